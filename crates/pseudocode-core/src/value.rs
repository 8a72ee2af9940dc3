//! Runtime values.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::ast::{DataType, Literal};
use crate::error::{Error, Result};

/// Upper bound on the number of cells a single array may hold.
pub const MAX_ARRAY_CELLS: usize = 1_000_000;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    /// STRING and CHAR values
    Text(String),
    Boolean(bool),
    Array(Array),
    /// What an unbound parameter reads as
    Null,
}

impl Value {
    /// The value a freshly declared variable of `data_type` holds.
    pub fn zero(data_type: DataType) -> Value {
        match data_type {
            DataType::Integer => Value::Integer(0),
            DataType::Real => Value::Real(0.0),
            DataType::Char | DataType::String => Value::Text(String::new()),
            DataType::Boolean => Value::Boolean(false),
        }
    }

    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Real(r) => Value::Real(*r),
            Literal::Char(c) => Value::Text(c.to_string()),
            Literal::String(s) => Value::Text(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }

    /// Type name used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "STRING",
            Value::Boolean(_) => "BOOLEAN",
            Value::Array(_) => "ARRAY",
            Value::Null => "NULL",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// An Integer, or a Real with no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => Some(*r as i64),
            _ => None,
        }
    }

    /// Language equality: Integer and Real compare by numeric value, every
    /// other pair of different types is unequal.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(_), Value::Real(_))
            | (Value::Real(_), Value::Integer(_))
            | (Value::Real(_), Value::Real(_)) => self.as_f64() == other.as_f64(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.equals(b),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }

    /// Ordering for `<`, `<=`, `>` and `>=`. Only numbers and text are
    /// ordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ if self.is_numeric() && other.is_numeric() => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => None,
        }
    }

    /// Convert raw input text into a value shaped like `current`, the value
    /// the target holds before the read.
    pub fn coerce_input(raw: &str, current: &Value) -> Result<Value> {
        let trimmed = raw.trim();
        match current {
            Value::Integer(_) => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::type_error(format!("Expected an INTEGER value but got '{}'", raw))),
            Value::Real(_) => match trimmed.parse::<f64>() {
                Ok(r) if r.is_finite() => Ok(Value::Real(r)),
                _ => Err(Error::type_error(format!("Expected a REAL value but got '{}'", raw))),
            },
            Value::Boolean(_) => match trimmed.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Value::Boolean(true)),
                "FALSE" => Ok(Value::Boolean(false)),
                _ => Err(Error::type_error(format!("Expected a BOOLEAN value but got '{}'", raw))),
            },
            Value::Text(_) | Value::Null => Ok(Value::Text(raw.to_string())),
            Value::Array(_) => Err(Error::type_error("Cannot read a value into a whole array")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", format_real(*r)),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Array(array) => write!(f, "{}", array),
            Value::Null => f.write_str("null"),
        }
    }
}

/// Shortest round-trip rendering, with integral values printed without a
/// fractional part.
pub fn format_real(r: f64) -> String {
    if r.is_nan() {
        "NaN".to_string()
    } else if r.is_infinite() {
        let sign = if r < 0.0 { "-" } else { "" };
        format!("{}Infinity", sign)
    } else if r == 0.0 {
        "0".to_string()
    } else {
        r.to_string()
    }
}

/// Why an array index was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("expected {expected} index(es) but got {found}")]
    WrongDimensions { expected: usize, found: usize },
    #[error("index {index} is out of bounds {lower}:{upper}")]
    OutOfBounds { index: i64, lower: i64, upper: i64 },
}

/// A one- or two-dimensional array with inclusive bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    bounds: Vec<(i64, i64)>,
    /// Row-major cells
    cells: Vec<Value>,
}

impl Array {
    /// Create an array over `bounds` with every cell set to `fill`.
    pub fn new(bounds: Vec<(i64, i64)>, fill: Value) -> Result<Self> {
        let mut count: usize = 1;
        for &(lower, upper) in &bounds {
            if lower > upper {
                return Err(Error::runtime(format!(
                    "Array lower bound {} is greater than upper bound {}",
                    lower, upper
                )));
            }
            let extent = usize::try_from(upper.abs_diff(lower))
                .ok()
                .and_then(|n| n.checked_add(1));
            count = extent
                .and_then(|n| count.checked_mul(n))
                .filter(|&n| n <= MAX_ARRAY_CELLS)
                .ok_or_else(|| {
                    Error::runtime(format!("Array exceeds the maximum of {} cells", MAX_ARRAY_CELLS))
                })?;
        }

        Ok(Self {
            bounds,
            cells: vec![fill; count],
        })
    }

    pub fn bounds(&self) -> &[(i64, i64)] {
        &self.bounds
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn offset(&self, indices: &[i64]) -> std::result::Result<usize, IndexError> {
        if indices.len() != self.bounds.len() {
            return Err(IndexError::WrongDimensions {
                expected: self.bounds.len(),
                found: indices.len(),
            });
        }

        let mut offset = 0usize;
        for (&index, &(lower, upper)) in indices.iter().zip(&self.bounds) {
            if index < lower || index > upper {
                return Err(IndexError::OutOfBounds { index, lower, upper });
            }
            let extent = (upper - lower) as usize + 1;
            offset = offset * extent + (index - lower) as usize;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[i64]) -> std::result::Result<&Value, IndexError> {
        let offset = self.offset(indices)?;
        Ok(&self.cells[offset])
    }

    pub fn get_mut(&mut self, indices: &[i64]) -> std::result::Result<&mut Value, IndexError> {
        let offset = self.offset(indices)?;
        Ok(&mut self.cells[offset])
    }

    pub fn set(&mut self, indices: &[i64], value: Value) -> std::result::Result<(), IndexError> {
        *self.get_mut(indices)? = value;
        Ok(())
    }

    fn equals(&self, other: &Array) -> bool {
        self.bounds == other.bounds
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.equals(b))
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |cells: &[Value]| {
            cells
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self.bounds.as_slice() {
            [_, (lower, upper)] => {
                let width = (upper - lower) as usize + 1;
                let rows: Vec<String> = self
                    .cells
                    .chunks(width)
                    .map(|row| format!("[{}]", join(row)))
                    .collect();
                write!(f, "[{}]", rows.join(", "))
            }
            _ => write!(f, "[{}]", join(&self.cells)),
        }
    }
}
