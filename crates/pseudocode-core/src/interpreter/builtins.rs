//! Built-in functions.

use std::fmt;

use rand::Rng;

use super::Interpreter;
use crate::error::{Error, Result};
use crate::value::Value;

/// A built-in function. Names are matched case-insensitively and take
/// precedence over user-defined functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Div,
    Mod,
    Length,
    Lcase,
    Ucase,
    Substring,
    Round,
    Random,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Div,
        Builtin::Mod,
        Builtin::Length,
        Builtin::Lcase,
        Builtin::Ucase,
        Builtin::Substring,
        Builtin::Round,
        Builtin::Random,
    ];

    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Div => "DIV",
            Builtin::Mod => "MOD",
            Builtin::Length => "LENGTH",
            Builtin::Lcase => "LCASE",
            Builtin::Ucase => "UCASE",
            Builtin::Substring => "SUBSTRING",
            Builtin::Round => "ROUND",
            Builtin::Random => "RANDOM",
        }
    }

    /// Argument counts the function accepts.
    pub fn arities(self) -> &'static [usize] {
        match self {
            Builtin::Length | Builtin::Lcase | Builtin::Ucase => &[1],
            Builtin::Div | Builtin::Mod | Builtin::Round => &[2],
            Builtin::Substring => &[3],
            Builtin::Random => &[0, 2],
        }
    }

    fn check_arity(self, count: usize) -> Result<()> {
        let arities = self.arities();
        if arities.contains(&count) {
            return Ok(());
        }
        let expected = match arities {
            [n] => n.to_string(),
            _ => arities
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
        };
        let noun = if arities == [1] { "argument" } else { "arguments" };
        Err(Error::runtime(format!(
            "{} requires {} {}",
            self.name(),
            expected,
            noun
        )))
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'h> Interpreter<'h> {
    pub(crate) fn call_builtin(&mut self, builtin: Builtin, arguments: Vec<Value>) -> Result<Value> {
        builtin.check_arity(arguments.len())?;
        let args = Arguments {
            builtin,
            values: &arguments,
        };

        match builtin {
            Builtin::Div => match (&arguments[0], &arguments[1]) {
                (Value::Integer(a), Value::Integer(b)) => {
                    if *b == 0 {
                        return Err(Error::runtime("Division by zero"));
                    }
                    floor_div(*a, *b)
                        .map(Value::Integer)
                        .ok_or_else(|| Error::runtime("Integer overflow"))
                }
                _ => {
                    let (a, b) = (args.number(0)?, args.number(1)?);
                    if b == 0.0 {
                        return Err(Error::runtime("Division by zero"));
                    }
                    let quotient = (a / b).floor();
                    if !quotient.is_finite() || quotient.abs() >= i64::MAX as f64 {
                        return Err(Error::runtime("Integer overflow"));
                    }
                    Ok(Value::Integer(quotient as i64))
                }
            },
            Builtin::Mod => match (&arguments[0], &arguments[1]) {
                (Value::Integer(a), Value::Integer(b)) => {
                    if *b == 0 {
                        return Err(Error::runtime("Division by zero"));
                    }
                    Ok(Value::Integer(a.checked_rem(*b).unwrap_or(0)))
                }
                _ => {
                    let (a, b) = (args.number(0)?, args.number(1)?);
                    if b == 0.0 {
                        return Err(Error::runtime("Division by zero"));
                    }
                    Ok(Value::Real(a % b))
                }
            },
            Builtin::Length => {
                let length = args.text(0)?.chars().count();
                Ok(Value::Integer(length as i64))
            }
            Builtin::Lcase => Ok(Value::Text(args.text(0)?.to_lowercase())),
            Builtin::Ucase => Ok(Value::Text(args.text(0)?.to_uppercase())),
            Builtin::Substring => {
                let text = args.text(0)?;
                let start = args.integer(1)?;
                let length = args.integer(2)?;
                Ok(Value::Text(substring(text, start, length)))
            }
            Builtin::Round => {
                let x = args.number(0)?;
                let places = args.integer(1)?;
                let places = i32::try_from(places)
                    .map_err(|_| Error::runtime(format!("ROUND cannot use {} decimal places", places)))?;
                let factor = 10f64.powi(places);
                Ok(Value::Real((x * factor + 0.5).floor() / factor))
            }
            Builtin::Random => {
                if arguments.is_empty() {
                    return Ok(Value::Real(self.rng.gen::<f64>()));
                }
                let (min, max) = (args.integer(0)?, args.integer(1)?);
                if min > max {
                    return Err(Error::runtime(format!(
                        "RANDOM minimum {} is greater than maximum {}",
                        min, max
                    )));
                }
                Ok(Value::Integer(self.rng.gen_range(min..=max)))
            }
        }
    }
}

/// Typed access to a built-in's arguments.
struct Arguments<'a> {
    builtin: Builtin,
    values: &'a [Value],
}

impl<'a> Arguments<'a> {
    fn wrong_type(&self, position: usize, expected: &str) -> Error {
        Error::type_error(format!(
            "{} argument {} must be {}, got {}",
            self.builtin,
            position + 1,
            expected,
            self.values[position].type_name()
        ))
    }

    fn number(&self, position: usize) -> Result<f64> {
        self.values[position]
            .as_f64()
            .ok_or_else(|| self.wrong_type(position, "a number"))
    }

    fn integer(&self, position: usize) -> Result<i64> {
        self.values[position]
            .as_integer()
            .ok_or_else(|| self.wrong_type(position, "an INTEGER"))
    }

    fn text(&self, position: usize) -> Result<&'a str> {
        self.values[position]
            .as_text()
            .ok_or_else(|| self.wrong_type(position, "a STRING"))
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

/// One-based substring of `length` characters, clamped to the text.
fn substring(text: &str, start: i64, length: i64) -> String {
    let begin = start.saturating_sub(1).max(0);
    let end = start.saturating_sub(1).saturating_add(length.max(0)).max(0);
    let begin = usize::try_from(begin).unwrap_or(usize::MAX);
    let end = usize::try_from(end).unwrap_or(usize::MAX);
    text.chars()
        .skip(begin)
        .take(end.saturating_sub(begin))
        .collect()
}
