//! Expression evaluation.

use std::cmp::Ordering;

use super::{Builtin, FrameKind, Interpreter};
use crate::ast::*;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::value::Value;

impl<'h> Interpreter<'h> {
    pub(crate) fn evaluate(&mut self, expression: &Expression, env: &Environment) -> Result<Value> {
        match expression {
            Expression::Literal { value, .. } => Ok(Value::from_literal(value)),
            Expression::Variable(name) => env.lookup(&name.name).cloned(),
            Expression::Grouping { expression, .. } => self.evaluate(expression, env),
            Expression::Unary {
                operator, operand, ..
            } => {
                let operand = self.evaluate(operand, env)?;
                unary(*operator, operand)
            }
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                binary(*operator, left, right)
            }
            Expression::ArrayAccess { name, indices, .. } => {
                let indices = indices
                    .iter()
                    .map(|index| self.evaluate_integer(index, env, "Array index"))
                    .collect::<Result<Vec<_>>>()?;
                self.element(&name.name, &indices, env)
            }
            Expression::FunctionCall {
                name, arguments, ..
            } => self.call_function(name, arguments, env),
        }
    }

    /// Evaluate an expression that must produce a whole number.
    pub(crate) fn evaluate_integer(
        &mut self,
        expression: &Expression,
        env: &Environment,
        what: &str,
    ) -> Result<i64> {
        let value = self.evaluate(expression, env)?;
        value.as_integer().ok_or_else(|| {
            Error::type_error(format!("{} must be an INTEGER, got {}", what, value.type_name()))
        })
    }

    /// Read one array cell.
    pub(crate) fn element(&self, name: &str, indices: &[i64], env: &Environment) -> Result<Value> {
        match env.lookup(name)? {
            Value::Array(array) => array
                .get(indices)
                .cloned()
                .map_err(|e| Error::runtime(format!("Array {}: {}", name, e))),
            _ => Err(Error::type_error(format!("{} is not an array", name))),
        }
    }

    fn call_function(&mut self, name: &Identifier, arguments: &[Expression], env: &Environment) -> Result<Value> {
        if let Some(builtin) = Builtin::from_name(&name.name) {
            let values = arguments
                .iter()
                .map(|argument| self.evaluate(argument, env))
                .collect::<Result<Vec<_>>>()?;
            return self.call_builtin(builtin, values);
        }

        match env.function(&name.name) {
            Some(function) => self.invoke(&function, arguments, env, FrameKind::Function),
            None if env.procedure(&name.name).is_some() => Err(Error::reference(format!(
                "{} is a procedure and returns no value; use CALL {}",
                name.name, name.name
            ))),
            None => Err(Error::reference(format!("Undefined function: {}", name.name))),
        }
    }
}

fn unary(operator: UnaryOperator, operand: Value) -> Result<Value> {
    match (operator, operand) {
        (UnaryOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::runtime("Integer overflow")),
        (UnaryOperator::Negate, Value::Real(r)) => Ok(Value::Real(-r)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Negate, other) => Err(Error::type_error(format!(
            "Cannot negate a {}",
            other.type_name()
        ))),
        (UnaryOperator::Not, other) => Err(Error::type_error(format!(
            "NOT requires a BOOLEAN, got {}",
            other.type_name()
        ))),
    }
}

fn binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value> {
    use BinaryOperator::*;

    match operator {
        And | Or => match (left.as_bool(), right.as_bool()) {
            (Some(a), Some(b)) => Ok(Value::Boolean(if operator == And { a && b } else { a || b })),
            _ => Err(mismatch(operator, &left, &right)),
        },
        Equal => Ok(Value::Boolean(left.equals(&right))),
        NotEqual => Ok(Value::Boolean(!left.equals(&right))),
        Less | LessEqual | Greater | GreaterEqual => {
            let ordering = left.compare(&right).ok_or_else(|| {
                Error::type_error(format!(
                    "Cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match operator {
                Less => ordering == Ordering::Less,
                LessEqual => ordering != Ordering::Greater,
                Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }
        Add if matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)) => {
            Ok(Value::Text(format!("{}{}", left, right)))
        }
        Divide => {
            let (a, b) = numbers(operator, &left, &right)?;
            if b == 0.0 {
                return Err(Error::runtime("Division by zero"));
            }
            Ok(Value::Real(a / b))
        }
        Power => match (&left, &right) {
            (Value::Integer(base), Value::Integer(exponent)) if *exponent >= 0 => {
                let result = u32::try_from(*exponent)
                    .ok()
                    .and_then(|exponent| base.checked_pow(exponent));
                result
                    .map(Value::Integer)
                    .ok_or_else(|| Error::runtime("Integer overflow"))
            }
            _ => {
                let (a, b) = numbers(operator, &left, &right)?;
                Ok(Value::Real(a.powf(b)))
            }
        },
        Add | Subtract | Multiply => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => {
                let result = match operator {
                    Add => a.checked_add(*b),
                    Subtract => a.checked_sub(*b),
                    _ => a.checked_mul(*b),
                };
                result
                    .map(Value::Integer)
                    .ok_or_else(|| Error::runtime("Integer overflow"))
            }
            _ => {
                let (a, b) = numbers(operator, &left, &right)?;
                let result = match operator {
                    Add => a + b,
                    Subtract => a - b,
                    _ => a * b,
                };
                Ok(Value::Real(result))
            }
        },
    }
}

fn numbers(operator: BinaryOperator, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(mismatch(operator, left, right)),
    }
}

fn mismatch(operator: BinaryOperator, left: &Value, right: &Value) -> Error {
    Error::type_error(format!(
        "Operator {} cannot be applied to {} and {}",
        operator,
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::run;

    fn value_of(expression: &str) -> String {
        let result = run(&format!("OUTPUT {}", expression));
        match result.error_lines().first() {
            Some(error) => error.to_string(),
            None => result.output,
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(value_of("1 + 2 * 3"), "7");
        assert_eq!(value_of("(1 + 2) * 3"), "9");
        assert_eq!(value_of("7 - 10"), "-3");
        assert_eq!(value_of("7 / 2"), "3.5");
        assert_eq!(value_of("6 / 3"), "2");
        assert_eq!(value_of("1.5 + 1"), "2.5");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(value_of("2 ^ 3 ^ 2"), "512");
        assert_eq!(value_of("2 ^ -1"), "0.5");
        assert_eq!(value_of("-2 ^ 2"), "4");
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(
            value_of("9223372036854775807 + 1"),
            "RuntimeError: Integer overflow at line 1"
        );
        assert_eq!(value_of("10 ^ 19"), "RuntimeError: Integer overflow at line 1");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(value_of("1 / 0"), "RuntimeError: Division by zero at line 1");
        assert_eq!(value_of("1.5 / 0.0"), "RuntimeError: Division by zero at line 1");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(value_of("2 = 2.0"), "TRUE");
        assert_eq!(value_of("1 <> 2"), "TRUE");
        assert_eq!(value_of("\"apple\" < \"banana\""), "TRUE");
        assert_eq!(value_of("3 >= 3"), "TRUE");
        assert_eq!(value_of("\"1\" = 1"), "FALSE");
        assert_eq!(
            value_of("TRUE < FALSE"),
            "TypeError: Cannot compare BOOLEAN with BOOLEAN at line 1"
        );
    }

    #[test]
    fn test_logic() {
        assert_eq!(value_of("TRUE AND NOT FALSE"), "TRUE");
        assert_eq!(value_of("FALSE OR FALSE"), "FALSE");
        assert_eq!(value_of("1 < 2 AND 2 < 3"), "TRUE");
        assert_eq!(
            value_of("1 AND TRUE"),
            "TypeError: Operator AND cannot be applied to INTEGER and BOOLEAN at line 1"
        );
        assert_eq!(
            value_of("NOT 1"),
            "TypeError: NOT requires a BOOLEAN, got INTEGER at line 1"
        );
    }

    #[test]
    fn test_logic_evaluates_both_sides() {
        assert_eq!(
            value_of("FALSE AND 1 / 0 = 1"),
            "RuntimeError: Division by zero at line 1"
        );
    }

    #[test]
    fn test_text_concatenation() {
        assert_eq!(value_of("\"a\" + \"b\""), "ab");
        assert_eq!(value_of("\"n = \" + 4"), "n = 4");
        assert_eq!(value_of("1.5 + \"!\""), "1.5!");
        assert_eq!(
            value_of("\"a\" - 1"),
            "TypeError: Operator - cannot be applied to STRING and INTEGER at line 1"
        );
    }

    #[test]
    fn test_char_literal_is_text() {
        assert_eq!(value_of("'x' = \"x\""), "TRUE");
    }

    #[test]
    fn test_undeclared_variable() {
        assert_eq!(
            value_of("Missing + 1"),
            "RuntimeError: Undeclared variable Missing at line 1"
        );
    }

    #[test]
    fn test_indexing_a_scalar() {
        let result = run("DECLARE X : INTEGER\nOUTPUT X[1]");
        assert_eq!(
            result.error_lines(),
            vec!["TypeError: X is not an array at line 2"]
        );
    }

    #[test]
    fn test_real_index_with_zero_fraction() {
        let result = run("DECLARE A : ARRAY[1:3] OF INTEGER\nA[2] ← 5\nOUTPUT A[4 / 2]\nOUTPUT A[1.5]");
        assert_eq!(result.output_lines(), vec!["5"]);
        assert_eq!(
            result.error_lines(),
            vec!["TypeError: Array index must be an INTEGER, got REAL at line 4"]
        );
    }

    #[test]
    fn test_procedure_used_as_function() {
        let result = run("PROCEDURE P\nENDPROCEDURE\nOUTPUT P()");
        assert_eq!(
            result.error_lines(),
            vec!["ReferenceError: P is a procedure and returns no value; use CALL P at line 3"]
        );
    }
}
