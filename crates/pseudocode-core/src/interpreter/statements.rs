//! Statement execution.

use std::rc::Rc;

use super::{Flow, FrameKind, Interpreter};
use crate::ast::*;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::host::OutputKind;
use crate::value::{Array, Value};

impl<'h> Interpreter<'h> {
    /// Execute one statement. Errors raised without a location get the
    /// statement's span.
    pub(crate) fn execute(&mut self, statement: &Statement, env: &mut Environment) -> Result<Flow> {
        self.tick()
            .and_then(|_| self.execute_kind(statement, env))
            .map_err(|error| error.or_span(statement.span))
    }

    /// Execute statements in order, stopping at the first RETURN.
    pub(crate) fn execute_block(&mut self, statements: &[Statement], env: &mut Environment) -> Result<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_kind(&mut self, statement: &Statement, env: &mut Environment) -> Result<Flow> {
        match &statement.kind {
            StatementKind::VariableDeclaration {
                name,
                data_type,
                dimensions,
            } => self.declare_variable(name, *data_type, dimensions, env)?,
            StatementKind::ConstantDeclaration { name, value } => {
                let value = self.evaluate(value, env)?;
                env.declare_constant(&name.name, value)?;
            }
            StatementKind::Assignment { target, value } => {
                let value = self.evaluate(value, env)?;
                self.store(target, value, env)?;
            }
            StatementKind::Input { target } => self.input_into(target, env)?,
            StatementKind::Output { expression } => {
                let value = self.evaluate(expression, env)?;
                self.emit(OutputKind::Output, value.to_string());
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate_condition(condition, env)? {
                    return self.execute_block(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.execute_block(else_branch, env);
                }
            }
            StatementKind::Case {
                subject,
                branches,
                otherwise,
            } => return self.execute_case(subject, branches, otherwise.as_deref(), env),
            StatementKind::For {
                variable,
                start,
                end,
                step,
                body,
                ..
            } => return self.execute_for(variable, start, end, step, body, env),
            StatementKind::Repeat { body, condition } => {
                return self.execute_repeat(statement.line(), body, condition, env)
            }
            StatementKind::While { condition, body } => {
                return self.execute_while(statement.line(), condition, body, env)
            }
            StatementKind::ProcedureDeclaration(callable) => {
                env.define_procedure(Rc::new(callable.clone()));
            }
            StatementKind::FunctionDeclaration(callable) => {
                env.define_function(Rc::new(callable.clone()));
            }
            StatementKind::Call { name, arguments } => self.call_procedure(name, arguments, env)?,
            StatementKind::Return { value } => {
                if self.frames.last() != Some(&FrameKind::Function) {
                    return Err(Error::runtime("RETURN is only allowed inside a FUNCTION"));
                }
                let value = self.evaluate(value, env)?;
                return Ok(Flow::Return(value));
            }
            StatementKind::OpenFile { file, mode } => self.open_file(file, *mode, env)?,
            StatementKind::ReadFile { file, target } => self.read_file(file, target, env)?,
            StatementKind::WriteFile { file, value } => self.write_file(file, value, env)?,
            StatementKind::CloseFile { file } => self.close_file(file, env)?,
            StatementKind::Error { message } => {
                let error = Error::syntax(message.clone(), statement.span);
                self.emit(OutputKind::Error, error.to_string());
            }
        }
        Ok(Flow::Normal)
    }

    // The helpers below keep `execute_kind` small: it sits on every level of
    // recursion, so its frame size bounds how deep programs can nest.

    fn declare_variable(
        &mut self,
        name: &Identifier,
        data_type: DataType,
        dimensions: &[Dimension],
        env: &mut Environment,
    ) -> Result<()> {
        let value = if dimensions.is_empty() {
            Value::zero(data_type)
        } else {
            let mut bounds = Vec::with_capacity(dimensions.len());
            for dimension in dimensions {
                let lower = self.evaluate_integer(&dimension.lower, env, "Array bound")?;
                let upper = self.evaluate_integer(&dimension.upper, env, "Array bound")?;
                bounds.push((lower, upper));
            }
            Value::Array(Array::new(bounds, Value::zero(data_type))?)
        };
        env.declare_variable(&name.name, value)
    }

    fn input_into(&mut self, target: &Target, env: &mut Environment) -> Result<()> {
        let raw = self
            .input
            .next_input(&target.name.name)
            .ok_or_else(|| Error::runtime(format!("No input available for {}", target.name.name)))?;
        self.store_text(target, &raw, env)
    }

    fn execute_case(
        &mut self,
        subject: &Expression,
        branches: &[CaseBranch],
        otherwise: Option<&Statement>,
        env: &mut Environment,
    ) -> Result<Flow> {
        let subject = self.evaluate(subject, env)?;
        for branch in branches {
            let label = self.evaluate(&branch.label, env)?;
            if subject.equals(&label) {
                return self.execute(&branch.statement, env);
            }
        }
        match otherwise {
            Some(statement) => self.execute(statement, env),
            None => Ok(Flow::Normal),
        }
    }

    fn execute_repeat(
        &mut self,
        line: usize,
        body: &[Statement],
        condition: &Expression,
        env: &mut Environment,
    ) -> Result<Flow> {
        self.trace(format!("REPEAT loop at line {}", line));
        let mut iterations = 0;
        loop {
            self.guard_iteration(&mut iterations)?;
            if let Flow::Return(value) = self.execute_block(body, env)? {
                return Ok(Flow::Return(value));
            }
            if self.evaluate_condition(condition, env)? {
                return Ok(Flow::Normal);
            }
        }
    }

    fn execute_while(
        &mut self,
        line: usize,
        condition: &Expression,
        body: &[Statement],
        env: &mut Environment,
    ) -> Result<Flow> {
        self.trace(format!("WHILE loop at line {}", line));
        let mut iterations = 0;
        while self.evaluate_condition(condition, env)? {
            self.guard_iteration(&mut iterations)?;
            if let Flow::Return(value) = self.execute_block(body, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn call_procedure(&mut self, name: &Identifier, arguments: &[Expression], env: &Environment) -> Result<()> {
        let procedure = match env.procedure(&name.name) {
            Some(procedure) => procedure,
            None if env.function(&name.name).is_some() => {
                return Err(Error::reference(format!(
                    "{} is a function; use it in an expression instead of CALL",
                    name.name
                )));
            }
            None => return Err(Error::reference(format!("Undefined procedure: {}", name.name))),
        };
        self.invoke(&procedure, arguments, env, FrameKind::Procedure)?;
        Ok(())
    }

    fn execute_for(
        &mut self,
        variable: &Identifier,
        start: &Expression,
        end: &Expression,
        step: &Expression,
        body: &[Statement],
        env: &mut Environment,
    ) -> Result<Flow> {
        let start = self.evaluate(start, env)?;
        let end = self.evaluate(end, env)?;
        let step = self.evaluate(step, env)?;

        for (what, value) in [("start", &start), ("end", &end), ("step", &step)] {
            if !value.is_numeric() {
                return Err(Error::type_error(format!(
                    "FOR {} value must be a number, got {}",
                    what,
                    value.type_name()
                )));
            }
        }
        if step.as_f64() == Some(0.0) {
            return Err(Error::limit(format!(
                "FOR loop on {} has STEP 0 and would never finish",
                variable.name
            )));
        }

        self.trace(format!(
            "FOR {} from {} to {} step {}",
            variable.name, start, end, step
        ));
        env.bind(&variable.name, start.clone())?;

        let mut iterations = 0;
        match (start, end, step) {
            (Value::Integer(mut counter), Value::Integer(end), Value::Integer(step)) => loop {
                let done = if step > 0 { counter > end } else { counter < end };
                if done {
                    break;
                }
                self.guard_iteration(&mut iterations)?;
                env.bind(&variable.name, Value::Integer(counter))?;
                if let Flow::Return(value) = self.execute_block(body, env)? {
                    return Ok(Flow::Return(value));
                }
                counter = match counter.checked_add(step) {
                    Some(next) => next,
                    None => break,
                };
            },
            (start, end, step) => {
                let (start, end, step) = (
                    start.as_f64().unwrap_or_default(),
                    end.as_f64().unwrap_or_default(),
                    step.as_f64().unwrap_or_default(),
                );
                // Each value is computed from the start so rounding error
                // does not build up across iterations.
                let mut index = 0u64;
                loop {
                    let counter = start + index as f64 * step;
                    let done = if step > 0.0 { counter > end } else { counter < end };
                    if done {
                        break;
                    }
                    self.guard_iteration(&mut iterations)?;
                    env.bind(&variable.name, Value::Real(counter))?;
                    if let Flow::Return(value) = self.execute_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                    index += 1;
                }
            }
        }
        Ok(Flow::Normal)
    }

    /// Call a procedure or function with positional arguments. Missing
    /// arguments bind to NULL; extra arguments are not evaluated.
    pub(crate) fn invoke(
        &mut self,
        callable: &Callable,
        arguments: &[Expression],
        env: &Environment,
        kind: FrameKind,
    ) -> Result<Value> {
        let mut frame = env.call_frame();
        for (index, parameter) in callable.parameters.iter().enumerate() {
            let value = match arguments.get(index) {
                Some(argument) => self.evaluate(argument, env)?,
                None => Value::Null,
            };
            frame.bind(&parameter.name.name, value)?;
        }

        if self.frames.len() >= self.limits.max_call_depth {
            return Err(Error::limit(format!(
                "Maximum call depth ({}) exceeded",
                self.limits.max_call_depth
            )));
        }

        self.trace(format!("entering {} {}", kind, callable.name.name));
        self.frames.push(kind);
        let result = self.execute_block(&callable.body, &mut frame);
        self.frames.pop();
        self.trace(format!("leaving {} {}", kind, callable.name.name));

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(callable.return_type.map(Value::zero).unwrap_or(Value::Null)),
        }
    }

    fn evaluate_condition(&mut self, condition: &Expression, env: &Environment) -> Result<bool> {
        let value = self.evaluate(condition, env)?;
        value.as_bool().ok_or_else(|| {
            Error::type_error(format!(
                "Condition must evaluate to a BOOLEAN, got {}",
                value.type_name()
            ))
        })
    }

    /// Evaluate the indices of an element target.
    fn evaluate_indices(&mut self, indices: &[Expression], env: &Environment) -> Result<Vec<i64>> {
        indices
            .iter()
            .map(|index| self.evaluate_integer(index, env, "Array index"))
            .collect()
    }

    /// Store `value` into a variable or array cell.
    pub(crate) fn store(&mut self, target: &Target, value: Value, env: &mut Environment) -> Result<()> {
        let name = &target.name.name;
        if !target.is_element() {
            return env.assign(name, value);
        }

        if matches!(value, Value::Array(_)) {
            return Err(Error::type_error(format!(
                "Cannot store an array in an element of {}",
                name
            )));
        }
        let indices = self.evaluate_indices(&target.indices, env)?;
        match env.variable_mut(name)? {
            Value::Array(array) => array
                .set(&indices, value)
                .map_err(|e| Error::runtime(format!("Array {}: {}", name, e))),
            _ => Err(Error::type_error(format!("{} is not an array", name))),
        }
    }

    /// Store raw text (from INPUT or READFILE), converted to the type the
    /// target currently holds.
    pub(crate) fn store_text(&mut self, target: &Target, raw: &str, env: &mut Environment) -> Result<()> {
        let current = if target.is_element() {
            let indices = self.evaluate_indices(&target.indices, env)?;
            self.element(&target.name.name, &indices, env)?
        } else {
            env.lookup(&target.name.name)?.clone()
        };
        let value = Value::coerce_input(raw, &current)?;
        self.store(target, value, env)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Limits;
    use crate::error::ErrorKind;
    use crate::host::QueueInput;
    use crate::interpreter::{run, Interpreter};

    fn outputs(source: &str) -> Vec<String> {
        run(source)
            .output_lines()
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn first_error(source: &str) -> String {
        run(source)
            .error_lines()
            .first()
            .map(|line| line.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_declared_variables_read_as_zero() {
        assert_eq!(outputs("DECLARE X : INTEGER\nX ← X\nOUTPUT X"), vec!["0"]);
        assert_eq!(
            outputs("DECLARE R : REAL\nDECLARE S : STRING\nDECLARE B : BOOLEAN\nOUTPUT R\nOUTPUT S\nOUTPUT B"),
            vec!["0", "", "FALSE"]
        );
    }

    #[test]
    fn test_redeclaration_is_an_error() {
        assert_eq!(
            first_error("DECLARE X : INTEGER\nDECLARE X : INTEGER"),
            "RuntimeError: Variable X already declared at line 2"
        );
    }

    #[test]
    fn test_constant_assignment_is_an_error() {
        let result = run("CONSTANT Max ← 10\nMax ← 11\nOUTPUT Max");
        assert_eq!(
            result.error_lines(),
            vec!["RuntimeError: Cannot assign to constant Max at line 2"]
        );
        assert_eq!(result.output_lines(), vec!["10"]);
    }

    #[test]
    fn test_assignment_to_undeclared_variable() {
        assert_eq!(
            first_error("Y ← 1"),
            "RuntimeError: Undeclared variable Y at line 1"
        );
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(
            outputs("FOR i ← 1 TO 5\nOUTPUT i\nNEXT i"),
            vec!["1", "2", "3", "4", "5"]
        );
        assert_eq!(
            outputs("FOR i ← 5 TO 1 STEP -1\nOUTPUT i\nNEXT i"),
            vec!["5", "4", "3", "2", "1"]
        );
        assert_eq!(
            outputs("FOR x ← 0 TO 1 STEP 0.5\nOUTPUT x\nNEXT x"),
            vec!["0", "0.5", "1"]
        );
    }

    #[test]
    fn test_real_step_reaches_the_end_value() {
        let up = outputs("FOR x ← 0 TO 1 STEP 0.1\nOUTPUT x\nNEXT x");
        assert_eq!(up.len(), 11);
        assert_eq!(up.last().map(String::as_str), Some("1"));

        let down = outputs("FOR x ← 1 TO 0 STEP -0.1\nOUTPUT x\nNEXT x");
        assert_eq!(down.len(), 11);
        assert_eq!(down.last().map(String::as_str), Some("0"));
    }

    #[test]
    fn test_for_variable_keeps_last_value() {
        assert_eq!(outputs("FOR i ← 1 TO 3\nNEXT i\nOUTPUT i"), vec!["3"]);
        assert_eq!(outputs("FOR i ← 7 TO 1\nNEXT i\nOUTPUT i"), vec!["7"]);
    }

    #[test]
    fn test_for_body_cannot_change_the_counter() {
        assert_eq!(
            outputs("FOR i ← 1 TO 3\ni ← 100\nOUTPUT i\nNEXT i"),
            vec!["100", "100", "100"]
        );
    }

    #[test]
    fn test_for_zero_step_trips_the_governor() {
        let result = run("FOR i ← 1 TO 5 STEP 0\nOUTPUT i\nNEXT i\nOUTPUT \"after\"");
        assert!(result.halted);
        assert!(result.output_lines().is_empty());
        assert_eq!(result.diagnostics.iter().last().and_then(|d| d.kind), Some(ErrorKind::Limit));
    }

    #[test]
    fn test_repeat_runs_at_least_once() {
        assert_eq!(outputs("REPEAT\nOUTPUT \"x\"\nUNTIL TRUE"), vec!["x"]);
    }

    #[test]
    fn test_while_checks_before_each_iteration() {
        assert_eq!(outputs("WHILE FALSE DO\nOUTPUT 1\nENDWHILE"), Vec::<String>::new());
        assert_eq!(
            outputs("DECLARE n : INTEGER\nWHILE n < 3 DO\nn ← n + 1\nOUTPUT n\nENDWHILE"),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn test_infinite_loop_is_stopped() {
        let mut interpreter = Interpreter::new().with_limits(Limits {
            max_loop_iterations: 50,
            ..Limits::default()
        });
        let result = interpreter.run_source("WHILE TRUE DO\nENDWHILE\nOUTPUT \"unreached\"");
        assert!(result.halted);
        assert_eq!(
            result.error_lines(),
            vec!["LimitExceeded: Loop exceeded 50 iterations at line 1"]
        );
    }

    #[test]
    fn test_endless_repeat_is_stopped() {
        let mut interpreter = Interpreter::new().with_limits(Limits {
            max_loop_iterations: 50,
            ..Limits::default()
        });
        let result = interpreter.run_source("REPEAT\nUNTIL FALSE\nOUTPUT \"unreached\"");
        assert!(result.halted);
        assert!(result.output_lines().is_empty());
        assert_eq!(
            result.error_lines(),
            vec!["LimitExceeded: Loop exceeded 50 iterations at line 1"]
        );
    }

    #[test]
    fn test_long_for_loop_is_stopped() {
        let mut interpreter = Interpreter::new().with_limits(Limits {
            max_loop_iterations: 50,
            ..Limits::default()
        });
        let result = interpreter.run_source("FOR i ← 1 TO 1000000\nOUTPUT i\nNEXT i\nOUTPUT \"unreached\"");
        assert!(result.halted);
        let printed = result.output_lines();
        assert_eq!(printed.len(), 50);
        assert_eq!(printed.last(), Some(&"50"));
        assert_eq!(
            result.error_lines(),
            vec!["LimitExceeded: Loop exceeded 50 iterations at line 1"]
        );
    }

    #[test]
    fn test_non_boolean_condition() {
        assert_eq!(
            first_error("IF 1 THEN\nOUTPUT 1\nENDIF"),
            "TypeError: Condition must evaluate to a BOOLEAN, got INTEGER at line 1"
        );
    }

    #[test]
    fn test_case_does_not_fall_through() {
        let source = "CASE 2 OF\n1 : OUTPUT \"one\"\n2 : OUTPUT \"two\"\nOTHERWISE : OUTPUT \"other\"\nENDCASE";
        assert_eq!(outputs(source), vec!["two"]);
        let source = "CASE \"z\" OF\n\"a\" : OUTPUT 1\nOTHERWISE : OUTPUT 0\nENDCASE";
        assert_eq!(outputs(source), vec!["0"]);
    }

    #[test]
    fn test_error_inside_loop_stops_the_loop() {
        let result = run("FOR i ← 1 TO 3\nOUTPUT 10 / (2 - i)\nNEXT i\nOUTPUT \"next\"");
        assert_eq!(result.output_lines(), vec!["10", "next"]);
        assert_eq!(
            result.error_lines(),
            vec!["RuntimeError: Division by zero at line 2"]
        );
    }

    #[test]
    fn test_arrays() {
        let source = r#"
DECLARE A : ARRAY[1:5] OF INTEGER
DECLARE G : ARRAY[0:1, 0:1] OF STRING
A[3] ← 7
G[1, 0] ← "x"
OUTPUT A[3]
OUTPUT A
OUTPUT G
A[10] ← 1
"#;
        let result = run(source);
        assert_eq!(
            result.output_lines(),
            vec!["7", "[0, 0, 7, 0, 0]", "[[, ], [x, ]]"]
        );
        assert_eq!(
            result.error_lines(),
            vec!["RuntimeError: Array A: index 10 is out of bounds 1:5 at line 9"]
        );
    }

    #[test]
    fn test_array_bounds_are_expressions() {
        let source = "CONSTANT N ← 3\nDECLARE A : ARRAY[1:N * 2] OF BOOLEAN\nA[6] ← TRUE\nOUTPUT A[6]";
        assert_eq!(outputs(source), vec!["TRUE"]);
        assert!(first_error("DECLARE A : ARRAY[5:1] OF INTEGER").contains("greater than upper bound"));
    }

    #[test]
    fn test_whole_array_assignment_copies() {
        let source = r#"
DECLARE A : ARRAY[1:2] OF INTEGER
DECLARE B : ARRAY[1:2] OF INTEGER
A[1] ← 1
B ← A
A[1] ← 9
OUTPUT B[1]
"#;
        assert_eq!(outputs(source), vec!["1"]);
    }

    #[test]
    fn test_input_converts_to_target_type() {
        let mut interpreter = Interpreter::new().with_input(QueueInput::new(["41", "2.5", "yes"]));
        let result = interpreter.run_source(
            "DECLARE N : INTEGER\nDECLARE R : REAL\nDECLARE B : BOOLEAN\nINPUT N\nINPUT R\nOUTPUT N + 1\nOUTPUT R * 2\nINPUT B",
        );
        assert_eq!(result.output_lines(), vec!["42", "5"]);
        assert_eq!(
            result.error_lines(),
            vec!["TypeError: Expected a BOOLEAN value but got 'yes' at line 8"]
        );
    }

    #[test]
    fn test_input_without_values() {
        assert_eq!(
            first_error("DECLARE N : INTEGER\nINPUT N"),
            "RuntimeError: No input available for N at line 2"
        );
    }

    #[test]
    fn test_procedures_and_functions() {
        let source = r#"
PROCEDURE Show(Label : STRING, Value : INTEGER)
    OUTPUT Label + ": " + Value
ENDPROCEDURE
FUNCTION Square(N : INTEGER) RETURNS INTEGER
    RETURN N * N
ENDFUNCTION
CALL Show("square", Square(4))
"#;
        assert_eq!(outputs(source), vec!["square: 16"]);
    }

    #[test]
    fn test_function_without_return_yields_zero_value() {
        assert_eq!(
            outputs("FUNCTION F() RETURNS INTEGER\nENDFUNCTION\nOUTPUT F()"),
            vec!["0"]
        );
        assert_eq!(
            outputs("FUNCTION G RETURNS BOOLEAN\nENDFUNCTION\nOUTPUT G()"),
            vec!["FALSE"]
        );
    }

    #[test]
    fn test_return_unwinds_nested_blocks() {
        let source = r#"
FUNCTION FirstOver(Limit : INTEGER) RETURNS INTEGER
    FOR i ← 1 TO 100
        IF i * i > Limit THEN
            RETURN i
        ENDIF
    NEXT i
    RETURN -1
ENDFUNCTION
OUTPUT FirstOver(50)
"#;
        assert_eq!(outputs(source), vec!["8"]);
    }

    #[test]
    fn test_missing_arguments_bind_null() {
        let source = "PROCEDURE P(A : INTEGER, B : INTEGER)\nOUTPUT B\nENDPROCEDURE\nCALL P(1)\nCALL P(1, 2, 3)";
        assert_eq!(outputs(source), vec!["null", "2"]);
    }

    #[test]
    fn test_callee_cannot_see_caller_locals() {
        let source = "DECLARE X : INTEGER\nPROCEDURE P\nOUTPUT X\nENDPROCEDURE\nCALL P";
        assert_eq!(
            first_error(source),
            "RuntimeError: Undeclared variable X at line 3"
        );
    }

    #[test]
    fn test_callable_redeclaration_overwrites() {
        let source = "PROCEDURE P\nOUTPUT 1\nENDPROCEDURE\nPROCEDURE P\nOUTPUT 2\nENDPROCEDURE\nCALL P";
        assert_eq!(outputs(source), vec!["2"]);
    }

    #[test]
    fn test_recursion_and_depth_limit() {
        let source = r#"
FUNCTION Fact(N : INTEGER) RETURNS INTEGER
    IF N <= 1 THEN
        RETURN 1
    ENDIF
    RETURN N * Fact(N - 1)
ENDFUNCTION
OUTPUT Fact(10)
"#;
        assert_eq!(outputs(source), vec!["3628800"]);

        let mut interpreter = Interpreter::new().with_limits(Limits {
            max_call_depth: 40,
            ..Limits::default()
        });
        let result = interpreter.run_source("PROCEDURE Loop\nCALL Loop\nENDPROCEDURE\nCALL Loop\nOUTPUT 1");
        assert!(result.halted);
        assert_eq!(
            result.error_lines(),
            vec!["LimitExceeded: Maximum call depth (40) exceeded at line 2"]
        );
    }

    #[test]
    fn test_default_call_depth_fits_the_thread_stack() {
        let function = r#"
FUNCTION Depth(N : INTEGER) RETURNS INTEGER
    IF N = 0 THEN
        RETURN 0
    ELSE
        RETURN Depth(N - 1) + 1
    ENDIF
ENDFUNCTION
"#;
        let deepest = Limits::default().max_call_depth - 1;
        assert_eq!(
            outputs(&format!("{}OUTPUT Depth({})", function, deepest)),
            vec![deepest.to_string()]
        );

        let result = run(&format!("{}OUTPUT Depth({})\nOUTPUT 1", function, deepest + 1));
        assert!(result.halted);
        assert!(result.output_lines().is_empty());
        assert_eq!(
            result.error_lines(),
            vec![format!(
                "LimitExceeded: Maximum call depth ({}) exceeded at line 6",
                deepest + 1
            )]
        );
    }

    #[test]
    fn test_error_in_function_is_not_a_return_value() {
        let result = run("FUNCTION F() RETURNS INTEGER\nRETURN 1 / 0\nENDFUNCTION\nOUTPUT F()\nOUTPUT \"after\"");
        assert!(!result.halted);
        assert_eq!(result.output_lines(), vec!["after"]);
        assert_eq!(
            result.error_lines(),
            vec!["RuntimeError: Division by zero at line 2"]
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(
            first_error("RETURN 1"),
            "RuntimeError: RETURN is only allowed inside a FUNCTION at line 1"
        );
        assert_eq!(
            first_error("PROCEDURE P\nRETURN 1\nENDPROCEDURE\nCALL P"),
            "RuntimeError: RETURN is only allowed inside a FUNCTION at line 2"
        );
    }

    #[test]
    fn test_unknown_callables() {
        assert_eq!(
            first_error("CALL Missing"),
            "ReferenceError: Undefined procedure: Missing at line 1"
        );
        assert_eq!(
            first_error("OUTPUT Missing(1)"),
            "ReferenceError: Undefined function: Missing at line 1"
        );
    }
}
