//! Tree-walking interpreter for pseudocode programs.
//!
//! An [`Interpreter`] owns the host collaborators and the per-run state
//! (output log, governors, open files). Statements run against an
//! [`Environment`] passed down explicitly; every procedure or function call
//! gets its own frame.

mod builtins;
mod expressions;
mod files;
mod statements;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::ast::{FileMode, Program};
use crate::config::{Config, Limits};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::host::{DirectoryFileStore, FileStore, InputSource, MemoryFileStore, OutputKind, OutputSink, QueueInput};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::value::Value;

pub use builtins::Builtin;

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Emit trace records (calls, loops, files, governor trips) through the
    /// output sink
    pub verbose: bool,
}

/// One line of the output log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub kind: OutputKind,
    pub text: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// The retained output log, one line per entry
    pub output: String,
    pub lines: Vec<OutputLine>,
    /// Lexical, syntax and runtime problems, in the order they were found
    pub diagnostics: Diagnostics,
    /// Whether a governor stopped the run
    pub halted: bool,
}

impl RunOutput {
    /// Whether any error line was produced or the run was stopped.
    pub fn has_errors(&self) -> bool {
        self.halted || self.lines.iter().any(|line| line.kind == OutputKind::Error)
    }

    /// Text of the OUTPUT lines only.
    pub fn output_lines(&self) -> Vec<&str> {
        self.lines_of(OutputKind::Output)
    }

    pub fn error_lines(&self) -> Vec<&str> {
        self.lines_of(OutputKind::Error)
    }

    fn lines_of(&self, kind: OutputKind) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| line.kind == kind)
            .map(|line| line.text.as_str())
            .collect()
    }
}

/// Result of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Normal,
    /// A RETURN is unwinding to the enclosing function call
    Return(Value),
}

/// What kind of call a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Procedure,
    Function,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Procedure => f.write_str("procedure"),
            FrameKind::Function => f.write_str("function"),
        }
    }
}

/// The pseudocode interpreter.
pub struct Interpreter<'h> {
    output: Box<dyn OutputSink + 'h>,
    input: Box<dyn InputSource + 'h>,
    files: Box<dyn FileStore + 'h>,
    memory_check: Option<Box<dyn Fn() -> bool + 'h>>,
    limits: Limits,
    options: RunOptions,
    rng: StdRng,
    /// Per-run state
    log: VecDeque<OutputLine>,
    diagnostics: Diagnostics,
    open_files: HashMap<String, FileMode>,
    frames: Vec<FrameKind>,
    statements_executed: u64,
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Interpreter<'h> {
    /// Create an interpreter with default limits, no input, an in-memory
    /// file store and a sink that discards lines as they are emitted (they
    /// are still collected in the returned [`RunOutput`]).
    pub fn new() -> Self {
        Self {
            output: Box::new(|_: &str, _: OutputKind| {}),
            input: Box::new(QueueInput::default()),
            files: Box::new(MemoryFileStore::default()),
            memory_check: None,
            limits: Limits::default(),
            options: RunOptions::default(),
            rng: StdRng::from_entropy(),
            log: VecDeque::new(),
            diagnostics: Diagnostics::new(),
            open_files: HashMap::new(),
            frames: Vec::new(),
            statements_executed: 0,
        }
    }

    pub fn with_output(mut self, sink: impl OutputSink + 'h) -> Self {
        self.output = Box::new(sink);
        self
    }

    pub fn with_input(mut self, input: impl InputSource + 'h) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_file_store(mut self, files: impl FileStore + 'h) -> Self {
        self.files = Box::new(files);
        self
    }

    /// Install a host memory check, consulted once per loop iteration.
    /// Returning `true` stops the run.
    pub fn with_memory_check(mut self, check: impl Fn() -> bool + 'h) -> Self {
        self.memory_check = Some(Box::new(check));
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Make RANDOM deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply limits, seed and file directory from a configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.limits = config.limits.clone();
        if let Some(seed) = config.random.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        if let Some(directory) = &config.files.directory {
            self.files = Box::new(DirectoryFileStore::new(directory));
        }
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Lex, parse and run `source`.
    ///
    /// Lexical errors are reported before execution starts; syntax errors
    /// are reported when their placeholder statement is reached.
    pub fn run_source(&mut self, source: &str) -> RunOutput {
        let (tokens, lex_diagnostics) = tokenize(source);
        let (program, parse_diagnostics) = parse(tokens);

        self.reset();
        for diagnostic in lex_diagnostics.errors() {
            if let Some(error) = diagnostic.to_error() {
                self.emit(OutputKind::Error, error.to_string());
            }
        }
        self.diagnostics.extend(lex_diagnostics);
        self.diagnostics.extend(parse_diagnostics);

        self.execute_program(&program)
    }

    /// Run an already parsed program.
    pub fn run(&mut self, program: &Program) -> RunOutput {
        self.reset();
        self.execute_program(program)
    }

    /// Run a program and return the joined output log.
    pub fn interpret(&mut self, program: &Program) -> String {
        self.run(program).output
    }

    fn reset(&mut self) {
        self.log.clear();
        self.diagnostics = Diagnostics::new();
        self.open_files.clear();
        self.frames.clear();
        self.statements_executed = 0;
    }

    fn execute_program(&mut self, program: &Program) -> RunOutput {
        let mut env = Environment::new();
        let mut halted = false;

        for statement in &program.statements {
            if let Err(error) = self.execute(statement, &mut env) {
                self.report(&error);
                if error.is_fatal() {
                    self.trace(format!("run halted: {}", error.message));
                    halted = true;
                    break;
                }
            }
        }

        self.close_all_files();
        self.frames.clear();

        let lines: Vec<OutputLine> = self.log.drain(..).collect();
        let output = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        RunOutput {
            output,
            lines,
            diagnostics: std::mem::take(&mut self.diagnostics),
            halted,
        }
    }

    /// Append a runtime error to the log and the diagnostics.
    fn report(&mut self, error: &Error) {
        self.diagnostics.push(Diagnostic::from(error));
        self.emit(OutputKind::Error, error.to_string());
    }

    pub(crate) fn emit(&mut self, kind: OutputKind, text: String) {
        self.output.emit(&text, kind);
        if kind == OutputKind::Trace {
            return;
        }
        self.log.push_back(OutputLine { kind, text });
        while self.log.len() > self.limits.max_output_lines {
            self.log.pop_front();
        }
    }

    pub(crate) fn trace(&mut self, message: String) {
        if self.options.verbose {
            self.emit(OutputKind::Trace, message);
        }
    }

    /// Count one executed statement against the statement governor.
    pub(crate) fn tick(&mut self) -> Result<()> {
        self.statements_executed += 1;
        if self.statements_executed > self.limits.max_statements {
            return Err(Error::limit(format!(
                "Maximum statement limit ({}) exceeded",
                self.limits.max_statements
            )));
        }
        Ok(())
    }

    /// Count one loop iteration against the loop governor and consult the
    /// host memory check.
    pub(crate) fn guard_iteration(&mut self, iterations: &mut u64) -> Result<()> {
        *iterations += 1;
        if *iterations > self.limits.max_loop_iterations {
            return Err(Error::limit(format!(
                "Loop exceeded {} iterations",
                self.limits.max_loop_iterations
            )));
        }
        if self.memory_check.as_ref().is_some_and(|check| check()) {
            return Err(Error::limit("Memory limit exceeded"));
        }
        Ok(())
    }

    fn close_all_files(&mut self) {
        let names: Vec<String> = self.open_files.drain().map(|(name, _)| name).collect();
        for name in names {
            if let Err(error) = self.files.close(&name) {
                self.report(&error);
            }
        }
    }
}

/// Run `source` with default settings.
pub fn run(source: &str) -> RunOutput {
    Interpreter::new().run_source(source)
}

/// Run `source` with pre-seeded input values and return the joined output.
pub fn interpret<I, S>(source: &str, inputs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Interpreter::new()
        .with_input(QueueInput::new(inputs))
        .run_source(source)
        .output
}
