//! Collaborators the host application injects into a run.
//!
//! The interpreter never touches a terminal or a file system directly. It
//! writes through an [`OutputSink`], reads through an [`InputSource`] and
//! stores files through a [`FileStore`].

pub mod files;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ast::FileMode;
use crate::error::Result;

pub use files::{DirectoryFileStore, MemoryFileStore};

/// Severity tag attached to each emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Produced by an OUTPUT statement
    Output,
    /// A reported error
    Error,
    /// Verbose tracing; never part of the program's output log
    Trace,
}

/// Receives every line a run emits, as it is emitted.
pub trait OutputSink {
    fn emit(&mut self, text: &str, kind: OutputKind);
}

impl<F> OutputSink for F
where
    F: FnMut(&str, OutputKind),
{
    fn emit(&mut self, text: &str, kind: OutputKind) {
        self(text, kind)
    }
}

/// Sink that keeps everything it receives.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    entries: Vec<(OutputKind, String)>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(OutputKind, String)] {
        &self.entries
    }

    /// Lines of one kind, in emission order.
    pub fn lines(&self, kind: OutputKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl OutputSink for BufferSink {
    fn emit(&mut self, text: &str, kind: OutputKind) {
        self.entries.push((kind, text.to_string()));
    }
}

/// Supplies values for INPUT statements.
pub trait InputSource {
    /// The next raw value, or `None` when no more input exists. `prompt`
    /// names what is being read.
    fn next_input(&mut self, prompt: &str) -> Option<String>;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn next_input(&mut self, prompt: &str) -> Option<String> {
        (**self).next_input(prompt)
    }
}

/// Pre-seeded FIFO of input values.
#[derive(Debug, Default, Clone)]
pub struct QueueInput {
    values: VecDeque<String>,
}

impl QueueInput {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push_back(value.into());
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl InputSource for QueueInput {
    fn next_input(&mut self, _prompt: &str) -> Option<String> {
        self.values.pop_front()
    }
}

/// Line-oriented storage behind the file statements.
///
/// The interpreter tracks which names are open and in which mode; a store
/// only has to move lines in and out. Failures are reported as
/// `FileError`s.
pub trait FileStore {
    /// Prepare `name` for reading from its first line, or create/truncate it
    /// for writing.
    fn open(&mut self, name: &str, mode: FileMode) -> Result<()>;

    /// The next line of a file opened for reading; `None` at end of data.
    fn read_line(&mut self, name: &str) -> Result<Option<String>>;

    /// Append a line to a file opened for writing.
    fn write_line(&mut self, name: &str, text: &str) -> Result<()>;

    fn close(&mut self, name: &str) -> Result<()>;
}

impl<T: FileStore + ?Sized> FileStore for &mut T {
    fn open(&mut self, name: &str, mode: FileMode) -> Result<()> {
        (**self).open(name, mode)
    }

    fn read_line(&mut self, name: &str) -> Result<Option<String>> {
        (**self).read_line(name)
    }

    fn write_line(&mut self, name: &str, text: &str) -> Result<()> {
        (**self).write_line(name, text)
    }

    fn close(&mut self, name: &str) -> Result<()> {
        (**self).close(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |text: &str, kind: OutputKind| seen.push((kind, text.to_string()));
            sink.emit("hello", OutputKind::Output);
        }
        assert_eq!(seen, vec![(OutputKind::Output, "hello".to_string())]);
    }

    #[test]
    fn test_buffer_sink_filters_by_kind() {
        let mut sink = BufferSink::new();
        sink.emit("1", OutputKind::Output);
        sink.emit("entering F", OutputKind::Trace);
        sink.emit("2", OutputKind::Output);
        assert_eq!(sink.lines(OutputKind::Output), vec!["1", "2"]);
        assert_eq!(sink.entries().len(), 3);
    }

    #[test]
    fn test_queue_input_is_fifo() {
        let mut input = QueueInput::new(["a", "b"]);
        input.push("c");
        assert_eq!(input.next_input("X").as_deref(), Some("a"));
        assert_eq!(input.next_input("X").as_deref(), Some("b"));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.next_input("X").as_deref(), Some("c"));
        assert_eq!(input.next_input("X"), None);
    }
}
