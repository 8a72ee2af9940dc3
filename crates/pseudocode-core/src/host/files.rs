//! Stock file stores: an in-memory one for tests and embedding, and one
//! backed by a directory on disk.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Component, Path, PathBuf};

use super::FileStore;
use crate::ast::FileMode;
use crate::error::{Error, Result};

/// Files kept in memory as lists of lines.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileStore {
    files: HashMap<String, Vec<String>>,
    /// Read position of every file open for reading
    cursors: HashMap<String, usize>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file with content.
    pub fn with_file<I, S>(mut self, name: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files
            .insert(name.to_string(), lines.into_iter().map(Into::into).collect());
        self
    }

    /// Current content of a file.
    pub fn contents(&self, name: &str) -> Option<&[String]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn lines_mut(&mut self, name: &str) -> Result<&mut Vec<String>> {
        self.files
            .get_mut(name)
            .ok_or_else(|| Error::file(format!("File {} does not exist", name)))
    }
}

impl FileStore for MemoryFileStore {
    fn open(&mut self, name: &str, mode: FileMode) -> Result<()> {
        match mode {
            FileMode::Read => {
                if !self.files.contains_key(name) {
                    return Err(Error::file(format!("File {} does not exist", name)));
                }
                self.cursors.insert(name.to_string(), 0);
            }
            FileMode::Write => {
                self.files.insert(name.to_string(), Vec::new());
            }
        }
        Ok(())
    }

    fn read_line(&mut self, name: &str) -> Result<Option<String>> {
        let position = self
            .cursors
            .get(name)
            .copied()
            .ok_or_else(|| Error::file(format!("File {} is not open for reading", name)))?;
        let line = self.lines_mut(name)?.get(position).cloned();
        if line.is_some() {
            self.cursors.insert(name.to_string(), position + 1);
        }
        Ok(line)
    }

    fn write_line(&mut self, name: &str, text: &str) -> Result<()> {
        self.lines_mut(name)?.push(text.to_string());
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.cursors.remove(name);
        Ok(())
    }
}

/// Files stored as plain text under a root directory.
///
/// Names must be a single path component; anything that would escape the
/// root is refused.
#[derive(Debug)]
pub struct DirectoryFileStore {
    root: PathBuf,
    readers: HashMap<String, Lines<BufReader<File>>>,
    writers: HashMap<String, BufWriter<File>>,
}

impl DirectoryFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            readers: HashMap::new(),
            writers: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(Error::file(format!("Invalid file name {}", name))),
        }
    }
}

fn io_error(action: &str, name: &str, error: std::io::Error) -> Error {
    Error::file(format!("Cannot {} {}: {}", action, name, error))
}

impl FileStore for DirectoryFileStore {
    fn open(&mut self, name: &str, mode: FileMode) -> Result<()> {
        let path = self.resolve(name)?;
        match mode {
            FileMode::Read => {
                if !path.is_file() {
                    return Err(Error::file(format!("File {} does not exist", name)));
                }
                let file = File::open(&path).map_err(|e| io_error("open", name, e))?;
                self.readers
                    .insert(name.to_string(), BufReader::new(file).lines());
            }
            FileMode::Write => {
                std::fs::create_dir_all(&self.root).map_err(|e| io_error("create", name, e))?;
                let file = File::create(&path).map_err(|e| io_error("create", name, e))?;
                self.writers.insert(name.to_string(), BufWriter::new(file));
            }
        }
        Ok(())
    }

    fn read_line(&mut self, name: &str) -> Result<Option<String>> {
        let lines = self
            .readers
            .get_mut(name)
            .ok_or_else(|| Error::file(format!("File {} is not open for reading", name)))?;
        lines
            .next()
            .transpose()
            .map_err(|e| io_error("read", name, e))
    }

    fn write_line(&mut self, name: &str, text: &str) -> Result<()> {
        let writer = self
            .writers
            .get_mut(name)
            .ok_or_else(|| Error::file(format!("File {} is not open for writing", name)))?;
        writeln!(writer, "{}", text).map_err(|e| io_error("write", name, e))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.readers.remove(name);
        if let Some(mut writer) = self.writers.remove(name) {
            writer.flush().map_err(|e| io_error("write", name, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_memory_store_reads_seeded_lines() {
        let mut store = MemoryFileStore::new().with_file("scores.txt", ["10", "20"]);
        store.open("scores.txt", FileMode::Read).unwrap();
        assert_eq!(store.read_line("scores.txt").unwrap().as_deref(), Some("10"));
        assert_eq!(store.read_line("scores.txt").unwrap().as_deref(), Some("20"));
        assert_eq!(store.read_line("scores.txt").unwrap(), None);
    }

    #[test]
    fn test_memory_store_write_truncates() {
        let mut store = MemoryFileStore::new().with_file("log.txt", ["old"]);
        store.open("log.txt", FileMode::Write).unwrap();
        store.write_line("log.txt", "new").unwrap();
        store.close("log.txt").unwrap();
        assert_eq!(store.contents("log.txt"), Some(&["new".to_string()][..]));
    }

    #[test]
    fn test_memory_store_missing_file() {
        let mut store = MemoryFileStore::new();
        let error = store.open("nope.txt", FileMode::Read).unwrap_err();
        assert_eq!(error.kind, ErrorKind::File);
        assert!(!store.exists("nope.txt"));
    }

    #[test]
    fn test_directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryFileStore::new(dir.path());

        store.open("out.txt", FileMode::Write).unwrap();
        store.write_line("out.txt", "first").unwrap();
        store.write_line("out.txt", "second").unwrap();
        store.close("out.txt").unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "first\nsecond\n");

        store.open("out.txt", FileMode::Read).unwrap();
        assert_eq!(store.read_line("out.txt").unwrap().as_deref(), Some("first"));
        assert_eq!(store.read_line("out.txt").unwrap().as_deref(), Some("second"));
        assert_eq!(store.read_line("out.txt").unwrap(), None);
        store.close("out.txt").unwrap();
    }

    #[test]
    fn test_directory_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryFileStore::new(dir.path());
        for name in ["../escape.txt", "sub/inner.txt", "/etc/passwd.txt", ".."] {
            let error = store.open(name, FileMode::Write).unwrap_err();
            assert_eq!(error.kind, ErrorKind::File, "{}", name);
        }
    }

    #[test]
    fn test_directory_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryFileStore::new(dir.path());
        let error = store.open("absent.txt", FileMode::Read).unwrap_err();
        assert_eq!(error.message, "File absent.txt does not exist");
    }
}
