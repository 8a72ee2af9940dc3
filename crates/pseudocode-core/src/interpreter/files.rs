//! File statements. The interpreter owns the open/closed state of every
//! file name; the [`FileStore`](crate::host::FileStore) only moves lines.

use super::Interpreter;
use crate::ast::{Expression, FileMode, Target};
use crate::environment::Environment;
use crate::error::{Error, Result};

const FILE_EXTENSION: &str = ".txt";

impl<'h> Interpreter<'h> {
    fn file_name(&mut self, file: &Expression, env: &Environment) -> Result<String> {
        let value = self.evaluate(file, env)?;
        match value.as_text() {
            Some(name) => Ok(name.to_string()),
            None => Err(Error::type_error(format!(
                "File name must be a STRING, got {}",
                value.type_name()
            ))),
        }
    }

    fn open_mode(&self, name: &str) -> Result<FileMode> {
        self.open_files
            .get(name)
            .copied()
            .ok_or_else(|| Error::runtime(format!("File {} is not open", name)))
    }

    fn require_mode(&self, name: &str, mode: FileMode) -> Result<()> {
        if self.open_mode(name)? != mode {
            let purpose = match mode {
                FileMode::Read => "reading",
                FileMode::Write => "writing",
            };
            return Err(Error::runtime(format!(
                "File {} is not open for {}",
                name, purpose
            )));
        }
        Ok(())
    }

    pub(crate) fn open_file(&mut self, file: &Expression, mode: FileMode, env: &Environment) -> Result<()> {
        let name = self.file_name(file, env)?;
        if !name.ends_with(FILE_EXTENSION) {
            return Err(Error::file(format!(
                "Only {} files can be opened, got {}",
                FILE_EXTENSION, name
            )));
        }
        if self.open_files.contains_key(&name) {
            return Err(Error::runtime(format!("File {} is already open", name)));
        }

        self.files.open(&name, mode)?;
        self.trace(format!("opened {} for {}", name, mode));
        self.open_files.insert(name, mode);
        Ok(())
    }

    pub(crate) fn read_file(&mut self, file: &Expression, target: &Target, env: &mut Environment) -> Result<()> {
        let name = self.file_name(file, env)?;
        self.require_mode(&name, FileMode::Read)?;
        let line = self
            .files
            .read_line(&name)?
            .ok_or_else(|| Error::runtime(format!("End of file {}", name)))?;
        self.store_text(target, &line, env)
    }

    pub(crate) fn write_file(&mut self, file: &Expression, value: &Expression, env: &Environment) -> Result<()> {
        let name = self.file_name(file, env)?;
        self.require_mode(&name, FileMode::Write)?;
        let value = self.evaluate(value, env)?;
        self.files.write_line(&name, &value.to_string())
    }

    pub(crate) fn close_file(&mut self, file: &Expression, env: &Environment) -> Result<()> {
        let name = self.file_name(file, env)?;
        self.open_mode(&name)?;
        self.open_files.remove(&name);
        self.trace(format!("closed {}", name));
        self.files.close(&name)
    }
}
