//! Plain file handler and the shared file-opening logic used by rotation

use crate::core::{Formatter, Handler, LogLevel, LogRecord, LoggerError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How an existing log file is treated when a handler opens it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// `a`: keep existing content
    #[default]
    Append,
    /// `w`: discard existing content
    Truncate,
}

impl FileMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a" => Some(FileMode::Append),
            "w" => Some(FileMode::Truncate),
            _ => None,
        }
    }
}

/// Open `path` for logging and take an exclusive advisory lock on it.
///
/// Returns the file and its size after opening. The parent directory must
/// already exist. Truncation happens only after the lock is held so that a
/// second writer cannot clobber a file it does not own.
pub(crate) fn open_log_file(path: &Path, mode: FileMode) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(mode == FileMode::Append)
        .write(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_handler(path.display().to_string(), format!("Failed to open: {}", e))
        })?;

    lock_exclusive(&file, path)?;

    if mode == FileMode::Truncate {
        file.set_len(0).map_err(|e| {
            LoggerError::file_handler(
                path.display().to_string(),
                format!("Failed to truncate: {}", e),
            )
        })?;
    }

    let size = file
        .metadata()
        .map_err(|e| {
            LoggerError::file_handler(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?
        .len();

    Ok((file, size))
}

#[cfg(feature = "file")]
fn lock_exclusive(file: &File, path: &Path) -> Result<()> {
    fs2::FileExt::try_lock_exclusive(file)
        .map_err(|_| LoggerError::file_lock(path.display().to_string()))
}

#[cfg(not(feature = "file"))]
fn lock_exclusive(_file: &File, _path: &Path) -> Result<()> {
    Ok(())
}

/// Appends formatted records to a single file, flushing after each record
pub struct FileHandler {
    name: String,
    level: Option<LogLevel>,
    formatter: Arc<Formatter>,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileHandler {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(path, FileMode::Append)
    }

    /// # Errors
    ///
    /// Fails when the file cannot be created (for example a missing parent
    /// directory) or when another handle already holds its lock.
    pub fn open(path: impl Into<PathBuf>, mode: FileMode) -> Result<Self> {
        let path = path.into();
        let (file, _) = open_log_file(&path, mode)?;

        Ok(Self {
            name: "file".to_string(),
            level: None,
            formatter: Arc::new(Formatter::default()),
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Handler for FileHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Option<LogLevel> {
        self.level
    }

    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File handler is closed"))?;

        let mut output = self.formatter.format(record);
        output.push('\n');

        writer.write_all(output.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileHandler {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
