//! Size-based rotating file handler
//!
//! Before a record is written, the handler checks whether it would bring the
//! file to `max_bytes` or beyond. If so the file is rolled over first:
//! `<file>.<backup_count>` is removed, every `<file>.<i>` becomes
//! `<file>.<i+1>`, the live file becomes `<file>.1` and a fresh file is
//! opened. At most `backup_count` backups therefore exist at any time.

use super::file::{open_log_file, FileMode};
use crate::core::{Formatter, Handler, LogLevel, LogRecord, LoggerError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// When and how a [`RotatingFileHandler`] rolls its file over
///
/// # Examples
///
/// ```
/// use dicomjson_logging::handlers::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(10 * 1024 * 1024)
///     .with_backup_count(10);
/// assert!(policy.is_enabled());
///
/// // Either limit at zero disables rotation
/// assert!(!RotationPolicy::new().with_backup_count(0).is_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub backup_count: usize,
    /// Gzip each backup as `<file>.<i>.gz`
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backup_count: 10,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

pub struct RotatingFileHandler {
    name: String,
    level: Option<LogLevel>,
    formatter: Arc<Formatter>,
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
    /// Consecutive failures to delete the oldest backup
    deletion_failure_count: usize,
}

impl RotatingFileHandler {
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self> {
        Self::open(path, policy, FileMode::Append)
    }

    /// # Errors
    ///
    /// Fails when the file cannot be created or is locked by another handle.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy, mode: FileMode) -> Result<Self> {
        let base_path = path.into();
        let (file, current_size) = open_log_file(&base_path, mode)?;

        Ok(Self {
            name: "file".to_string(),
            level: None,
            formatter: Arc::new(Formatter::default()),
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            rotations: 0,
            deletion_failure_count: 0,
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

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Number of rollovers performed by this handler
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotations
    }

    /// Path of backup `index` (1 is the newest)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.base_path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn compressed_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// An empty file never rotates, so a single record larger than
    /// `max_bytes` is written whole instead of looping.
    fn should_rotate(&self, incoming: u64) -> bool {
        self.policy.is_enabled()
            && self.current_size > 0
            && self.current_size + incoming >= self.policy.max_bytes
    }

    fn rotate(&mut self) -> Result<()> {
        // Dropping the writer releases the lock before the file is renamed
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        self.remove_oldest_backup()?;

        for i in (1..self.policy.backup_count).rev() {
            let old_path = self.backup_path(i);
            let new_path = self.backup_path(i + 1);
            let old_compressed = Self::compressed_path(&old_path);

            if old_compressed.exists() {
                rename_replacing(&old_compressed, &Self::compressed_path(&new_path))?;
            } else if old_path.exists() {
                rename_replacing(&old_path, &new_path)?;
            }
        }

        let newest = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &newest).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&newest, &Self::compressed_path(&newest))?;
            }
        }

        let (file, size) = open_log_file(&self.base_path, FileMode::Append)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        self.rotations += 1;

        Ok(())
    }

    fn remove_oldest_backup(&mut self) -> Result<()> {
        const MAX_DELETION_FAILURES: usize = 5;

        let oldest = self.backup_path(self.policy.backup_count);
        let oldest_compressed = Self::compressed_path(&oldest);
        let mut deletion_failed = false;

        for candidate in [&oldest_compressed, &oldest] {
            if candidate.exists() {
                if let Err(e) = fs::remove_file(candidate) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        candidate.display(),
                        e,
                        self.deletion_failure_count + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }

        if !deletion_failed {
            self.deletion_failure_count = 0;
            return Ok(());
        }

        self.deletion_failure_count += 1;
        if self.deletion_failure_count >= MAX_DELETION_FAILURES {
            return Err(LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!(
                    "Rotation aborted: failed to delete old backup files {} consecutive times",
                    self.deletion_failure_count
                ),
            ));
        }
        Ok(())
    }

    fn recover_writer(&mut self) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let (file, size) = open_log_file(&self.base_path, FileMode::Append)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        Ok(())
    }
}

fn rename_replacing(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Some platforms refuse to rename onto an existing file
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).map_err(|e| {
        LoggerError::file_rotation(
            from.display().to_string(),
            format!("Failed to rotate backup file: {}", e),
        )
    })
}

/// Gzip `path` into `gz_path`, removing `path` only once the archive is
/// complete. A temporary file is renamed into place at the end.
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    use flate2::{write::GzEncoder, Compression};
    use std::io::{BufReader, Read};

    let mut temp_name = gz_path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let cleanup = |e: std::io::Error, what: &str| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation("compress log file", what.to_string(), e)
    };

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary file: {}", temp_path.display()),
            e,
        )
    })?;
    let mut encoder = GzEncoder::new(BufWriter::with_capacity(64 * 1024, output), Compression::default());

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| cleanup(e, "Failed to read log file"))?;
        if read == 0 {
            break;
        }
        encoder
            .write_all(&buffer[..read])
            .map_err(|e| cleanup(e, "Failed to compress data chunk"))?;
    }

    let mut inner = encoder
        .finish()
        .map_err(|e| cleanup(e, "Failed to finish compression"))?;
    inner
        .flush()
        .map_err(|e| cleanup(e, "Failed to flush compressed file"))?;
    drop(inner);

    fs::rename(&temp_path, gz_path)
        .map_err(|e| cleanup(e, "Failed to move compressed file into place"))?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove the original: {}",
            path.display(),
            e
        );
    }

    Ok(())
}

impl Handler for RotatingFileHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Option<LogLevel> {
        self.level
    }

    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let mut output = self.formatter.format(record);
        output.push('\n');
        let incoming = output.len() as u64;

        if self.should_rotate(incoming) {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                self.recover_writer()?;
                // Without a reset every later record would retry the failed rotation
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Rotating file handler is closed"))?;
        writer.write_all(output.as_bytes())?;
        writer.flush()?;
        self.current_size += incoming;
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

impl Drop for RotatingFileHandler {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
