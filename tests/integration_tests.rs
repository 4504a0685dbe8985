//! Integration tests for the dicomjson logging configuration
//!
//! These tests verify:
//! - The bundled document builds two handlers on the root logger
//! - Level routing between the console and file sinks
//! - Size rotation and backup retention of the file sink
//! - Load-time failures for dangling references
//! - Exclusive file ownership, propagation and reconfiguration

use dicomjson_logging::config::{Configurator, LoggingConfig, DICOMJSON_CONFIG_YAML};
use dicomjson_logging::handlers::{QueueHandler, StreamTarget};
use dicomjson_logging::{error, info, LogLevel, LoggerError, Manager};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory stand-in for stdout or stderr
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn apply(config: &LoggingConfig, stdout: &Capture, stderr: &Capture) -> Result<Manager, LoggerError> {
    let manager = Manager::new();
    let out = stdout.clone();
    let err = stderr.clone();
    Configurator::new(config)
        .redirect_stream(StreamTarget::Stdout, move || Box::new(out.clone()))
        .redirect_stream(StreamTarget::Stderr, move || Box::new(err.clone()))
        .apply(&manager)?;
    Ok(manager)
}

fn bundled_in(dir: &Path) -> LoggingConfig {
    let mut config = LoggingConfig::dicomjson().expect("bundled configuration loads");
    config.rebase_filenames(dir);
    config
}

fn log_path(dir: &Path) -> PathBuf {
    dir.join("dicomjson.log")
}

#[test]
fn test_bundled_config_has_two_handlers_and_one_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    assert_eq!(manager.handler_names(), vec!["console", "file"]);
    assert_eq!(manager.root().handler_names(), vec!["console", "file"]);
    assert_eq!(manager.root().level(), Some(LogLevel::Debug));
    assert!(manager.logger_names().is_empty());
}

#[test]
fn test_handler_thresholds() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    let console = manager.handler("console").expect("console handler");
    let file = manager.handler("file").expect("file handler");
    assert_eq!(console.lock().level(), Some(LogLevel::Debug));
    assert_eq!(file.lock().level(), Some(LogLevel::Warning));
}

#[test]
fn test_info_reaches_console_only() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let stdout = Capture::default();
    let manager =
        apply(&bundled_in(temp_dir.path()), &stdout, &Capture::default()).expect("configure");

    manager.root().debug("reading dataset");
    manager.root().info("converted 12 instances");

    let console = stdout.text();
    assert!(console.contains("[DEBUG] reading dataset"), "{}", console);
    assert!(console.contains("[INFO ] converted 12 instances"), "{}", console);

    let file = fs::read_to_string(log_path(temp_dir.path())).expect("log file exists");
    assert!(file.is_empty(), "file sink received: {}", file);
}

#[test]
fn test_error_reaches_both_sinks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let stdout = Capture::default();
    let manager =
        apply(&bundled_in(temp_dir.path()), &stdout, &Capture::default()).expect("configure");

    let log = manager.get_logger("json2dicom");
    error!(log, "missing tag {}", "(0008,0016)");
    log.warning("unknown VR");

    let file = fs::read_to_string(log_path(temp_dir.path())).expect("log file exists");
    assert!(file.contains("[ERROR] missing tag (0008,0016)\n"));
    assert!(file.contains("[WARNI] unknown VR\n"));
    assert_eq!(file.lines().count(), 2);

    let console = stdout.text();
    assert!(console.contains("[ERROR] missing tag (0008,0016)"));
    assert!(console.contains("[WARNI] unknown VR"));
}

#[test]
fn test_file_line_layout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    manager.root().critical("disk full");

    let file = fs::read_to_string(log_path(temp_dir.path())).expect("log file exists");
    let line = file.lines().next().expect("one line");
    // "YYYY-mm-dd HH:MM:SS [CRITI] disk full"
    assert_eq!(line.len(), 19 + " [CRITI] disk full".len());
    assert!(chrono::NaiveDateTime::parse_from_str(&line[..19], "%Y-%m-%d %H:%M:%S").is_ok());
    assert!(line.ends_with(" [CRITI] disk full"));
}

#[test]
fn test_rotates_at_ten_mebibytes() {
    const MAX_BYTES: u64 = 10_485_760;
    // 19 (asctime) + 9 (" [ERROR] ") + message + newline = 4096
    const LINE: u64 = 4096;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");
    let root = manager.root();
    let message = "x".repeat(LINE as usize - 29);

    let lines_before_limit = MAX_BYTES / LINE - 1;
    for _ in 0..lines_before_limit {
        root.error(message.as_str());
    }

    let base = log_path(temp_dir.path());
    let first_backup = temp_dir.path().join("dicomjson.log.1");
    assert_eq!(fs::metadata(&base).unwrap().len(), lines_before_limit * LINE);
    assert!(!first_backup.exists());

    // This line would bring the file to the limit, so the file rolls over first
    root.error(message.as_str());

    assert!(first_backup.exists());
    assert_eq!(fs::metadata(&first_backup).unwrap().len(), lines_before_limit * LINE);
    assert!(fs::metadata(&first_backup).unwrap().len() < MAX_BYTES);
    assert_eq!(fs::metadata(&base).unwrap().len(), LINE);
}

#[test]
fn test_keeps_at_most_ten_backups() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let yaml = DICOMJSON_CONFIG_YAML
        .replace("maxBytes: 10485760", "maxBytes: 64")
        .replace(
            "\"%(asctime)s [%(levelname)-5.5s] %(message)s\"",
            "\"%(message)s\"",
        );
    let mut config = LoggingConfig::from_yaml_str(&yaml).expect("config");
    config.rebase_filenames(temp_dir.path());
    let manager = apply(&config, &Capture::default(), &Capture::default()).expect("configure");

    // 40-byte lines: every line after the first forces a rollover
    for i in 0..15 {
        manager.root().error(format!("{:0>39}", i));
    }

    let backup = |i: usize| temp_dir.path().join(format!("dicomjson.log.{}", i));
    for i in 1..=10 {
        assert!(backup(i).exists(), "backup {} missing", i);
    }
    assert!(!backup(11).exists());

    let read = |path: PathBuf| fs::read_to_string(path).unwrap();
    assert_eq!(read(log_path(temp_dir.path())), format!("{:0>39}\n", 14));
    assert_eq!(read(backup(1)), format!("{:0>39}\n", 13));
    assert_eq!(read(backup(10)), format!("{:0>39}\n", 4));
}

#[test]
fn test_missing_formatter_fails_at_load() {
    let yaml = DICOMJSON_CONFIG_YAML.replace("    formatter: standard\n    filename", "    filename");
    let err = LoggingConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, LoggerError::MissingFormatter { ref handler } if handler == "file"));
}

#[test]
fn test_undeclared_formatter_fails_at_load() {
    let yaml = DICOMJSON_CONFIG_YAML.replace(
        "formatter: standard\n    stream",
        "formatter: detailed\n    stream",
    );
    let err = LoggingConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(
        err,
        LoggerError::UnknownFormatter { ref handler, ref formatter }
            if handler == "console" && formatter == "detailed"
    ));
    assert!(err.is_config_error());
}

#[test]
fn test_dangling_root_handler_fails_at_load() {
    let yaml = DICOMJSON_CONFIG_YAML.replace("[console, file]", "[console, file, syslog]");
    let err = LoggingConfig::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, LoggerError::UnknownHandler { ref handler, .. } if handler == "syslog"));
    assert!(err.to_string().contains("syslog"));
}

#[test]
fn test_unwritable_destination_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = bundled_in(&temp_dir.path().join("no-such-dir"));

    let err = apply(&config, &Capture::default(), &Capture::default())
        .err()
        .expect("missing directory must fail");
    assert!(matches!(err, LoggerError::FileHandlerError { .. }));
    assert!(!err.is_config_error());
}

#[cfg(feature = "file")]
#[test]
fn test_second_writer_on_same_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = bundled_in(temp_dir.path());

    let _first = apply(&config, &Capture::default(), &Capture::default()).expect("first owner");
    let err = apply(&config, &Capture::default(), &Capture::default())
        .err()
        .expect("second owner must fail");
    assert!(matches!(err, LoggerError::FileLockError { .. }));
}

#[test]
fn test_reconfigure_releases_previous_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = bundled_in(temp_dir.path());
    let manager = apply(&config, &Capture::default(), &Capture::default()).expect("configure");

    manager.root().error("before");
    manager.configure(&config).expect("reconfigure on the same file");
    manager.root().error("after");

    let file = fs::read_to_string(log_path(temp_dir.path())).unwrap();
    assert!(file.contains("before"));
    assert!(file.contains("after"));
    assert_eq!(manager.root().handler_names(), vec!["console", "file"]);
}

const PROPAGATION_YAML: &str = r#"
version: 1
formatters:
  plain: {format: "%(name)s:%(message)s"}
handlers:
  out: {class: logging.StreamHandler, formatter: plain, stream: "ext://sys.stdout"}
  err: {class: logging.StreamHandler, formatter: plain, stream: "ext://sys.stderr"}
loggers:
  dicom2json:
    handlers: [err]
  json2dicom:
    handlers: [err]
    propagate: false
root:
  level: INFO
  handlers: [out]
"#;

#[test]
fn test_propagation() {
    let config = LoggingConfig::from_yaml_str(PROPAGATION_YAML).expect("config");
    let (stdout, stderr) = (Capture::default(), Capture::default());
    let manager = apply(&config, &stdout, &stderr).expect("configure");

    manager.get_logger("dicom2json.tags").info("propagated");
    manager.get_logger("json2dicom").info("contained");

    assert_eq!(stdout.text(), "dicom2json.tags:propagated\n");
    assert_eq!(
        stderr.text(),
        "dicom2json.tags:propagated\njson2dicom:contained\n"
    );
}

#[test]
fn test_disable_existing_loggers() {
    let config = LoggingConfig::from_yaml_str(PROPAGATION_YAML).expect("config");
    assert!(config.disable_existing_loggers);

    let stdout = Capture::default();
    let manager = Manager::new();
    let early = manager.get_logger("early");
    let early_child = manager.get_logger("dicom2json.early");
    early_child.set_level(Some(LogLevel::Critical));

    let out = stdout.clone();
    Configurator::new(&config)
        .redirect_stream(StreamTarget::Stdout, move || Box::new(out.clone()))
        .redirect_stream(StreamTarget::Stderr, || Box::new(io::sink()))
        .apply(&manager)
        .expect("configure");

    assert!(early.is_disabled());
    early.error("silenced");
    assert!(stdout.text().is_empty());

    // Loggers below a configured one are reset, not disabled
    assert!(!early_child.is_disabled());
    assert_eq!(early_child.level(), None);
    early_child.info("kept");
    assert_eq!(stdout.text(), "dicom2json.early:kept\n");
}

#[test]
fn test_bundled_config_keeps_existing_loggers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = Manager::new();
    let early = manager.get_logger("dicom2json");

    Configurator::new(&bundled_in(temp_dir.path()))
        .redirect_stream(StreamTarget::Stdout, || Box::new(io::sink()))
        .apply(&manager)
        .expect("configure");

    assert!(!early.is_disabled());
    assert!(early.is_enabled_for(LogLevel::Debug));
}

#[test]
fn test_failed_validation_keeps_previous_setup() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    let mut broken = bundled_in(temp_dir.path());
    broken.root.as_mut().unwrap().handlers.push("missing".to_string());
    assert!(manager.configure(&broken).is_err());

    manager.root().error("still written");
    let file = fs::read_to_string(log_path(temp_dir.path())).unwrap();
    assert!(file.contains("still written"));
}

#[test]
fn test_exception_chain_is_written() {
    #[derive(Debug)]
    struct Conversion(io::Error);

    impl std::fmt::Display for Conversion {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "conversion failed")
        }
    }

    impl std::error::Error for Conversion {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    let err = Conversion(io::Error::new(io::ErrorKind::NotFound, "study.dcm"));
    manager.get_logger("dicom2json").exception("cannot convert", &err);

    let file = fs::read_to_string(log_path(temp_dir.path())).unwrap();
    assert!(file.contains("[ERROR] cannot convert\nError: conversion failed\nCaused by: study.dcm\n"));
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = apply(&bundled_in(temp_dir.path()), &Capture::default(), &Capture::default())
        .expect("configure");

    manager
        .root()
        .error("bad tag\n2024-10-17 00:00:00 [CRITI] forged\r\tend");

    let file = fs::read_to_string(log_path(temp_dir.path())).unwrap();
    assert_eq!(file.lines().count(), 1, "Log should be a single line, not multiple");
    assert!(file.contains("bad tag\\n2024-10-17 00:00:00 [CRITI] forged\\r\\tend"));
}

#[test]
fn test_queue_handler_forwards_to_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let yaml = r#"
version: 1
formatters:
  plain: {format: "%(levelname)s %(message)s"}
handlers:
  file: {class: logging.FileHandler, formatter: plain, filename: queued.log, level: INFO}
  background: {class: logging.handlers.QueueHandler, handlers: [file], maxsize: 128}
root:
  level: DEBUG
  handlers: [background]
"#;
    let mut config = LoggingConfig::from_yaml_str(yaml).expect("config");
    config.rebase_filenames(temp_dir.path());
    let manager = apply(&config, &Capture::default(), &Capture::default()).expect("configure");

    assert_eq!(manager.handler_names(), vec!["file", "background"]);
    for i in 0..50 {
        info!(manager.root(), "record {}", i);
    }
    manager.root().debug("below file threshold");
    manager.flush().expect("flush");

    let file = fs::read_to_string(temp_dir.path().join("queued.log")).unwrap();
    assert_eq!(file.lines().count(), 50);
    assert!(file.starts_with("INFO record 0\n"));
    assert!(file.ends_with("INFO record 49\n"));

    manager.shutdown();
    assert!(manager.handler_names().is_empty());
    assert!(manager.root().handler_names().is_empty());
}

#[test]
fn test_queue_handler_close_drains() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file = dicomjson_logging::handlers::FileHandler::new(temp_dir.path().join("drain.log"))
        .expect("file handler");
    let mut queue =
        QueueHandler::spawn(vec![dicomjson_logging::share(file)], 0).expect("queue worker");

    use dicomjson_logging::{Handler, LogRecord};
    for i in 0..100 {
        queue
            .emit(&LogRecord::new("root", LogLevel::Warning, format!("m{}", i)))
            .unwrap();
    }
    queue.close().expect("drained in time");

    let content = fs::read_to_string(temp_dir.path().join("drain.log")).unwrap();
    assert_eq!(content.lines().count(), 100);
}
