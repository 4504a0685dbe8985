//! Named loggers example
//!
//! Loads a configuration with one logger per conversion direction. The
//! `json2dicom` logger does not propagate and sends its records through a
//! background queue to an ERROR-only stderr handler.
//!
//! Run with: cargo run --example named_loggers

use dicomjson_logging::prelude::*;
use dicomjson_logging::{error, info};

const CONFIG: &str = r#"
version: 1
disable_existing_loggers: false
formatters:
  brief:
    format: "%(name)-12s %(levelname)-8s %(message)s"
  detailed:
    format: "%(asctime)s %(name)s %(filename)s:%(lineno)d [%(levelname)s] %(message)s"
    datefmt: "%H:%M:%S"
handlers:
  console:
    class: logging.StreamHandler
    formatter: brief
    stream: ext://sys.stdout
    colorize: true
  errors:
    class: logging.StreamHandler
    level: ERROR
    formatter: detailed
    stream: ext://sys.stderr
  background:
    class: logging.handlers.QueueHandler
    handlers: [errors]
    maxsize: 1024
loggers:
  dicom2json:
    level: DEBUG
  json2dicom:
    level: INFO
    handlers: [background]
    propagate: false
root:
  level: INFO
  handlers: [console]
"#;

fn main() -> Result<()> {
    let manager = Manager::from_config(&LoggingConfig::from_yaml_str(CONFIG)?)?;

    let forward = manager.get_logger("dicom2json");
    let backward = manager.get_logger("json2dicom");
    let pixels = manager.get_logger("dicom2json.pixels");

    info!(forward, "Reading {}", "study.dcm");
    pixels.debug("Encoding pixel data as base64");
    // Queued, then dropped by the ERROR threshold of the target
    info!(backward, "Reading {}", "study.json");
    error!(backward, "Missing required attribute {}", "SOPClassUID");

    let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "out/study.json");
    backward.exception("Could not write output", &err);

    manager.flush()?;
    println!(
        "\nroot: {:?}, json2dicom: {:?}, total dispatched: {}",
        manager.root().handler_names(),
        backward.handler_names(),
        manager.metrics().snapshot().written
    );
    Ok(())
}
