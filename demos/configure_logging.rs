//! Bundled configuration example
//!
//! Applies the dicomjson logging document: DEBUG and above on stdout,
//! WARNING and above in a rotating `dicomjson.log`.
//!
//! Run with: cargo run --example configure_logging
//!
//! Set `DICOMJSON_LOG_CONFIG=/path/to/logging.yaml` to load another document.

use dicomjson_logging::prelude::*;
use dicomjson_logging::{critical, debug, info, warning};

fn main() -> Result<()> {
    println!("=== dicomjson logging - bundled configuration ===\n");

    let config = LoggingConfig::from_env_or_default()?;
    println!(
        "Handlers: {:?}, file destinations: {:?}\n",
        config.handlers.keys().collect::<Vec<_>>(),
        config.file_destinations()
    );
    init(&config)?;

    let log = root();
    debug!(log, "Reading input directory");
    info!(log, "Converting {} DICOM files to JSON", 3);
    for i in 1..=3 {
        info!(log, "Converted file {}/3", i);
    }
    warning!(log, "File 2 has a private tag without a creator");
    critical!(log, "Output volume is read-only");

    dicomjson_logging::shutdown();

    println!("\n=== Example completed ===");
    println!("WARNING and above were also written to 'dicomjson.log'");
    Ok(())
}
