//! Property-based tests for dicomjson_logging using proptest

use dicomjson_logging::config::LoggingConfig;
use dicomjson_logging::prelude::*;
use proptest::prelude::*;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

// ============================================================================
// LogLevel
// ============================================================================

proptest! {
    #[test]
    fn test_level_name_roundtrip(level in any_level(), lowercase in any::<bool>()) {
        let name = if lowercase {
            level.to_str().to_lowercase()
        } else {
            level.to_str().to_string()
        };
        prop_assert_eq!(name.parse::<LogLevel>(), Ok(level));
    }

    #[test]
    fn test_ordering_matches_levelno(a in any_level(), b in any_level()) {
        prop_assert_eq!(a.cmp(&b), a.levelno().cmp(&b.levelno()));
    }

    #[test]
    fn test_threshold_passes_iff_not_below(level in any_level(), threshold in any_level()) {
        prop_assert_eq!(LogLevel::passes(level, Some(threshold)), level >= threshold);
        prop_assert!(LogLevel::passes(level, None));
    }
}

// ============================================================================
// Formatter
// ============================================================================

proptest! {
    #[test]
    fn test_width_pads_to_at_least_width(width in 1usize..40, message in "[a-z ]{0,60}") {
        let formatter = Formatter::new(&format!("%(message){}s", width), None).unwrap();
        let record = LogRecord::new("root", LogLevel::Info, message.clone());
        let rendered = formatter.format(&record);

        prop_assert_eq!(rendered.chars().count(), message.chars().count().max(width));
        prop_assert!(rendered.ends_with(&message));
    }

    #[test]
    fn test_left_aligned_width(width in 1usize..40, message in "[a-z]{0,60}") {
        let formatter = Formatter::new(&format!("%(message)-{}s|", width), None).unwrap();
        let record = LogRecord::new("root", LogLevel::Info, message.clone());
        let rendered = formatter.format(&record);

        prop_assert!(rendered.starts_with(&message));
        prop_assert_eq!(rendered.chars().count(), message.chars().count().max(width) + 1);
    }

    #[test]
    fn test_precision_truncates(precision in 0usize..20, message in "[a-zA-Z0-9]{0,40}") {
        let formatter = Formatter::new(&format!("%(message).{}s", precision), None).unwrap();
        let record = LogRecord::new("root", LogLevel::Info, message.clone());
        let rendered = formatter.format(&record);

        let expected: String = message.chars().take(precision).collect();
        prop_assert_eq!(rendered, expected);
    }

    #[test]
    fn test_literal_text_survives(prefix in "[a-zA-Z :\\[\\]-]{0,20}", message in "[a-z]{1,20}") {
        let formatter = Formatter::new(&format!("{}%(message)s", prefix), None).unwrap();
        let record = LogRecord::new("root", LogLevel::Info, message.clone());
        prop_assert_eq!(formatter.format(&record), format!("{}{}", prefix, message));
    }

    #[test]
    fn test_levelname_is_fixed_width_in_bundled_layout(level in any_level()) {
        let formatter = Formatter::new("[%(levelname)-5.5s]", None).unwrap();
        let record = LogRecord::new("root", level, "m");
        prop_assert_eq!(formatter.format(&record).len(), 7);
    }
}

// ============================================================================
// Configuration references
// ============================================================================

proptest! {
    #[test]
    fn test_dangling_root_reference_is_rejected(name in "[a-z]{3,12}") {
        prop_assume!(name != "console" && name != "file");

        let yaml = dicomjson_logging::config::DICOMJSON_CONFIG_YAML
            .replace("[console, file]", &format!("[console, {}]", name));
        let err = LoggingConfig::from_yaml_str(&yaml).unwrap_err();

        let matches = matches!(err, LoggerError::UnknownHandler { ref handler, .. } if *handler == name);
        prop_assert!(matches, "unexpected error: {:?}", err);
    }

    #[test]
    fn test_dangling_formatter_reference_is_rejected(name in "[a-z]{3,12}") {
        prop_assume!(name != "standard");

        let yaml = dicomjson_logging::config::DICOMJSON_CONFIG_YAML
            .replace("formatter: standard\n    filename", &format!("formatter: {}\n    filename", name));
        let err = LoggingConfig::from_yaml_str(&yaml).unwrap_err();

        let matches = matches!(
            err,
            LoggerError::UnknownFormatter { ref handler, ref formatter }
                if handler == "file" && *formatter == name
        );
        prop_assert!(matches, "unexpected error: {:?}", err);
    }

    #[test]
    fn test_handler_level_names(level in any_level()) {
        let yaml = dicomjson_logging::config::DICOMJSON_CONFIG_YAML
            .replace("level: WARNING", &format!("level: {}", level.to_str().to_lowercase()));
        let plan = LoggingConfig::from_yaml_str(&yaml).unwrap().validate().unwrap();
        prop_assert_eq!(plan.handler("file").unwrap().level, Some(level));
    }
}
