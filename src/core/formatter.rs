//! Record formatter
//!
//! A [`Formatter`] is compiled once from a `%(attribute)s`-style template and
//! then renders every record it is handed. Compilation rejects anything it
//! could not render later, so a bad template fails at configuration time
//! instead of on the first log call.
//!
//! Directive syntax: `%(name)[flags][width][.precision]conversion`
//!
//! | part | accepted |
//! |---|---|
//! | flags | `-` left-justify, `0` zero-pad; `+`, ` `, `#` are accepted and ignored |
//! | conversion | `s`, `r`, `d`, `i`, `f` |
//!
//! `%%` renders a literal percent sign.

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use super::timestamp::DateFormat;
use std::borrow::Cow;

pub const DEFAULT_TEMPLATE: &str = "%(message)s";

/// Record attributes available to templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    AscTime,
    Created,
    FileName,
    LevelName,
    LevelNo,
    LineNo,
    Message,
    Module,
    Msecs,
    Name,
    PathName,
    Process,
    Thread,
    ThreadName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Integer,
    Float,
}

impl Attribute {
    fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "asctime" => Attribute::AscTime,
            "created" => Attribute::Created,
            "filename" => Attribute::FileName,
            "levelname" => Attribute::LevelName,
            "levelno" => Attribute::LevelNo,
            "lineno" => Attribute::LineNo,
            "message" => Attribute::Message,
            "module" => Attribute::Module,
            "msecs" => Attribute::Msecs,
            "name" => Attribute::Name,
            "pathname" => Attribute::PathName,
            "process" => Attribute::Process,
            "thread" => Attribute::Thread,
            "threadName" => Attribute::ThreadName,
            _ => return None,
        })
    }

    fn kind(self) -> Kind {
        match self {
            Attribute::Created | Attribute::Msecs => Kind::Float,
            Attribute::LevelNo | Attribute::LineNo | Attribute::Process => Kind::Integer,
            _ => Kind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Str,
    Repr,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    attribute: Attribute,
    left_align: bool,
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Directive),
}

enum Value<'a> {
    Text(Cow<'a, str>),
    Int(i64),
    Float(f64),
}

/// Compiled record template plus its date format
///
/// # Examples
///
/// ```
/// use dicomjson_logging::core::{Formatter, LogLevel, LogRecord};
///
/// let formatter = Formatter::new("[%(levelname)-5.5s] %(name)s: %(message)s", None).unwrap();
/// let record = LogRecord::new("dicom2json", LogLevel::Warning, "unknown field");
/// assert_eq!(formatter.format(&record), "[WARNI] dicom2json: unknown field");
/// ```
#[derive(Debug, Clone)]
pub struct Formatter {
    template: String,
    segments: Vec<Segment>,
    date_format: DateFormat,
}

impl Formatter {
    /// Compile `template` with an optional strftime `datefmt`
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::FormatterError`] for unknown attributes, malformed
    /// directives, numeric conversions of textual attributes, templates with no
    /// attribute at all, and invalid `datefmt` directives.
    pub fn new(template: &str, datefmt: Option<&str>) -> Result<Self> {
        let segments = compile(template)?;
        if !segments.iter().any(|s| matches!(s, Segment::Field(_))) {
            return Err(LoggerError::formatter(
                template,
                "template references no record attribute",
            ));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            date_format: DateFormat::parse(datefmt)?,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }

    /// Render `asctime` for a record
    #[must_use]
    pub fn format_time(&self, record: &LogRecord) -> String {
        self.date_format.format(&record.timestamp)
    }

    /// Render a record, appending its error chain (if any) on following lines
    #[must_use]
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.template.len() + record.message.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(directive) => {
                    let value = self.value_of(directive.attribute, record);
                    render(&mut out, directive, value);
                }
            }
        }

        if let Some(ref chain) = record.error_chain {
            out.push('\n');
            out.push_str(chain);
        }

        out
    }

    fn value_of<'a>(&self, attribute: Attribute, record: &'a LogRecord) -> Value<'a> {
        match attribute {
            Attribute::AscTime => Value::Text(Cow::Owned(self.format_time(record))),
            Attribute::Created => Value::Float(
                record.timestamp.timestamp() as f64
                    + f64::from(record.timestamp.timestamp_subsec_micros()) / 1_000_000.0,
            ),
            Attribute::FileName => {
                Value::Text(Cow::Borrowed(record.file_name().unwrap_or("(unknown file)")))
            }
            Attribute::LevelName => Value::Text(Cow::Borrowed(record.level.to_str())),
            Attribute::LevelNo => Value::Int(i64::from(record.level.levelno())),
            Attribute::LineNo => Value::Int(i64::from(record.line.unwrap_or(0))),
            Attribute::Message => Value::Text(Cow::Borrowed(&record.message)),
            Attribute::Module => Value::Text(Cow::Borrowed(record.module().unwrap_or("unknown"))),
            Attribute::Msecs => {
                Value::Float(f64::from(record.timestamp.timestamp_subsec_micros()) / 1000.0)
            }
            Attribute::Name => Value::Text(Cow::Borrowed(&record.name)),
            Attribute::PathName => {
                Value::Text(Cow::Borrowed(record.file.as_deref().unwrap_or("(unknown file)")))
            }
            Attribute::Process => Value::Int(i64::from(record.process_id)),
            Attribute::Thread => Value::Text(Cow::Borrowed(&record.thread_id)),
            Attribute::ThreadName => Value::Text(Cow::Borrowed(record.thread_label())),
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            segments: vec![Segment::Field(Directive {
                attribute: Attribute::Message,
                left_align: false,
                zero_pad: false,
                width: None,
                precision: None,
                conversion: Conversion::Str,
            })],
            date_format: DateFormat::Default,
        }
    }
}

fn compile(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        match chars.next() {
            Some('%') => literal.push('%'),
            Some('(') => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }

                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(k) => key.push(k),
                        None => {
                            return Err(LoggerError::formatter(
                                template,
                                format!("unterminated attribute name '%({}'", key),
                            ))
                        }
                    }
                }

                let attribute = Attribute::parse(&key).ok_or_else(|| {
                    LoggerError::formatter(template, format!("unknown record attribute '{}'", key))
                })?;

                let mut left_align = false;
                let mut zero_pad = false;
                while let Some(&flag) = chars.peek() {
                    match flag {
                        '-' => left_align = true,
                        '0' => zero_pad = true,
                        '+' | ' ' | '#' => {}
                        _ => break,
                    }
                    chars.next();
                }

                let width = take_number(&mut chars);
                let precision = if chars.peek() == Some(&'.') {
                    chars.next();
                    Some(take_number(&mut chars).unwrap_or(0))
                } else {
                    None
                };

                let conversion = match chars.next() {
                    Some('s') => Conversion::Str,
                    Some('r') => Conversion::Repr,
                    Some('d') | Some('i') => Conversion::Int,
                    Some('f') => Conversion::Float,
                    Some(other) => {
                        return Err(LoggerError::formatter(
                            template,
                            format!("unsupported conversion '{}' for '{}'", other, key),
                        ))
                    }
                    None => {
                        return Err(LoggerError::formatter(
                            template,
                            format!("missing conversion for '{}'", key),
                        ))
                    }
                };

                if attribute.kind() == Kind::Text
                    && matches!(conversion, Conversion::Int | Conversion::Float)
                {
                    return Err(LoggerError::formatter(
                        template,
                        format!("'{}' is text and cannot use a numeric conversion", key),
                    ));
                }

                segments.push(Segment::Field(Directive {
                    attribute,
                    left_align,
                    zero_pad,
                    width,
                    precision,
                    conversion,
                }));
            }
            Some(other) => {
                return Err(LoggerError::formatter(
                    template,
                    format!("unsupported directive '%{}', expected '%(name)s'", other),
                ))
            }
            None => {
                return Err(LoggerError::formatter(template, "template ends with a bare '%'"))
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&d) = chars.peek() {
        if !d.is_ascii_digit() {
            break;
        }
        digits.push(d);
        chars.next();
    }
    digits.parse().ok()
}

fn render(out: &mut String, directive: &Directive, value: Value<'_>) {
    let (body, numeric) = match (directive.conversion, value) {
        (Conversion::Str, Value::Text(text)) => (truncate(text, directive.precision), false),
        (Conversion::Repr, Value::Text(text)) => (
            truncate(Cow::Owned(format!("'{}'", text)), directive.precision),
            false,
        ),
        (Conversion::Str | Conversion::Repr, Value::Int(n)) => {
            (truncate(Cow::Owned(n.to_string()), directive.precision), false)
        }
        (Conversion::Str | Conversion::Repr, Value::Float(f)) => {
            (truncate(Cow::Owned(f.to_string()), directive.precision), false)
        }
        (Conversion::Int, Value::Int(n)) => (Cow::Owned(int_digits(n, directive.precision)), true),
        (Conversion::Int, Value::Float(f)) => {
            (Cow::Owned(int_digits(f.trunc() as i64, directive.precision)), true)
        }
        (Conversion::Float, Value::Int(n)) => (
            Cow::Owned(format!("{:.*}", directive.precision.unwrap_or(6), n as f64)),
            true,
        ),
        (Conversion::Float, Value::Float(f)) => (
            Cow::Owned(format!("{:.*}", directive.precision.unwrap_or(6), f)),
            true,
        ),
        // Rejected by `compile`
        (Conversion::Int | Conversion::Float, Value::Text(text)) => (text, false),
    };

    let len = body.chars().count();
    let pad = directive.width.map_or(0, |w| w.saturating_sub(len));

    if pad == 0 {
        out.push_str(&body);
    } else if directive.left_align {
        out.push_str(&body);
        out.extend(std::iter::repeat(' ').take(pad));
    } else if directive.zero_pad && numeric {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", &body[..]),
        };
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(pad));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat(' ').take(pad));
        out.push_str(&body);
    }
}

fn truncate(text: Cow<'_, str>, precision: Option<usize>) -> Cow<'_, str> {
    match precision {
        Some(max) if text.chars().count() > max => Cow::Owned(text.chars().take(max).collect()),
        _ => text,
    }
}

/// `%.Nd` means "at least N digits"
fn int_digits(n: i64, precision: Option<usize>) -> String {
    match precision {
        Some(p) if n < 0 => format!("-{:0>width$}", n.unsigned_abs(), width = p),
        Some(p) => format!("{:0>width$}", n, width = p),
        None => n.to_string(),
    }
}
