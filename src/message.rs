//! Structured log records produced by the parser.
//!
//! A [`LogMessage`] is immutable once built; the sink only reads it.

use chrono::{DateTime, SecondsFormat, Utc};

/// Log level.
///
/// Ordered by severity: `Error` is the most severe and compares lowest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
    Verbose = 4,
}

impl LogLevel {
    /// Map an ESP-IDF level letter (`E`, `W`, `I`, `D`, `V`).
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'E' => Some(LogLevel::Error),
            b'W' => Some(LogLevel::Warning),
            b'I' => Some(LogLevel::Info),
            b'D' => Some(LogLevel::Debug),
            b'V' => Some(LogLevel::Verbose),
            _ => None,
        }
    }

    /// ESP-IDF level letter.
    pub fn letter(self) -> char {
        match self {
            LogLevel::Error => 'E',
            LogLevel::Warning => 'W',
            LogLevel::Info => 'I',
            LogLevel::Debug => 'D',
            LogLevel::Verbose => 'V',
        }
    }

    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Verbose => log::Level::Trace,
        }
    }
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogMessage {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    tag: String,
    payload: String,
}

impl LogMessage {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        tag: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    /// Point in time the line was emitted (or captured, if the line carried no
    /// usable timestamp).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Component tag, empty when the line had none.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Format: `[timestamp] LEVEL tag: payload` (tag part omitted when empty).
impl core::fmt::Display for LogMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[{}] {:<7}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.as_str()
        )?;
        if !self.tag.is_empty() {
            write!(f, " {}:", self.tag)?;
        }
        write!(f, " {}", self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Verbose);
    }

    #[test]
    fn test_letter_mapping() {
        for level in [
            LogLevel::Error,
            LogLevel::Warning,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Verbose,
        ] {
            assert_eq!(LogLevel::from_letter(level.letter() as u8), Some(level));
        }
        assert_eq!(LogLevel::from_letter(b'X'), None);
        assert_eq!(LogLevel::from_letter(b'e'), None);
    }

    #[test]
    fn test_log_crate_mapping() {
        assert_eq!(log::Level::from(LogLevel::Warning), log::Level::Warn);
        assert_eq!(log::Level::from(LogLevel::Verbose), log::Level::Trace);
    }

    #[test]
    fn test_format_message() {
        let ts = Utc.timestamp_millis_opt(1_234_567).unwrap();
        let msg = LogMessage::new(ts, LogLevel::Info, "wifi", "connected");

        let formatted = msg.to_string();
        assert!(formatted.contains("1970-01-01T00:20:34.567Z"));
        assert!(formatted.contains("INFO"));
        assert!(formatted.contains("wifi: connected"));
    }

    #[test]
    fn test_format_message_without_tag() {
        let ts = Utc.timestamp_millis_opt(0).unwrap();
        let msg = LogMessage::new(ts, LogLevel::Error, "", "raw line");

        let formatted = msg.to_string();
        assert!(formatted.ends_with("ERROR   raw line"));
    }
}
