//! ESP-IDF log line parser.
//!
//! Expected layout: `<L> (<TIME>) <TAG>: <PAYLOAD>`, for example
//! `I (12345) wifi: connected`. `<TIME>` is milliseconds since boot.
//!
//! Lines are untrusted printf output, so parsing is total: anything that does
//! not match comes back as an Info record whose payload is the whole line.

use chrono::{DateTime, TimeDelta, Utc};

use crate::message::{LogLevel, LogMessage};

/// Minimum length of a line carrying a level prefix (`"L (x"` plus one).
const MIN_STRUCTURED_LEN: usize = 5;

/// Parses normalized lines into [`LogMessage`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parser {
    boot_epoch: DateTime<Utc>,
}

impl Default for Parser {
    /// Boot epoch at the Unix epoch: timestamps read as plain uptime.
    fn default() -> Self {
        Self {
            boot_epoch: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Positions of the structural delimiters in a line.
struct Layout {
    level: LogLevel,
    open: usize,
    close: usize,
    colon: usize,
}

impl Parser {
    /// Parser that resolves `(<TIME>)` against `boot_epoch`.
    pub const fn new(boot_epoch: DateTime<Utc>) -> Self {
        Self { boot_epoch }
    }

    pub fn boot_epoch(&self) -> DateTime<Utc> {
        self.boot_epoch
    }

    /// Parse a normalized line. Never fails.
    pub fn parse(&self, line: &str) -> LogMessage {
        let captured = Utc::now();

        let Some(layout) = locate(line) else {
            return LogMessage::new(captured, LogLevel::Info, "", line);
        };

        let timestamp = line
            .get(layout.open + 1..layout.close)
            .and_then(parse_millis)
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|offset| self.boot_epoch.checked_add_signed(offset))
            .unwrap_or(captured);

        let bytes = line.as_bytes();
        let tag = if bytes[layout.close + 1] == b' ' {
            line.get(layout.close + 2..layout.colon).unwrap_or("")
        } else {
            ""
        };

        let mut payload_start = layout.colon + 1;
        if bytes.get(payload_start) == Some(&b' ') {
            payload_start += 1;
        }

        match line.get(payload_start..) {
            Some(payload) => LogMessage::new(timestamp, layout.level, tag, payload),
            None => LogMessage::new(captured, LogLevel::Info, "", line),
        }
    }
}

/// Parse with the default (Unix epoch) boot reference.
pub fn parse(line: &str) -> LogMessage {
    Parser::default().parse(line)
}

/// Find level, parentheses and the tag/payload colon; `None` means fallback.
fn locate(line: &str) -> Option<Layout> {
    let bytes = line.as_bytes();
    if bytes.len() < MIN_STRUCTURED_LEN || bytes[1] != b' ' {
        return None;
    }
    let level = LogLevel::from_letter(bytes[0])?;

    let open = line.find('(')?;
    let close = open + line[open..].find(')')?;
    if close + 1 >= bytes.len() {
        return None;
    }

    let mut colon = close + 1 + line[close + 1..].find(':')?;
    // "(5):" has no tag; the separating colon is the next one, if any.
    if colon == close + 1 {
        if let Some(next) = line[colon + 1..].find(':') {
            colon = colon + 1 + next;
        }
    }

    Some(Layout {
        level,
        open,
        close,
        colon,
    })
}

/// Strict decimal milliseconds: digits only, no sign, no whitespace.
fn parse_millis(span: &str) -> Option<i64> {
    if span.is_empty() || !span.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    span.parse::<u64>().ok().and_then(|ms| i64::try_from(ms).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_locate_standard_line() {
        let layout = locate("I (12345) MYTAG: hello").unwrap();
        assert_eq!(layout.level, LogLevel::Info);
        assert_eq!(layout.open, 2);
        assert_eq!(layout.close, 8);
        assert_eq!(layout.colon, 15);
    }

    #[test]
    fn test_locate_rejects_short_and_unknown() {
        assert!(locate("I (1").is_none());
        assert!(locate("X (1) t: m").is_none());
        assert!(locate("I(1) t: m").is_none());
    }

    #[test]
    fn test_locate_close_paren_at_end() {
        assert!(locate("I (1234)").is_none());
    }

    #[test]
    fn test_parse_millis_strict() {
        assert_eq!(parse_millis("42"), Some(42));
        assert_eq!(parse_millis(""), None);
        assert_eq!(parse_millis("+42"), None);
        assert_eq!(parse_millis(" 42"), None);
        assert_eq!(parse_millis("12:30:01.5"), None);
        assert_eq!(parse_millis("99999999999999999999999"), None);
    }

    #[test]
    fn test_timestamp_relative_to_boot() {
        let msg = Parser::new(boot()).parse("W (1500) tag: x");
        assert_eq!(msg.timestamp(), boot() + TimeDelta::milliseconds(1500));
    }

    #[test]
    fn test_default_parser_uses_unix_epoch() {
        let msg = parse("D (2000) tag: x");
        assert_eq!(msg.timestamp().timestamp_millis(), 2000);
        assert_eq!(msg.level(), LogLevel::Debug);
    }
}
