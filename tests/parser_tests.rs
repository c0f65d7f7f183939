//! Structured parser tests

use chrono::{DateTime, TimeDelta, Utc};

use esp_loghook::{LogLevel, Parser};

fn boot() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-15T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_parse_standard_line() {
    let msg = Parser::new(boot()).parse("I (12345) MYTAG: hello world");

    assert_eq!(msg.level(), LogLevel::Info);
    assert_eq!(msg.timestamp(), boot() + TimeDelta::milliseconds(12345));
    assert_eq!(msg.tag(), "MYTAG");
    assert_eq!(msg.payload(), "hello world");
}

#[test]
fn test_parse_all_levels() {
    let parser = Parser::new(boot());
    let cases = [
        ('E', LogLevel::Error),
        ('W', LogLevel::Warning),
        ('I', LogLevel::Info),
        ('D', LogLevel::Debug),
        ('V', LogLevel::Verbose),
    ];
    for (letter, level) in cases {
        let msg = parser.parse(&format!("{} (1) tag: body", letter));
        assert_eq!(msg.level(), level);
        assert_eq!(msg.tag(), "tag");
        assert_eq!(msg.payload(), "body");
    }
}

#[test]
fn test_full_fallback_for_free_text() {
    let before = Utc::now();
    let msg = Parser::new(boot()).parse("not a log line at all");

    assert_eq!(msg.level(), LogLevel::Info);
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "not a log line at all");
    assert!(msg.timestamp() >= before);
}

#[test]
fn test_empty_tag_is_bounded() {
    let msg = Parser::new(boot()).parse("E (5) : oops");

    assert_eq!(msg.level(), LogLevel::Error);
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "oops");
    assert_eq!(msg.timestamp(), boot() + TimeDelta::milliseconds(5));
}

#[test]
fn test_colon_directly_after_paren_skips_to_next() {
    let msg = Parser::new(boot()).parse("W (7):: doubled");
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "doubled");

    let msg = Parser::new(boot()).parse("W (7):only");
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "only");
}

#[test]
fn test_payload_keeps_later_colons() {
    let msg = Parser::new(boot()).parse("D (100) http: GET /a:b -> 200: ok");
    assert_eq!(msg.tag(), "http");
    assert_eq!(msg.payload(), "GET /a:b -> 200: ok");
}

#[test]
fn test_payload_without_space_after_colon() {
    let msg = Parser::new(boot()).parse("I (1) tag:tight");
    assert_eq!(msg.tag(), "tag");
    assert_eq!(msg.payload(), "tight");
}

#[test]
fn test_non_numeric_time_keeps_capture_time() {
    let before = Utc::now();
    let msg = Parser::new(boot()).parse("I (12:30:01.250) sys: clock source");

    assert_eq!(msg.level(), LogLevel::Info);
    assert!(msg.timestamp() >= before);
    assert_eq!(msg.tag(), "sys");
    assert_eq!(msg.payload(), "clock source");
}

#[test]
fn test_empty_time_keeps_capture_time() {
    let before = Utc::now();
    let msg = Parser::new(boot()).parse("W () t: m");
    assert!(msg.timestamp() >= before);
    assert_eq!(msg.payload(), "m");
}

#[test]
fn test_missing_colon_falls_back() {
    let msg = Parser::new(boot()).parse("I (12) no separator here");
    assert_eq!(msg.level(), LogLevel::Info);
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "I (12) no separator here");
}

#[test]
fn test_missing_paren_falls_back() {
    let msg = Parser::new(boot()).parse("E 12) tag: x");
    assert_eq!(msg.level(), LogLevel::Info);
    assert_eq!(msg.payload(), "E 12) tag: x");

    let msg = Parser::new(boot()).parse("E (12 tag: x");
    assert_eq!(msg.payload(), "E (12 tag: x");
}

#[test]
fn test_paren_at_end_falls_back() {
    let msg = Parser::new(boot()).parse("W (42)");
    assert_eq!(msg.level(), LogLevel::Info);
    assert_eq!(msg.payload(), "W (42)");
}

#[test]
fn test_short_lines_fall_back() {
    for line in ["", "E", "E ", "E (", "E (1"] {
        let msg = Parser::new(boot()).parse(line);
        assert_eq!(msg.level(), LogLevel::Info, "line {:?}", line);
        assert_eq!(msg.payload(), line);
    }
}

#[test]
fn test_colon_at_end_gives_empty_payload() {
    let msg = Parser::new(boot()).parse("I (3) tag:");
    assert_eq!(msg.tag(), "tag");
    assert_eq!(msg.payload(), "");
}

#[test]
fn test_no_space_after_paren_has_empty_tag() {
    let msg = Parser::new(boot()).parse("I (3)tag: body");
    assert_eq!(msg.tag(), "");
    assert_eq!(msg.payload(), "body");
}

#[test]
fn test_huge_timestamp_keeps_capture_time() {
    let before = Utc::now();
    let msg = Parser::new(boot()).parse("I (18446744073709551615) t: max");
    assert!(msg.timestamp() >= before);
    assert_eq!(msg.payload(), "max");
}

#[test]
fn test_multibyte_text_never_panics() {
    let parser = Parser::new(boot());
    let lines = [
        "é (1) t: x",
        "I (1) tâg: pàyload ✓",
        "I (١٢) t: arabic digits",
        "✓✓✓✓✓",
        "I (1) :",
    ];
    for line in lines {
        let _ = parser.parse(line);
    }

    assert_eq!(parser.parse("I (1) tâg: pàyload ✓").tag(), "tâg");
}
