//! Colour-escape and terminator stripping for completed lines.
//!
//! ESP-IDF wraps coloured lines as `ESC[0;32mI (123) tag: msg ESC[0m\n`.

/// Start of a colour escape (`ESC '['`).
const ESCAPE_START: &str = "\x1b[";

/// Strip `ESC[...m` runs and trailing line terminators.
///
/// Each escape is erased up to the first `m` after it. An escape start with no
/// `m` after it stops the scan and is left in place. Scanning resumes one byte
/// before an erased span, so an escape formed by joining the text on either
/// side of the erased span is removed as well. The result is a fixed point:
/// normalizing it again returns it unchanged.
pub fn normalize(line: &str) -> String {
    let mut message = line.to_owned();

    let mut start_pos = 0;
    while let Some(found) = message[start_pos..].find(ESCAPE_START) {
        let start = start_pos + found;
        let Some(end) = message[start..].find('m') else {
            break;
        };
        message.replace_range(start..=start + end, "");
        // Only ESC (ASCII) can precede a newly joined '[', so the
        // resumed position is always a char boundary.
        start_pos = if start > 0 && message.as_bytes()[start - 1] == 0x1b {
            start - 1
        } else {
            start
        };
    }

    let trimmed = message.trim_end_matches(['\n', '\r']).len();
    message.truncate(trimmed);
    message
}
