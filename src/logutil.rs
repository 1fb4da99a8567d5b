//! Keep user-authored text on one log line.
//!
//! Message bodies arrive with newlines, tabs and the odd control character; logging them
//! raw splits a record across lines. [escape_log] makes them printable and caps the length.

use std::fmt::Write;

/// Characters of user content shown in a log record before it is cut off.
pub const LOG_PREVIEW_CHARS: usize = 120;

/// Escape `s` for a single log line and cut it at [LOG_PREVIEW_CHARS].
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, LOG_PREVIEW_CHARS)
}

/// Like [escape_log] with an explicit limit. Longer input ends in `…`.
pub fn escape_log_with(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:04x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
