//! Helpers for putting player-supplied and content strings into single-line logs.

use std::fmt::Write;

const MAX_PREVIEW: usize = 200;

/// Escape a string for single-line logging and cap its length.
///
/// Newlines, carriage returns, tabs and backslashes are escaped; other control
/// characters become `\xNN`. Strings longer than the preview limit end in `…`.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Session tokens are bearer credentials; only their first characters go to the logs.
pub fn redact_token(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{}…", head)
}
