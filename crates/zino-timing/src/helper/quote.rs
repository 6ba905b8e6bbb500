/// Quotes a string as a double-quoted literal.
///
/// Double quotes and backslashes are escaped with a backslash. Control characters
/// use the short escapes `\a`, `\b`, `\f`, `\n`, `\r`, `\t`, `\v` when they exist,
/// or the hexadecimal forms `\xNN` and `\uNNNN` otherwise.
pub(crate) fn quote_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for ch in s.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\u{07}' => quoted.push_str("\\a"),
            '\u{08}' => quoted.push_str("\\b"),
            '\u{0c}' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{0b}' => quoted.push_str("\\v"),
            ch if ch.is_control() => {
                let code = u32::from(ch);
                let escaped = if code < 0x80 {
                    format!("\\x{code:02x}")
                } else {
                    format!("\\u{code:04x}")
                };
                quoted.push_str(&escaped);
            }
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
