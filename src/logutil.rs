//! Logging utilities for rendering raw serial chunks so logs stay single-line.
//! Escapes control and non-ASCII bytes that otherwise break log readability.

/// Escape a byte chunk for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - any other byte outside printable ASCII => `\\xNN`
///
/// Truncates chunks longer than `MAX_PREVIEW` bytes with an ellipsis to cap log noise.
pub fn escape_bytes(data: &[u8]) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(data.len().min(MAX_PREVIEW) + 8);
    for (count, &b) in data.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", b);
            }
        }
    }
    out
}
