//! The fixed escape table applied to every string the writer emits.
//!
//! Besides what JSON requires, the table escapes `/`, the Unicode line
//! separators and the HTML-significant `<` and `&`, so output can be embedded
//! in a `<script>` element or a JavaScript string unchanged.
use core::fmt::{self, Write};

/// Writes `src` to `f` with every character the table covers escaped.
pub(crate) fn write_escaped<W: Write + ?Sized>(f: &mut W, src: &str) -> fmt::Result {
    let mut start = 0;
    for (i, c) in src.char_indices() {
        let short = match c {
            '"' => "\\\"",
            '\\' => "\\\\",
            '/' => "\\/",
            '\u{8}' => "\\b",
            '\u{c}' => "\\f",
            '\n' => "\\n",
            '\r' => "\\r",
            '\t' => "\\t",
            '\0'..='\u{1f}' | '\u{2028}' | '\u{2029}' | '<' | '&' => "",
            _ => continue,
        };
        f.write_str(&src[start..i])?;
        if short.is_empty() {
            write!(f, "\\u{:04x}", c as u32)?;
        } else {
            f.write_str(short)?;
        }
        start = i + c.len_utf8();
    }
    f.write_str(&src[start..])
}

/// Appends `src` to `dst`, escaped.
pub(crate) fn push_escaped(dst: &mut String, src: &str) {
    // Writing into a `String` cannot fail.
    let _ = write_escaped(dst, src);
}
