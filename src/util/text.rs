use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns (CJK and emoji count as 2,
/// combining marks as 0).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to at most `max_width` terminal columns, appending
/// `...` when anything was cut.
///
/// Returns `Cow::Borrowed` when the string already fits. Widths of 3 or less
/// get plain character truncation with no ellipsis, since there is no room
/// for one.
///
/// # Examples
///
/// ```
/// use curator::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Loudspeakers", 20), "Loudspeakers");
/// assert_eq!(truncate_to_width("Loudspeakers", 8), "Louds...");
/// assert_eq!(truncate_to_width("Loudspeakers", 2), "Lo");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..end].to_owned())
    } else {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    }
}

/// Truncates to `width` columns and right-pads with spaces so the result
/// occupies exactly `width` columns. Used for table alignment.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let shown = truncate_to_width(s, width);
    let fill = width.saturating_sub(display_width(&shown));
    let mut out = shown.into_owned();
    out.extend(std::iter::repeat(' ').take(fill));
    out
}

fn is_banned(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Strips terminal control characters and ANSI escape sequences.
///
/// Every string the store hands back (names, slugs, descriptions, error
/// bodies) ends up on the operator's terminal, so it is treated as untrusted:
/// C0 controls, DEL, CSI/OSC sequences, and bare ESC bytes are removed. Tab,
/// newline, and carriage return survive.
///
/// Returns `Cow::Borrowed` for clean input, which is the common case.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(is_banned) {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == 0x1b {
            i += 1;
            match bytes.get(i) {
                // CSI: parameter and intermediate bytes end at a final byte in 0x40..=0x7e
                Some(b'[') => {
                    i += 1;
                    while let Some(&c) = bytes.get(i) {
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: runs until BEL or ST
                Some(b']') => {
                    i += 1;
                    while let Some(&c) = bytes.get(i) {
                        if c == 0x07 {
                            i += 1;
                            break;
                        }
                        if c == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                // Bare ESC: already consumed
                _ => {}
            }
        } else if is_banned(b) {
            i += 1;
        } else {
            // Copy the whole run of clean bytes in one push. Banned bytes are
            // all ASCII, so a run boundary is always a char boundary.
            let start = i;
            while i < bytes.len() && !is_banned(bytes[i]) {
                i += 1;
            }
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}
