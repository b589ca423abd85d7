use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use url::Url;

const ELLIPSIS: &str = "...";

/// Make a network-supplied title safe to draw on a single terminal line.
///
/// Drops ANSI escape sequences and control characters, and turns tabs and
/// line breaks into spaces. Returns `Cow::Borrowed` when nothing needs fixing.
pub fn sanitize_title(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                // CSI: parameters up to a final byte in 0x40..=0x7e
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: up to BEL or ESC
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == '\u{1b}' {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Truncate `s` to at most `max_width` terminal columns, ending in "..." when
/// something was cut. Widths of 3 or less get a plain cut without ellipsis.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width > ELLIPSIS.len() {
        (max_width - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (max_width, "")
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
    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

/// Age of a submission as shown in the story list ("5m", "3h", "2d", "Mar 04").
pub fn format_age(time: i64, now: i64) -> String {
    let diff = now.saturating_sub(time);

    if diff < 60 {
        return "now".to_string();
    }
    if diff < 3600 {
        return format!("{}m", diff / 60);
    }
    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }
    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }

    chrono::DateTime::from_timestamp(time, 0)
        .map(|dt| dt.format("%b %d").to_string())
        .unwrap_or_default()
}

/// Host part of a story link without a leading "www.".
pub fn url_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
