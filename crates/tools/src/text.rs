use memchr::{memchr, memchr2};

/// Collapse internal runs of whitespace to a single space and trim the ends.
/// Titles and option labels are displayed on one line, so embedded newlines
/// and tabs are unwanted.
pub fn space_crunch(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Strip leading whitespace in place.
pub fn left_clip(s: &mut String) {
    let skip = s.len() - s.trim_start().len();
    if skip > 0 {
        s.drain(..skip);
    }
}

pub fn is_html_content_type(ct: &Option<String>) -> bool {
    let Some(value) = ct.as_deref() else {
        return false;
    };
    contains_ignore_ascii_case(value, b"text/html")
        || contains_ignore_ascii_case(value, b"application/xhtml")
}

/// ASCII-case-insensitive substring search, accelerated with memchr on the
/// first needle byte.
pub fn contains_ignore_ascii_case(haystack: &str, needle: &[u8]) -> bool {
    let hay = haystack.as_bytes();
    let n = needle.len();
    if n == 0 {
        return true;
    }
    let hay_len = hay.len();
    if hay_len < n {
        return false;
    }
    let first = needle[0];
    let (a, b) = if first.is_ascii_alphabetic() {
        (first.to_ascii_lowercase(), first.to_ascii_uppercase())
    } else {
        (first, first)
    };
    if n == 1 {
        if a == b {
            return memchr(a, hay).is_some();
        }
        return memchr2(a, b, hay).is_some();
    }
    let mut i = 0;
    while i + n <= hay_len {
        let rel = if a == b {
            memchr(a, &hay[i..])
        } else {
            memchr2(a, b, &hay[i..])
        };
        let Some(rel) = rel else {
            return false;
        };
        let pos = i + rel;
        if pos + n <= hay_len && hay[pos..pos + n].eq_ignore_ascii_case(needle) {
            return true;
        }
        i = pos + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_crunch_collapses_runs() {
        assert_eq!(space_crunch("  a \t b\n\nc "), "a b c");
        assert_eq!(space_crunch("plain"), "plain");
        assert_eq!(space_crunch("   "), "");
    }

    #[test]
    fn left_clip_strips_leading_only() {
        let mut s = String::from("\n\t  hello \n");
        left_clip(&mut s);
        assert_eq!(s, "hello \n");
    }

    #[test]
    fn ci_contains() {
        assert!(contains_ignore_ascii_case("Text/HTML; charset=utf-8", b"text/html"));
        assert!(!contains_ignore_ascii_case("application/json", b"text/html"));
        assert!(contains_ignore_ascii_case("xYz", b"y"));
    }

    #[test]
    fn html_content_type() {
        assert!(is_html_content_type(&Some("text/html".into())));
        assert!(is_html_content_type(&Some("application/xhtml+xml".into())));
        assert!(!is_html_content_type(&Some("image/png".into())));
        assert!(!is_html_content_type(&None));
    }
}
