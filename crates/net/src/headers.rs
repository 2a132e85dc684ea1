//! Stateless parsers for raw HTTP header text. The transfer loop keeps
//! headers as one accumulated string and picks fields out of it, so
//! header quirks stay in one place.

use tools::contains_ignore_ascii_case;

/// Find a header's value in the raw `Name: value\n` block.
/// The name match is case-insensitive; surrounding whitespace and one
/// layer of matching quotes are stripped. An empty value counts as absent.
pub fn find_header(raw: &str, name: &str) -> Option<String> {
    for line in raw.lines() {
        let Some((n, v)) = line.split_once(':') else {
            continue;
        };
        if !n.trim_end().eq_ignore_ascii_case(name) {
            continue;
        }
        let mut v = v.trim();
        let b = v.as_bytes();
        if b.len() >= 2 && b[0] == b[b.len() - 1] && (b[0] == b'"' || b[0] == b'\'') {
            v = &v[1..v.len() - 1];
        }
        if v.is_empty() {
            return None;
        }
        return Some(v.to_string());
    }
    None
}

/// Pull `item` out of a `;`-separated parameter list, as in
/// `text/html; charset=utf-8`. Even the first parameter must follow a `;`.
pub fn header_param(value: &str, item: &str) -> Option<String> {
    let mut s = value;
    while let Some(i) = s.find(';') {
        s = s[i + 1..].trim_start_matches(|c: char| c == ';' || c <= ' ');
        let matched = s
            .as_bytes()
            .get(..item.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(item.as_bytes()));
        if !matched {
            continue;
        }
        let rest = s[item.len()..].trim_start_matches(|c: char| c <= ' ' || c == '=');
        let end = rest
            .find(|c: char| c < ' ' || c == ';')
            .unwrap_or(rest.len());
        return Some(rest[..end].to_string());
    }
    None
}

/// Everything the transfer loop wants to know from a response's headers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMeta {
    /// Lowercased media type, parameters split off.
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub length: Option<u64>,
    pub disposition_filename: Option<String>,
    pub etag: Option<String>,
    /// Raw last-modified text; [`crate::date::parse_header_date`] turns it
    /// into an instant.
    pub last_modified: Option<String>,
    pub cacheable: bool,
    pub location: Option<String>,
    pub refresh: Option<String>,
}

pub fn scan_headers(raw: &str) -> ResponseMeta {
    let mut meta = ResponseMeta {
        cacheable: true,
        ..ResponseMeta::default()
    };

    if let Some(v) = find_header(raw, "content-type") {
        let lower = v.to_ascii_lowercase();
        match lower.split_once(';') {
            Some((ct, _)) => {
                meta.content_type = Some(ct.trim_end().to_string());
                meta.charset = header_param(&lower, "charset");
            }
            None => meta.content_type = Some(lower),
        }
        log::debug!("content {}", meta.content_type.as_deref().unwrap_or_default());
    }

    if let Some(v) = find_header(raw, "content-disposition") {
        if let Some(i) = v.to_ascii_lowercase().find("filename=") {
            let mut s = &v[i + 9..];
            if let Some(stripped) = s.strip_prefix('"') {
                s = stripped.split('"').next().unwrap_or(stripped);
            } else if let Some(j) = s.find(';') {
                s = &s[..j];
            }
            if !s.is_empty() {
                log::debug!("disposition filename {s}");
                meta.disposition_filename = Some(s.to_string());
            }
        }
    }

    if let Some(v) = find_header(raw, "content-length") {
        meta.length = v.trim().parse().ok();
        if let Some(l) = meta.length {
            log::debug!("content length {l}");
        }
    }

    if let Some(v) = find_header(raw, "etag") {
        log::debug!("etag {v}");
        meta.etag = Some(v);
    }

    for h in ["cache-control", "pragma"] {
        if meta.cacheable {
            if let Some(v) = find_header(raw, h) {
                if contains_ignore_ascii_case(&v, b"no-cache") {
                    meta.cacheable = false;
                    log::debug!("no cache");
                }
            }
        }
    }

    if let Some(v) = find_header(raw, "last-modified") {
        log::debug!("mod date {v}");
        meta.last_modified = Some(v);
    }

    meta.location = find_header(raw, "location");
    meta.refresh = find_header(raw, "refresh");
    meta
}

/// Crack a refresh directive, `<seconds>;url=<target>`. Returns the delay
/// and target; a directive without `url=` is garbled and yields nothing.
pub fn parse_refresh(refresh: &str) -> Option<(u32, String)> {
    let digits = refresh
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(refresh.len());
    let delay = refresh[..digits]
        .split('.')
        .next()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);

    let mut rest = &refresh[digits..];
    rest = rest.strip_prefix(';').unwrap_or(rest).trim_start_matches(' ');
    let tagged = rest
        .as_bytes()
        .get(..4)
        .is_some_and(|p| p.eq_ignore_ascii_case(b"url="));
    if !tagged {
        log::warn!("garbled refresh directive {refresh}");
        return None;
    }
    let mut target = &rest[4..];
    let b = target.as_bytes();
    if !b.is_empty() && (b[0] == b'"' || b[0] == b'\'') {
        let qc = b[0];
        target = &target[1..];
        if target.as_bytes().last() == Some(&qc) {
            target = &target[..target.len() - 1];
        }
    }
    log::debug!("delay {delay} {target}");
    Some((delay, target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "HTTP/1.1 200 OK\n\
Content-Type: Text/HTML; charset=UTF-8\n\
Content-Length: 1234\n\
ETag: \"abc123\"\n\
Last-Modified: Sat, 03 Jan 2015 21:29:33 GMT\n\
Content-Disposition: attachment; filename=\"report.pdf\"\n";

    #[test]
    fn header_lookup_is_case_insensitive_and_unquotes() {
        assert_eq!(find_header(RAW, "etag").as_deref(), Some("abc123"));
        assert_eq!(find_header(RAW, "CONTENT-LENGTH").as_deref(), Some("1234"));
        assert_eq!(find_header(RAW, "x-missing"), None);
    }

    #[test]
    fn scan_pulls_the_usual_fields() {
        let meta = scan_headers(RAW);
        assert_eq!(meta.content_type.as_deref(), Some("text/html"));
        assert_eq!(meta.charset.as_deref(), Some("utf-8"));
        assert_eq!(meta.length, Some(1234));
        assert_eq!(meta.etag.as_deref(), Some("abc123"));
        assert_eq!(meta.disposition_filename.as_deref(), Some("report.pdf"));
        assert!(meta.cacheable);
    }

    #[test]
    fn no_cache_headers_clear_cacheability() {
        let meta = scan_headers("Cache-Control: private, no-cache\n");
        assert!(!meta.cacheable);
        let meta = scan_headers("Pragma: No-Cache\n");
        assert!(!meta.cacheable);
    }

    #[test]
    fn params_need_their_semicolon() {
        let v = "text/html; charset=utf-8; boundary=xyz";
        assert_eq!(header_param(v, "charset").as_deref(), Some("utf-8"));
        assert_eq!(header_param(v, "boundary").as_deref(), Some("xyz"));
        // the leading item is not a parameter
        assert_eq!(header_param("charset=utf-8", "charset"), None);
    }

    #[test]
    fn multibyte_params_near_the_prefix_are_skipped() {
        // the parameter name is shorter than the sought item and ends in
        // multibyte chars; the prefix compare must not cut one in half
        assert_eq!(header_param("text/plain; éééé=x", "charset"), None);
        assert_eq!(
            header_param("text/plain; éééé=x; charset=utf-8", "charset").as_deref(),
            Some("utf-8")
        );
    }

    #[test]
    fn refresh_parsing() {
        assert_eq!(
            parse_refresh("0;url=/next"),
            Some((0, "/next".to_string()))
        );
        assert_eq!(
            parse_refresh("5; URL='http://x.example.com/'"),
            Some((5, "http://x.example.com/".to_string()))
        );
        assert_eq!(parse_refresh("30"), None);
        assert_eq!(parse_refresh("garbage"), None);
        // multibyte garbage where url= belongs
        assert_eq!(parse_refresh("0;ééé"), None);
    }
}
