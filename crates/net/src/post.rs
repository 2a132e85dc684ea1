//! POST payload handling. A form submission travels as one string, the
//! url, a control-A marker, then the body. A multipart body announces
//! itself with a backquote prefix carrying the mime boundary, and any
//! uploaded file inside it arrives base64 encoded, to be unpacked before
//! the bytes go on the wire.

/// Separates the url proper from the POST body riding along behind it.
pub const PAYLOAD_MARKER: char = '\u{1}';

const MULTIPART_PREFIX: &str = "`mfd~";
const MESSAGE64: &str = "Content-Transfer-Encoding: base64";

/// Split a composite url at the payload marker. No marker means GET.
pub fn split_payload(url: &str) -> (&str, Option<&str>) {
    match url.split_once(PAYLOAD_MARKER) {
        Some((u, p)) => (u, Some(p)),
        None => (url, None),
    }
}

/// A POST body, classified and ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostPayload {
    /// application/x-www-form-urlencoded, sent as is.
    UrlEncoded(String),
    /// multipart/form-data; the boundary goes into the Content-Type
    /// header and the body has had its base64 file sections unpacked.
    Multipart { boundary: String, body: Vec<u8> },
}

impl PostPayload {
    pub fn body(&self) -> &[u8] {
        match self {
            PostPayload::UrlEncoded(s) => s.as_bytes(),
            PostPayload::Multipart { body, .. } => body,
        }
    }

    pub fn content_type(&self) -> String {
        match self {
            PostPayload::UrlEncoded(_) => {
                "application/x-www-form-urlencoded".to_string()
            }
            PostPayload::Multipart { boundary, .. } => {
                format!("multipart/form-data; boundary={boundary}")
            }
        }
    }
}

/// Classify the text after the payload marker. Returns `None` when a
/// multipart prefix is present but truncated before its boundary ends.
pub fn classify_payload(post: &str) -> Option<PostPayload> {
    let Some(rest) = post.strip_prefix(MULTIPART_PREFIX) else {
        return Some(PostPayload::UrlEncoded(post.to_string()));
    };
    let cr = rest.find('\r')?;
    let boundary = rest[..cr].to_string();
    let body = rest.get(cr + 2..)?;
    let body = unpack_uploaded_file(body, &boundary)
        .unwrap_or_else(|| body.as_bytes().to_vec());
    Some(PostPayload::Multipart { boundary, body })
}

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode bytes as base64, for the Authorization header.
pub fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;
        out.push(BASE64_ALPHABET[(n >> 18) as usize & 63] as char);
        out.push(BASE64_ALPHABET[(n >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            BASE64_ALPHABET[(n >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_ALPHABET[n as usize & 63] as char
        } else {
            '='
        });
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Base64Outcome {
    Good,
    /// A character outside the alphabet.
    Bad,
    /// More data after the terminating `=` padding.
    ExtraChars,
}

fn base64_bits(c: u8) -> u8 {
    match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => 64,
    }
}

/// Decode base64 text, tolerating embedded whitespace. On error the
/// bytes decoded so far come back along with the failure kind.
pub fn base64_decode(data: &[u8]) -> (Vec<u8>, Base64Outcome) {
    let mut out = Vec::with_capacity(data.len() / 4 * 3 + 3);
    let mut leftover = 0u8;
    let mut phase = 0u8;
    let mut equals = false;
    for &c in data {
        if c.is_ascii_whitespace() {
            continue;
        }
        if equals {
            if c == b'=' {
                continue;
            }
            return (out, Base64Outcome::ExtraChars);
        }
        if c == b'=' {
            equals = true;
            continue;
        }
        let val = base64_bits(c);
        if val & 64 != 0 {
            return (out, Base64Outcome::Bad);
        }
        match phase {
            0 => leftover = val << 2,
            1 => {
                out.push(leftover | (val >> 4));
                leftover = val << 4;
            }
            2 => {
                out.push(leftover | (val >> 2));
                leftover = val << 6;
            }
            _ => out.push(leftover | val),
        }
        phase = (phase + 1) & 3;
    }
    (out, Base64Outcome::Good)
}

/// Decode the base64 file sections of a multipart body in place,
/// rewriting each section's transfer encoding to 8bit. Returns `None`
/// when no section is base64 encoded and the body can be sent verbatim.
pub fn unpack_uploaded_file(post: &str, boundary: &str) -> Option<Vec<u8>> {
    if !post.contains(MESSAGE64) {
        return None;
    }

    let mut out = Vec::with_capacity(post.len());
    let first = post.find(boundary)?;
    let cut = first + boundary.len();
    out.extend_from_slice(post[..cut].as_bytes());
    let mut rest = &post[cut..];

    loop {
        if !rest.starts_with("\r\n") {
            // the closing -- after the final boundary
            out.extend_from_slice(rest.as_bytes());
            break;
        }
        let Some(next) = rest.find(boundary) else {
            out.extend_from_slice(rest.as_bytes());
            break;
        };
        unpack_part(&rest[..next], &mut out);
        out.extend_from_slice(boundary.as_bytes());
        rest = &rest[next + boundary.len()..];
    }
    Some(out)
}

fn unpack_part(part: &str, out: &mut Vec<u8>) {
    // headers end at the blank line; content runs up to the \r\n--
    // leading into the next boundary
    let encoded = part.contains(MESSAGE64);
    let header_end = part.find("\r\n\r\n");
    let (Some(header_end), true) = (header_end, encoded) else {
        out.extend_from_slice(part.as_bytes());
        return;
    };

    let headers = part[..header_end].replace(MESSAGE64, "Content-Transfer-Encoding: 8bit");
    out.extend_from_slice(headers.as_bytes());
    out.extend_from_slice(b"\r\n\r\n");

    // byte offsets; the cut four bytes before the boundary may land
    // inside a multibyte char when the part is malformed
    let bytes = part.as_bytes();
    let content_end = bytes.len().saturating_sub(4).max(header_end + 4);
    let (decoded, outcome) = base64_decode(&bytes[header_end + 4..content_end]);
    if outcome != Base64Outcome::Good {
        log::warn!("could not decode the uploaded file as base64");
    }
    out.extend_from_slice(&decoded);
    out.extend_from_slice(&bytes[content_end..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_split_at_the_marker() {
        assert_eq!(
            split_payload("http://x/form\u{1}a=b&c=d"),
            ("http://x/form", Some("a=b&c=d"))
        );
        assert_eq!(split_payload("http://x/page"), ("http://x/page", None));
    }

    #[test]
    fn plain_payloads_stay_urlencoded() {
        assert_eq!(
            classify_payload("a=b&c=d"),
            Some(PostPayload::UrlEncoded("a=b&c=d".to_string()))
        );
    }

    #[test]
    fn base64_decodes_the_usual_suspects() {
        let (out, rc) = base64_decode(b"aGVsbG8gd29ybGQ=");
        assert_eq!(rc, Base64Outcome::Good);
        assert_eq!(out, b"hello world");

        // whitespace anywhere is fine
        let (out, rc) = base64_decode(b"aGVs\r\nbG8=");
        assert_eq!(rc, Base64Outcome::Good);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn base64_encode_round_trips() {
        for text in ["", "a", "ab", "abc", "hello world"] {
            let enc = base64_encode(text.as_bytes());
            assert_eq!(enc.len() % 4, 0);
            let (dec, rc) = base64_decode(enc.as_bytes());
            assert_eq!(rc, Base64Outcome::Good);
            assert_eq!(dec, text.as_bytes());
        }
        assert_eq!(base64_encode(b"user:pass"), "dXNlcjpwYXNz");
    }

    #[test]
    fn base64_rejects_junk() {
        let (_, rc) = base64_decode(b"aGV!bG8=");
        assert_eq!(rc, Base64Outcome::Bad);
        let (_, rc) = base64_decode(b"aGVsbG8=extra");
        assert_eq!(rc, Base64Outcome::ExtraChars);
    }

    fn multipart_body(encoding: &str, content: &str) -> String {
        format!(
            "--bnd\r\n\
             Content-Disposition: form-data; name=\"up\"; filename=\"f.txt\"\r\n\
             Content-Transfer-Encoding: {encoding}\r\n\r\n\
             {content}\r\n\
             --bnd--\r\n"
        )
    }

    #[test]
    fn multipart_base64_sections_are_unpacked() {
        let body = multipart_body("base64", "aGVsbG8gd29ybGQ=");
        let out = unpack_uploaded_file(&body, "bnd").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Transfer-Encoding: 8bit"));
        assert!(text.contains("hello world"));
        assert!(!text.contains("aGVsbG8"));
        assert!(text.ends_with("--bnd--\r\n"));
    }

    #[test]
    fn malformed_multipart_tails_keep_multibyte_chars_whole() {
        // no \r\n before the final boundary, and a multibyte char sits
        // where the four-byte trailer would be cut
        let body = "--bnd\r\nContent-Transfer-Encoding: base64\r\n\r\né---bnd--";
        let out = unpack_uploaded_file(body, "bnd").unwrap();
        assert!(out.ends_with(b"--"));
    }

    #[test]
    fn bodies_without_base64_pass_through() {
        let body = multipart_body("8bit", "plain text here");
        assert_eq!(unpack_uploaded_file(&body, "bnd"), None);
    }

    #[test]
    fn classify_extracts_the_boundary() {
        let post = format!("`mfd~bnd\r\n{}", multipart_body("8bit", "x"));
        match classify_payload(&post) {
            Some(PostPayload::Multipart { boundary, .. }) => assert_eq!(boundary, "bnd"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multipart_content_type_carries_the_boundary() {
        let p = PostPayload::Multipart {
            boundary: "bnd".to_string(),
            body: Vec::new(),
        };
        assert_eq!(p.content_type(), "multipart/form-data; boundary=bnd");
    }
}
