//! Mime handlers. A handler claims content by file suffix, protocol,
//! content type, or a substring of the url, and carries the command line
//! of the external program that plays or converts it.

/// One configured handler. The match fields are comma lists
/// (`mp3,wav,ogg`), except `url_match` which is `|` separated.
#[derive(Clone, Debug, Default)]
pub struct MimeHandler {
    pub suffixes: String,
    pub protocols: String,
    pub content_types: String,
    pub url_match: String,
    /// Command template; `%i` expands to the input file or url,
    /// `%o` to the output file.
    pub program: String,
    /// Stream consumers take over the transfer entirely, the url is
    /// handed to the program and nothing is fetched here.
    pub stream: bool,
    /// Download first, then run the program on the saved file.
    pub download: bool,
}

fn in_comma_list(list: &str, item: &str) -> bool {
    !item.is_empty()
        && list
            .split(',')
            .any(|entry| entry.trim().eq_ignore_ascii_case(item))
}

/// The url's file suffix, stopping at a query string or payload marker.
fn url_suffix(url: &str) -> Option<&str> {
    let end = url.find(['?', '\u{1}']).unwrap_or(url.len());
    let path = &url[..end];
    let dot = path.rfind('.')?;
    if path[dot..].contains('/') {
        return None;
    }
    let suffix = &path[dot + 1..];
    (!suffix.is_empty() && suffix.len() < 12).then_some(suffix)
}

#[derive(Clone, Debug, Default)]
pub struct PluginRegistry {
    handlers: Vec<MimeHandler>,
}

impl PluginRegistry {
    pub fn new(handlers: Vec<MimeHandler>) -> Self {
        PluginRegistry { handlers }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn by_suffix(&self, suffix: &str) -> Option<&MimeHandler> {
        self.handlers
            .iter()
            .find(|m| in_comma_list(&m.suffixes, suffix))
    }

    pub fn by_protocol(&self, prot: &str) -> Option<&MimeHandler> {
        self.handlers
            .iter()
            .find(|m| in_comma_list(&m.protocols, prot))
    }

    pub fn by_content_type(&self, content: &str) -> Option<&MimeHandler> {
        self.handlers
            .iter()
            .find(|m| in_comma_list(&m.content_types, content))
    }

    /// Match by the url's suffix first, then by url substring patterns.
    pub fn by_url(&self, url: &str) -> Option<&MimeHandler> {
        if let Some(suffix) = url_suffix(url) {
            if let Some(m) = self.by_suffix(suffix) {
                return Some(m);
            }
        }
        let lower = url.to_ascii_lowercase();
        self.handlers.iter().find(|m| {
            m.url_match
                .split('|')
                .any(|pat| !pat.is_empty() && lower.contains(&pat.to_ascii_lowercase()))
        })
    }
}

fn shell_protect(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
}

/// Expand a handler's command template for the given input and output.
pub fn expand_command(handler: &MimeHandler, infile: &str, outfile: &str) -> String {
    let mut cmd = String::with_capacity(handler.program.len() + infile.len() + outfile.len());
    let mut chars = handler.program.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('i') => {
                    chars.next();
                    shell_protect(&mut cmd, infile);
                    continue;
                }
                Some('o') => {
                    chars.next();
                    shell_protect(&mut cmd, outfile);
                    continue;
                }
                _ => {}
            }
        }
        cmd.push(c);
    }
    log::debug!("plugin {cmd}");
    cmd
}
