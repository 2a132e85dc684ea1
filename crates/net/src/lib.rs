//! Blocking transfer layer: http/https with manual redirect control,
//! passive ftp with directory listings, background downloads, and the
//! content cache that backs HEAD probes.

pub mod cache;
pub mod date;
pub mod dirlist;
pub mod error;
pub mod ftp;
pub mod headers;
pub mod jobs;
pub mod plugin;
pub mod post;
pub mod transfer;

pub use cache::{ContentCache, MemoryCache, NoCache, Validators};
pub use date::parse_header_date;
pub use dirlist::listing_to_html;
pub use error::{TransferError, status_message};
pub use ftp::{FtpPayload, FtpTransport, SystemFtp, TcpFtp};
pub use headers::{ResponseMeta, find_header, header_param, parse_refresh, scan_headers};
pub use jobs::{BackgroundJobs, JobReport, JobState};
pub use plugin::{MimeHandler, PluginRegistry, expand_command};
pub use transfer::{
    DownloadChoice, FetchOutcome, FetchRequest, Prompter, SilentPrompter, Transfer,
    TransferState,
};

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgressMode {
    Quiet,
    #[default]
    Dots,
}

/// One proxy rule; empty protocol or domain matches everything.
#[derive(Clone, Debug)]
pub struct ProxyRule {
    pub protocol: String,
    /// Matched against the end of the host name.
    pub domain: String,
    /// Proxy url, or "direct" to bypass any later rule.
    pub proxy: String,
}

#[derive(Clone, Debug)]
pub struct NetConfig {
    pub user_agent: String,
    pub accept_language: Option<String>,
    pub connect_timeout: Duration,
    pub send_referrer: bool,
    pub allow_redirection: bool,
    pub plugins_on: bool,
    /// First matching rule wins.
    pub proxy_rules: Vec<ProxyRule>,
    /// Host suffixes whose certificates are accepted unverified.
    pub no_verify_hosts: Vec<String>,
    pub progress: ProgressMode,
    /// Bytes per progress chunk.
    pub chunk_size: usize,
    pub download_dir: PathBuf,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            user_agent: "edbrowse-rs/0.1".to_string(),
            accept_language: None,
            connect_timeout: Duration::from_secs(20),
            send_referrer: true,
            allow_redirection: true,
            plugins_on: true,
            proxy_rules: Vec::new(),
            no_verify_hosts: Vec::new(),
            progress: ProgressMode::Dots,
            chunk_size: 1_000_000,
            download_dir: PathBuf::from("."),
        }
    }
}

impl NetConfig {
    /// Proxy for a scheme and host, if any rule claims it.
    pub fn find_proxy(&self, protocol: &str, host: &str) -> Option<&str> {
        for rule in &self.proxy_rules {
            if !rule.protocol.is_empty() && !rule.protocol.eq_ignore_ascii_case(protocol) {
                continue;
            }
            if !rule.domain.is_empty() && !host_matches(host, &rule.domain) {
                continue;
            }
            if rule.proxy.is_empty() || rule.proxy.eq_ignore_ascii_case("direct") {
                return None;
            }
            return Some(&rule.proxy);
        }
        None
    }

    pub fn host_no_verify(&self, host: &str) -> bool {
        self.no_verify_hosts.iter().any(|s| host_matches(host, s))
    }
}

/// Suffix match on domain boundaries: `example.com` claims itself and
/// `www.example.com`, never `badexample.com`.
fn host_matches(host: &str, suffix: &str) -> bool {
    if host.eq_ignore_ascii_case(suffix) {
        return true;
    }
    host.len() > suffix.len()
        && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
        && host[host.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
