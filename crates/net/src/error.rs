//! The closed set of user-facing transport failures. HTTP status codes
//! outside 2xx are not failures; the page the server sent back is still a
//! page.

use std::error::Error as _;
use std::fmt;
use std::io;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferError {
    UnsupportedProtocol(String),
    MalformedUrl(String),
    HostUnresolvable(String),
    AccessDenied,
    TooManyRedirects,
    Timeout,
    Certificate(String),
    ConnectionRefused(String),
    Send,
    Receive,
    Interrupted,
    UserAborted,
    CredentialsTooLong(usize),
    Io(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::UnsupportedProtocol(p) => {
                write!(f, "the web protocol {p} is not supported")
            }
            TransferError::MalformedUrl(u) => write!(f, "cannot identify {u} as a url"),
            TransferError::HostUnresolvable(h) => write!(f, "cannot identify {h} on the network"),
            TransferError::AccessDenied => write!(f, "access to the remote resource was denied"),
            TransferError::TooManyRedirects => write!(f, "too many redirections"),
            TransferError::Timeout => write!(f, "the operation timed out"),
            TransferError::Certificate(h) => {
                write!(f, "cannot verify the certificate from {h}")
            }
            TransferError::ConnectionRefused(h) => write!(f, "cannot connect to {h}"),
            TransferError::Send => write!(f, "cannot send data to the server"),
            TransferError::Receive => write!(f, "error reading data from the server"),
            TransferError::Interrupted => write!(f, "transfer interrupted"),
            TransferError::UserAborted => write!(f, "aborted at your request"),
            TransferError::CredentialsTooLong(max) => {
                write!(f, "username or password longer than {max} characters")
            }
            TransferError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TransferError {}

impl TransferError {
    /// Fold a transport-layer error into the closed set, given the host we
    /// were talking to.
    pub fn from_ureq(e: ureq::Error, host: &str) -> Self {
        match e {
            ureq::Error::Status(_, _) => {
                // status errors are handled as data before we get here
                TransferError::Receive
            }
            ureq::Error::Transport(t) => {
                use ureq::ErrorKind;
                match t.kind() {
                    ErrorKind::UnknownScheme => {
                        TransferError::UnsupportedProtocol(t.to_string())
                    }
                    ErrorKind::InvalidUrl => TransferError::MalformedUrl(t.to_string()),
                    ErrorKind::Dns => TransferError::HostUnresolvable(host.to_string()),
                    ErrorKind::ConnectionFailed => {
                        TransferError::ConnectionRefused(host.to_string())
                    }
                    ErrorKind::TooManyRedirects => TransferError::TooManyRedirects,
                    ErrorKind::Io => match t.source().map(io_kind_of) {
                        Some(io::ErrorKind::TimedOut) | Some(io::ErrorKind::WouldBlock) => {
                            TransferError::Timeout
                        }
                        Some(io::ErrorKind::ConnectionRefused) => {
                            TransferError::ConnectionRefused(host.to_string())
                        }
                        Some(io::ErrorKind::Interrupted) => TransferError::Interrupted,
                        _ => TransferError::Receive,
                    },
                    ErrorKind::InvalidProxyUrl | ErrorKind::ProxyConnect => {
                        TransferError::ConnectionRefused(host.to_string())
                    }
                    _ => {
                        if t.to_string().contains("certificate") {
                            TransferError::Certificate(host.to_string())
                        } else {
                            TransferError::Receive
                        }
                    }
                }
            }
        }
    }
}

fn io_kind_of(e: &(dyn std::error::Error + 'static)) -> io::ErrorKind {
    e.downcast_ref::<io::Error>()
        .map(|e| e.kind())
        .unwrap_or(io::ErrorKind::Other)
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransferError::Timeout,
            io::ErrorKind::ConnectionRefused => {
                TransferError::ConnectionRefused(String::new())
            }
            io::ErrorKind::Interrupted => TransferError::Interrupted,
            _ => TransferError::Io(e.to_string()),
        }
    }
}

const RESPONSES_1XX: &[&str] = &["Continue", "Switching Protocols"];

const RESPONSES_2XX: &[&str] = &[
    "OK",
    "Created",
    "Accepted",
    "Non-Authoritative Information",
    "No Content",
    "Reset Content",
    "Partial Content",
];

const RESPONSES_3XX: &[&str] = &[
    "Multiple Choices",
    "Moved Permanently",
    "Found",
    "See Other",
    "Not Modified",
    "Use Proxy",
    "(Unused)",
    "Temporary Redirect",
];

const RESPONSES_4XX: &[&str] = &[
    "Bad Request",
    "Unauthorized",
    "Payment Required",
    "Forbidden",
    "Not Found",
    "Method Not Allowed",
    "Not Acceptable",
    "Proxy Authentication Required",
    "Request Timeout",
    "Conflict",
    "Gone",
    "Length Required",
    "Precondition Failed",
    "Request Entity Too Large",
    "Request-URI Too Long",
    "Unsupported Media Type",
    "Requested Range Not Satisfiable",
    "Expectation Failed",
];

const RESPONSES_5XX: &[&str] = &[
    "Internal Server Error",
    "Not Implemented",
    "Bad Gateway",
    "Service Unavailable",
    "Gateway Timeout",
    "HTTP Version Not Supported",
];

const UNKNOWN_RESPONSE: &str = "Unknown response when accessing webpage.";

/// Human text for an HTTP status code, for announcing codes outside
/// 200/201 while browsing proceeds with whatever body came back.
pub fn status_message(code: u16) -> &'static str {
    let table: &[&str] = match code / 100 {
        1 => RESPONSES_1XX,
        2 => RESPONSES_2XX,
        3 => RESPONSES_3XX,
        4 => RESPONSES_4XX,
        5 => RESPONSES_5XX,
        _ => return UNKNOWN_RESPONSE,
    };
    table.get((code % 100) as usize).copied().unwrap_or(UNKNOWN_RESPONSE)
}
