//! Plain passive-mode FTP over TCP. Just enough of the protocol to pull
//! one file or one directory listing per session; the transfer layer
//! decides which and reformats listings into HTML.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::process::Command;
use std::time::Duration;

use url::Url;

use crate::error::TransferError;

/// What came back for a path. `NotFound` lets the caller retry the same
/// path as a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FtpPayload {
    File(Vec<u8>),
    NotFound,
}

pub trait FtpTransport {
    fn retrieve(
        &mut self,
        url: &Url,
        user: &str,
        pass: &str,
    ) -> Result<FtpPayload, TransferError>;

    /// Raw line-oriented listing of the url's directory path.
    fn list(&mut self, url: &Url, user: &str, pass: &str) -> Result<String, TransferError>;
}

pub struct TcpFtp {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for TcpFtp {
    fn default() -> Self {
        TcpFtp {
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl FtpTransport for TcpFtp {
    fn retrieve(
        &mut self,
        url: &Url,
        user: &str,
        pass: &str,
    ) -> Result<FtpPayload, TransferError> {
        let mut session = self.open(url, user, pass)?;
        session.command("TYPE I")?;
        let data = session.passive_data()?;
        let (code, _) = session.command(&format!("RETR {}", url.path()))?;
        if code == 550 {
            return Ok(FtpPayload::NotFound);
        }
        if code >= 400 {
            return Err(TransferError::Receive);
        }
        let body = read_data(data)?;
        session.expect_complete()?;
        Ok(FtpPayload::File(body))
    }

    fn list(&mut self, url: &Url, user: &str, pass: &str) -> Result<String, TransferError> {
        let mut session = self.open(url, user, pass)?;
        let path = url.path().trim_end_matches('/');
        if !path.is_empty() {
            let (code, _) = session.command(&format!("CWD {path}"))?;
            if code >= 400 {
                return Err(TransferError::Receive);
            }
        }
        session.command("TYPE A")?;
        let data = session.passive_data()?;
        let (code, _) = session.command("LIST")?;
        if code >= 400 {
            return Err(TransferError::Receive);
        }
        let body = read_data(data)?;
        session.expect_complete()?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Default transport: plain ftp goes over our own TCP client, the ssh
/// file schemes (sftp/scp) and tftp are handed to the system curl,
/// which speaks them natively.
#[derive(Default)]
pub struct SystemFtp {
    tcp: TcpFtp,
}

impl FtpTransport for SystemFtp {
    fn retrieve(
        &mut self,
        url: &Url,
        user: &str,
        pass: &str,
    ) -> Result<FtpPayload, TransferError> {
        if url.scheme().eq_ignore_ascii_case("ftp") {
            return self.tcp.retrieve(url, user, pass);
        }
        curl_transfer(url.as_str(), url, user, pass)
    }

    fn list(&mut self, url: &Url, user: &str, pass: &str) -> Result<String, TransferError> {
        if url.scheme().eq_ignore_ascii_case("ftp") {
            return self.tcp.list(url, user, pass);
        }
        // curl lists a remote directory when the url ends in a slash
        let mut target = url.to_string();
        if !target.ends_with('/') {
            target.push('/');
        }
        match curl_transfer(&target, url, user, pass)? {
            FtpPayload::File(body) => Ok(String::from_utf8_lossy(&body).into_owned()),
            FtpPayload::NotFound => Err(TransferError::Receive),
        }
    }
}

fn curl_transfer(
    target: &str,
    url: &Url,
    user: &str,
    pass: &str,
) -> Result<FtpPayload, TransferError> {
    let host = url.host_str().unwrap_or_default();
    log::debug!("curl {target}");
    let out = Command::new("curl")
        .args(["--silent", "--globoff", "--user"])
        .arg(format!("{user}:{pass}"))
        .arg("--")
        .arg(target)
        .output()
        .map_err(|e| TransferError::Io(e.to_string()))?;
    match out.status.code() {
        Some(0) => Ok(FtpPayload::File(out.stdout)),
        // 9 and 78: the remote file or directory is not there
        Some(9) | Some(78) => Ok(FtpPayload::NotFound),
        Some(67) => Err(TransferError::AccessDenied),
        Some(6) => Err(TransferError::HostUnresolvable(host.to_string())),
        Some(7) => Err(TransferError::ConnectionRefused(host.to_string())),
        _ => Err(TransferError::Receive),
    }
}

impl TcpFtp {
    fn open(&self, url: &Url, user: &str, pass: &str) -> Result<Session, TransferError> {
        let host = url
            .host_str()
            .ok_or_else(|| TransferError::MalformedUrl(url.to_string()))?;
        let port = url.port().unwrap_or(21);
        let addr = resolve(host, port)?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(|_| TransferError::ConnectionRefused(host.to_string()))?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|_| TransferError::Receive)?;
        let mut session = Session {
            ctrl: BufReader::new(stream),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        };
        let (code, text) = session.reply()?;
        if code != 220 {
            log::debug!("ftp greeting {}", text.trim_end());
            return Err(TransferError::ConnectionRefused(host.to_string()));
        }
        session.login(user, pass)?;
        Ok(session)
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransferError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| TransferError::HostUnresolvable(host.to_string()))
}

struct Session {
    ctrl: BufReader<TcpStream>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Session {
    fn command(&mut self, cmd: &str) -> Result<(u16, String), TransferError> {
        log::debug!("ftp> {cmd}");
        self.ctrl
            .get_mut()
            .write_all(format!("{cmd}\r\n").as_bytes())
            .map_err(|_| TransferError::Send)?;
        self.reply()
    }

    fn reply(&mut self) -> Result<(u16, String), TransferError> {
        let r = read_reply(&mut self.ctrl)?;
        log::debug!("ftp< {}", r.1.trim_end());
        Ok(r)
    }

    fn login(&mut self, user: &str, pass: &str) -> Result<(), TransferError> {
        let (code, _) = self.command(&format!("USER {user}"))?;
        let code = if code == 331 {
            self.command(&format!("PASS {pass}"))?.0
        } else {
            code
        };
        if code >= 400 {
            return Err(TransferError::AccessDenied);
        }
        Ok(())
    }

    /// Enter passive mode and open the data connection it names.
    fn passive_data(&mut self) -> Result<TcpStream, TransferError> {
        let (code, text) = self.command("PASV")?;
        if code != 227 {
            return Err(TransferError::Receive);
        }
        let addr = parse_pasv(&text).ok_or(TransferError::Receive)?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(|_| TransferError::ConnectionRefused(addr.to_string()))?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|_| TransferError::Receive)?;
        Ok(stream)
    }

    /// Final reply after the data connection drains.
    fn expect_complete(&mut self) -> Result<(), TransferError> {
        let (code, _) = self.reply()?;
        if code >= 400 {
            return Err(TransferError::Receive);
        }
        Ok(())
    }
}

fn read_data(mut stream: TcpStream) -> Result<Vec<u8>, TransferError> {
    let mut body = Vec::new();
    stream
        .read_to_end(&mut body)
        .map_err(|_| TransferError::Receive)?;
    Ok(body)
}

/// A reply is one or more lines; the last starts with the three-digit
/// code and a space, intermediate lines use a dash.
fn read_reply<R: BufRead>(r: &mut R) -> Result<(u16, String), TransferError> {
    let mut text = String::new();
    loop {
        let mut line = String::new();
        let n = r.read_line(&mut line).map_err(|_| TransferError::Receive)?;
        if n == 0 {
            return Err(TransferError::Receive);
        }
        text.push_str(&line);
        let b = line.as_bytes();
        if b.len() >= 4 && b[..3].iter().all(u8::is_ascii_digit) && b[3] == b' ' {
            let code = line[..3].parse().unwrap_or(0);
            return Ok((code, text));
        }
    }
}

/// Crack `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
fn parse_pasv(text: &str) -> Option<SocketAddr> {
    let open = text.find('(')?;
    let close = text[open..].find(')')? + open;
    let mut nums = text[open + 1..close].split(',').map(|n| n.trim().parse::<u8>());
    let mut next = || nums.next().and_then(Result::ok);
    let (a, b, c, d) = (next()?, next()?, next()?, next()?);
    let (p1, p2) = (next()?, next()?);
    let port = u16::from(p1) * 256 + u16::from(p2);
    Some(SocketAddr::from(([a, b, c, d], port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn pasv_addresses_parse() {
        let addr = parse_pasv("227 Entering Passive Mode (192,168,1,2,4,1).").unwrap();
        assert_eq!(addr, SocketAddr::from(([192, 168, 1, 2], 1025)));
        assert_eq!(parse_pasv("227 nonsense"), None);
        assert_eq!(parse_pasv("227 (1,2,3)"), None);
    }

    #[test]
    fn multiline_replies_end_at_the_spaced_code() {
        let mut r = Cursor::new(b"220-welcome\r\n220-to the server\r\n220 ready\r\n".to_vec());
        let (code, text) = read_reply(&mut r).unwrap();
        assert_eq!(code, 220);
        assert!(text.contains("welcome"));
        assert!(text.ends_with("220 ready\r\n"));
    }

    #[test]
    fn truncated_replies_are_receive_errors() {
        let mut r = Cursor::new(b"220-never finished\r\n".to_vec());
        assert_eq!(read_reply(&mut r), Err(TransferError::Receive));
    }
}
