//! Bare HTTP/1.0 GET client used to open network streams.
//!
//! Only what playback needs: connect with a timeout, send the request line,
//! check for a 200 status and scan the headers for an MPEG content type. The
//! socket is handed back positioned at the first body byte.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Instant;

use url::{Host, Url};

use crate::config::Config;
use crate::error::{PlayError, Result};
use crate::format::AudioFormat;

/// Length of the fixed status-line prefix, e.g. `HTTP/1.1 200`.
const STATUS_PREFIX_LEN: usize = 12;
/// Offset of the three status digits within that prefix.
const STATUS_CODE_OFFSET: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    pub host: String,
    pub port: u16,
    /// Request path including any query string.
    pub path: String,
}

pub fn is_http(input: &str) -> bool {
    input
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"))
}

pub fn parse_url(input: &str, default_port: u16) -> Result<HttpTarget> {
    let url = Url::parse(input).map_err(|e| PlayError::Url {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" {
        return Err(PlayError::Url {
            url: input.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    // IPv6 literals lose their brackets so they resolve as plain addresses
    let host = match url.host() {
        Some(Host::Domain(name)) if !name.is_empty() => name.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => {
            return Err(PlayError::Url {
                url: input.to_string(),
                reason: "missing host".to_string(),
            });
        }
    };

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    // `Url::port` also hides an explicit `:80`, so look at the authority text
    let port = match url.port() {
        Some(port) => port,
        None if has_explicit_port(input) => url.port_or_known_default().unwrap_or(default_port),
        None => default_port,
    };

    Ok(HttpTarget { host, port, path })
}

/// Whether the authority of `input` carries a non-empty `:port`.
fn has_explicit_port(input: &str) -> bool {
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host
        .split_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

fn resolve(target: &HttpTarget) -> Result<SocketAddr> {
    let mut addrs = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| PlayError::Resolve {
            host: target.host.clone(),
            source: Some(e),
        })?;
    addrs.next().ok_or_else(|| PlayError::Resolve {
        host: target.host.clone(),
        source: None,
    })
}

/// Connect to `input`, issue the GET and consume the response head.
///
/// Returns the connected stream and an MP3 hint when the server announced
/// `audio/mpeg`.
pub fn fetch(input: &str, config: &Config) -> Result<(TcpStream, Option<AudioFormat>)> {
    let target = parse_url(input, config.default_port)?;
    let addr = resolve(&target)?;

    log::info!("Connecting to {} ({})", target.host, addr);
    let started = Instant::now();

    let connected = if config.connect_timeout.is_zero() {
        TcpStream::connect(addr)
    } else {
        TcpStream::connect_timeout(&addr, config.connect_timeout)
    };
    let mut stream = connected.map_err(|e| PlayError::Connect {
        addr: addr.to_string(),
        source: e,
    })?;

    log::info!(
        "Connection established in {} ms",
        started.elapsed().as_millis()
    );

    // Steady state blocks without a deadline
    stream.set_read_timeout(None)?;
    stream.set_write_timeout(None)?;

    let request = format!("GET {} HTTP/1.0\r\n\r\n", target.path);
    stream.write_all(request.as_bytes())?;

    // Grace period for the response to start arriving
    if !config.response_grace.is_zero() {
        thread::sleep(config.response_grace);
    }

    let status = read_status(&mut stream)?;
    log::info!("Response status {}", status);
    if status != 200 {
        return Err(PlayError::Status(status));
    }

    let hint = scan_headers(&mut stream, config.header_limit)?;
    Ok((stream, hint))
}

/// Read the fixed 12-byte status prefix and return the numeric code.
pub fn read_status<R: Read>(reader: &mut R) -> Result<u16> {
    let mut prefix = [0u8; STATUS_PREFIX_LEN];
    reader.read_exact(&mut prefix).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PlayError::Protocol("truncated status line".to_string()),
        _ => PlayError::Io(e),
    })?;

    if !prefix.starts_with(b"HTTP/") {
        return Err(PlayError::Protocol(format!(
            "unexpected status line {:?}",
            String::from_utf8_lossy(&prefix)
        )));
    }

    let digits = &prefix[STATUS_CODE_OFFSET..];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(PlayError::Protocol(format!(
            "non-numeric status {:?}",
            String::from_utf8_lossy(digits)
        )));
    }

    Ok(digits
        .iter()
        .fold(0u16, |code, d| code * 10 + u16::from(d - b'0')))
}

/// Consume header bytes one at a time up to and including the blank line.
///
/// Reading byte by byte keeps the body untouched in the socket. Each line
/// may hold at most `line_limit` bytes; a longer one is reported as
/// [`PlayError::HeaderOverflow`].
pub fn scan_headers<R: Read>(reader: &mut R, line_limit: usize) -> Result<Option<AudioFormat>> {
    let mut hint = None;
    let mut line: Vec<u8> = Vec::with_capacity(line_limit);
    // The first line is the tail of the status line, so an empty one is not the terminator
    let mut completed_lines = 0usize;
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(PlayError::Protocol(
                    "connection closed before end of headers".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        if byte[0] == b'\n' && line.last() == Some(&b'\r') {
            line.pop();
            if line.is_empty() && completed_lines > 0 {
                return Ok(hint);
            }

            let text = String::from_utf8_lossy(&line);
            log::debug!("resphdr: {}", text);
            if is_mpeg_content_type(&text) {
                log::info!("Server announced audio/mpeg");
                hint = Some(AudioFormat::Mp3);
            }

            line.clear();
            completed_lines += 1;
            continue;
        }

        if line.len() >= line_limit {
            return Err(PlayError::HeaderOverflow { limit: line_limit });
        }
        line.push(byte[0]);
    }
}

fn is_mpeg_content_type(line: &str) -> bool {
    match line.split_once(':') {
        Some((name, value)) => {
            name.trim().eq_ignore_ascii_case("content-type")
                && value.to_ascii_lowercase().contains("audio/mpeg")
        }
        None => false,
    }
}
