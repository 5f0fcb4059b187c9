//! Byte sources: local files and HTTP/1.0 streams.

pub mod http;

use std::fs::File;
use std::io::{self, Read};
use std::net::TcpStream;

use url::Url;

use crate::config::Config;
use crate::error::{PlayError, Result};
use crate::format::AudioFormat;

/// An opened input stream. Dropping it closes the file or socket.
#[derive(Debug)]
pub enum ByteSource {
    File(File),
    Http(TcpStream),
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ByteSource::File(f) => f.read(buf),
            ByteSource::Http(s) => s.read(buf),
        }
    }
}

/// Open `input` as an `http://` stream or, failing the scheme check, a local file.
///
/// The second value is a format hint taken from the response headers; local
/// files never carry one.
pub fn open(input: &str, config: &Config) -> Result<(ByteSource, Option<AudioFormat>)> {
    if !http::is_http(input) {
        let file = File::open(input).map_err(|e| PlayError::Open {
            path: input.to_string(),
            source: e,
        })?;
        return Ok((ByteSource::File(file), None));
    }

    let (stream, hint) = http::fetch(input, config)?;
    Ok((ByteSource::Http(stream), hint))
}

/// Name used for extension-based sniffing: the URL path for streams, the
/// input itself for files.
pub fn name_hint(input: &str) -> String {
    if http::is_http(input) {
        if let Ok(url) = Url::parse(input) {
            return url.path().to_string();
        }
    }
    input.to_string()
}
