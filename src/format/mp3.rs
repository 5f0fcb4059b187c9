//! MPEG audio frame header and ID3v2 tag handling.

use std::io::{self, Read};

pub const ID3_HEADER_LEN: usize = 10;

/// Sample rates indexed by `[sample_rate_index][version]`.
///
/// Version 0 is MPEG 2.5, 2 is MPEG 2, 3 is MPEG 1; version 1 and index 3
/// are reserved and map to 0.
const SAMPLE_RATES: [[u32; 4]; 4] = [
    [11025, 0, 22050, 44100],
    [12000, 0, 24000, 48000],
    [8000, 0, 16000, 32000],
    [0, 0, 0, 0],
];

const CHANNEL_MODE_MONO: u8 = 3;

/// Bit fields of a 32-bit MPEG audio frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sync: bool,
    pub version: u8,
    pub layer: u8,
    pub bitrate_index: u8,
    pub sample_rate_index: u8,
    pub padding: bool,
    pub channel_mode: u8,
}

impl FrameHeader {
    /// Decode four header bytes in network order.
    pub fn decode(bytes: [u8; 4]) -> Self {
        let h = u32::from_be_bytes(bytes);
        Self {
            sync: (h >> 21) & 0x7FF == 0x7FF,
            version: ((h >> 19) & 0x3) as u8,
            layer: ((h >> 17) & 0x3) as u8,
            bitrate_index: ((h >> 12) & 0xF) as u8,
            sample_rate_index: ((h >> 10) & 0x3) as u8,
            padding: (h >> 9) & 0x1 == 1,
            channel_mode: ((h >> 6) & 0x3) as u8,
        }
    }

    /// Sample rate in Hz, or `None` for reserved table entries.
    pub fn sample_rate(&self) -> Option<u32> {
        let rate = SAMPLE_RATES[usize::from(self.sample_rate_index)][usize::from(self.version)];
        (rate != 0).then_some(rate)
    }

    pub fn channels(&self) -> u16 {
        if self.channel_mode == CHANNEL_MODE_MONO {
            1
        } else {
            2
        }
    }
}

pub fn has_id3_marker(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ID3")
}

/// Tag length stored at offset 6 of the ID3v2 header.
///
/// Read as a plain big-endian integer. ID3v2 defines this field as synch-safe
/// (7 bits per byte), so tags whose size has any byte above 0x7F, or which are
/// large enough for the encodings to differ, are skipped by the wrong amount.
pub fn id3_tag_len(header: &[u8; ID3_HEADER_LEN]) -> u32 {
    u32::from_be_bytes([header[6], header[7], header[8], header[9]])
}

/// Discard exactly `len` bytes from `reader`.
pub fn skip<R: Read + ?Sized>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended after {skipped} of {len} tag bytes"),
        ));
    }
    Ok(())
}
