//! Fixed-prefix WAV header decoding.

/// Number of header bytes consumed before PCM data is streamed.
pub const WAV_HEADER_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// `RIFF` at offset 0 and `WAVE` at offset 8.
    pub has_riff_magic: bool,
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode the canonical 44-byte layout from its first 40 bytes.
///
/// Fields are taken at their canonical offsets whether or not the magic
/// matches, and are not range checked.
pub fn parse_header(header: &[u8; WAV_HEADER_LEN]) -> WavHeader {
    WavHeader {
        channels: read_u16_le(header, 22),
        sample_rate: read_u32_le(header, 24),
        bits_per_sample: read_u16_le(header, 34),
        has_riff_magic: &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE",
    }
}
