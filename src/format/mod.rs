//! Container sniffing: decide PCM or MP3 and pull channel count and rate
//! from the leading header bytes.

pub mod mp3;
pub mod wav;

use std::fmt;
use std::io::Read;

use crate::error::{PlayError, Result};

use mp3::{FrameHeader, ID3_HEADER_LEN};
use wav::WAV_HEADER_LEN;

const DEFAULT_CHANNELS: u16 = 2;
const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Undefined,
    Pcm,
    Mp3,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioFormat::Undefined => "undefined",
            AudioFormat::Pcm => "pcm",
            AudioFormat::Mp3 => "mp3",
        })
    }
}

/// Stream parameters handed to the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub format: AudioFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for AudioStreamInfo {
    fn default() -> Self {
        Self {
            format: AudioFormat::Undefined,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SniffOptions {
    /// Reject WAV input without `RIFF`/`WAVE` magic.
    pub strict_wav: bool,
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.len() > ext.len()
        && name
            .get(name.len() - ext.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
}

/// Consume the container header from `source` and describe the stream.
///
/// `name` is the file path or URL path; `hint` is the format announced by
/// the transport, if any. After a successful return the source is positioned
/// where streaming should start.
pub fn sniff<R: Read + ?Sized>(
    source: &mut R,
    name: &str,
    hint: Option<AudioFormat>,
    options: SniffOptions,
) -> Result<AudioStreamInfo> {
    let mut info = AudioStreamInfo::default();

    if has_extension(name, ".wav") {
        info.format = AudioFormat::Pcm;

        let mut header = [0u8; WAV_HEADER_LEN];
        source.read_exact(&mut header)?;
        let parsed = wav::parse_header(&header);
        if !parsed.has_riff_magic {
            if options.strict_wav {
                return Err(PlayError::Protocol(format!("{name} has no RIFF/WAVE header")));
            }
            log::debug!("{} lacks RIFF/WAVE magic, using header fields as-is", name);
        }
        if parsed.bits_per_sample != 16 {
            log::warn!(
                "{} declares {} bits per sample, output assumes 16",
                name,
                parsed.bits_per_sample
            );
        }
        info.channels = parsed.channels;
        info.sample_rate = parsed.sample_rate;
    } else if has_extension(name, ".mp3") || hint == Some(AudioFormat::Mp3) {
        info.format = AudioFormat::Mp3;

        let header = read_mp3_frame_header(source)?;
        if header.sync {
            log::debug!(
                "MP3 frame: version={} layer={} bitrate_index={} padding={} mode={}",
                header.version,
                header.layer,
                header.bitrate_index,
                header.padding,
                header.channel_mode
            );
            match header.sample_rate() {
                Some(rate) => info.sample_rate = rate,
                None => log::warn!(
                    "Reserved MP3 sample rate (version={}, index={}), assuming {} Hz",
                    header.version,
                    header.sample_rate_index,
                    info.sample_rate
                ),
            }
            info.channels = header.channels();
        } else {
            log::info!("No MP3 frame sync at stream start, using defaults");
        }
    }

    if info.format == AudioFormat::Undefined {
        return Err(PlayError::UnresolvedFormat(name.to_string()));
    }

    log::info!(
        "fmt={} ch={} freq={}",
        info.format,
        info.channels,
        info.sample_rate
    );
    Ok(info)
}

/// Read the first frame header, skipping a leading ID3v2 tag if present.
fn read_mp3_frame_header<R: Read + ?Sized>(source: &mut R) -> Result<FrameHeader> {
    let mut tag = [0u8; ID3_HEADER_LEN];
    source.read_exact(&mut tag[..4])?;

    if mp3::has_id3_marker(&tag) {
        source.read_exact(&mut tag[4..])?;
        let len = mp3::id3_tag_len(&tag);
        log::debug!("Skipping {} bytes of ID3 tag", len);
        mp3::skip(source, u64::from(len))?;
        source.read_exact(&mut tag[..4])?;
    }

    Ok(FrameHeader::decode([tag[0], tag[1], tag[2], tag[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn wav_bytes(channels: u16, rate: u32, magic: bool) -> Vec<u8> {
        let mut bytes = vec![0u8; WAV_HEADER_LEN];
        if magic {
            bytes[0..4].copy_from_slice(b"RIFF");
            bytes[8..12].copy_from_slice(b"WAVE");
        }
        bytes[22..24].copy_from_slice(&channels.to_le_bytes());
        bytes[24..28].copy_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes
    }

    #[test]
    fn wav_fields_override_defaults() {
        let mut source = Cursor::new(wav_bytes(1, 22050, true));
        let info = sniff(&mut source, "/mnt/sd0/voice.wav", None, SniffOptions::default()).unwrap();
        assert_eq!(
            info,
            AudioStreamInfo {
                format: AudioFormat::Pcm,
                channels: 1,
                sample_rate: 22050,
            }
        );
        // exactly the 40-byte prefix is consumed
        assert_eq!(source.position(), 40);
    }

    #[test]
    fn wav_stereo_44100() {
        let mut bytes = vec![0u8; WAV_HEADER_LEN];
        bytes[22..24].copy_from_slice(&[0x02, 0x00]);
        bytes[24..28].copy_from_slice(&[0x44, 0xAC, 0x00, 0x00]);
        let info = sniff(&mut Cursor::new(bytes), "a.wav", None, SniffOptions::default()).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 44100);
    }

    #[test]
    fn strict_wav_rejects_missing_magic() {
        let options = SniffOptions { strict_wav: true };
        let mut plain = Cursor::new(wav_bytes(2, 48000, false));
        assert!(matches!(
            sniff(&mut plain, "a.wav", None, options),
            Err(PlayError::Protocol(_))
        ));

        let mut riff = Cursor::new(wav_bytes(2, 48000, true));
        assert_eq!(sniff(&mut riff, "a.wav", None, options).unwrap().sample_rate, 48000);
    }

    #[test]
    fn truncated_wav_header_is_an_error() {
        let mut source = Cursor::new(vec![0u8; 20]);
        assert!(matches!(
            sniff(&mut source, "short.wav", None, SniffOptions::default()),
            Err(PlayError::Io(_))
        ));
    }

    #[test]
    fn mp3_frame_header_sets_rate_and_channels() {
        let mut source = Cursor::new(vec![0xFF, 0xF3, 0x46, 0xC4, 0x00]);
        let info = sniff(&mut source, "clip.MP3", None, SniffOptions::default()).unwrap();
        assert_eq!(
            info,
            AudioStreamInfo {
                format: AudioFormat::Mp3,
                channels: 1,
                sample_rate: 24000,
            }
        );
    }

    #[test]
    fn id3_tag_is_skipped_before_frame_header() {
        let mut bytes = b"ID3\x03\x00\x00".to_vec();
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x0A]);
        // tag body; a stray sync pattern here must not be read as the header
        bytes.extend_from_slice(&[0xFF, 0xF3, 0x46, 0xC4, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        bytes.extend_from_slice(b"audio");

        let mut source = Cursor::new(bytes);
        let info = sniff(&mut source, "tagged.mp3", None, SniffOptions::default()).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(source.position(), 24);
    }

    #[test]
    fn content_type_hint_selects_mp3() {
        let mut source = Cursor::new(vec![0xFF, 0xFB, 0x94, 0xC4]);
        let hint = Some(AudioFormat::Mp3);
        let info = sniff(&mut source, "/live", hint, SniffOptions::default()).unwrap();
        assert_eq!(info.format, AudioFormat::Mp3);
        assert_eq!(info.sample_rate, 48000);
        assert_eq!(info.channels, 1);
    }

    #[test]
    fn unsynced_mp3_keeps_defaults() {
        let mut source = Cursor::new(b"junkjunk".to_vec());
        let info = sniff(&mut source, "radio.mp3", None, SniffOptions::default()).unwrap();
        assert_eq!(
            info,
            AudioStreamInfo {
                format: AudioFormat::Mp3,
                ..AudioStreamInfo::default()
            }
        );
    }

    #[test]
    fn reserved_rate_falls_back_to_default() {
        let mut source = Cursor::new(vec![0xFF, 0xFB, 0x9C, 0xC4]);
        let info = sniff(&mut source, "odd.mp3", None, SniffOptions::default()).unwrap();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 1);
    }

    #[test]
    fn unknown_container_is_unresolved() {
        let mut source = Cursor::new(b"OggS....".to_vec());
        assert!(matches!(
            sniff(&mut source, "track.ogg", None, SniffOptions::default()),
            Err(PlayError::UnresolvedFormat(_))
        ));
        // nothing is consumed for unknown input
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn extension_match_needs_a_stem() {
        assert!(has_extension("a.wav", ".wav"));
        assert!(has_extension("A.WAV", ".wav"));
        assert!(!has_extension(".wav", ".wav"));
        assert!(!has_extension("a.wave", ".wav"));
    }
}
