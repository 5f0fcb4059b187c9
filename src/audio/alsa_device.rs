//! ALSA PCM playback device and the sink built on it.

use std::io;

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::sink::AudioSink;
use crate::error::PlayError;
use crate::format::{AudioFormat, AudioStreamInfo};

/// Consecutive failed writes tolerated before a chunk is given up.
const MAX_WRITE_RETRIES: u32 = 3;

/// Bytes per sample for S16LE.
const SAMPLE_BYTES: usize = 2;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
    /// Ring buffer size in frames
    pub buffer_size: usize,
}

/// Open a PCM device for interleaved S16LE playback.
///
/// Playback starts once `threshold_percent` of the ring buffer is filled.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    channels: u32,
    threshold_percent: u8,
) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Playback, false)
        .with_context(|| format!("Failed to open PCM device '{}' for Playback", device))?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(channels)
            .with_context(|| format!("Device '{}' rejects {} channels", device, channels))?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, period_size, buffer_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        let bs = hwp.get_buffer_size()? as usize;
        (rate, ch, ps, bs)
    };

    {
        let swp = pcm.sw_params_current()?;
        let threshold = buffer_size * usize::from(threshold_percent.min(100)) / 100;
        swp.set_start_threshold(threshold.max(1) as alsa::pcm::Frames)?;
        pcm.sw_params(&swp)?;
    }

    if actual_rate != sample_rate {
        log::warn!(
            "ALSA Playback: requested {} Hz, device runs at {} Hz",
            sample_rate,
            actual_rate
        );
    }

    let params = AlsaParams {
        sample_rate: actual_rate,
        channels: actual_channels,
        period_size,
        buffer_size,
    };

    log::info!(
        "ALSA Playback: device={}, rate={}, channels={}, period_size={}, buffer_size={}, start_threshold={}%",
        device,
        actual_rate,
        actual_channels,
        period_size,
        buffer_size,
        threshold_percent,
    );

    Ok((pcm, params))
}

/// PCM playback through ALSA. MP3 streams need a passthrough sink instead.
pub struct AlsaSink {
    device: String,
    pcm: Option<PCM>,
    frame_bytes: usize,
    /// Bytes left over from the previous chunk that do not fill a whole frame.
    pending: Vec<u8>,
}

impl AlsaSink {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            pcm: None,
            frame_bytes: 0,
            pending: Vec::new(),
        }
    }
}

fn not_configured() -> PlayError {
    PlayError::Sink(anyhow::anyhow!("ALSA sink used before configure"))
}

/// Write whole frames, recovering from underruns like the record/play loops do.
fn write_frames(pcm: &PCM, data: &[u8], frame_bytes: usize) -> crate::error::Result<()> {
    let pcm_io = pcm.io_bytes();
    let total_frames = data.len() / frame_bytes;
    let mut frames_written = 0;
    let mut retry_count = 0u32;

    while frames_written < total_frames {
        let offset = frames_written * frame_bytes;
        match pcm_io.writei(&data[offset..total_frames * frame_bytes]) {
            Ok(n) => {
                frames_written += n;
                retry_count = 0;
            }
            Err(e) => {
                log::warn!("ALSA XRUN or error: {}, recovering...", e);
                retry_count += 1;

                if let Err(e2) = pcm.prepare() {
                    log::error!("Failed to recover PCM playback: {}", e2);
                    return Err(PlayError::Write(io::Error::other(e2)));
                }

                if retry_count >= MAX_WRITE_RETRIES {
                    log::error!(
                        "Max recovery retries ({}) reached with {} frames unwritten",
                        retry_count,
                        total_frames - frames_written
                    );
                    return Err(PlayError::Write(io::Error::other(e)));
                }
            }
        }
    }
    Ok(())
}

impl AudioSink for AlsaSink {
    fn configure(
        &mut self,
        info: &AudioStreamInfo,
        threshold_percent: u8,
    ) -> crate::error::Result<()> {
        if info.format != AudioFormat::Pcm {
            return Err(PlayError::Sink(anyhow::anyhow!(
                "ALSA output plays PCM only; use a file: or framed: output for {}",
                info.format
            )));
        }

        let (pcm, params) = open_playback(
            &self.device,
            info.sample_rate,
            u32::from(info.channels),
            threshold_percent,
        )
        .map_err(PlayError::Sink)?;

        log::debug!(
            "ALSA sink ready: {} Hz, {} frames/period, {} frame ring",
            params.sample_rate,
            params.period_size,
            params.buffer_size
        );
        self.frame_bytes = SAMPLE_BYTES * params.channels as usize;
        self.pcm = Some(pcm);
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> crate::error::Result<()> {
        let pcm = self.pcm.as_ref().ok_or_else(not_configured)?;

        if self.pending.is_empty() && chunk.len() % self.frame_bytes == 0 {
            return write_frames(pcm, chunk, self.frame_bytes);
        }

        self.pending.extend_from_slice(chunk);
        let whole = self.pending.len() / self.frame_bytes * self.frame_bytes;
        write_frames(pcm, &self.pending[..whole], self.frame_bytes)?;
        self.pending.drain(..whole);
        Ok(())
    }

    fn finish(&mut self) -> crate::error::Result<()> {
        let pcm = self.pcm.as_ref().ok_or_else(not_configured)?;
        if !self.pending.is_empty() {
            log::debug!("Dropping {} bytes short of a frame", self.pending.len());
        }
        pcm.drain()
            .context("Failed to drain PCM playback")
            .map_err(PlayError::Sink)
    }
}
