//! Wires one playback run together: open, sniff, configure the output, pump.

use crate::audio::{self, AlsaSink, AudioSink, Framing, PumpOptions, PumpReport, WriterSink};
use crate::cancel::CancellationToken;
use crate::config::{Config, OutputTarget};
use crate::error::{PlayError, Result};
use crate::format::{self, SniffOptions};
use crate::source;

fn open_sink(target: &OutputTarget) -> Result<Box<dyn AudioSink>> {
    Ok(match target {
        OutputTarget::Alsa(device) => Box::new(AlsaSink::new(device.clone())),
        OutputTarget::File(path) => Box::new(WriterSink::create(path, Framing::Raw)?),
        OutputTarget::Framed(path) => Box::new(WriterSink::create(path, Framing::LengthPrefixed)?),
    })
}

/// Play `input` to the configured output until it ends or `token` is raised.
///
/// Runs entirely on the calling thread with blocking I/O.
pub fn play(input: &str, config: &Config, token: &CancellationToken) -> Result<PumpReport> {
    if config.chunk_size == 0 {
        return Err(PlayError::Argument("chunk size must be positive".to_string()));
    }

    let (mut source, hint) = source::open(input, config)?;

    let info = format::sniff(
        &mut source,
        &source::name_hint(input),
        hint,
        SniffOptions {
            strict_wav: config.strict_wav,
        },
    )?;

    let mut sink = open_sink(&config.output)?;
    sink.configure(&info, config.buffer_threshold_percent)?;

    audio::pump::run(
        source,
        sink,
        PumpOptions {
            chunk_size: config.chunk_size,
            flush_partial: config.flush_partial,
        },
        token,
    )
}
