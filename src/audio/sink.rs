//! Output sinks: the destination of every transfer chunk.

use std::fs::{File, OpenOptions};
use std::io::Write;

use crate::error::{PlayError, Result};
use crate::format::AudioStreamInfo;

/// A blocking audio output.
///
/// `configure` is called once before the first chunk. `write_chunk` must
/// either consume the whole chunk or return an error.
pub trait AudioSink {
    fn configure(&mut self, info: &AudioStreamInfo, threshold_percent: u8) -> Result<()>;

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Called once after the last chunk on a normal end of stream.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn configure(&mut self, info: &AudioStreamInfo, threshold_percent: u8) -> Result<()> {
        (**self).configure(info, threshold_percent)
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        (**self).write_chunk(chunk)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Chunk bytes only.
    Raw,
    /// `declared_len: u32 LE`, `max_len: u32 LE`, then the chunk bytes, in one write.
    LengthPrefixed,
}

/// Sink writing chunks to any `Write`, e.g. a dump file or a character device.
pub struct WriterSink<W: Write> {
    writer: W,
    framing: Framing,
    frame: Vec<u8>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, framing: Framing) -> Self {
        Self {
            writer,
            framing,
            frame: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<File> {
    /// Open `path` for writing, creating and truncating regular files.
    pub fn create(path: &str, framing: Framing) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| PlayError::Open {
                path: path.to_string(),
                source: e,
            })?;
        Ok(Self::new(file, framing))
    }
}

impl<W: Write> AudioSink for WriterSink<W> {
    fn configure(&mut self, info: &AudioStreamInfo, threshold_percent: u8) -> Result<()> {
        log::info!(
            "Writer output: fmt={} ch={} freq={} threshold={}% framing={:?}",
            info.format,
            info.channels,
            info.sample_rate,
            threshold_percent,
            self.framing
        );
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match self.framing {
            Framing::Raw => self.writer.write_all(chunk).map_err(PlayError::Write),
            Framing::LengthPrefixed => {
                let len = u32::try_from(chunk.len()).map_err(|_| {
                    PlayError::Write(std::io::Error::other("chunk larger than u32::MAX"))
                })?;
                self.frame.clear();
                self.frame.extend_from_slice(&len.to_le_bytes());
                self.frame.extend_from_slice(&len.to_le_bytes());
                self.frame.extend_from_slice(chunk);
                self.writer.write_all(&self.frame).map_err(PlayError::Write)
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(PlayError::Write)
    }
}
