//! The steady-state transfer loop: fill one chunk from the source, hand it
//! to the sink, repeat until end of stream or a stop request.

use std::io::{self, ErrorKind, Read};

use super::sink::AudioSink;
use crate::cancel::CancellationToken;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct PumpOptions {
    /// Transfer buffer capacity in bytes.
    pub chunk_size: usize,
    /// Write a short final chunk instead of dropping it.
    pub flush_partial: bool,
}

#[derive(Debug)]
pub enum StreamEnd {
    Eof,
    Cancelled,
    /// The source failed mid-stream; playback ends as it would at EOF.
    ReadError(io::Error),
}

#[derive(Debug)]
pub struct PumpReport {
    pub chunks: u64,
    pub bytes: u64,
    /// Trailing bytes read but never written.
    pub discarded: usize,
    pub end: StreamEnd,
}

/// Fill `buf` from `source`. Returns the byte count and, if the buffer could
/// not be filled, why the stream stopped.
fn fill<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> (usize, Option<StreamEnd>) {
    let mut total = 0;
    while total < buf.len() {
        match source.read(&mut buf[total..]) {
            Ok(0) => return (total, Some(StreamEnd::Eof)),
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return (total, Some(StreamEnd::ReadError(e))),
        }
    }
    (total, None)
}

/// Pump `source` into `sink` one `chunk_size` chunk at a time.
///
/// `token` is checked once per chunk, before reading. Source and sink are
/// dropped before this returns on every path; the sink is only finished
/// (drained) when the stream ended by itself.
pub fn run<R, S>(
    mut source: R,
    mut sink: S,
    options: PumpOptions,
    token: &CancellationToken,
) -> Result<PumpReport>
where
    R: Read,
    S: AudioSink,
{
    let mut buf = vec![0u8; options.chunk_size];
    let mut report = PumpReport {
        chunks: 0,
        bytes: 0,
        discarded: 0,
        end: StreamEnd::Eof,
    };

    log::info!("Streaming in {} byte chunks", options.chunk_size);

    loop {
        if token.is_cancelled() {
            report.end = StreamEnd::Cancelled;
            break;
        }

        let (filled, stopped) = fill(&mut source, &mut buf);

        if let Some(end) = stopped {
            if let StreamEnd::ReadError(e) = &end {
                log::warn!("read() failed after {} bytes: {}", report.bytes + filled as u64, e);
            }
            if filled > 0 {
                if options.flush_partial {
                    sink.write_chunk(&buf[..filled])?;
                    report.chunks += 1;
                    report.bytes += filled as u64;
                } else {
                    log::warn!("Discarding {} trailing bytes short of a chunk", filled);
                    report.discarded = filled;
                }
            }
            report.end = end;
            break;
        }

        sink.write_chunk(&buf)?;
        report.chunks += 1;
        report.bytes += buf.len() as u64;
    }

    if !matches!(report.end, StreamEnd::Cancelled) {
        sink.finish()?;
    }

    log::info!(
        "Playback stopped: {:?}, {} chunks, {} bytes, {} discarded",
        report.end,
        report.chunks,
        report.bytes,
        report.discarded
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlayError;
    use crate::format::AudioStreamInfo;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Records every chunk; shared so the test can inspect it after `run` drops the sink.
    #[derive(Clone, Default)]
    struct RecordingSink {
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
        finished: Arc<Mutex<bool>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl AudioSink for RecordingSink {
        fn configure(&mut self, _info: &AudioStreamInfo, _threshold_percent: u8) -> Result<()> {
            Ok(())
        }

        fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
            let mut chunks = self.chunks.lock().unwrap();
            chunks.push(chunk.to_vec());
            if let Some((n, token)) = &self.cancel_after {
                if chunks.len() == *n {
                    token.cancel();
                }
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            *self.finished.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Hands out data in small uneven pieces, then optionally fails.
    struct Dribble {
        data: Cursor<Vec<u8>>,
        step: usize,
        fail_at_end: bool,
    }

    impl Read for Dribble {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step);
            let read = self.data.read(&mut buf[..n])?;
            if read == 0 && self.fail_at_end {
                return Err(io::Error::new(ErrorKind::ConnectionReset, "peer reset"));
            }
            Ok(read)
        }
    }

    fn options(flush_partial: bool) -> PumpOptions {
        PumpOptions {
            chunk_size: 1024,
            flush_partial,
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn trailing_partial_chunk_is_discarded() {
        let data = pattern(3 * 1024 + 100);
        let sink = RecordingSink::default();
        let report = run(
            Cursor::new(data.clone()),
            sink.clone(),
            options(false),
            &CancellationToken::new(),
        )
        .unwrap();

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1024));
        assert_eq!(chunks.concat(), &data[..3 * 1024]);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.bytes, 3 * 1024);
        assert_eq!(report.discarded, 100);
        assert!(matches!(report.end, StreamEnd::Eof));
        assert!(*sink.finished.lock().unwrap());
    }

    #[test]
    fn trailing_partial_chunk_can_be_flushed() {
        let data = pattern(2 * 1024 + 7);
        let sink = RecordingSink::default();
        let report = run(
            Cursor::new(data.clone()),
            sink.clone(),
            options(true),
            &CancellationToken::new(),
        )
        .unwrap();

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 7);
        assert_eq!(chunks.concat(), data);
        assert_eq!(report.discarded, 0);
    }

    #[test]
    fn short_reads_are_accumulated_into_full_chunks() {
        let data = pattern(2048);
        let source = Dribble {
            data: Cursor::new(data.clone()),
            step: 100,
            fail_at_end: false,
        };
        let sink = RecordingSink::default();
        run(source, sink.clone(), options(false), &CancellationToken::new()).unwrap();

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn read_error_ends_stream_like_eof() {
        let source = Dribble {
            data: Cursor::new(pattern(1024 + 50)),
            step: 512,
            fail_at_end: true,
        };
        let sink = RecordingSink::default();
        let report = run(source, sink.clone(), options(false), &CancellationToken::new()).unwrap();

        assert_eq!(sink.chunks.lock().unwrap().len(), 1);
        assert_eq!(report.discarded, 50);
        assert!(matches!(
            report.end,
            StreamEnd::ReadError(ref e) if e.kind() == ErrorKind::ConnectionReset
        ));
    }

    #[test]
    fn cancelled_before_start_writes_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let sink = RecordingSink::default();
        let report = run(Cursor::new(pattern(4096)), sink.clone(), options(false), &token).unwrap();

        assert!(sink.chunks.lock().unwrap().is_empty());
        assert!(matches!(report.end, StreamEnd::Cancelled));
        assert!(!*sink.finished.lock().unwrap());
    }

    #[test]
    fn cancellation_stops_on_a_chunk_boundary() {
        let token = CancellationToken::new();
        let sink = RecordingSink {
            cancel_after: Some((2, token.clone())),
            ..RecordingSink::default()
        };
        let report = run(
            Cursor::new(pattern(10 * 1024)),
            sink.clone(),
            options(false),
            &token,
        )
        .unwrap();

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 1024));
        assert_eq!(report.bytes, 2048);
        assert!(matches!(report.end, StreamEnd::Cancelled));
    }

    struct FailingSink;

    impl AudioSink for FailingSink {
        fn configure(&mut self, _info: &AudioStreamInfo, _threshold_percent: u8) -> Result<()> {
            Ok(())
        }

        fn write_chunk(&mut self, _chunk: &[u8]) -> Result<()> {
            Err(PlayError::Write(io::Error::new(ErrorKind::BrokenPipe, "device gone")))
        }
    }

    #[test]
    fn sink_failure_is_returned() {
        let result = run(
            Cursor::new(pattern(2048)),
            FailingSink,
            options(false),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(PlayError::Write(_))));
    }
}
