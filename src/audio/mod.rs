//! audio - Output sinks and the chunk transfer loop
//!
//! Uses ALSA for PCM playback, or plain writers for dumps and
//! length-prefixed chunk devices.

mod alsa_device;
pub mod pump;
pub mod sink;

pub use alsa_device::AlsaSink;
pub use pump::{PumpOptions, PumpReport, StreamEnd};
pub use sink::{AudioSink, Framing, WriterSink};
