//! Audio output interfaces.
//!
//! Every live voice opens its OWN sink and writes to it concurrently with
//! all the others; this crate never mixes. A sink implementation must
//! therefore tolerate concurrent independent writers and perform the
//! summation itself — the cpal sink satisfies this because each one is a
//! separate output stream mixed by the host audio server.

/// cpal-backed output to the default device.
pub mod device;

use std::sync::{Arc, Mutex};

use crate::SynthError;

pub use device::{device_sink_factory, CpalSink};

/// A destination for rendered sample blocks.
pub trait AudioSink {
    /// The rate the sink consumes samples at, in Hz. Voices render at this
    /// rate.
    fn sample_rate(&self) -> u32;

    /// Write one block, blocking until the sink accepts it. This
    /// back-pressure is the caller's pacing; there is no other rate limit.
    fn play(&mut self, block: &[f32]);
}

/// Builds one sink per voice, on the voice's own thread.
///
/// Audio streams are generally not movable across threads, so voices take a
/// factory and open the sink themselves.
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn AudioSink>, SynthError> + Send + Sync>;

/// An offline sink that records everything written to it.
///
/// Never blocks, so a voice driving one renders as fast as it can — handy
/// for tests and for inspecting rendered audio.
#[derive(Clone)]
pub struct CaptureSink {
    sample_rate: u32,
    samples: Arc<Mutex<Vec<f32>>>,
}

impl CaptureSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of everything captured so far.
    pub fn samples(&self) -> Vec<f32> {
        self.samples.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A factory handing every voice a clone of this sink; all captured
    /// audio lands in one shared buffer.
    pub fn factory(&self) -> SinkFactory {
        let sink = self.clone();
        Arc::new(move || Ok(Box::new(sink.clone()) as Box<dyn AudioSink>))
    }
}

impl AudioSink for CaptureSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, block: &[f32]) {
        self.samples.lock().unwrap().extend_from_slice(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_accumulates_blocks() {
        let mut sink = CaptureSink::new(crate::SAMPLE_RATE);
        sink.play(&[0.1, 0.2]);
        sink.play(&[0.3]);
        assert_eq!(sink.samples(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn clones_share_one_buffer() {
        let sink = CaptureSink::new(crate::SAMPLE_RATE);
        let mut writer = sink.clone();
        writer.play(&[1.0; 4]);
        assert_eq!(sink.len(), 4);
    }
}
