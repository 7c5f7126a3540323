use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::warn;
use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::io::{AudioSink, SinkFactory};
use crate::{SynthError, BLOCK_SIZE};

/// How many blocks fit in the ring between a voice and its stream callback.
const RING_BLOCKS: usize = 4;

/// How long `play` naps when the ring is full before retrying.
const FULL_RING_BACKOFF: Duration = Duration::from_millis(1);

/// One output stream on the default device, fed through an SPSC ring.
///
/// The voice thread pushes samples; the cpal callback pops them, duplicating
/// mono across however many channels the device wants and zero-filling on
/// underrun. `play` blocks while the ring is full, which is exactly the
/// pacing the voice loop relies on.
pub struct CpalSink {
    sample_rate: u32,
    producer: Producer<f32>,
    // Held so the stream stays alive exactly as long as the sink.
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Open the default output device.
    ///
    /// The device keeps its native sample rate; the voice asks the sink for
    /// it rather than assuming one.
    pub fn open() -> Result<Self, SynthError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SynthError::Device("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| SynthError::Device(format!("default output config: {e}")))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let (producer, consumer) = RingBuffer::<f32>::new(BLOCK_SIZE * RING_BLOCKS);

        let stream = device
            .build_output_stream(
                &config.into(),
                callback(consumer, channels),
                |err| warn!("output stream error: {err}"),
                None,
            )
            .map_err(|e| SynthError::Device(format!("build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| SynthError::Device(format!("start output stream: {e}")))?;

        Ok(Self {
            sample_rate,
            producer,
            _stream: stream,
        })
    }
}

fn callback(mut consumer: Consumer<f32>, channels: usize) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) {
    move |data: &mut [f32], _| {
        for frame in data.chunks_mut(channels) {
            // Underruns (voice still rendering, or already gone) play silence.
            let sample = consumer.pop().unwrap_or(0.0);
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }
    }
}

impl AudioSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, block: &[f32]) {
        for &s in block {
            let mut sample = s;
            loop {
                match self.producer.push(sample) {
                    Ok(()) => break,
                    Err(PushError::Full(rejected)) => {
                        sample = rejected;
                        thread::sleep(FULL_RING_BACKOFF);
                    }
                }
            }
        }
    }
}

/// A factory opening one fresh device sink per voice.
pub fn device_sink_factory() -> SinkFactory {
    Arc::new(|| CpalSink::open().map(|sink| Box::new(sink) as Box<dyn AudioSink>))
}
