pub mod dsp; // Envelope shaping and oscillator math
pub mod error;
pub mod files; // Preset and song text formats
pub mod io;
pub mod sequencing; // Beats, note names, the song driver
pub mod synth; // Per-note voices and their threads

pub use error::SynthError;

/// Output sample rate shared by every voice, in Hz.
pub const SAMPLE_RATE: u32 = 44_100;
/// Samples per rendered block. Envelope gain is applied once per block.
pub const BLOCK_SIZE: usize = 4_096;
/// Global peak-amplitude ceiling. Envelope gain never exceeds this.
pub const MAX_VOLUME: f64 = 0.6;

pub(crate) const MIN_TIME: f64 = 1.0 / 48_000.0;
