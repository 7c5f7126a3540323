//! Signal math shared by every voice.
//!
//! These components are plain value types plus allocation-free render
//! routines, so a voice can own them directly and evaluate them from its
//! streaming thread without locks.

/// Attack/decay/sustain/release envelope and its gain rule.
pub mod envelope;
/// Wave descriptors and the multiplicative oscillator bank.
pub mod oscillator;

pub use envelope::Envelope;
pub use oscillator::{OscillatorBank, WaveDescriptor, WaveShape};

use crate::MIN_TIME;

/// Linear interpolation of `x` along the segment `(x1, y1) -> (x2, y2)`.
///
/// Zero-length segments (a zero attack or release time) collapse to the
/// segment's end value instead of dividing by zero.
pub(crate) fn interpolate(x1: f64, x2: f64, y1: f64, y2: f64, x: f64) -> f64 {
    if x2 - x1 <= MIN_TIME {
        return y2;
    }
    ((y2 - y1) * x + x2 * y1 - x1 * y2) / (x2 - x1)
}
