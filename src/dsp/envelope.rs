use crate::dsp::interpolate;

/*
ADSR Envelope
=============

An envelope shapes a note's loudness over its lifetime with four linear
segments:

  Gain
   V   ┐     ╱╲
       │    ╱  ╲___________
  s·V  │   ╱               ╲
       │  ╱                 ╲
   0   └─╱───────────────────╲──→ Time
       Attack Decay  Sustain  Release
        (a)   (d)      (s)      (r)

`V` is the global peak ceiling (`crate::MAX_VOLUME`), `s` the sustain level
as a fraction of it. Attack, decay and release are durations in seconds;
sustain holds indefinitely until a release is triggered.

Unlike a gated envelope that steps per sample, this one is a pure function
of elapsed time: callers hand in `t` and, once the note has been told to
stop, the release point they snapshotted at that moment. Release always
ramps from the snapshotted gain, not from the sustain level, so stopping a
note mid-attack fades from wherever the ramp actually was and never clicks.

The segments are linear on purpose. Exponential envelopes sound more
"natural", but linear is predictable, cheap, and what this synthesizer has
always shipped.
*/

/// A release snapshot: when the note was told to stop, and the gain it had.
///
/// Once taken, the snapshot is fixed for the rest of the note's life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleasePoint {
    /// Elapsed time at which the release was triggered, in seconds.
    pub at: f64,
    /// Gain at that moment.
    pub gain: f64,
}

/// An immutable ADSR description, shared by value across voices.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Seconds to ramp from silence to the peak.
    pub attack: f64,
    /// Seconds to ramp from the peak down to the sustain level.
    pub decay: f64,
    /// Sustain level as a fraction of the peak, in `[0, 1]`.
    pub sustain: f64,
    /// Seconds to ramp from the release snapshot down to silence.
    pub release: f64,
}

impl Envelope {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        }
    }

    /// Gain at elapsed time `t`, scaled to the peak `V`.
    ///
    /// `release` carries the snapshot taken when the note was stopped, or
    /// `None` while it is still held. The released ramp is clamped at zero
    /// so a voice can use `gain <= 0` as its termination signal.
    pub fn gain_at(&self, t: f64, release: Option<ReleasePoint>, peak: f64) -> f64 {
        if let Some(rp) = release {
            return interpolate(rp.at, rp.at + self.release, rp.gain, 0.0, t).max(0.0);
        }
        if t < self.attack {
            interpolate(0.0, self.attack, 0.0, peak, t)
        } else if t < self.attack + self.decay {
            interpolate(
                self.attack,
                self.attack + self.decay,
                peak,
                self.sustain * peak,
                t,
            )
        } else {
            self.sustain * peak
        }
    }
}

/// The preset every voice falls back to when none has been loaded.
impl Default for Envelope {
    fn default() -> Self {
        Envelope::new(0.1, 0.1, 0.4, 0.25)
    }
}
