use std::f64::consts::TAU;

/*
Oscillator Bank
===============

A voice's timbre is a list of wave descriptors evaluated against one base
frequency. Each descriptor picks a basis shape, a frequency ratio relative
to the base, an amplitude, and a phase offset in radians.

Composition is MULTIPLICATIVE: the output buffer starts at 1.0 and each
descriptor multiplies it elementwise by `amplitude * basis(θ)`. That is
ring modulation, not the additive partial-summing most synthesizers do.
With one descriptor the two are identical; with several, multiplication
produces sum-and-difference sidebands instead of a harmonic stack, which
is this instrument's characteristic (slightly metallic) sound. Changing it
to addition would silently change the timbre of every existing preset, so
it stays.

Basis shapes, all with period 2π in the angle θ = 2π·(base·ratio)·t + phase:

  Sine      sin θ
  Square    +1 for the first half period, -1 for the second (50% duty)
  Sawtooth  rising ramp from -1 to 1 over the period
  Triangle  rises -1 to 1 over the first half, falls back over the second
*/

/// The four basis waveforms a descriptor can choose from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl WaveShape {
    /// Evaluate the basis at angle `theta` (radians).
    pub fn eval(self, theta: f64) -> f64 {
        match self {
            WaveShape::Sine => theta.sin(),
            WaveShape::Square => {
                if Self::cycle_fraction(theta) < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Sawtooth => 2.0 * Self::cycle_fraction(theta) - 1.0,
            WaveShape::Triangle => {
                let frac = Self::cycle_fraction(theta);
                if frac < 0.5 {
                    4.0 * frac - 1.0
                } else {
                    3.0 - 4.0 * frac
                }
            }
        }
    }

    /// Position within the current cycle, in `[0, 1)`.
    fn cycle_fraction(theta: f64) -> f64 {
        (theta / TAU).rem_euclid(1.0)
    }
}

/// One wave in a bank: shape, ratio to the base frequency, amplitude, phase.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveDescriptor {
    pub shape: WaveShape,
    /// Frequency as a multiple of the bank's base frequency.
    pub frequency_ratio: f64,
    pub amplitude: f64,
    /// Phase offset in radians.
    pub phase: f64,
}

impl WaveDescriptor {
    pub fn new(shape: WaveShape, frequency_ratio: f64, amplitude: f64, phase: f64) -> Self {
        Self {
            shape,
            frequency_ratio,
            amplitude,
            phase,
        }
    }
}

/// The wave preset every voice falls back to when none has been loaded:
/// a single pure sine at the note's own frequency.
pub fn default_wave_preset() -> Vec<WaveDescriptor> {
    vec![WaveDescriptor::new(WaveShape::Sine, 1.0, 1.0, 0.0)]
}

/// A list of wave descriptors bound to one base frequency.
///
/// Constructed per voice at spawn time; the descriptors are copied in so a
/// later preset swap never touches a sounding note.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    base_frequency: f64,
    waves: Vec<WaveDescriptor>,
}

impl OscillatorBank {
    pub fn new(base_frequency: f64, waves: Vec<WaveDescriptor>) -> Self {
        Self {
            base_frequency,
            waves,
        }
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    /// Render the bank at the given timestamps (seconds) into `out`.
    ///
    /// `out` is initialized to all ones and each descriptor multiplies it in
    /// list order. An empty bank therefore renders a constant 1.0 — silence
    /// only matters for degenerate test setups.
    pub fn render(&self, times: &[f64], out: &mut [f32]) {
        debug_assert_eq!(times.len(), out.len());
        out.fill(1.0);
        for wave in &self.waves {
            let omega = TAU * self.base_frequency * wave.frequency_ratio;
            for (t, sample) in times.iter().zip(out.iter_mut()) {
                let theta = omega * t + wave.phase;
                *sample *= (wave.amplitude * wave.shape.eval(theta)) as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn single_sine_is_unattenuated() {
        let f = 100.0;
        let bank = OscillatorBank::new(f, default_wave_preset());
        // one quarter period, well inside the first cycle
        let ts = times(64, 1.0 / (4.0 * f) / 64.0);
        let mut out = vec![0.0f32; ts.len()];
        bank.render(&ts, &mut out);
        for (t, s) in ts.iter().zip(&out) {
            let expected = (TAU * f * t).sin() as f32;
            assert!((s - expected).abs() < 1e-5, "t={t}: {s} vs {expected}");
        }
    }

    #[test]
    fn square_is_a_unit_pulse() {
        let bank = OscillatorBank::new(
            1.0,
            vec![WaveDescriptor::new(WaveShape::Square, 1.0, 1.0, 0.0)],
        );
        let ts = vec![0.1, 0.4, 0.6, 0.9];
        let mut out = vec![0.0f32; 4];
        bank.render(&ts, &mut out);
        assert_eq!(out, vec![1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn sawtooth_ramps_across_the_period() {
        let bank = OscillatorBank::new(
            1.0,
            vec![WaveDescriptor::new(WaveShape::Sawtooth, 1.0, 1.0, 0.0)],
        );
        let ts = vec![0.0, 0.25, 0.5, 0.75];
        let mut out = vec![0.0f32; 4];
        bank.render(&ts, &mut out);
        let expected = [-1.0f32, -0.5, 0.0, 0.5];
        for (s, e) in out.iter().zip(expected) {
            assert!((s - e).abs() < 1e-6);
        }
    }

    #[test]
    fn triangle_rises_then_falls() {
        let bank = OscillatorBank::new(
            1.0,
            vec![WaveDescriptor::new(WaveShape::Triangle, 1.0, 1.0, 0.0)],
        );
        let ts = vec![0.0, 0.25, 0.5, 0.75];
        let mut out = vec![0.0f32; 4];
        bank.render(&ts, &mut out);
        let expected = [-1.0f32, 0.0, 1.0, 0.0];
        for (s, e) in out.iter().zip(expected) {
            assert!((s - e).abs() < 1e-6);
        }
    }

    #[test]
    fn composition_multiplies_in_list_order() {
        // A sine ring-modulated by a half-amplitude square: wherever the
        // square is +1 the output is sin/2, wherever -1 it is -sin/2.
        let f = 10.0;
        let bank = OscillatorBank::new(
            f,
            vec![
                WaveDescriptor::new(WaveShape::Sine, 1.0, 1.0, 0.0),
                WaveDescriptor::new(WaveShape::Square, 0.5, 0.5, 0.0),
            ],
        );
        let ts = times(32, 1.0 / f / 32.0);
        let mut out = vec![0.0f32; ts.len()];
        bank.render(&ts, &mut out);
        for (t, s) in ts.iter().zip(&out) {
            let sine = (TAU * f * t).sin();
            let square = if (0.5 * f * t).rem_euclid(1.0) < 0.5 { 1.0 } else { -1.0 };
            let expected = (sine * 0.5 * square) as f32;
            assert!((s - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_bank_renders_ones() {
        let bank = OscillatorBank::new(440.0, Vec::new());
        let mut out = vec![0.0f32; 8];
        bank.render(&times(8, 0.01), &mut out);
        assert!(out.iter().all(|&s| s == 1.0));
    }
}
