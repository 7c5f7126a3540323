use crate::SynthError;

/*
Note Names
==========

Pitch is spelled `<PitchClass><Octave>`: a letter, an optional sharp, and a
signed decimal octave number — `C4`, `F#3`, `A-1`. Tuning is 12-tone equal
temperament referenced to A4 = 440 Hz: the table below fixes octave 4 and
every other octave scales by a power of two.

    frequency(name) = table[pitch_class] * 2^(octave - 4)
*/

/// Base frequencies for octave 4, in table (chromatic) order.
const BASE_FREQUENCIES: [(&str, f64); 12] = [
    ("C", 261.63),
    ("C#", 277.18),
    ("D", 293.66),
    ("D#", 311.13),
    ("E", 329.63),
    ("F", 349.23),
    ("F#", 369.99),
    ("G", 392.00),
    ("G#", 415.30),
    ("A", 440.00),
    ("A#", 466.16),
    ("B", 493.88),
];

/// Resolve a note name like `"C#4"` to its frequency in Hz.
///
/// The octave is any trailing signed integer; the remainder must be one of
/// the twelve pitch classes. Anything else is an [`SynthError::InvalidNote`].
pub fn resolve(name: &str) -> Result<f64, SynthError> {
    let split = name
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() || *c == '-' || *c == '+')
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    let (pitch, octave) = name.split_at(split);

    let octave: i32 = octave
        .parse()
        .map_err(|_| SynthError::InvalidNote(name.to_string()))?;
    let base = BASE_FREQUENCIES
        .iter()
        .find(|(p, _)| *p == pitch)
        .map(|(_, f)| *f)
        .ok_or_else(|| SynthError::InvalidNote(name.to_string()))?;

    Ok(base * 2f64.powi(octave - 4))
}
