//! The preset and song text formats.
//!
//! All three formats are line-oriented; lines starting with `$` are comments
//! and blank lines are ignored. The `parse_*` functions work on strings, the
//! `load_*` wrappers read files — songs additionally resolve the preset
//! paths they reference against their own directory.
//!
//! Wave preset — one descriptor per line:
//!
//! ```text
//! $ type ratio amplitude phase   (type: 1=sine 2=square 3=sawtooth 4=triangle)
//! 1 1.0 1.0 0.0
//! 2 0.5 0.3 1.5708
//! ```
//!
//! Envelope preset — a single line; the leading type code is reserved:
//!
//! ```text
//! 1 0.1 0.1 0.4 0.25
//! ```
//!
//! Song — title, metadata until `---`, then beats:
//!
//! ```text
//! My Song
//! 1 120              $ bpm
//! 2 warm.wave        $ wave preset, relative to the song file
//! 3 soft.env         $ envelope preset
//! ---
//! 2 C4:1.0 E4:0.5    $ chord: count, then pitch:beats pairs
//! 0 1.0              $ pause for one beat
//! ```

use std::fs;
use std::path::Path;

use crate::dsp::{Envelope, WaveDescriptor, WaveShape};
use crate::sequencing::{Beat, BeatNote, SongSheet};
use crate::SynthError;

/// Marker for a pause beat and the reserved "rest" pitch token.
const PAUSE_MARKER: &str = "0";

fn is_data(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with('$')
}

fn wave_shape(code: &str) -> Result<WaveShape, SynthError> {
    match code {
        "1" => Ok(WaveShape::Sine),
        "2" => Ok(WaveShape::Square),
        "3" => Ok(WaveShape::Sawtooth),
        "4" => Ok(WaveShape::Triangle),
        other => Err(SynthError::InvalidWaveType(other.to_string())),
    }
}

fn parse_f64(token: &str, what: &str) -> Result<f64, SynthError> {
    token
        .parse()
        .map_err(|_| SynthError::MalformedPreset(format!("bad {what}: {token:?}")))
}

/// Parse a wave preset: one descriptor per data line.
pub fn parse_wave_preset(src: &str) -> Result<Vec<WaveDescriptor>, SynthError> {
    let mut preset = Vec::new();
    for line in src.lines().filter(|l| is_data(l)) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let shape = wave_shape(tokens[0])?;
        if tokens.len() != 4 {
            return Err(SynthError::MalformedPreset(format!(
                "expected 4 fields in wave line, found {}: {line:?}",
                tokens.len()
            )));
        }
        preset.push(WaveDescriptor::new(
            shape,
            parse_f64(tokens[1], "frequency ratio")?,
            parse_f64(tokens[2], "amplitude")?,
            parse_f64(tokens[3], "phase")?,
        ));
    }
    Ok(preset)
}

pub fn load_wave_preset(path: &Path) -> Result<Vec<WaveDescriptor>, SynthError> {
    parse_wave_preset(&fs::read_to_string(path)?)
}

/// Parse an envelope preset: the first data line wins.
pub fn parse_envelope_preset(src: &str) -> Result<Envelope, SynthError> {
    for line in src.lines().filter(|l| is_data(l)) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 5 {
            return Err(SynthError::MalformedPreset(format!(
                "expected 5 fields in envelope line, found {}: {line:?}",
                tokens.len()
            )));
        }
        // tokens[0] is the envelope type code, reserved for future shapes.
        return Ok(Envelope::new(
            parse_f64(tokens[1], "attack")?,
            parse_f64(tokens[2], "decay")?,
            parse_f64(tokens[3], "sustain")?,
            parse_f64(tokens[4], "release")?,
        ));
    }
    Err(SynthError::MalformedPreset(
        "envelope preset has no data line".into(),
    ))
}

pub fn load_envelope_preset(path: &Path) -> Result<Envelope, SynthError> {
    parse_envelope_preset(&fs::read_to_string(path)?)
}

/// Parse a song. `base_dir` anchors relative preset paths named in the
/// metadata section.
pub fn parse_song(src: &str, base_dir: &Path) -> Result<SongSheet, SynthError> {
    let mut lines = src.lines();
    let title = lines
        .next()
        .ok_or_else(|| SynthError::MalformedSong("empty song file".into()))?
        .trim_end()
        .to_string();

    let mut bpm: u32 = 100;
    let mut waves = None;
    let mut envelope = None;
    let mut beats = Vec::new();
    let mut in_meta = true;

    for line in lines.filter(|l| is_data(l)) {
        if in_meta {
            if line.starts_with("---") {
                in_meta = false;
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(SynthError::MalformedSong(format!(
                    "metadata line needs a key and a value: {line:?}"
                )));
            }
            match tokens[0] {
                "1" => {
                    bpm = tokens[1].parse().map_err(|_| {
                        SynthError::MalformedSong(format!("bad bpm: {:?}", tokens[1]))
                    })?;
                }
                "2" => waves = Some(load_wave_preset(&base_dir.join(tokens[1]))?),
                "3" => envelope = Some(load_envelope_preset(&base_dir.join(tokens[1]))?),
                other => {
                    return Err(SynthError::MalformedSong(format!(
                        "unknown metadata key {other:?}"
                    )))
                }
            }
        } else {
            beats.push(parse_beat(line, beats.len() + 1)?);
        }
    }

    if bpm == 0 {
        return Err(SynthError::MalformedSong("bpm must be positive".into()));
    }
    Ok(SongSheet {
        title,
        bpm,
        waves,
        envelope,
        beats,
    })
}

fn parse_beat(line: &str, number: usize) -> Result<Beat, SynthError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens[0] == PAUSE_MARKER {
        if tokens.len() != 2 {
            return Err(SynthError::MalformedSong(format!(
                "beat {number}: a pause is \"0 <beats>\": {line:?}"
            )));
        }
        let beats = tokens[1].parse().map_err(|_| {
            SynthError::MalformedSong(format!("beat {number}: bad pause length {:?}", tokens[1]))
        })?;
        return Ok(Beat::Pause { beats });
    }

    let declared: usize = tokens[0].parse().map_err(|_| {
        SynthError::MalformedSong(format!("beat {number}: bad note count {:?}", tokens[0]))
    })?;
    if tokens.len() - 1 != declared {
        return Err(SynthError::MalformedSong(format!(
            "beat {number}: declared {declared} notes, found {}",
            tokens.len() - 1
        )));
    }

    let mut notes = Vec::with_capacity(declared);
    for token in &tokens[1..] {
        let (pitch, beats) = token.split_once(':').ok_or_else(|| {
            SynthError::MalformedSong(format!("beat {number}: note needs pitch:beats: {token:?}"))
        })?;
        let beats = beats.parse().map_err(|_| {
            SynthError::MalformedSong(format!("beat {number}: bad note length {beats:?}"))
        })?;
        notes.push(BeatNote::new(pitch, beats));
    }
    Ok(Beat::Notes(notes))
}

pub fn load_song(path: &Path) -> Result<SongSheet, SynthError> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_song(&fs::read_to_string(path)?, base_dir)
}
