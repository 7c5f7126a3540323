/// One note within a beat: what to play and for how many beats.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BeatNote {
    /// Note name, e.g. `"C4"` — resolved to a frequency at spawn time.
    pub pitch: String,
    /// Length in beats.
    pub beats: f64,
}

impl BeatNote {
    pub fn new(pitch: impl Into<String>, beats: f64) -> Self {
        Self {
            pitch: pitch.into(),
            beats,
        }
    }
}

/// A scheduling slot: either silence or one-or-more simultaneous notes.
///
/// Simultaneous notes may have different lengths. The slot only gates the
/// sequencer for the SHORTEST of them, so longer notes keep sounding into
/// the following beats (legato overlap).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Beat {
    /// Rest for the given number of beats.
    Pause { beats: f64 },
    /// Strike every note at once.
    Notes(Vec<BeatNote>),
}

impl Beat {
    /// How long the sequencer waits on this slot, in beats.
    pub fn gate_beats(&self) -> f64 {
        match self {
            Beat::Pause { beats } => *beats,
            Beat::Notes(notes) => notes
                .iter()
                .map(|n| n.beats)
                .reduce(f64::min)
                .unwrap_or(0.0),
        }
    }
}
