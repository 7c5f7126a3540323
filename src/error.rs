use thiserror::Error;

/// Everything that can go wrong while loading or playing material.
///
/// Parse errors are reported to the operator and never interrupt voices that
/// are already sounding. Conditions that would indicate a bug (a lookup miss
/// that initialization makes impossible) are panics, not variants.
#[derive(Debug, Error)]
pub enum SynthError {
    /// A note name whose pitch class or octave could not be understood.
    #[error("invalid note name: {0:?}")]
    InvalidNote(String),

    /// A wave type code outside the mapped 1-4 range.
    #[error("invalid wave type: {0:?}")]
    InvalidWaveType(String),

    /// A wave or envelope preset line that does not follow the format.
    #[error("malformed preset: {0}")]
    MalformedPreset(String),

    /// A song file that does not follow the format.
    #[error("malformed song: {0}")]
    MalformedSong(String),

    /// The audio device could not be opened or configured.
    #[error("audio device: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
