// Musical scheduling: note names, beats, and the song driver thread.

pub mod beat;
pub mod notes;
pub mod song;

pub use beat::{Beat, BeatNote};
pub use song::{Song, SongSheet};
