// Per-note voices: the streaming core and the thread-per-voice lifecycle.

pub mod message;
pub mod voice;

pub use message::{VoiceCommand, VoiceHandle};
pub use voice::Voice;
