use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use rtrb::Producer;

/// Commands a voice accepts while sounding.
///
/// The queue is drained at the top of every block, so a command takes effect
/// at the next block boundary — never mid-block.
#[derive(Debug, Copy, Clone)]
pub enum VoiceCommand {
    /// Trigger the release segment. Idempotent; the first one wins.
    Stop,
}

/// The caller's end of a spawned voice.
///
/// The voice itself runs on its own thread and owns all of its state; this
/// handle can only send commands and observe termination. Dropping the
/// handle detaches the voice (fire-and-forget) — it keeps sounding until its
/// envelope reaches silence.
pub struct VoiceHandle {
    commands: Producer<VoiceCommand>,
    dead: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl VoiceHandle {
    pub(crate) fn new(
        commands: Producer<VoiceCommand>,
        dead: Arc<AtomicBool>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            dead,
            thread: Some(thread),
        }
    }

    /// Ask the voice to fade out from its current gain.
    ///
    /// No immediate silence: release shaping continues for up to the
    /// envelope's release time. Harmless after the voice has died or has
    /// already been released.
    pub fn stop(&mut self) {
        // A full queue means a stop is already pending; nothing to add.
        let _ = self.commands.push(VoiceCommand::Stop);
    }

    /// True once the voice thread has finished for any reason.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    /// Block until the voice thread exits. Used by tests and teardown paths
    /// that must not outlive their audio.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
