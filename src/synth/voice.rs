use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error};
use rtrb::RingBuffer;

use crate::dsp::envelope::ReleasePoint;
use crate::dsp::{Envelope, OscillatorBank};
use crate::io::SinkFactory;
use crate::synth::message::{VoiceCommand, VoiceHandle};
use crate::{BLOCK_SIZE, MAX_VOLUME};

/*
Voice
=====

A voice is one sounding note: an envelope, an oscillator bank, and a
streaming loop that writes fixed-size blocks to its own audio sink until
the envelope reaches silence.

Lifecycle: Attack -> Decay -> Sustain -> Release -> Dead. The state is
never stored; each block derives its gain from the elapsed time `t` and
the optional release snapshot. Dead is `gain <= 0 && t > attack` — the
attack guard keeps the genuinely-zero gain at the start of the ramp from
reading as completion.

Gain is computed ONCE PER BLOCK, not per sample. A block is ~93 ms at the
default rate, short next to typical envelope segments, so the staircase
this puts on the envelope is inaudible in practice. It is a deliberate
trade and part of this synthesizer's sound; do not quietly upgrade it to
sample-accurate interpolation.

Each voice opens its own sink and never mixes with anyone: summation of
concurrent voices is the sink's job (the OS audio server, for the cpal
sink). The blocking `play` call is also the loop's only pacing — there is
no timer.
*/

/// How many not-yet-seen commands a voice can have queued.
const COMMAND_QUEUE_SIZE: usize = 8;

/// The streaming core of one note. Pure and single-threaded; the
/// thread-per-voice wrapper is [`Voice::spawn`].
pub struct Voice {
    envelope: Envelope,
    bank: OscillatorBank,
    /// Auto-stop after this many seconds; `None` holds until stopped.
    length: Option<f64>,
    sample_rate: u32,
    /// Elapsed time at the start of the next block, in seconds.
    t: f64,
    /// Gain applied to the most recent block.
    gain: f64,
    release: Option<ReleasePoint>,
    /// Scratch timestamps for the current block.
    times: Vec<f64>,
}

impl Voice {
    pub fn new(
        envelope: Envelope,
        bank: OscillatorBank,
        length: Option<f64>,
        sample_rate: u32,
    ) -> Self {
        Self {
            envelope,
            bank,
            length,
            sample_rate,
            t: 0.0,
            gain: 0.0,
            release: None,
            times: Vec::new(),
        }
    }

    /// Begin the release segment from the current gain. The first trigger
    /// fixes the snapshot; later ones are ignored.
    pub fn trigger_release(&mut self) {
        if self.release.is_none() {
            self.release = Some(ReleasePoint {
                at: self.t,
                gain: self.gain,
            });
        }
    }

    /// Terminal state: the envelope has reached silence.
    pub fn is_dead(&self) -> bool {
        self.gain <= 0.0 && self.t > self.envelope.attack
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn elapsed(&self) -> f64 {
        self.t
    }

    pub fn is_released(&self) -> bool {
        self.release.is_some()
    }

    /// Render the next block covering `[t, t + len/rate)` into `out`.
    pub fn render_block(&mut self, out: &mut [f32]) {
        if let Some(length) = self.length {
            if self.t > length && self.release.is_none() {
                self.trigger_release();
            }
        }
        self.gain = self.envelope.gain_at(self.t, self.release, MAX_VOLUME);

        let dt = 1.0 / self.sample_rate as f64;
        self.times.clear();
        self.times
            .extend((0..out.len()).map(|i| self.t + i as f64 * dt));
        self.bank.render(&self.times, out);

        let gain = self.gain as f32;
        for sample in out.iter_mut() {
            *sample *= gain;
        }
        self.t += out.len() as f64 * dt;
    }

    /// Run this note on its own thread, streaming blocks into a sink built
    /// from `factory`, until the envelope reaches silence.
    ///
    /// The sink is constructed on the voice thread (audio streams are not
    /// generally movable across threads). If it cannot be opened the voice
    /// dies immediately; that is fatal to this note only.
    pub fn spawn(
        envelope: Envelope,
        bank: OscillatorBank,
        length: Option<f64>,
        factory: SinkFactory,
    ) -> VoiceHandle {
        let (commands, mut rx) = RingBuffer::<VoiceCommand>::new(COMMAND_QUEUE_SIZE);
        let dead = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dead);

        let thread = thread::spawn(move || {
            let mut sink = match factory() {
                Ok(sink) => sink,
                Err(err) => {
                    error!("voice could not open its sink: {err}");
                    flag.store(true, Ordering::Release);
                    return;
                }
            };
            let mut voice = Voice::new(envelope, bank, length, sink.sample_rate());
            debug!(
                "voice up: {:.2} Hz, length {:?}",
                voice.bank.base_frequency(),
                length
            );

            let mut block = vec![0.0f32; BLOCK_SIZE];
            while !voice.is_dead() {
                while let Ok(command) = rx.pop() {
                    match command {
                        VoiceCommand::Stop => voice.trigger_release(),
                    }
                }
                voice.render_block(&mut block);
                sink.play(&block);
            }
            debug!("voice done after {:.2}s", voice.elapsed());
            flag.store(true, Ordering::Release);
        });

        VoiceHandle::new(commands, dead, thread)
    }
}
