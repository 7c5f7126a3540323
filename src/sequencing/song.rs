use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::dsp::oscillator::default_wave_preset;
use crate::dsp::{Envelope, OscillatorBank, WaveDescriptor};
use crate::io::SinkFactory;
use crate::sequencing::{notes, Beat};
use crate::synth::{Voice, VoiceHandle};

/*
Sequencer
=========

A loaded song owns one long-lived driver thread. While the playing flag is
clear the driver naps in ~100 ms slices; once set, it walks the beats in
order, spawning one voice per note and sleeping between beats according to
the tempo:

  pause beat     sleep (60/bpm) * pause_beats, spawn nothing
  note beat      spawn every note, then sleep (60/bpm) * SHORTEST note

Gating on the shortest note is deliberate: longer notes in the same beat
keep sounding past the nominal boundary, which is how chords tie into the
next beat (legato). When the beats run out the driver clears the playing
flag itself.

Stopping is cooperative, never preemptive. `stop_playback` only clears the
flag; the driver notices at the next beat or pause boundary, and voices
already spawned finish their own envelopes. `kill` ends the driver thread
itself and is the only way to do so; dropping the Song calls it.

Spawned voices are fire-and-forget from the outside, but the driver keeps
their handles, reaps dead ones each beat, and refuses to exceed
`MAX_VOICES` so a dense song cannot spawn threads without bound.
*/

/// Idle poll interval, and the slice size for interruptible sleeps.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on concurrently sounding voices per song.
const MAX_VOICES: usize = 64;

/// A parsed song: immutable value produced by the loader.
#[derive(Debug, Clone)]
pub struct SongSheet {
    pub title: String,
    /// Tempo in beats per minute, always positive.
    pub bpm: u32,
    /// Wave preset from the song file, if it named one.
    pub waves: Option<Vec<WaveDescriptor>>,
    /// Envelope preset from the song file, if it named one.
    pub envelope: Option<Envelope>,
    pub beats: Vec<Beat>,
}

/// The presets voices are spawned with. Swappable while playing; voices
/// copy them at spawn time, so a swap never affects a sounding note.
#[derive(Debug, Clone)]
struct Presets {
    envelope: Envelope,
    waves: Vec<WaveDescriptor>,
}

struct Shared {
    playing: AtomicBool,
    alive: AtomicBool,
}

/// A loaded song with its driver thread.
pub struct Song {
    title: String,
    bpm: u32,
    shared: Arc<Shared>,
    presets: Arc<Mutex<Presets>>,
    driver: Option<JoinHandle<()>>,
}

impl Song {
    /// Take ownership of a parsed sheet and start the (idle) driver thread.
    /// Presets missing from the sheet fall back to the defaults.
    pub fn new(sheet: SongSheet, factory: SinkFactory) -> Self {
        let presets = Arc::new(Mutex::new(Presets {
            envelope: sheet.envelope.unwrap_or_default(),
            waves: sheet.waves.unwrap_or_else(default_wave_preset),
        }));
        let shared = Arc::new(Shared {
            playing: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        });

        let driver = {
            let shared = Arc::clone(&shared);
            let presets = Arc::clone(&presets);
            let beats = sheet.beats;
            let bpm = sheet.bpm;
            thread::spawn(move || drive(&beats, bpm, &shared, &presets, factory))
        };

        Self {
            title: sheet.title,
            bpm: sheet.bpm,
            shared,
            presets,
            driver: Some(driver),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Begin (or restart) a playback pass at the next driver poll.
    pub fn start_playback(&self) {
        info!("playing: {}", self.title);
        self.shared.playing.store(true, Ordering::Release);
    }

    /// Cooperative stop: the driver finishes its current beat or pause and
    /// already-spawned voices keep sounding to completion.
    pub fn stop_playback(&self) {
        self.shared.playing.store(false, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Swap the wave preset used for voices spawned from here on.
    pub fn set_wave_preset(&self, waves: Vec<WaveDescriptor>) {
        self.presets.lock().unwrap().waves = waves;
    }

    pub fn wave_preset(&self) -> Vec<WaveDescriptor> {
        self.presets.lock().unwrap().waves.clone()
    }

    /// Swap the envelope preset used for voices spawned from here on.
    pub fn set_envelope_preset(&self, envelope: Envelope) {
        self.presets.lock().unwrap().envelope = envelope;
    }

    pub fn envelope_preset(&self) -> Envelope {
        self.presets.lock().unwrap().envelope
    }

    /// Terminate the driver thread. Voices already sounding are left to
    /// finish on their own. Called automatically on drop.
    pub fn kill(&mut self) {
        self.shared.alive.store(false, Ordering::Release);
        self.shared.playing.store(false, Ordering::Release);
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
    }
}

impl Drop for Song {
    fn drop(&mut self) {
        self.kill();
    }
}

fn drive(
    beats: &[Beat],
    bpm: u32,
    shared: &Shared,
    presets: &Mutex<Presets>,
    factory: SinkFactory,
) {
    // Seconds per beat at this tempo.
    let beat_seconds = 60.0 / bpm as f64;
    let mut live: Vec<VoiceHandle> = Vec::new();

    while shared.alive.load(Ordering::Acquire) {
        if !shared.playing.load(Ordering::Acquire) {
            sleep_while_alive(POLL_INTERVAL, shared);
            continue;
        }

        for beat in beats {
            // The flag is only observed here, at beat boundaries.
            if !shared.playing.load(Ordering::Acquire) || !shared.alive.load(Ordering::Acquire) {
                break;
            }
            live.retain(|voice| !voice.is_dead());

            match beat {
                Beat::Pause { beats: pause } => {
                    sleep_while_alive(seconds(beat_seconds * pause), shared);
                }
                Beat::Notes(chord) => {
                    let preset = presets.lock().unwrap().clone();
                    for note in chord {
                        let frequency = match notes::resolve(&note.pitch) {
                            Ok(f) => f,
                            Err(err) => {
                                warn!("skipping note: {err}");
                                continue;
                            }
                        };
                        if live.len() >= MAX_VOICES {
                            warn!("voice limit reached, dropping {}", note.pitch);
                            continue;
                        }
                        live.push(Voice::spawn(
                            preset.envelope,
                            OscillatorBank::new(frequency, preset.waves.clone()),
                            Some(note.beats * beat_seconds),
                            Arc::clone(&factory),
                        ));
                    }
                    sleep_while_alive(seconds(beat_seconds * beat.gate_beats()), shared);
                }
            }
        }

        // Pass complete (or stopped): the song stops itself.
        shared.playing.store(false, Ordering::Release);
    }
    // Remaining handles are dropped; length-bounded voices finish alone.
}

fn seconds(secs: f64) -> Duration {
    Duration::from_secs_f64(secs.max(0.0))
}

/// Sleep `total`, in slices, bailing early only if the song is killed.
/// Playback stops are NOT observed here — they wait for a beat boundary.
fn sleep_while_alive(total: Duration, shared: &Shared) {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if !shared.alive.load(Ordering::Acquire) {
            return;
        }
        let slice = remaining.min(POLL_INTERVAL);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{AudioSink, CaptureSink};
    use crate::sequencing::BeatNote;
    use crate::SynthError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// A factory that counts how many voices asked for a sink.
    fn counting_factory(count: Arc<AtomicUsize>) -> SinkFactory {
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CaptureSink::new(crate::SAMPLE_RATE)) as Box<dyn AudioSink>)
        })
    }

    fn failing_factory() -> SinkFactory {
        Arc::new(|| Err(SynthError::Device("test device unavailable".into())))
    }

    fn quick_sheet(beats: Vec<Beat>) -> SongSheet {
        SongSheet {
            title: "test".into(),
            bpm: 600, // 100 ms per beat keeps tests fast
            waves: None,
            envelope: Some(Envelope::new(0.01, 0.01, 0.5, 0.01)),
            beats,
        }
    }

    fn wait_until_stopped(song: &Song) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while song.is_playing() {
            assert!(Instant::now() < deadline, "song never self-stopped");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn spawns_one_voice_per_note_and_self_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let sheet = quick_sheet(vec![
            Beat::Notes(vec![BeatNote::new("C4", 0.5)]),
            Beat::Pause { beats: 0.5 },
            Beat::Notes(vec![BeatNote::new("E4", 0.5), BeatNote::new("G4", 1.0)]),
        ]);
        let mut song = Song::new(sheet, counting_factory(Arc::clone(&count)));

        assert!(!song.is_playing());
        song.start_playback();
        wait_until_stopped(&song);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        song.kill();
    }

    #[test]
    fn pause_beats_spawn_nothing_and_take_time() {
        let count = Arc::new(AtomicUsize::new(0));
        // 2 beats at 600 bpm = 200 ms
        let sheet = quick_sheet(vec![Beat::Pause { beats: 2.0 }]);
        let mut song = Song::new(sheet, counting_factory(Arc::clone(&count)));

        song.start_playback();
        let started = Instant::now();
        wait_until_stopped(&song);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() >= Duration::from_millis(150));
        song.kill();
    }

    #[test]
    fn unresolvable_notes_are_skipped_not_fatal() {
        let count = Arc::new(AtomicUsize::new(0));
        let sheet = quick_sheet(vec![Beat::Notes(vec![
            BeatNote::new("X9", 0.5),
            BeatNote::new("A4", 0.5),
        ])]);
        let mut song = Song::new(sheet, counting_factory(Arc::clone(&count)));

        song.start_playback();
        wait_until_stopped(&song);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        song.kill();
    }

    #[test]
    fn sink_failure_is_fatal_to_the_voice_only() {
        let sheet = quick_sheet(vec![
            Beat::Notes(vec![BeatNote::new("C4", 0.5)]),
            Beat::Notes(vec![BeatNote::new("E4", 0.5)]),
        ]);
        let mut song = Song::new(sheet, failing_factory());
        song.start_playback();
        wait_until_stopped(&song);
        song.kill();
    }

    #[test]
    fn voice_spawns_are_capped_per_pass() {
        let count = Arc::new(AtomicUsize::new(0));
        // one chord with more notes than the bound allows
        let chord: Vec<BeatNote> = (0..MAX_VOICES + 8)
            .map(|_| BeatNote::new("A4", 0.5))
            .collect();
        let sheet = quick_sheet(vec![Beat::Notes(chord)]);
        let mut song = Song::new(sheet, counting_factory(Arc::clone(&count)));

        song.start_playback();
        wait_until_stopped(&song);
        assert_eq!(count.load(Ordering::SeqCst), MAX_VOICES);
        song.kill();
    }

    #[test]
    fn stop_ends_the_pass_at_the_next_beat_boundary() {
        let count = Arc::new(AtomicUsize::new(0));
        // long gates leave a wide window to stop inside the first beat
        let sheet = quick_sheet(vec![
            Beat::Notes(vec![BeatNote::new("C4", 5.0)]),
            Beat::Notes(vec![BeatNote::new("E4", 5.0)]),
            Beat::Notes(vec![BeatNote::new("G4", 5.0)]),
        ]);
        let mut song = Song::new(sheet, counting_factory(Arc::clone(&count)));

        song.start_playback();
        let deadline = Instant::now() + Duration::from_secs(10);
        while count.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "first beat never played");
            thread::sleep(Duration::from_millis(5));
        }
        song.stop_playback();
        assert!(!song.is_playing());

        // let the driver cross the first beat's gate and observe the flag
        thread::sleep(Duration::from_millis(700));
        assert_eq!(
            count.load(Ordering::SeqCst),
            1,
            "beats after the stop must not play"
        );
        song.kill();
    }

    #[test]
    fn preset_swaps_apply_to_later_voices() {
        let sheet = quick_sheet(vec![]);
        let mut song = Song::new(sheet, counting_factory(Arc::new(AtomicUsize::new(0))));

        let custom = Envelope::new(0.2, 0.3, 0.9, 0.4);
        song.set_envelope_preset(custom);
        assert_eq!(song.envelope_preset(), custom);

        let waves = vec![crate::dsp::WaveDescriptor::new(
            crate::dsp::WaveShape::Square,
            2.0,
            0.5,
            0.0,
        )];
        song.set_wave_preset(waves.clone());
        assert_eq!(song.wave_preset(), waves);
        song.kill();
    }

    #[test]
    fn kill_joins_the_driver() {
        let sheet = quick_sheet(vec![Beat::Pause { beats: 50.0 }]);
        let mut song = Song::new(sheet, counting_factory(Arc::new(AtomicUsize::new(0))));
        song.start_playback();
        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        song.kill();
        // the sliced sleep notices `alive` within ~one poll interval
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
