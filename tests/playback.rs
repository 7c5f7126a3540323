//! End-to-end playback through an offline capture sink: a voice thread's
//! whole lifecycle, and a parsed song driving the sequencer.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use cantor::dsp::{oscillator::default_wave_preset, Envelope, OscillatorBank};
use cantor::io::CaptureSink;
use cantor::sequencing::Song;
use cantor::synth::Voice;
use cantor::{files, MAX_VOLUME, SAMPLE_RATE};

fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

fn short_envelope() -> Envelope {
    Envelope::new(0.01, 0.01, 0.5, 0.02)
}

#[test]
fn fixed_length_voice_dies_on_its_own() {
    let sink = CaptureSink::new(SAMPLE_RATE);
    let bank = OscillatorBank::new(440.0, default_wave_preset());
    let handle = Voice::spawn(short_envelope(), bank, Some(0.1), sink.factory());

    wait_for("voice death", || handle.is_dead());
    handle.join();

    let samples = sink.samples();
    assert!(!samples.is_empty());
    // length + release worth of audio, rounded up to whole blocks
    let min_samples = (0.1 * SAMPLE_RATE as f64) as usize;
    assert!(samples.len() >= min_samples);
    assert!(samples.iter().any(|s| s.abs() > 0.01), "expected audio");
}

#[test]
fn samples_never_exceed_the_volume_ceiling() {
    let sink = CaptureSink::new(SAMPLE_RATE);
    let bank = OscillatorBank::new(440.0, default_wave_preset());
    let handle = Voice::spawn(short_envelope(), bank, Some(0.1), sink.factory());
    wait_for("voice death", || handle.is_dead());
    handle.join();

    let peak = sink
        .samples()
        .iter()
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!((peak as f64) <= MAX_VOLUME + 1e-6, "peak {peak}");
}

#[test]
fn stop_fades_an_unbounded_voice_out() {
    let sink = CaptureSink::new(SAMPLE_RATE);
    let bank = OscillatorBank::new(220.0, default_wave_preset());
    let mut handle = Voice::spawn(short_envelope(), bank, None, sink.factory());

    thread::sleep(Duration::from_millis(20));
    assert!(!handle.is_dead(), "held voice must sustain");
    handle.stop();
    wait_for("release to finish", || handle.is_dead());

    // stopping a dead voice is harmless
    handle.stop();
    handle.join();
    assert!(!sink.is_empty());
}

#[test]
fn a_parsed_song_plays_through_the_sequencer() {
    let src = "Round Trip\n1 600\n---\n1 C4:0.5\n0 0.5\n2 E4:0.5 G4:1.0\n";
    let sheet = files::parse_song(src, Path::new(".")).unwrap();
    assert_eq!(sheet.title, "Round Trip");

    let sink = CaptureSink::new(SAMPLE_RATE);
    let mut song = Song::new(sheet, sink.factory());
    song.set_envelope_preset(short_envelope());

    song.start_playback();
    wait_for("song to self-stop", || !song.is_playing());
    song.kill();

    // voices may outlive the pass briefly; give their releases a moment
    wait_for("voices to finish", || {
        let before = sink.len();
        thread::sleep(Duration::from_millis(50));
        sink.len() == before && before > 0
    });
    assert!(sink.samples().iter().any(|s| s.abs() > 0.01));
}
