//! Interactive mode: the middle keyboard row is a piano octave.
//!
//! With a terminal that reports key releases (kitty keyboard protocol),
//! holding a key holds the note and releasing it triggers the envelope's
//! release — one sounding voice per key, exactly one writer and one reader
//! per map entry. Terminals without release events fall back to
//! fixed-length notes per press.

use std::collections::HashMap;
use std::io::{stdout, Write};
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use log::{info, warn};

use cantor::dsp::{oscillator::default_wave_preset, Envelope, OscillatorBank, WaveDescriptor};
use cantor::io::device_sink_factory;
use cantor::sequencing::notes;
use cantor::synth::{Voice, VoiceHandle};

/// Key-to-note layout, C4 up to C5 with sharps on the row above.
const NOTE_KEYS: [(char, &str); 13] = [
    ('a', "C4"),
    ('w', "C#4"),
    ('s', "D4"),
    ('e', "D#4"),
    ('d', "E4"),
    ('f', "F4"),
    ('t', "F#4"),
    ('g', "G4"),
    ('y', "G#4"),
    ('h', "A4"),
    ('u', "A#4"),
    ('j', "B4"),
    ('k', "C5"),
];

/// Note length per press when the terminal cannot report releases.
const FALLBACK_NOTE_SECONDS: f64 = 0.5;

pub fn run(wave: Option<Vec<WaveDescriptor>>, envelope: Option<Envelope>) -> Result<()> {
    let waves = wave.unwrap_or_else(default_wave_preset);
    let envelope = envelope.unwrap_or_default();
    let factory = device_sink_factory();
    let layout: HashMap<char, &str> = NOTE_KEYS.into_iter().collect();

    enable_raw_mode()?;
    let releases = supports_keyboard_enhancement().unwrap_or(false);
    if releases {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    } else {
        warn!("terminal does not report key releases; notes play {FALLBACK_NOTE_SECONDS}s each");
    }
    // raw mode: line-buffered stdout will not flush on its own
    print!("keys  a w s e d f t g y h u j k  ->  C4 .. C5,  Esc quits\r\n");
    stdout().flush()?;

    let result = key_loop(releases, &layout, &waves, envelope, &factory);

    if releases {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    disable_raw_mode()?;
    result
}

fn key_loop(
    releases: bool,
    layout: &HashMap<char, &str>,
    waves: &[WaveDescriptor],
    envelope: Envelope,
    factory: &cantor::io::SinkFactory,
) -> Result<()> {
    // One sounding voice per key, at most.
    let mut sounding: HashMap<char, VoiceHandle> = HashMap::new();

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        let quit = key.code == KeyCode::Esc
            || key.code == KeyCode::F(12)
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit && key.kind == KeyEventKind::Press {
            break;
        }
        let KeyCode::Char(c) = key.code else {
            continue;
        };
        let Some(&pitch) = layout.get(&c) else {
            continue;
        };

        match key.kind {
            KeyEventKind::Press => {
                if sounding.get(&c).is_some_and(|v| !v.is_dead()) {
                    continue; // already sounding, keep holding
                }
                if let Some(mut old) = sounding.remove(&c) {
                    old.stop();
                }
                let frequency = match notes::resolve(pitch) {
                    Ok(f) => f,
                    Err(err) => {
                        warn!("{err}");
                        continue;
                    }
                };
                let length = (!releases).then_some(FALLBACK_NOTE_SECONDS);
                sounding.insert(
                    c,
                    Voice::spawn(
                        envelope,
                        OscillatorBank::new(frequency, waves.to_vec()),
                        length,
                        Arc::clone(factory),
                    ),
                );
            }
            KeyEventKind::Release => {
                if let Some(mut voice) = sounding.remove(&c) {
                    voice.stop();
                }
            }
            KeyEventKind::Repeat => {}
        }
    }

    info!("stopping {} voice(s)", sounding.len());
    for (_, mut voice) in sounding.drain() {
        voice.stop();
    }
    Ok(())
}
