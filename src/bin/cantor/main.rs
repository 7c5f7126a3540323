//! cantor — play text-scored songs, or a live keyboard.

mod keys;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use log::info;
use structopt::StructOpt;

use cantor::files;
use cantor::io::device_sink_factory;
use cantor::sequencing::{Song, SongSheet};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "cantor",
    about = "Polyphonic text-scored software synthesizer"
)]
struct Opt {
    /// Play notes live from the keyboard
    #[structopt(short = "i", long = "interactive")]
    interactive: bool,

    /// Wave preset file
    #[structopt(short = "w", long = "wave", parse(from_os_str))]
    wave: Option<PathBuf>,

    /// Envelope preset file
    #[structopt(short = "e", long = "envelope", parse(from_os_str))]
    envelope: Option<PathBuf>,

    /// Song file (ignored in interactive mode)
    #[structopt(short = "s", long = "song", parse(from_os_str))]
    song: Option<PathBuf>,

    /// Verbosity (-v: debug, -vv: trace)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let wave = opt
        .wave
        .as_deref()
        .map(files::load_wave_preset)
        .transpose()
        .wrap_err("failed to read wave preset")?;
    let envelope = opt
        .envelope
        .as_deref()
        .map(files::load_envelope_preset)
        .transpose()
        .wrap_err("failed to read envelope preset")?;

    if opt.interactive {
        return keys::run(wave, envelope);
    }

    let Some(song_path) = opt.song else {
        // Nothing to do without a song.
        Opt::clap().print_help()?;
        println!();
        return Ok(());
    };

    let sheet = files::load_song(&song_path).wrap_err("failed to read song")?;
    let mut song = Song::new(
        apply_presets(sheet, wave, envelope),
        device_sink_factory(),
    );
    info!("loaded {:?} at {} bpm", song.title(), song.bpm());

    song.start_playback();
    while song.is_playing() {
        thread::sleep(Duration::from_millis(100));
    }
    song.kill();
    Ok(())
}

/// Command-line presets fill in wherever the song file did not name its own;
/// a song's presets always win over the flags.
fn apply_presets(
    mut sheet: SongSheet,
    wave: Option<Vec<cantor::dsp::WaveDescriptor>>,
    envelope: Option<cantor::dsp::Envelope>,
) -> SongSheet {
    if sheet.waves.is_none() {
        sheet.waves = wave;
    }
    if sheet.envelope.is_none() {
        sheet.envelope = envelope;
    }
    sheet
}
