//! keys - two-octave terminal synthesizer
//!
//! Run with: cargo run --bin keys -- --mode fm

mod app;
mod ui;

use std::{fs::File, path::PathBuf, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing_subscriber::EnvFilter;

use app::Keys;
use saavy_keys::{config::SynthConfig, dsp::Waveform, SynthMode};

#[derive(Parser, Debug)]
#[command(name = "keys")]
#[command(author, version, about = "Polyphonic additive/AM/FM keyboard synthesizer", long_about = None)]
struct Args {
    /// TOML config file with startup parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Synthesis mode: additive, am or fm
    #[arg(short, long)]
    mode: Option<SynthMode>,

    /// Oscillator waveform: sine, square, sawtooth or triangle
    #[arg(short, long)]
    waveform: Option<Waveform>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, default_value = "keys.log")]
    log_file: PathBuf,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let log = File::create(&args.log_file)
        .wrap_err_with(|| format!("failed to create log file {}", args.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut config = match &args.config {
        Some(path) => SynthConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
        None => SynthConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.synth.mode = mode;
    }
    if let Some(waveform) = args.waveform {
        config.synth.waveform = waveform;
    }

    tracing::info!(mode = %config.synth.mode, waveform = %config.synth.waveform, "starting keys");
    Keys::new(config).run()
}
