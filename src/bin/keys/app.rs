//! Keys - audio device setup and terminal lifecycle

use std::io::stdout;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use rtrb::RingBuffer;

use saavy_keys::{config::SynthConfig, GraphEngine, PolySynth, SharedEngine, MAX_BLOCK_SIZE};

use super::ui::UiApp;

/// Oscilloscope ring capacity in samples
const SCOPE_CAPACITY: usize = 8192;

/// Main application: owns the startup configuration until `run`.
pub struct Keys {
    config: SynthConfig,
}

impl Keys {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Open the default output device, start streaming and take over the
    /// terminal until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = f64::from(config.sample_rate().0);
        let channels = config.channels() as usize;
        tracing::info!(sample_rate, channels, "output device ready");

        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);
        let mut engine = GraphEngine::new(sample_rate);
        engine.set_scope(scope_tx);
        let engine = SharedEngine::new(engine);

        // The callback renders the same engine the UI thread edits
        let audio = engine.clone();
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames_to_render];
                        audio.render(block);

                        // Copy to output (mono to all channels)
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }

                        frames_written += frames_to_render;
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .wrap_err("failed to build output stream")?;
        stream.play().wrap_err("failed to start output stream")?;

        let synth = PolySynth::new(engine, self.config.synth);
        let releases = supports_keyboard_enhancement().unwrap_or(false);
        tracing::info!(releases, "key release reporting");

        let mut terminal = ratatui::init();
        execute!(stdout(), EnableMouseCapture)?;
        if releases {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let mut app = UiApp::new(synth, scope_rx, self.config.keyboard.hold_gate(), releases);
        let result = app.run(&mut terminal);

        if releases {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        execute!(stdout(), DisableMouseCapture)?;
        ratatui::restore();
        drop(stream);

        result
    }
}
