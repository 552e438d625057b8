//! TUI module for keys
//!
//! Piano, control panel and oscilloscope, driven by crossterm key and mouse
//! events routed into the synth session.

mod controls;
mod piano;
mod status;
mod waveform;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use saavy_keys::{
    io::HoldGate, InputEvent, InputRouter, NoteId, PolySynth, SharedEngine, SynthMode,
};

use controls::{render_controls, Control};
use piano::{key_at, render_piano};
use status::{render_status, AudioStats, StatusLine};
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// UI application state
pub struct UiApp {
    synth: PolySynth<SharedEngine>,
    router: InputRouter,
    /// Synthesized releases when the terminal cannot report them
    gate: HoldGate,
    /// Whether the terminal reports key release events
    releases: bool,
    /// Ring buffer receiver for audio samples
    audio_rx: Consumer<f32>,
    /// Audio sample buffer for visualization
    audio_buffer: Vec<f32>,
    /// Key held down by the mouse
    mouse_key: Option<NoteId>,
    /// Piano area from the last frame, for mouse hit-testing
    piano_area: Rect,
    selected: usize,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        synth: PolySynth<SharedEngine>,
        audio_rx: Consumer<f32>,
        gate: HoldGate,
        releases: bool,
    ) -> Self {
        Self {
            synth,
            router: InputRouter::new(),
            gate,
            releases,
            audio_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            mouse_key: None,
            piano_area: Rect::default(),
            selected: 0,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.expire_held_keys();
            self.synth.tick();
            for event in self.synth.drain_events() {
                tracing::trace!(?event, "session event");
            }

            terminal.draw(|frame| self.render(frame))?;

            // Handle input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        self.synth.all_notes_off();
        Ok(())
    }

    /// Poll for new audio samples from ring buffer
    fn poll_audio(&mut self) {
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    fn expire_held_keys(&mut self) {
        if self.releases {
            return;
        }
        for id in self.gate.expired(Instant::now()) {
            self.router.route(&mut self.synth, InputEvent::KeyUp(id));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char(c) = key.code {
            if key.modifiers.contains(KeyModifiers::CONTROL) && c == 'c' {
                self.should_quit = true;
                return;
            }
            if let Some(id) = NoteId::from_char(c).filter(|id| self.synth.table().contains(*id)) {
                self.handle_note_key(id, key.kind);
                return;
            }
        }

        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                self.synth.start_output();
            }
            KeyCode::F(1) => {
                self.synth.set_mode(SynthMode::Additive);
            }
            KeyCode::F(2) => {
                self.synth.set_mode(SynthMode::Am);
            }
            KeyCode::F(3) => {
                self.synth.set_mode(SynthMode::Fm);
            }
            KeyCode::F(4) => {
                let next = self.synth.params().waveform.next();
                self.synth.set_waveform(next);
            }
            KeyCode::F(5) => {
                let enabled = !self.synth.params().vibrato.enabled;
                self.synth.set_vibrato_enabled(enabled);
            }
            KeyCode::Up => {
                self.selected = (self.selected + Control::ALL.len() - 1) % Control::ALL.len();
            }
            KeyCode::Down => self.selected = (self.selected + 1) % Control::ALL.len(),
            KeyCode::Left => Control::ALL[self.selected].adjust(&mut self.synth, -1),
            KeyCode::Right => Control::ALL[self.selected].adjust(&mut self.synth, 1),
            _ => {}
        }
    }

    fn handle_note_key(&mut self, id: NoteId, kind: KeyEventKind) {
        match kind {
            KeyEventKind::Release => {
                self.gate.release(id);
                self.router.route(&mut self.synth, InputEvent::KeyUp(id));
            }
            KeyEventKind::Repeat if self.releases => {}
            _ if self.releases => {
                self.router.route(&mut self.synth, InputEvent::KeyDown(id));
            }
            _ => {
                if self.gate.press(id, Instant::now()) {
                    self.router.route(&mut self.synth, InputEvent::KeyDown(id));
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let table = self.synth.table();
        let under = key_at(&table, self.piano_area, mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = under {
                    if self.router.route(&mut self.synth, InputEvent::MouseDown(id)) {
                        self.mouse_key = Some(id);
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(held) = self.mouse_key.filter(|held| Some(*held) != under) {
                    self.router.route(&mut self.synth, InputEvent::MouseLeave(held));
                    self.mouse_key = None;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(held) = self.mouse_key.take() {
                    self.router.route(&mut self.synth, InputEvent::MouseUp(held));
                }
            }
            _ => {}
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Main layout: status, piano, controls + scope, help
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Status bar
                Constraint::Length(10), // Piano
                Constraint::Min(14),    // Controls and waveform
                Constraint::Length(1),  // Help bar
            ])
            .split(area);

        let pressed = self.synth.pressed_labels();
        let status = StatusLine {
            state: self.synth.output_state(),
            active: self.synth.active_count(),
            releasing: self.synth.releasing_count(),
            pressed: &pressed,
            stats: AudioStats::from_buffer(&self.audio_buffer),
        };
        render_status(frame, chunks[0], &status);

        let table = self.synth.table();
        let synth = &self.synth;
        self.piano_area = render_piano(frame, chunks[1], &table, |id| synth.is_pressed(id));

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(20)])
            .split(chunks[2]);
        render_controls(frame, body[0], self.synth.params(), self.selected);
        render_waveform(
            frame,
            body[1],
            &self.audio_buffer,
            self.synth.params().master_volume,
        );

        let help = if self.synth.is_running() {
            " [Z..M Q..U] Play  [F1-F3] Mode  [F4] Wave  [F5] Vibrato  [↑↓←→] Adjust  [Esc] Quit"
        } else {
            " [Enter] Start audio  [Esc] Quit"
        };
        let help = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
