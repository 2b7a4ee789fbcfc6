//! Terminal controller: owns the session and maps keys onto it

use std::{path::PathBuf, time::Duration};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;

use chorale_player::{
    audio::CpalBackend,
    chorale::{MAX_PITCH, SEED_CHORDS, VOICES},
    service::{GenerationService, JsonExport, SeedType},
    Session,
};

use super::ui;

const TEMPO_STEP: f64 = 5.0;
const MIN_TEMPO: f64 = 20.0;
const MAX_TEMPO: f64 = 300.0;
/// Chords skipped per arrow press
const SCROLL_STEP: usize = 4;
const REST_STEP: f64 = 0.05;
/// Requested length moves in whole seed-sized steps
const LENGTH_STEP: usize = SEED_CHORDS;
const MAX_LENGTH: usize = 512;

pub struct App {
    pub session: Session<CpalBackend>,
    service: Box<dyn GenerationService>,
    export_path: PathBuf,
    pub tempo_bpm: f64,
    /// First chord shown in the roll
    pub scroll: usize,
    /// Chords that fit in the roll view at the last draw
    pub visible_chords: usize,
    /// Selected seed grid cell as (chord, voice)
    pub seed_cursor: (usize, usize),
    /// Transient message from the app itself (exports)
    pub notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: Session<CpalBackend>,
        service: Box<dyn GenerationService>,
        export_path: PathBuf,
    ) -> Self {
        let tempo_bpm = session.config().tempo_bpm;
        Self {
            session,
            service,
            export_path,
            tempo_bpm,
            scroll: 0,
            visible_chords: 0,
            seed_cursor: (0, 0),
            notice: None,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.session.tick();
            self.follow_playhead();

            terminal.draw(|frame| ui::render(frame, self))?;

            // Non-blocking, ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.session.stop();
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => {
                self.session.play(self.tempo_bpm);
            }
            KeyCode::Char('s') => self.session.stop(),
            KeyCode::Char('g') => {
                self.notice = None;
                if self.session.generate(self.service.as_mut()) {
                    self.scroll = 0;
                }
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('n') => self.session.toggle_notes(),
            KeyCode::Tab => {
                let next = match self.session.seed_type() {
                    SeedType::Manual => SeedType::Csv,
                    SeedType::Csv => SeedType::Random,
                    SeedType::Random => SeedType::Manual,
                };
                self.session.set_seed_type(next);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.tempo_bpm = (self.tempo_bpm + TEMPO_STEP).min(MAX_TEMPO);
            }
            KeyCode::Char('-') => {
                self.tempo_bpm = (self.tempo_bpm - TEMPO_STEP).max(MIN_TEMPO);
            }
            KeyCode::Left => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            KeyCode::Right => {
                self.scroll = (self.scroll + SCROLL_STEP).min(self.max_scroll());
            }
            KeyCode::Home => self.scroll = 0,
            KeyCode::Char('r') => {
                let next = self.session.seed_random().map_or(0, |s| s.wrapping_add(1));
                self.session.set_seed_random(Some(next));
            }
            KeyCode::Char('R') => self.session.set_seed_random(None),
            KeyCode::Char('[') => {
                let p = self.session.config().rest_probability;
                self.session.set_rest_probability(p - REST_STEP);
            }
            KeyCode::Char(']') => {
                let p = self.session.config().rest_probability;
                self.session.set_rest_probability(p + REST_STEP);
            }
            KeyCode::Char('<') | KeyCode::Char(',') => {
                let length = self.session.config().length.saturating_sub(LENGTH_STEP);
                self.session.set_length(length.max(SEED_CHORDS));
            }
            KeyCode::Char('>') | KeyCode::Char('.') => {
                let length = self.session.config().length + LENGTH_STEP;
                self.session.set_length(length.min(MAX_LENGTH));
            }
            KeyCode::Up => self.seed_cursor.0 = self.seed_cursor.0.saturating_sub(1),
            KeyCode::Down => self.seed_cursor.0 = (self.seed_cursor.0 + 1).min(SEED_CHORDS - 1),
            KeyCode::Char('h') => self.seed_cursor.1 = self.seed_cursor.1.saturating_sub(1),
            KeyCode::Char('l') => self.seed_cursor.1 = (self.seed_cursor.1 + 1).min(VOICES - 1),
            KeyCode::PageUp => self.nudge_seed(1),
            KeyCode::PageDown => self.nudge_seed(-1),
            KeyCode::Char('0') => {
                let (chord, voice) = self.seed_cursor;
                self.session.set_seed_pitch(chord, voice, 0);
            }
            _ => {}
        }
    }

    fn export(&mut self) {
        let Some(bytes) = self.session.export(&mut JsonExport) else {
            return;
        };
        self.notice = Some(match std::fs::write(&self.export_path, bytes) {
            Ok(()) => format!("Exported to {}", self.export_path.display()),
            Err(err) => format!("Error: {err}"),
        });
    }

    /// Move the selected seed pitch by `delta` semitones
    fn nudge_seed(&mut self, delta: i16) {
        let (chord, voice) = self.seed_cursor;
        let pitch = self.session.seed_grid().rows()[chord].pitches()[voice];
        let pitch = (pitch as i16 + delta).clamp(0, MAX_PITCH as i16) as u8;
        self.session.set_seed_pitch(chord, voice, pitch);
    }

    fn max_scroll(&self) -> usize {
        let chords = self.session.chorale().map_or(0, |c| c.len());
        chords.saturating_sub(self.visible_chords.max(1))
    }

    /// Keep the playhead inside the roll view
    fn follow_playhead(&mut self) {
        let Some(position) = self.session.position() else {
            return;
        };
        let visible = self.visible_chords.max(1);
        if position < self.scroll || position >= self.scroll + visible {
            self.scroll = position.min(self.max_scroll());
        }
    }
}
