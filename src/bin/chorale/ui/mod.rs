//! TUI module for chorale
//!
//! Layout: transport bar on top, piano roll with the notes listing and
//! seed grid beside it, then the status box and a help bar.

mod notes;
mod roll;
mod transport;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::app::App;

use notes::render_notes;
use roll::render_roll;
use transport::render_transport;

/// Seed chords are highlighted in the seed note color everywhere
pub const SEED_COLOR: Color = Color::Rgb(0xf7, 0xb7, 0x33);

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(12),   // Roll + side panel
            Constraint::Length(4), // Status
            Constraint::Length(2), // Help bar
        ])
        .split(area);

    render_transport(frame, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(30)])
        .split(chunks[1]);

    let roll_block = Block::default()
        .title(" Piano roll ")
        .borders(Borders::ALL);
    let roll_inner = roll_block.inner(body[0]);
    frame.render_widget(roll_block, body[0]);
    app.visible_chords = render_roll(frame, roll_inner, app);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(10)])
        .split(body[1]);
    render_notes(frame, side[0], &app.session);
    render_seed(frame, side[1], app);

    render_status(frame, chunks[2], app);

    let help = Paragraph::new(vec![
        Line::from(
            " [Q] Quit  [G] Generate  [Space] Play  [S] Stop  [Tab] Seed  [+/-] Tempo  [←/→] Scroll  [N] Notes  [E] Export",
        ),
        Line::from(
            " [↑/↓/H/L] Seed cell  [PgUp/PgDn] Pitch  [0] Rest  [</>] Length  [R/Shift-R] Random seed  [[/]] Rest odds",
        ),
    ])
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}

fn render_seed(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Seed ").borders(Borders::ALL);
    let (cursor_chord, cursor_voice) = app.seed_cursor;
    let lines: Vec<Line> = app
        .session
        .seed_grid()
        .rows()
        .iter()
        .enumerate()
        .map(|(row, chord)| {
            let spans: Vec<Span> = chord
                .pitches()
                .iter()
                .enumerate()
                .map(|(voice, pitch)| {
                    let mut style = Style::default().fg(SEED_COLOR);
                    if (row, voice) == (cursor_chord, cursor_voice) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!(" {pitch:>3}"), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Status ").borders(Borders::ALL);

    let mut lines = vec![Line::from(Span::styled(
        app.session.status().to_owned(),
        Style::default().fg(Color::White),
    ))];

    let mut second = Vec::new();
    if !app.session.csv_status().is_empty() {
        second.push(Span::styled(
            format!("{}  ", app.session.csv_status()),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(notice) = &app.notice {
        second.push(Span::styled(notice.clone(), Style::default().fg(Color::Green)));
    }
    lines.push(Line::from(second));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
