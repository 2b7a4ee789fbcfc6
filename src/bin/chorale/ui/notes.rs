//! Notes listing - chord numbers and the four pitches of each chord

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use chorale_player::{audio::CpalBackend, Session};

use super::SEED_COLOR;

pub fn render_notes(frame: &mut Frame, area: Rect, session: &Session<CpalBackend>) {
    let title = if session.shows_all_notes() {
        " Notes [N] less "
    } else {
        " Notes [N] all "
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let header = Row::new(["#", "1", "2", "3", "4"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let playhead = session.position();
    let rows = session.notes().into_iter().map(|note| {
        let mut cells = vec![Cell::from(note.number.to_string())];
        cells.extend(note.chord.pitches().iter().map(|p| Cell::from(p.to_string())));

        let mut style = if note.seed {
            Style::default().fg(SEED_COLOR)
        } else {
            Style::default()
        };
        if playhead == Some(note.number - 1) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Row::new(cells).style(style)
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}
