//! Transport bar widget - tempo, play state, seed source and statistics

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use chorale_player::service::SeedType;

use super::App;

pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" chorale ").borders(Borders::ALL);

    let session = &app.session;
    let playing = session.is_playing();
    let play_symbol = if playing { "▶" } else { "■" };
    let play_state_str = if playing { "Playing" } else { "Stopped" };

    let seed = match session.seed_type() {
        SeedType::Manual => "manual".to_owned(),
        SeedType::Csv => "csv".to_owned(),
        SeedType::Random => {
            let draw = session
                .seed_random()
                .map_or_else(|| "any".to_owned(), |s| s.to_string());
            format!(
                "random #{} rests {:.2}",
                draw,
                session.config().rest_probability
            )
        }
    };

    let position = match (session.position(), session.chorale()) {
        (Some(index), Some(chorale)) => format!("{}/{}  ", index + 1, chorale.len()),
        _ => String::new(),
    };

    let stats = session.stats();

    let line = Line::from(vec![
        Span::styled(
            format!(" BPM: {:.0}  ", app.tempo_bpm),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if playing { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(position, Style::default().fg(Color::White)),
        Span::styled(
            format!("Seed: {}  Length: {}  ", seed, session.config().length),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(
                "Chords: {}  Range: {}  Rests: {}",
                stats.chord_count_label(),
                stats.pitch_range_label(),
                stats.rest_count_label()
            ),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
