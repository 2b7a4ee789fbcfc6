//! Piano roll widget - samples the rendered surface into terminal cells
//!
//! One terminal column per chord. Each cell shows two stacked pixel rows
//! with the upper half block: foreground is the top sample, background
//! the bottom one. A gutter on the left labels the C of each octave and,
//! on the ruler row, the chord at the scroll cursor.

use std::ops::Range;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use chorale_player::roll::{PianoRoll, Rgba, RollLayout, Surface};

use super::{App, SEED_COLOR};

/// Width of the label gutter
const GUTTER: usize = 5;

/// Draw the roll and return how many chords fit across `area`
pub fn render_roll(frame: &mut Frame, area: Rect, app: &App) -> usize {
    if area.height < 2 || (area.width as usize) < GUTTER + 4 {
        return 0;
    }
    let columns = area.width as usize - GUTTER;

    let session = &app.session;
    if session.chorale().is_none() {
        let hint = Paragraph::new(" No chorale yet. Press [G] to generate.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, area);
        return columns;
    }

    let surface = session.surface();
    let roll = session.roll();
    let layout = roll.layout();

    // Last row is the ruler
    let rows = area.height as usize - 1;
    let half_rows = rows * 2;
    let pitch_rows = layout.pitch_rows();

    let mut lines = Vec::with_capacity(rows + 1);
    for row in 0..rows {
        let top = pitch_span(2 * row, half_rows, pitch_rows);
        let bottom = pitch_span(2 * row + 1, half_rows, pitch_rows);

        let label = octave_label(roll, top.start..bottom.end);
        let mut spans = vec![Span::styled(label, Style::default().fg(Color::DarkGray))];
        spans.extend((0..columns).map(|col| {
            let x = column_x(layout, app.scroll + col);
            let fg = to_color(sample(surface, layout, x, top.clone()));
            let bg = to_color(sample(surface, layout, x, bottom.clone()));
            Span::styled("▀", Style::default().fg(fg).bg(bg))
        }));
        lines.push(Line::from(spans));
    }

    lines.push(ruler(app, roll, columns));
    frame.render_widget(Paragraph::new(lines), area);
    columns
}

/// Pitch rows covered by half-row `index` of `half_rows`
fn pitch_span(index: usize, half_rows: usize, pitch_rows: usize) -> Range<usize> {
    let start = index * pitch_rows / half_rows;
    let end = ((index + 1) * pitch_rows / half_rows).max(start + 1);
    start..end.min(pitch_rows)
}

/// Pixel column sampled for the chord in terminal column `chord`
fn column_x(layout: &RollLayout, chord: usize) -> usize {
    chord * layout.cell_width + layout.cell_width / 2
}

/// Label the first C among the pitch rows a terminal row covers
fn octave_label(roll: &PianoRoll, pitch_rows: Range<usize>) -> String {
    let row_height = roll.layout().row_height;
    pitch_rows
        .filter_map(|row| roll.pitch_at(row * row_height + row_height / 2))
        .find(|pitch| pitch % 12 == 0)
        .map_or_else(
            || " ".repeat(GUTTER),
            |pitch| format!("C{:<3}│", i32::from(pitch) / 12 - 1),
        )
}

/// Prefer a note over background when several pitch rows share a cell
fn sample(surface: &Surface, layout: &RollLayout, x: usize, pitch_rows: Range<usize>) -> Option<Rgba> {
    let mut found = None;
    for pitch_row in pitch_rows {
        let y = pitch_row * layout.row_height + layout.row_height / 2;
        let px = surface.pixel(x, y)?;
        if px.a == 255 {
            return Some(px);
        }
        found = Some(px);
    }
    found
}

fn to_color(px: Option<Rgba>) -> Color {
    match px {
        Some(px) if px.a > 0 => {
            let px = px.over(Rgba::opaque(0, 0, 0));
            Color::Rgb(px.r, px.g, px.b)
        }
        _ => Color::Reset,
    }
}

/// Seed boundary and playhead markers under the roll, after the number of
/// the chord at the scroll cursor
fn ruler(app: &App, roll: &PianoRoll, columns: usize) -> Line<'static> {
    let boundary = app.session.seed_boundary();
    let playhead = app.session.position();
    let layout = roll.layout();

    let cursor = roll.chord_at(column_x(layout, app.scroll)) + 1;
    let mut spans = vec![Span::styled(
        format!("{:>width$} ", cursor, width = GUTTER - 1),
        Style::default().fg(Color::DarkGray),
    )];
    spans.extend((0..columns).map(|col| {
        let chord = roll.chord_at(column_x(layout, app.scroll + col));
        if Some(chord) == playhead {
            Span::styled("▲", Style::default().fg(Color::Yellow))
        } else if chord == boundary {
            Span::styled("┃", Style::default().fg(SEED_COLOR))
        } else if chord % 8 == 0 {
            Span::styled("┆", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled("─", Style::default().fg(Color::DarkGray))
        }
    }));
    Line::from(spans)
}
