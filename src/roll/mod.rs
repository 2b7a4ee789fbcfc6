//! Piano-roll rasterization of a chorale.

/*
Piano Roll Geometry
===================

The roll is a grid: one column per chord, one row per semitone.

     y
     0 ┌──────────────────────────────────────────────→ x
       │ P_max ░░░░░░░░░│
       │       ░░██░░░░░│        ██       ██
       │       ░░░░██░░░│   ██        ██
       │       ░░░░░░░░░│        ██
       │ P_min ░░░░░░░░░│
       └────────────────┴──────────────────────
        seed region      divider   generated region
        (tinted)         at boundary × cell_width

Mapping for chord index i and pitch p:

    x = i × cell_width
    y = (P_max − p) × row_height

so higher pitches sit nearer the top. Each note is a block one pixel
narrower and shorter than its cell, leaving a hairline gap between
neighbours. Pitches outside [P_min, P_max] fall off the surface and are
clipped.

Paint order matters for the translucent layers:

    1. clear to transparent
    2. background
    3. seed tint over [0, boundary × cell_width)
    4. note blocks (seed chords and generated chords in different colors)
    5. divider line at boundary × cell_width

Every render starts from step 1, so the output depends only on the chorale,
the boundary and the layout.
*/

pub mod surface;

use serde::{Deserialize, Serialize};

use crate::chorale::Chorale;

pub use surface::{Rect, Rgba, Surface};

/// Grid dimensions of the roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollLayout {
    /// Pixels per chord
    pub cell_width: usize,
    /// Pixels per semitone
    pub row_height: usize,
    /// Lowest displayable pitch
    pub min_pitch: u8,
    /// Highest displayable pitch
    pub max_pitch: u8,
    /// The surface never gets narrower than this
    pub min_width: usize,
}

impl Default for RollLayout {
    fn default() -> Self {
        Self {
            cell_width: 10,
            row_height: 6,
            min_pitch: 36,
            max_pitch: 81,
            min_width: 640,
        }
    }
}

impl RollLayout {
    /// Number of semitones in the pitch window
    pub fn pitch_rows(&self) -> usize {
        (self.max_pitch.saturating_sub(self.min_pitch)) as usize + 1
    }

    pub fn surface_width(&self, chords: usize) -> usize {
        self.min_width.max(chords * self.cell_width)
    }

    pub fn surface_height(&self) -> usize {
        self.pitch_rows() * self.row_height
    }
}

/// Colors used by the roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollPalette {
    pub background: Rgba,
    pub seed_tint: Rgba,
    pub seed_note: Rgba,
    pub generated_note: Rgba,
    pub divider: Rgba,
}

impl Default for RollPalette {
    fn default() -> Self {
        Self {
            background: Rgba::with_alpha(10, 12, 18, 0.9),
            seed_tint: Rgba::with_alpha(247, 183, 51, 0.08),
            seed_note: Rgba::opaque(0xf7, 0xb7, 0x33),
            generated_note: Rgba::opaque(0x8e, 0xca, 0xe6),
            divider: Rgba::with_alpha(255, 255, 255, 0.08),
        }
    }
}

/// Draws chorales onto a [`Surface`]
#[derive(Debug, Clone, Default)]
pub struct PianoRoll {
    layout: RollLayout,
    palette: RollPalette,
}

impl PianoRoll {
    pub fn new(layout: RollLayout) -> Self {
        Self {
            layout,
            palette: RollPalette::default(),
        }
    }

    pub fn layout(&self) -> &RollLayout {
        &self.layout
    }

    pub fn palette(&self) -> &RollPalette {
        &self.palette
    }

    /// Repaint `surface` with `chorale`. Chords before `seed_boundary` are
    /// drawn as seed material.
    ///
    /// A missing chorale clears the surface and draws nothing else.
    pub fn render(&self, surface: &mut Surface, chorale: Option<&Chorale>, seed_boundary: usize) {
        let Some(chorale) = chorale else {
            surface.clear();
            return;
        };

        let width = self.layout.surface_width(chorale.len());
        let height = self.layout.surface_height();
        surface.reset(width, height);

        let full = Rect::new(0, 0, width as i64, height as i64);
        surface.fill_rect(full, self.palette.background);

        let seed_x = self.boundary_x(seed_boundary);
        surface.fill_rect(Rect::new(0, 0, seed_x, height as i64), self.palette.seed_tint);

        for (index, chord) in chorale.iter().enumerate() {
            let color = if index < seed_boundary {
                self.palette.seed_note
            } else {
                self.palette.generated_note
            };
            for pitch in chord.notes() {
                surface.fill_rect(self.note_rect(index, pitch), color);
            }
        }

        surface.vline(seed_x, self.palette.divider);
    }

    /// Block occupied by `pitch` in chord `index`
    pub fn note_rect(&self, index: usize, pitch: u8) -> Rect {
        let cell = self.layout.cell_width as i64;
        let row = self.layout.row_height as i64;
        let x = index as i64 * cell;
        let y = (self.layout.max_pitch as i64 - pitch as i64) * row;
        Rect::new(x, y, (cell - 1).max(1), (row - 1).max(1))
    }

    /// x coordinate of the seed/generated divider, saturating for
    /// boundaries far past the end of the surface
    pub fn boundary_x(&self, seed_boundary: usize) -> i64 {
        let x = seed_boundary.saturating_mul(self.layout.cell_width);
        i64::try_from(x).unwrap_or(i64::MAX)
    }

    /// Chord index under pixel column `x`
    pub fn chord_at(&self, x: usize) -> usize {
        x / self.layout.cell_width.max(1)
    }

    /// Pitch under pixel row `y`, if it lies inside the window
    pub fn pitch_at(&self, y: usize) -> Option<u8> {
        let row = y / self.layout.row_height.max(1);
        if row >= self.layout.pitch_rows() {
            return None;
        }
        Some(self.layout.max_pitch - row as u8)
    }
}
