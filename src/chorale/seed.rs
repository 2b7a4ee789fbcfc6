//! Seed ingestion from delimited text.

use thiserror::Error;

use super::{Chord, SeedMatrix, MAX_PITCH, SEED_CHORDS, VOICES};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed needs 8 rows of 4 numbers, found {found} usable rows")]
    TooFewRows { found: usize },
}

/// Parses tabular text (CSV by default) into a [`SeedMatrix`].
///
/// Lines that are blank or have fewer than four fields are skipped. The
/// first four fields of each remaining line become a chord; anything that is
/// not a number counts as a rest. Parsing stops after eight rows, and the
/// text is rejected as a whole if fewer than eight were found.
#[derive(Debug, Clone, Copy)]
pub struct SeedTableParser {
    delimiter: char,
}

impl SeedTableParser {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    /// Set the field delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn parse(&self, text: &str) -> Result<SeedMatrix, SeedError> {
        let mut rows = [Chord::REST; SEED_CHORDS];
        let mut found = 0;

        // `lines` also strips the `\r` of CRLF endings
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let fields: Vec<&str> = line.split(self.delimiter).collect();
            if fields.len() < VOICES {
                continue;
            }

            let mut chord = [0u8; VOICES];
            for (slot, field) in chord.iter_mut().zip(&fields) {
                *slot = coerce_pitch(field);
            }
            rows[found] = Chord(chord);
            found += 1;

            if found == SEED_CHORDS {
                return Ok(SeedMatrix(rows));
            }
        }

        Err(SeedError::TooFewRows { found })
    }
}

impl Default for SeedTableParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse comma-separated seed text
pub fn parse_seed_table(text: &str) -> Result<SeedMatrix, SeedError> {
    SeedTableParser::new().parse(text)
}

/// Non-numeric and empty fields are rests; numbers are truncated and clamped
/// into the MIDI range.
fn coerce_pitch(field: &str) -> u8 {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return 0;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc().clamp(0.0, MAX_PITCH as f64) as u8,
        _ => 0,
    }
}
