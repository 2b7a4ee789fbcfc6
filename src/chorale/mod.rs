//! Chorale data model: four-voice chords of MIDI pitches.
//!
//! A pitch of `0` is a rest. Voice order is preserved but nothing downstream
//! depends on it; renderer and scheduler treat every non-zero entry alike.

pub mod pitch;
pub mod seed;
pub mod stats;

use serde::{Deserialize, Serialize};

pub use pitch::frequency;
pub use seed::{parse_seed_table, SeedError, SeedTableParser};
pub use stats::{ChoraleStats, PitchRange};

/// Number of simultaneous voices in a chord
pub const VOICES: usize = 4;

/// Number of chords in a seed
pub const SEED_CHORDS: usize = 8;

/// Highest valid MIDI pitch
pub const MAX_PITCH: u8 = 127;

/// Four simultaneous MIDI pitches (0 = rest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chord(pub [u8; VOICES]);

impl Chord {
    pub const REST: Chord = Chord([0; VOICES]);

    pub fn new(pitches: [u8; VOICES]) -> Self {
        Self(pitches)
    }

    /// All four entries, rests included, in voice order
    pub fn pitches(&self) -> &[u8; VOICES] {
        &self.0
    }

    /// Sounding pitches only
    pub fn notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied().filter(|&p| p > 0)
    }

    pub fn rest_count(&self) -> usize {
        self.0.iter().filter(|&&p| p == 0).count()
    }
}

impl From<[u8; VOICES]> for Chord {
    fn from(pitches: [u8; VOICES]) -> Self {
        Self(pitches)
    }
}

/// An ordered sequence of chords
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chorale {
    chords: Vec<Chord>,
}

impl Chorale {
    pub fn new(chords: Vec<Chord>) -> Self {
        Self { chords }
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chord> {
        self.chords.iter()
    }
}

impl From<Vec<[u8; VOICES]>> for Chorale {
    fn from(rows: Vec<[u8; VOICES]>) -> Self {
        Self::new(rows.into_iter().map(Chord).collect())
    }
}

impl FromIterator<Chord> for Chorale {
    fn from_iter<I: IntoIterator<Item = Chord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Exactly eight chords used to prime generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedMatrix(pub [Chord; SEED_CHORDS]);

impl SeedMatrix {
    pub fn rows(&self) -> &[Chord; SEED_CHORDS] {
        &self.0
    }
}

/// C major cadence shown in the seed grid before anything is entered
impl Default for SeedMatrix {
    fn default() -> Self {
        Self([
            Chord([60, 64, 67, 72]),
            Chord([62, 65, 69, 74]),
            Chord([59, 63, 67, 71]),
            Chord([60, 64, 67, 72]),
            Chord([55, 60, 64, 67]),
            Chord([57, 60, 64, 69]),
            Chord([59, 62, 65, 69]),
            Chord([60, 64, 67, 72]),
        ])
    }
}
