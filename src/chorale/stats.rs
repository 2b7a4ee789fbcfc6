//! Summary numbers for a chorale, as shown next to the piano roll.
//!
//! These are display aggregates: an empty or missing chorale yields
//! "unavailable" for every metric instead of an error.

use std::fmt;

use super::Chorale;

/// Shown wherever a metric is unavailable
pub const UNAVAILABLE: &str = "--";

/// Lowest and highest sounding pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    pub min: u8,
    pub max: u8,
}

impl fmt::Display for PitchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChoraleStats {
    pub chord_count: Option<usize>,
    /// Rest entries across all voices
    pub rest_count: Option<usize>,
    /// None when nothing sounds
    pub pitch_range: Option<PitchRange>,
}

impl ChoraleStats {
    pub fn compute(chorale: Option<&Chorale>) -> Self {
        let Some(chorale) = chorale.filter(|c| !c.is_empty()) else {
            return Self::default();
        };

        let rest_count = chorale.iter().map(|c| c.rest_count()).sum();
        let pitch_range = chorale
            .iter()
            .flat_map(|c| c.notes())
            .fold(None, |range: Option<PitchRange>, p| {
                Some(match range {
                    None => PitchRange { min: p, max: p },
                    Some(r) => PitchRange {
                        min: r.min.min(p),
                        max: r.max.max(p),
                    },
                })
            });

        Self {
            chord_count: Some(chorale.len()),
            rest_count: Some(rest_count),
            pitch_range,
        }
    }

    pub fn chord_count_label(&self) -> String {
        label(self.chord_count)
    }

    pub fn rest_count_label(&self) -> String {
        label(self.rest_count)
    }

    pub fn pitch_range_label(&self) -> String {
        label(self.pitch_range)
    }
}

fn label<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
}
