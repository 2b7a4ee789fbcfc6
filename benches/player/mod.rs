//! Benchmarks for the player's hot paths.

mod playback;
mod roll;

pub use playback::{bench_mix, bench_schedule};
pub use roll::bench_render;

use chorale_player::chorale::{Chorale, Chord};

/// A chorale of `len` chords with a rest every fifth chord
pub fn chorale(len: usize) -> Chorale {
    (0..len)
        .map(|i| {
            let root = 48 + (i % 12) as u8;
            if i % 5 == 4 {
                Chord::REST
            } else {
                Chord([root, root + 4, root + 7, root + 12])
            }
        })
        .collect()
}
