pub mod audio; // Voice scheduling and synthesis backends
pub mod chorale; // Chords, seeds, statistics
pub mod config;
pub mod roll; // Piano-roll rasterization
pub mod service; // Generation/export collaborators
pub mod session;

pub use audio::scheduler::AudioScheduler;
pub use chorale::{Chorale, Chord, SeedMatrix};
pub use config::PlayerConfig;
pub use roll::{PianoRoll, Surface};
pub use session::Session;

/// Largest block the mixer renders in one pass.
pub const MAX_BLOCK_SIZE: usize = 2048;
