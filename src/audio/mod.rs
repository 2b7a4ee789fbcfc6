// Purpose: turn chorales into sound
// The scheduler plans voices; backends own the clock and render them

pub mod backend;
#[cfg(feature = "rtrb")]
pub mod device;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod scheduler;
pub mod voice;

use thiserror::Error;

pub use backend::{OfflineBackend, ScheduleError, StopError, SynthBackend};
#[cfg(feature = "rtrb")]
pub use device::CpalBackend;
pub use envelope::{EnvelopeShape, SlotEnvelope, ENVELOPE_FLOOR};
pub use scheduler::{AudioScheduler, PlaybackSettings, DEFAULT_TEMPO_BPM};
pub use voice::{VoiceId, VoicePlan};

/// Failures opening an audio output
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default output device available")]
    NoOutputDevice,
    #[error("failed to fetch default output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}
