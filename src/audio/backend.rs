//! Synthesis backends: where scheduled voices actually become sound.

use std::collections::HashMap;

use thiserror::Error;

use super::{
    mixer::{EngineMessage, VoiceMixer},
    voice::{VoiceId, VoicePlan},
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("control queue is full")]
    QueueFull,
}

/// Reasons a voice could not be stopped. None of these are fatal; the
/// scheduler treats every stop as best effort.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StopError {
    #[error("{0} is not tracked (never scheduled, already stopped or reclaimed)")]
    Unknown(VoiceId),
    #[error("{0} already finished")]
    Finished(VoiceId),
    #[error("control queue is full, {0} will end on its own")]
    QueueFull(VoiceId),
}

/// A clock plus a way to start and stop voices against it
pub trait SynthBackend {
    /// Backend clock in seconds
    fn current_time(&self) -> f64;

    fn schedule(&mut self, plan: VoicePlan) -> Result<VoiceId, ScheduleError>;

    /// Best-effort stop. Safe to call for any id, at any time.
    fn try_stop(&mut self, id: VoiceId) -> Result<(), StopError>;

    /// Housekeeping between scheduling calls, for backends that feed their
    /// output incrementally
    fn pump(&mut self) {}
}

/// Scheduler-side bookkeeping shared by the backends: hands out ids and
/// remembers when each voice ends so stale entries can be reclaimed.
#[derive(Debug, Default)]
pub struct VoiceLedger {
    next_id: u64,
    stops: HashMap<VoiceId, f64>,
}

impl VoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plan: &VoicePlan) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.stops.insert(id, plan.stop);
        id
    }

    /// Forget a voice that is being stopped at `now`
    pub fn release(&mut self, id: VoiceId, now: f64) -> Result<(), StopError> {
        match self.stops.remove(&id) {
            None => Err(StopError::Unknown(id)),
            Some(stop) if now >= stop => Err(StopError::Finished(id)),
            Some(_) => Ok(()),
        }
    }

    /// Drop a voice that never reached the backend
    pub fn forget(&mut self, id: VoiceId) {
        self.stops.remove(&id);
    }

    /// Drop every voice that has ended by `now`
    pub fn prune(&mut self, now: f64) {
        self.stops.retain(|_, stop| *stop > now);
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Renders into memory on demand. The clock only moves when [`render`] is
/// called, which makes playback fully deterministic.
///
/// [`render`]: OfflineBackend::render
pub struct OfflineBackend {
    mixer: VoiceMixer,
    ledger: VoiceLedger,
}

impl OfflineBackend {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mixer: VoiceMixer::new(sample_rate),
            ledger: VoiceLedger::new(),
        }
    }

    /// Render `frames` mono samples, advancing the clock
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        for block in out.chunks_mut(crate::MAX_BLOCK_SIZE) {
            self.mixer.render_block(block);
        }
        self.ledger.prune(self.mixer.now());
        out
    }

    /// Render `seconds` worth of audio
    pub fn advance(&mut self, seconds: f64) -> Vec<f32> {
        let frames = (seconds * self.mixer.sample_rate() as f64).round().max(0.0) as usize;
        self.render(frames)
    }

    pub fn mixer(&self) -> &VoiceMixer {
        &self.mixer
    }

    pub fn ledger(&self) -> &VoiceLedger {
        &self.ledger
    }
}

impl SynthBackend for OfflineBackend {
    fn current_time(&self) -> f64 {
        self.mixer.now()
    }

    fn schedule(&mut self, plan: VoicePlan) -> Result<VoiceId, ScheduleError> {
        self.ledger.prune(self.mixer.now());
        let id = self.ledger.register(&plan);
        self.mixer.handle(EngineMessage::Start { id, plan });
        Ok(id)
    }

    fn try_stop(&mut self, id: VoiceId) -> Result<(), StopError> {
        self.ledger.release(id, self.mixer.now())?;
        self.mixer.handle(EngineMessage::Stop { id });
        Ok(())
    }
}
