//! Sample-accurate voice mixer.
//!
//! The mixer owns its own frame clock: a voice planned for time `t` starts on
//! the first frame whose timestamp reaches `t`, no matter how the host slices
//! its buffers. It runs on the audio thread for the device backend and
//! inline for the offline backend.

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use super::voice::{SynthVoice, VoiceId, VoicePlan};

/// Voices preallocated so scheduling a typical chorale never reallocates on
/// the audio thread
const VOICE_CAPACITY: usize = 512;

/// Control messages from the scheduler side to the mixer
#[derive(Debug, Clone, Copy)]
pub enum EngineMessage {
    Start { id: VoiceId, plan: VoicePlan },
    Stop { id: VoiceId },
    StopAll,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}

pub struct VoiceMixer {
    sample_rate: f32,
    frame: u64,
    voices: Vec<SynthVoice>,
}

impl VoiceMixer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            voices: Vec::with_capacity(VOICE_CAPACITY),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current clock time in seconds
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Voices waiting to start or still sounding
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|v| v.id() == id)
    }

    pub fn handle(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Start { id, plan } => {
                self.voices.push(SynthVoice::new(id, plan));
            }
            EngineMessage::Stop { id } => {
                self.voices.retain(|v| v.id() != id);
            }
            EngineMessage::StopAll => {
                self.voices.clear();
            }
        }
    }

    /// Apply every pending control message
    pub fn drain<R: MessageReceiver>(&mut self, rx: &mut R) {
        while let Some(msg) = rx.pop() {
            self.handle(msg);
        }
    }

    /// Render a mono block and advance the clock.
    ///
    /// Voices that have passed their stop time are dropped afterwards.
    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let sample_period = 1.0 / self.sample_rate as f64;
        let block_start = self.now();

        for voice in &mut self.voices {
            for (i, sample) in out.iter_mut().enumerate() {
                let t = block_start + i as f64 * sample_period;
                *sample += voice.next_sample(t, self.sample_rate);
            }
        }

        self.frame += out.len() as u64;

        let now = self.now();
        self.voices.retain(|v| !v.is_finished(now));
    }
}
