use super::{envelope::SlotEnvelope, oscillator::SineOsc};

/// Handle for one scheduled voice, unique per backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Everything a backend needs to play one note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoicePlan {
    /// Oscillator frequency in Hz
    pub frequency: f64,
    /// Backend time at which the tone starts (seconds)
    pub start: f64,
    /// Backend time at which the oscillator is stopped (seconds)
    pub stop: f64,
    pub envelope: SlotEnvelope,
}

/// A voice living inside the mixer: oscillator plus envelope
#[derive(Debug, Clone)]
pub struct SynthVoice {
    id: VoiceId,
    plan: VoicePlan,
    osc: SineOsc,
}

impl SynthVoice {
    pub fn new(id: VoiceId, plan: VoicePlan) -> Self {
        Self {
            id,
            plan,
            osc: SineOsc::new(),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// True once `t` has reached the stop time
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.plan.stop
    }

    /// Sample at time `t`; silent before the start and after the stop
    #[inline]
    pub fn next_sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        if t < self.plan.start || t >= self.plan.stop {
            return 0.0;
        }
        let level = self.plan.envelope.level_at(t);
        self.osc.next_sample(self.plan.frequency, sample_rate) * level
    }
}
