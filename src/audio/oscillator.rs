use std::f64::consts::TAU;

/// Sine oscillator with a running phase.
///
/// Phase is kept in cycles (0.0-1.0) so a long-running voice never loses
/// precision the way an ever-growing time value would.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineOsc {
    phase: f64,
}

impl SineOsc {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    /// Produce one sample and advance by one sample period
    #[inline]
    pub fn next_sample(&mut self, frequency: f64, sample_rate: f32) -> f32 {
        let out = (self.phase * TAU).sin() as f32;
        self.phase = (self.phase + frequency / sample_rate as f64).fract();
        out
    }
}
