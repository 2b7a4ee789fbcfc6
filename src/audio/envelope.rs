/*
Exponential Slot Envelope
=========================

Every chorale voice sounds for exactly one chord slot. Its amplitude follows
a two-segment envelope:

  Level
   peak ┐  ╱╲
        │ │  ╲
        │ │   ╲__
        │ │      ╲___
  floor └─┘          ╲______→ Time
        onset  |            slot end
             onset + attack

  attack   floor → peak, multiplicative ramp
  decay    peak → floor, multiplicative ramp ending at the slot boundary

Why multiplicative? Loudness is perceived on a log scale, so a ramp that
multiplies the level by a constant factor per unit time sounds even, where
a straight line sounds like it falls off a cliff at the end.

The ramp between v0 and v1 over [t0, t1] is

    v(t) = v0 × (v1 / v0) ^ ((t − t0) / (t1 − t0))

which is undefined for v0 = 0 or v1 = 0: no power of anything reaches zero.
So the envelope never targets zero; it targets ENVELOPE_FLOOR, a level
about −80 dB below full scale, which is inaudible in practice.
*/

use serde::{Deserialize, Serialize};

/// Smallest level an exponential ramp may start from or target. Stands in
/// for silence, which an exponential ramp cannot reach.
pub const ENVELOPE_FLOOR: f32 = 1e-4;

/// Attack time and peak level shared by every voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeShape {
    /// Seconds from onset to peak
    pub attack: f64,
    /// Peak amplitude (0.0-1.0)
    pub peak: f32,
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self {
            attack: 0.02,
            peak: 0.25,
        }
    }
}

/// Envelope of one voice, placed on the backend clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotEnvelope {
    onset: f64,
    peak_time: f64,
    end_time: f64,
    peak: f32,
}

impl SlotEnvelope {
    /// Envelope for a slot of `duration` seconds starting at `onset`.
    ///
    /// Attack is capped at half the slot so the decay always has room.
    pub fn new(shape: EnvelopeShape, onset: f64, duration: f64) -> Self {
        let duration = duration.max(0.0);
        let attack = shape.attack.clamp(0.0, duration / 2.0);
        Self {
            onset,
            peak_time: onset + attack,
            end_time: onset + duration,
            peak: shape.peak.max(ENVELOPE_FLOOR),
        }
    }

    pub fn onset(&self) -> f64 {
        self.onset
    }

    pub fn peak_time(&self) -> f64 {
        self.peak_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Amplitude at absolute time `t` (seconds)
    pub fn level_at(&self, t: f64) -> f32 {
        if t <= self.onset || t >= self.end_time {
            ENVELOPE_FLOOR
        } else if t < self.peak_time {
            ramp(ENVELOPE_FLOOR, self.peak, self.onset, self.peak_time, t)
        } else {
            ramp(self.peak, ENVELOPE_FLOOR, self.peak_time, self.end_time, t)
        }
    }
}

fn ramp(v0: f32, v1: f32, t0: f64, t1: f64, t: f64) -> f32 {
    let span = t1 - t0;
    if span <= 0.0 {
        return v1;
    }
    let progress = ((t - t0) / span).clamp(0.0, 1.0);
    (v0 as f64 * (v1 as f64 / v0 as f64).powf(progress)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> SlotEnvelope {
        SlotEnvelope::new(EnvelopeShape::default(), 1.0, 0.5)
    }

    #[test]
    fn peaks_after_attack() {
        let env = envelope();
        assert!((env.level_at(1.02) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn starts_and_ends_at_floor() {
        let env = envelope();
        assert_eq!(env.level_at(0.5), ENVELOPE_FLOOR);
        assert_eq!(env.level_at(1.0), ENVELOPE_FLOOR);
        assert_eq!(env.level_at(1.5), ENVELOPE_FLOOR);
        assert!(env.level_at(1.499) < 0.001);
    }

    #[test]
    fn ramps_are_monotonic() {
        let env = envelope();
        let attack: Vec<f32> = (0..20).map(|i| env.level_at(1.0 + i as f64 * 0.001)).collect();
        assert!(attack.windows(2).all(|w| w[0] <= w[1]));

        let decay: Vec<f32> = (0..48).map(|i| env.level_at(1.02 + i as f64 * 0.01)).collect();
        assert!(decay.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn levels_stay_positive() {
        let env = envelope();
        for i in 0..1000 {
            assert!(env.level_at(0.9 + i as f64 * 0.001) > 0.0);
        }
    }

    #[test]
    fn short_slot_caps_attack() {
        let env = SlotEnvelope::new(EnvelopeShape::default(), 0.0, 0.01);
        assert_eq!(env.peak_time(), 0.005);
        assert!(env.peak_time() < env.end_time());
    }

    #[test]
    fn zero_peak_is_raised_to_floor() {
        let shape = EnvelopeShape {
            attack: 0.02,
            peak: 0.0,
        };
        let env = SlotEnvelope::new(shape, 0.0, 1.0);
        assert_eq!(env.peak(), ENVELOPE_FLOOR);
        assert!(env.level_at(0.5).is_finite());
    }
}
