/// Reference pitch for tuning (concert A)
pub const A4_PITCH: i32 = 69;

/// Frequency of the reference pitch in Hz
pub const A4_FREQUENCY: f64 = 440.0;

/// Convert MIDI pitch to frequency in Hz.
/// A4 = 440 Hz = MIDI pitch 69
///
/// Total over integers; callers never pass rests.
#[inline]
pub fn frequency(pitch: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((pitch - A4_PITCH) as f64 / 12.0)
}
