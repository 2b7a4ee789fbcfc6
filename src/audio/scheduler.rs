//! Chorale playback: one chord per beat, every note its own voice.
//!
//! Scheduling is fire-and-forget. `play` plans every voice up front against
//! the backend clock and returns immediately; the backend starts and ends
//! them on time. `stop` cancels whatever is still tracked.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::{
    backend::SynthBackend,
    envelope::{EnvelopeShape, SlotEnvelope},
    voice::{VoiceId, VoicePlan},
};
use crate::chorale::{frequency, Chorale};

/// Tempo used when the requested one is unusable
pub const DEFAULT_TEMPO_BPM: f64 = 90.0;

/// Timing constants for playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Delay before the first chord so nothing is scheduled in the past
    pub lead_in: f64,
    /// Extra time a voice keeps running after its slot ends
    pub tail: f64,
    #[serde(flatten)]
    pub envelope: EnvelopeShape,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            lead_in: 0.1,
            tail: 0.02,
            envelope: EnvelopeShape::default(),
        }
    }
}

/// Seconds per chord at `tempo_bpm`, falling back to [`DEFAULT_TEMPO_BPM`]
/// for non-finite or non-positive tempos
pub fn chord_duration(tempo_bpm: f64) -> f64 {
    let tempo = if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        tempo_bpm
    } else {
        DEFAULT_TEMPO_BPM
    };
    60.0 / tempo
}

#[derive(Debug, Clone, Copy)]
struct TrackedVoice {
    id: VoiceId,
    stop: f64,
}

/// Where the current playback sits on the backend clock
#[derive(Debug, Clone, Copy)]
struct PlaybackWindow {
    start: f64,
    chord_duration: f64,
    chords: usize,
}

pub struct AudioScheduler<B: SynthBackend> {
    backend: B,
    settings: PlaybackSettings,
    registry: Vec<TrackedVoice>,
    window: Option<PlaybackWindow>,
}

impl<B: SynthBackend> AudioScheduler<B> {
    pub fn new(backend: B, settings: PlaybackSettings) -> Self {
        Self {
            backend,
            settings,
            registry: Vec::new(),
            window: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Schedule `chorale` for playback, replacing anything already scheduled.
    ///
    /// A missing or empty chorale leaves current playback untouched. Returns
    /// the number of voices scheduled.
    pub fn play(&mut self, chorale: Option<&Chorale>, tempo_bpm: f64) -> usize {
        let Some(chorale) = chorale.filter(|c| !c.is_empty()) else {
            return 0;
        };

        self.stop();

        let chord_duration = chord_duration(tempo_bpm);
        let start = self.backend.current_time() + self.settings.lead_in;

        for (index, chord) in chorale.iter().enumerate() {
            let onset = start + index as f64 * chord_duration;
            let envelope = SlotEnvelope::new(self.settings.envelope, onset, chord_duration);
            let stop = onset + chord_duration + self.settings.tail;

            for pitch in chord.notes() {
                let plan = VoicePlan {
                    frequency: frequency(pitch as i32),
                    start: onset,
                    stop,
                    envelope,
                };
                match self.backend.schedule(plan) {
                    Ok(id) => self.registry.push(TrackedVoice { id, stop }),
                    Err(err) => warn!("dropped chord {} pitch {}: {}", index, pitch, err),
                }
            }
        }

        self.window = Some(PlaybackWindow {
            start,
            chord_duration,
            chords: chorale.len(),
        });

        debug!(
            "scheduled {} voices over {} chords at {:.3}s per chord",
            self.registry.len(),
            chorale.len(),
            chord_duration
        );
        self.registry.len()
    }

    /// Stop every tracked voice and clear the registry.
    ///
    /// Voices that already finished or were never started cannot be stopped;
    /// those failures are expected and ignored.
    pub fn stop(&mut self) {
        for voice in self.registry.drain(..) {
            if let Err(err) = self.backend.try_stop(voice.id) {
                trace!("ignoring stop failure: {}", err);
            }
        }
        self.window = None;
    }

    /// Periodic upkeep while playing: lets the backend catch up with the
    /// clock and forgets voices that have ended
    pub fn tick(&mut self) {
        self.backend.pump();
        self.prune();
    }

    /// Forget voices that have ended on their own
    pub fn prune(&mut self) {
        let now = self.backend.current_time();
        self.registry.retain(|v| v.stop > now);
        if self.registry.is_empty() {
            self.window = None;
        }
    }

    /// Voices currently tracked for cancellation
    pub fn scheduled(&self) -> impl Iterator<Item = VoiceId> + '_ {
        self.registry.iter().map(|v| v.id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.registry.len()
    }

    /// True while any tracked voice has yet to end
    pub fn is_playing(&self) -> bool {
        let now = self.backend.current_time();
        self.registry.iter().any(|v| v.stop > now)
    }

    /// Index of the chord under the playhead, if playback has reached one
    pub fn position(&self) -> Option<usize> {
        let window = self.window?;
        let elapsed = self.backend.current_time() - window.start;
        if elapsed < 0.0 {
            return None;
        }
        let index = (elapsed / window.chord_duration) as usize;
        (index < window.chords).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::OfflineBackend;
    use crate::chorale::Chorale;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn scheduler() -> AudioScheduler<OfflineBackend> {
        AudioScheduler::new(OfflineBackend::new(SAMPLE_RATE), PlaybackSettings::default())
    }

    fn cadence() -> Chorale {
        Chorale::from(vec![[60, 64, 67, 72], [0, 0, 0, 0], [55, 0, 62, 67]])
    }

    #[test]
    fn stop_with_nothing_scheduled_is_fine() {
        let mut s = scheduler();
        s.stop();
        s.stop();
        assert_eq!(s.scheduled_count(), 0);
    }

    #[test]
    fn one_voice_per_sounding_note() {
        let mut s = scheduler();
        assert_eq!(s.play(Some(&cadence()), 120.0), 7);
        assert_eq!(s.backend().mixer().voice_count(), 7);
    }

    #[test]
    fn onsets_are_one_chord_apart() {
        let mut s = scheduler();
        s.play(Some(&Chorale::from(vec![[60, 0, 0, 0], [62, 0, 0, 0], [64, 0, 0, 0]])), 120.0);

        // No direct access to plans from the scheduler, so listen instead:
        // at 120 bpm chord i starts at 0.1 + 0.5 i seconds.
        let audio = s.backend_mut().advance(1.7);
        let onset = |seconds: f64| (seconds * SAMPLE_RATE as f64) as usize;
        let loud = |from: f64, to: f64| {
            audio[onset(from)..onset(to)]
                .iter()
                .any(|x| x.abs() > 0.05)
        };

        assert!(!loud(0.0, 0.1), "lead-in is silent");
        assert!(loud(0.1, 0.2));
        assert!(loud(0.6, 0.7));
        assert!(loud(1.1, 1.2));
    }

    #[test]
    fn first_chord_starts_after_lead_in() {
        let mut s = scheduler();
        s.backend_mut().advance(2.0);
        s.play(Some(&cadence()), 90.0);

        assert_eq!(s.position(), None);
        s.backend_mut().advance(0.15);
        assert_eq!(s.position(), Some(0));
        s.backend_mut().advance(60.0 / 90.0);
        assert_eq!(s.position(), Some(1));
    }

    #[test]
    fn stop_twice_equals_once() {
        let mut s = scheduler();
        s.play(Some(&cadence()), 90.0);
        s.stop();
        let after_first = s.backend().mixer().voice_count();
        s.stop();

        assert_eq!(after_first, 0);
        assert_eq!(s.backend().mixer().voice_count(), 0);
        assert_eq!(s.scheduled_count(), 0);
        assert!(!s.is_playing());
    }

    #[test]
    fn stop_after_natural_end_is_silent() {
        let mut s = scheduler();
        s.play(Some(&cadence()), 240.0);
        s.backend_mut().advance(5.0);
        assert!(!s.is_playing());

        s.stop();
        assert_eq!(s.scheduled_count(), 0);
    }

    #[test]
    fn second_play_replaces_first() {
        let mut s = scheduler();
        s.play(Some(&cadence()), 90.0);
        let first: Vec<VoiceId> = s.scheduled().collect();

        let second = Chorale::from(vec![[48, 0, 0, 0], [50, 0, 0, 0]]);
        s.play(Some(&second), 90.0);
        let remaining: Vec<VoiceId> = s.scheduled().collect();

        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|id| !first.contains(id)));
        assert_eq!(s.backend().mixer().voice_count(), 2);
    }

    #[test]
    fn missing_or_empty_chorale_is_a_no_op() {
        let mut s = scheduler();
        s.play(Some(&cadence()), 90.0);

        assert_eq!(s.play(None, 90.0), 0);
        assert_eq!(s.play(Some(&Chorale::default()), 90.0), 0);
        assert_eq!(s.scheduled_count(), 7);
    }

    #[test]
    fn bad_tempo_falls_back() {
        assert_eq!(chord_duration(120.0), 0.5);
        assert_eq!(chord_duration(0.0), 60.0 / DEFAULT_TEMPO_BPM);
        assert_eq!(chord_duration(-10.0), 60.0 / DEFAULT_TEMPO_BPM);
        assert_eq!(chord_duration(f64::NAN), 60.0 / DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn tick_keeps_registry_to_sounding_voices() {
        let mut s = scheduler();
        s.play(Some(&cadence()), 120.0);
        // First chord ends at 0.1 + 0.5 + tail
        s.backend_mut().advance(0.7);
        s.tick();
        assert_eq!(s.scheduled_count(), 3);
        assert!(s.is_playing());

        s.backend_mut().advance(1.0);
        s.tick();
        assert_eq!(s.scheduled_count(), 0);
        assert_eq!(s.position(), None);
    }

    #[test]
    fn prune_releases_finished_voices() {
        let mut s = scheduler();
        for _ in 0..5 {
            s.play(Some(&cadence()), 600.0);
            s.backend_mut().advance(1.0);
            s.prune();
            assert_eq!(s.scheduled_count(), 0);
        }
        assert!(s.backend().ledger().is_empty());
    }
}
