//! Output on the default audio device through cpal.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info};
use rtrb::{Producer, RingBuffer};

use super::{
    backend::{ScheduleError, StopError, SynthBackend, VoiceLedger},
    mixer::{EngineMessage, VoiceMixer},
    voice::{VoiceId, VoicePlan},
    AudioError,
};
use crate::MAX_BLOCK_SIZE;

/// Ring buffer slots between the scheduler and the audio callback
const CONTROL_QUEUE_SIZE: usize = 4096;

/// Starts are handed to the audio thread this many seconds ahead of their
/// onset. Later ones wait in the backlog.
const START_HORIZON: f64 = 2.0;

/// Voices the backlog holds before scheduling reports a full queue
const BACKLOG_LIMIT: usize = 65_536;

/// Scheduler side of the control channel.
///
/// Only starts due within the horizon travel over the ring, so the ring
/// and the mixer's voice list stay small however long the chorale is.
/// Stopping a voice that is still in the backlog never touches the ring.
struct ControlQueue {
    tx: Producer<EngineMessage>,
    backlog: BTreeMap<VoiceId, VoicePlan>,
    horizon: f64,
}

impl ControlQueue {
    fn new(tx: Producer<EngineMessage>, horizon: f64) -> Self {
        Self {
            tx,
            backlog: BTreeMap::new(),
            horizon,
        }
    }

    fn start(&mut self, id: VoiceId, plan: VoicePlan, now: f64) -> Result<(), ScheduleError> {
        if self.backlog.len() >= BACKLOG_LIMIT {
            return Err(ScheduleError::QueueFull);
        }
        self.backlog.insert(id, plan);
        self.flush(now);
        Ok(())
    }

    fn stop(&mut self, id: VoiceId) -> Result<(), StopError> {
        if self.backlog.remove(&id).is_some() {
            return Ok(());
        }
        self.tx.push(EngineMessage::Stop { id }).map_err(|_| {
            debug!("control queue full while stopping {}", id);
            StopError::QueueFull(id)
        })
    }

    /// Hand every backlogged start due by `now + horizon` to the audio
    /// thread, as far as the ring has room. Ids grow with onset time, so
    /// the backlog is in onset order.
    fn flush(&mut self, now: f64) {
        while let Some(entry) = self.backlog.first_entry() {
            if entry.get().start > now + self.horizon || self.tx.is_full() {
                break;
            }
            let (id, plan) = entry.remove_entry();
            // Single producer: room checked above
            let _ = self.tx.push(EngineMessage::Start { id, plan });
        }
    }

    #[cfg(test)]
    fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

/// Plays voices on the default output device.
///
/// Voice messages travel to the audio callback over a lock-free ring buffer;
/// the callback publishes how many frames it has rendered so the scheduler
/// can read the device clock without locking.
pub struct CpalBackend {
    _stream: cpal::Stream,
    queue: ControlQueue,
    clock: Arc<AtomicU64>,
    sample_rate: f32,
    ledger: VoiceLedger,
}

impl CpalBackend {
    /// Open the default output device and start streaming silence
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(
            "audio output: {} Hz, {} channel(s)",
            sample_rate, channels
        );

        let (tx, mut rx) = RingBuffer::<EngineMessage>::new(CONTROL_QUEUE_SIZE);
        let clock = Arc::new(AtomicU64::new(0));

        let callback_clock = clock.clone();
        let mut mixer = VoiceMixer::new(sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                mixer.drain(&mut rx);

                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames_to_render];
                    mixer.render_block(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }

                    frames_written += frames_to_render;
                }

                callback_clock.store(mixer.frame(), Ordering::Release);
            },
            |err| error!("audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            queue: ControlQueue::new(tx, START_HORIZON),
            clock,
            sample_rate,
            ledger: VoiceLedger::new(),
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl SynthBackend for CpalBackend {
    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn schedule(&mut self, plan: VoicePlan) -> Result<VoiceId, ScheduleError> {
        self.ledger.prune(self.current_time());
        let id = self.ledger.register(&plan);
        if let Err(err) = self.queue.start(id, plan, self.current_time()) {
            self.ledger.forget(id);
            return Err(err);
        }
        Ok(id)
    }

    fn try_stop(&mut self, id: VoiceId) -> Result<(), StopError> {
        self.ledger.release(id, self.current_time())?;
        self.queue.stop(id)
    }

    fn pump(&mut self) {
        let now = self.current_time();
        self.ledger.prune(now);
        self.queue.flush(now);
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        // Best effort; the stream is torn down right after anyway
        let _ = self.queue.tx.push(EngineMessage::StopAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::envelope::{EnvelopeShape, SlotEnvelope};
    use rtrb::Consumer;

    fn plan(start: f64) -> VoicePlan {
        VoicePlan {
            frequency: 220.0,
            start,
            stop: start + 0.5,
            envelope: SlotEnvelope::new(EnvelopeShape::default(), start, 0.5),
        }
    }

    fn queue(slots: usize) -> (ControlQueue, Consumer<EngineMessage>) {
        let (tx, rx) = RingBuffer::new(slots);
        (ControlQueue::new(tx, START_HORIZON), rx)
    }

    fn received(rx: &mut Consumer<EngineMessage>) -> Vec<EngineMessage> {
        std::iter::from_fn(|| rx.pop().ok()).collect()
    }

    #[test]
    fn long_chorale_fits_a_small_ring() {
        let (mut queue, mut rx) = queue(8);
        // 1000 chords of four voices, half a second apart
        for i in 0..4_000u64 {
            let onset = 0.1 + (i / 4) as f64 * 0.5;
            assert_eq!(queue.start(VoiceId(i), plan(onset), 0.0), Ok(()));
        }
        assert_eq!(received(&mut rx).len(), 8);
        assert_eq!(queue.backlog_len(), 4_000 - 8);

        // Only what falls inside the horizon moves up as the clock runs
        queue.flush(100.0);
        let sent = received(&mut rx);
        assert_eq!(sent.len(), 8);
        assert!(matches!(sent[0], EngineMessage::Start { id: VoiceId(8), .. }));
    }

    #[test]
    fn starts_wait_for_the_horizon() {
        let (mut queue, mut rx) = queue(64);
        queue.start(VoiceId(0), plan(0.5), 0.0).unwrap();
        queue.start(VoiceId(1), plan(10.0), 0.0).unwrap();
        assert_eq!(received(&mut rx).len(), 1);

        queue.flush(7.0);
        assert!(received(&mut rx).is_empty());
        queue.flush(8.5);
        assert_eq!(received(&mut rx).len(), 1);
        assert_eq!(queue.backlog_len(), 0);
    }

    #[test]
    fn stopping_backlogged_voices_sends_nothing() {
        let (mut queue, mut rx) = queue(4);
        for i in 0..100u64 {
            queue.start(VoiceId(i), plan(i as f64), 0.0).unwrap();
        }
        received(&mut rx);

        for i in 0..100u64 {
            assert_eq!(queue.stop(VoiceId(i)), Ok(()));
        }
        let sent = received(&mut rx);
        assert!(sent
            .iter()
            .all(|msg| matches!(msg, EngineMessage::Stop { .. })));
        assert!(sent.len() <= 4);
        assert_eq!(queue.backlog_len(), 0);
    }
}
