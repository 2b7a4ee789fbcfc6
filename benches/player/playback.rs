//! Benchmarks for voice scheduling and mixing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use chorale_player::{
    audio::{AudioScheduler, OfflineBackend, PlaybackSettings},
    chorale::Chorale,
};

use super::chorale;
use crate::CHORALE_LENGTHS;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("playback/schedule");

    for &len in CHORALE_LENGTHS {
        let chorale = chorale(len);
        let mut scheduler =
            AudioScheduler::new(OfflineBackend::new(SAMPLE_RATE), PlaybackSettings::default());

        // Each play() cancels the previous one, so this measures stop + schedule
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(scheduler.play(Some(&chorale), 90.0)))
        });
    }

    group.finish();
}

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("playback/mix");

    for &block in &[256usize, 512] {
        // One four-note chord held for hours, so every block mixes four voices
        let mut scheduler =
            AudioScheduler::new(OfflineBackend::new(SAMPLE_RATE), PlaybackSettings::default());
        scheduler.play(Some(&Chorale::from(vec![[60, 64, 67, 72]])), 0.01);
        scheduler.backend_mut().advance(0.5);

        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            b.iter(|| black_box(scheduler.backend_mut().render(block)))
        });
    }

    group.finish();
}
