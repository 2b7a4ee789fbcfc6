//! Benchmarks for piano-roll rasterization.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use chorale_player::roll::{PianoRoll, RollLayout, Surface};

use super::chorale;
use crate::CHORALE_LENGTHS;

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("roll/render");
    let roll = PianoRoll::new(RollLayout::default());

    for &len in CHORALE_LENGTHS {
        let chorale = chorale(len);
        let mut surface = Surface::new(0, 0);

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                roll.render(black_box(&mut surface), Some(black_box(&chorale)), 8);
            })
        });
    }

    group.finish();
}
