//! Benchmarks for graph ticking and the DSP primitives under it.
//!
//! Run with: cargo bench
//!
//! Reference deadline: one 64-frame block at 48 kHz must render in well
//! under 1.33 ms, including every node it fans out to.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use blocksynth::dsp::min_blep::generate_min_blep;
use blocksynth::dsp::{AudioFrames, DelayLine};
use blocksynth::graph::{
    BandlimitedSaw, BasicDelay, Mixer, SawtoothWave, Signal, SineWave, SynthesisContext,
};
use blocksynth::synth::Synth;
use blocksynth::SYNTHESIS_BLOCK_SIZE;

fn bench_oscillators(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/oscillator");

    let cases: [(&str, Signal); 3] = [
        ("naive_saw", SawtoothWave::new(440.0).into()),
        ("bandlimited_saw", BandlimitedSaw::new(440.0).into()),
        ("sine", SineWave::new(440.0).into()),
    ];

    for (name, signal) in cases {
        let mut ctx = SynthesisContext::new(48_000.0);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        group.bench_function(name, |b| {
            b.iter(|| {
                ctx.advance();
                signal.tick(black_box(&mut frames), &ctx);
            })
        });
    }
    group.finish();
}

fn bench_mixer_fanin(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/mixer");

    for voices in [2_usize, 8, 32] {
        let mixer = Mixer::new();
        for voice in 0..voices {
            mixer.add_input(SineWave::new(110.0 * (voice + 1) as f32));
        }
        let signal: Signal = mixer.into();
        let mut ctx = SynthesisContext::new(48_000.0);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2);
        group.bench_function(format!("{voices}_inputs"), |b| {
            b.iter(|| {
                ctx.advance();
                signal.tick(black_box(&mut frames), &ctx);
            })
        });
    }
    group.finish();
}

fn bench_delay_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay_line");

    let mut line = DelayLine::new();
    line.initialize(1.0, 1, 48_000.0);
    let delay = 0.25;
    group.bench_function("block_of_taps", |b| {
        b.iter(|| {
            let mut acc = 0.0_f32;
            for i in 0..SYNTHESIS_BLOCK_SIZE {
                acc += line.tick_out(black_box(delay), 0);
                line.tick_in(i as f32 * 1e-3, 0);
                line.advance();
            }
            acc
        })
    });
    group.finish();
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/fill");

    let synth = Synth::new(48_000.0);
    let voice: Signal = BandlimitedSaw::new(110.0).into();
    synth.set_output(BasicDelay::new(voice, 0.3, 1.0, 48_000.0).feedback(0.4));
    let mut out = vec![0.0_f32; 512 * 2];
    group.bench_function("512_frames_stereo", |b| {
        b.iter(|| synth.fill_buffer_of_floats(black_box(&mut out), 2))
    });
    group.finish();
}

fn bench_table_generation(c: &mut Criterion) {
    // Offline cost, but worth tracking: it gates first-note latency.
    c.bench_function("dsp/min_blep_table", |b| {
        b.iter(|| generate_min_blep(black_box(8), black_box(16)))
    });
}

criterion_group!(
    benches,
    bench_oscillators,
    bench_mixer_fanin,
    bench_delay_line,
    bench_fill,
    bench_table_generation,
);
criterion_main!(benches);
