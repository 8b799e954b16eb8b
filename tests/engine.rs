//! Cross-module behavior of the graph execution model: shared-subgraph
//! memoization, control fan-out, and structural mutation under concurrent
//! ticking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use blocksynth::dsp::AudioFrames;
use blocksynth::graph::{
    AudioNode, Control, ControlNode, ControlOutput, FixedValue, Mixer, Signal, SynthesisContext,
};
use blocksynth::synth::Synth;
use blocksynth::SYNTHESIS_BLOCK_SIZE;

struct CountingSource {
    computed: Arc<AtomicUsize>,
}

impl AudioNode for CountingSource {
    fn render_block(&mut self, output: &mut AudioFrames, _ctx: &SynthesisContext) {
        self.computed.fetch_add(1, Ordering::SeqCst);
        output.fill(1.0);
    }
}

struct CountingControl {
    computed: Arc<AtomicUsize>,
}

impl ControlNode for CountingControl {
    fn compute(&mut self, _ctx: &SynthesisContext) -> ControlOutput {
        let count = self.computed.fetch_add(1, Ordering::SeqCst) + 1;
        ControlOutput {
            value: count as f32,
            triggered: true,
        }
    }
}

#[test]
fn diamond_shaped_audio_fanout_computes_once_per_block() {
    let computed = Arc::new(AtomicUsize::new(0));
    let source = Signal::new(CountingSource {
        computed: computed.clone(),
    });

    // Same node wired into both sides of an expression.
    let diamond = source.clone() + source;

    let synth = Synth::new(44_100.0);
    synth.set_output(diamond);

    let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2);
    for _ in 0..5 {
        synth.tick(&mut frames);
    }

    assert_eq!(computed.load(Ordering::SeqCst), 5);
    // Both parents saw the same cached block: 1.0 + 1.0.
    assert!(frames.as_slice().iter().all(|&s| s == 2.0));
}

#[test]
fn control_fanout_is_evaluated_once_and_observed_identically() {
    let computed = Arc::new(AtomicUsize::new(0));
    let control = Control::new(CountingControl {
        computed: computed.clone(),
    });

    // Two independent audio-rate parents of the same control node. If the
    // control were evaluated per-parent, its value would differ between
    // them and the difference would be nonzero.
    let left: Signal = FixedValue::new(control.clone()).into();
    let right: Signal = FixedValue::new(control).into();
    let difference = left - right;

    let synth = Synth::new(44_100.0);
    synth.set_output(difference);

    let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2);
    for _ in 0..8 {
        synth.tick(&mut frames);
        assert!(frames.as_slice().iter().all(|&s| s == 0.0));
    }
    assert_eq!(computed.load(Ordering::SeqCst), 8);
}

#[test]
fn unreached_node_resumes_where_it_left_off() {
    let computed = Arc::new(AtomicUsize::new(0));
    let source = Signal::new(CountingSource {
        computed: computed.clone(),
    });

    let synth = Synth::new(44_100.0);
    synth.set_output(source.clone());

    let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2);
    synth.tick(&mut frames);
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    // Detach the node for a while; it must not tick.
    synth.clear_output();
    for _ in 0..4 {
        synth.tick(&mut frames);
    }
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    // Reattached, it picks up on the next block.
    synth.set_output(source);
    synth.tick(&mut frames);
    assert_eq!(computed.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_mixer_mutation_preserves_input_count() {
    let synth = Synth::new(44_100.0);
    let mixer = Mixer::new();
    synth.set_output(mixer.clone());

    let adds = 300_usize;
    let mutator = {
        let mixer = mixer.clone();
        std::thread::spawn(move || {
            let mut live: Vec<Signal> = Vec::new();
            let mut removed = 0_usize;
            for i in 0..adds {
                let input = Signal::from(0.001);
                mixer.add_input(input.clone());
                live.push(input);
                // Remove every third input while the audio side keeps
                // ticking.
                if i % 3 == 0 {
                    let victim = live.remove(0);
                    mixer.remove_input(&victim);
                    removed += 1;
                }
                if i % 16 == 0 {
                    std::thread::yield_now();
                }
            }
            removed
        })
    };

    let mut out = vec![0.0_f32; 512];
    while !mutator.is_finished() {
        synth.fill_buffer_of_floats(&mut out, 2);
    }
    let removed = mutator.join().expect("mutator thread panicked");

    assert_eq!(mixer.num_inputs(), adds - removed);

    // The surviving graph still renders: every input is a small constant.
    synth.fill_buffer_of_floats(&mut out, 2);
    let expected = 0.001 * (adds - removed) as f32;
    assert!(out.iter().all(|&s| (s - expected).abs() < 1e-3));
}
