use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/*
Naive Oscillators
=================

Phase-accumulator oscillators with hard edges. They alias: the jump at
each cycle edge contains energy above Nyquist that folds back down. So
they are best used as LFOs or control shapes, or when the grit is wanted.
For pitched audio use the `bandlimited` module, which renders the same
shapes with the edges replaced by bandlimited steps.

`AngularWaveNode` covers the whole saw/triangle family with one `slope`
input: the fraction of the cycle spent rising.

  slope = 0.0   descending sawtooth
  slope = 0.5   triangle
  slope = 1.0   ascending sawtooth

Frequency is an audio-rate input, so FM at full sample resolution comes for
free; a literal float works too, via the usual conversion.
*/

pub struct AngularWaveNode {
    freq: Signal,
    slope: Signal,
    freq_frames: AudioFrames,
    slope_frames: AudioFrames,
    phase: f64,
}

impl AngularWaveNode {
    pub fn new(freq: impl Into<Signal>, slope: impl Into<Signal>) -> Self {
        Self {
            freq: freq.into(),
            slope: slope.into(),
            freq_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
            slope_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
            phase: 0.0,
        }
    }
}

impl AudioNode for AngularWaveNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.freq.tick(&mut self.freq_frames, ctx);
        self.slope.tick(&mut self.slope_frames, ctx);

        let rate = 1.0 / ctx.sample_rate as f64;
        for i in 0..output.frames() {
            let slope = self.slope_frames[i].clamp(0.0, 1.0);
            let phase = self.phase as f32;
            self.phase = (self.phase + self.freq_frames[i] as f64 * rate).rem_euclid(1.0);

            output[i] = if phase < slope {
                (phase / slope) * 2.0 - 1.0
            } else {
                (1.0 - (phase - slope) / (1.0 - slope)) * 2.0 - 1.0
            };
        }
    }
}

/// Plain sawtooth. Descending by default, like the analog shape.
#[derive(Clone)]
pub struct SawtoothWave {
    handle: NodeHandle<AngularWaveNode>,
}

impl SawtoothWave {
    pub fn new(freq: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(AngularWaveNode::new(freq, 0.0)),
        }
    }

    pub fn ascending(freq: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(AngularWaveNode::new(freq, 1.0)),
        }
    }
}

impl From<SawtoothWave> for Signal {
    fn from(wave: SawtoothWave) -> Signal {
        wave.handle.signal()
    }
}

/// Naive rectangle wave with a pulse-width input (0..1 duty cycle).
pub struct RectWaveNode {
    freq: Signal,
    pwm: Signal,
    freq_frames: AudioFrames,
    pwm_frames: AudioFrames,
    phase: f64,
}

impl AudioNode for RectWaveNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.freq.tick(&mut self.freq_frames, ctx);
        self.pwm.tick(&mut self.pwm_frames, ctx);

        let rate = 1.0 / ctx.sample_rate as f64;
        for i in 0..output.frames() {
            let phase = self.phase as f32;
            self.phase = (self.phase + self.freq_frames[i] as f64 * rate).rem_euclid(1.0);
            output[i] = if phase > self.pwm_frames[i] { -1.0 } else { 1.0 };
        }
    }
}

#[derive(Clone)]
pub struct RectWave {
    handle: NodeHandle<RectWaveNode>,
}

impl RectWave {
    pub fn new(freq: impl Into<Signal>, pwm: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(RectWaveNode {
                freq: freq.into(),
                pwm: pwm.into(),
                freq_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
                pwm_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
                phase: 0.0,
            }),
        }
    }

    /// Square wave: 50% duty cycle.
    pub fn square(freq: impl Into<Signal>) -> Self {
        Self::new(freq, 0.5)
    }
}

impl From<RectWave> for Signal {
    fn from(wave: RectWave) -> Signal {
        wave.handle.signal()
    }
}

/// Allow slope control on the raw angular wave, e.g. a morphing saw.
#[derive(Clone)]
pub struct AngularWave {
    handle: NodeHandle<AngularWaveNode>,
}

impl AngularWave {
    pub fn new(freq: impl Into<Signal>, slope: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(AngularWaveNode::new(freq, slope)),
        }
    }
}

impl From<AngularWave> for Signal {
    fn from(wave: AngularWave) -> Signal {
        wave.handle.signal()
    }
}
