use crate::dsp::frames::AudioFrames;
use crate::dsp::min_blep::{BlepRing, MinBlepTable};
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/*
Bandlimited Oscillators
=======================

Same phase accumulators as the naive oscillators, but every discontinuity
is cancelled with a minBLEP injection (see `dsp::min_blep`).

Timing is the whole game. When the phase wraps, the crossing did not happen
at this sample. It happened `phase / increment` of a sample *ago*, where
`phase` is the already-wrapped remainder. That fractional offset selects
which oversampled phase of the table is injected. Rounding it to the
nearest sample would put the correction up to half a sample off and
reintroduce most of the aliasing being removed.

The waveform is synthesized in 0..1 range (saw = raw phase, rect = 0/1
state) with corrections added on top, then recentered to ±1, matching the
step table's polarity.
*/

/// Anti-aliased sawtooth.
pub struct BandlimitedSawNode {
    freq: Signal,
    freq_frames: AudioFrames,
    table: &'static MinBlepTable,
    ring: BlepRing,
    phase: f32,
}

impl BandlimitedSawNode {
    pub fn new(freq: impl Into<Signal>) -> Self {
        let table = MinBlepTable::shared();
        Self {
            freq: freq.into(),
            freq_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
            table,
            ring: BlepRing::for_table(table),
            phase: 0.0,
        }
    }
}

impl AudioNode for BandlimitedSawNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.freq.tick(&mut self.freq_frames, ctx);

        let rate = 1.0 / ctx.sample_rate;
        for i in 0..output.frames() {
            let increment = self.freq_frames[i] * rate;
            self.phase += increment;

            if self.phase >= 1.0 {
                self.phase -= 1.0;
                // Fractional offset of the wrap within this sample.
                self.ring.add(self.table, self.phase / increment, 1.0);
            }

            let sample = self.phase + self.ring.next();
            output[i] = sample * 2.0 - 1.0;
        }
    }
}

#[derive(Clone)]
pub struct BandlimitedSaw {
    handle: NodeHandle<BandlimitedSawNode>,
}

impl BandlimitedSaw {
    pub fn new(freq: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(BandlimitedSawNode::new(freq)),
        }
    }
}

impl From<BandlimitedSaw> for Signal {
    fn from(saw: BandlimitedSaw) -> Signal {
        saw.handle.signal()
    }
}

/// Anti-aliased rectangle wave with a pulse-width input. Both edges (the
/// cycle wrap and the duty-cycle crossing) get their own injection.
pub struct BandlimitedRectNode {
    freq: Signal,
    pwm: Signal,
    freq_frames: AudioFrames,
    pwm_frames: AudioFrames,
    table: &'static MinBlepTable,
    ring: BlepRing,
    phase: f32,
    /// Current rectangle state in 0..1 range; flips at each edge.
    state: f32,
}

impl AudioNode for BandlimitedRectNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.freq.tick(&mut self.freq_frames, ctx);
        self.pwm.tick(&mut self.pwm_frames, ctx);

        let rate = 1.0 / ctx.sample_rate;
        for i in 0..output.frames() {
            let increment = self.freq_frames[i] * rate;
            let pwm = self.pwm_frames[i];
            self.phase += increment;

            if self.phase >= 1.0 {
                self.phase -= 1.0;
                self.state = 0.0;
                self.ring.add(self.table, self.phase / increment, 1.0);
            }

            if self.state == 0.0 && self.phase > pwm {
                self.state = 1.0;
                self.ring.add(self.table, (self.phase - pwm) / increment, -1.0);
            }

            let sample = self.state + self.ring.next();
            output[i] = sample * 2.0 - 1.0;
        }
    }
}

#[derive(Clone)]
pub struct BandlimitedRect {
    handle: NodeHandle<BandlimitedRectNode>,
}

impl BandlimitedRect {
    pub fn new(freq: impl Into<Signal>, pwm: impl Into<Signal>) -> Self {
        let table = MinBlepTable::shared();
        Self {
            handle: NodeHandle::new(BandlimitedRectNode {
                freq: freq.into(),
                pwm: pwm.into(),
                freq_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
                pwm_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
                table,
                ring: BlepRing::for_table(table),
                phase: 0.0,
                state: 0.0,
            }),
        }
    }

    pub fn square(freq: impl Into<Signal>) -> Self {
        Self::new(freq, 0.5)
    }
}

impl From<BandlimitedRect> for Signal {
    fn from(rect: BandlimitedRect) -> Signal {
        rect.handle.signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_blocks(signal: &Signal, blocks: usize, sample_rate: f32) -> Vec<f32> {
        let mut ctx = SynthesisContext::new(sample_rate);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        let mut rendered = Vec::new();
        for _ in 0..blocks {
            ctx.advance();
            signal.tick(&mut frames, &ctx);
            rendered.extend_from_slice(frames.as_slice());
        }
        rendered
    }

    #[test]
    fn saw_stays_in_range_and_oscillates() {
        let saw: Signal = BandlimitedSaw::new(441.0).into();
        let rendered = render_blocks(&saw, 32, 44_100.0);
        assert!(rendered.iter().all(|s| s.abs() < 1.5));
        let positive = rendered.iter().filter(|&&s| s > 0.0).count();
        let share = positive as f32 / rendered.len() as f32;
        assert!((share - 0.5).abs() < 0.1, "positive share {share}");
    }

    #[test]
    fn saw_spreads_the_wrap_over_the_blep_span() {
        use crate::graph::oscillator::SawtoothWave;

        let max_step = |rendered: &[f32]| {
            rendered
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).abs())
                .fold(0.0_f32, f32::max)
        };

        let naive: Signal = SawtoothWave::new(441.0).into();
        let corrected: Signal = BandlimitedSaw::new(441.0).into();
        let naive_step = max_step(&render_blocks(&naive, 32, 44_100.0));
        let corrected_step = max_step(&render_blocks(&corrected, 32, 44_100.0));

        // The raw saw jumps by nearly the full ±1 range at each wrap; the
        // corrected wrap must be strictly softer.
        assert!(naive_step > 1.8, "naive step {naive_step}");
        assert!(
            corrected_step < naive_step,
            "corrected {corrected_step} vs naive {naive_step}"
        );
    }

    #[test]
    fn square_alternates_states() {
        let square: Signal = BandlimitedRect::square(441.0).into();
        let rendered = render_blocks(&square, 32, 44_100.0);
        let high = rendered.iter().filter(|&&s| s > 0.0).count();
        let share = high as f32 / rendered.len() as f32;
        assert!((share - 0.5).abs() < 0.05, "high share {share}");
    }
}
