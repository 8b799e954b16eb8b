use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/// One cycle of a waveform for table-lookup synthesis.
///
/// The stored length is a power of two plus one guard sample (a copy of
/// sample 0), so the oscillator's interpolated read never branches at the
/// wrap point. Tables of any other length are a configuration error: they
/// are logged and resampled to the next power of two rather than rejected.
pub struct WaveTable {
    frames: AudioFrames,
}

impl WaveTable {
    pub fn new(samples: Vec<f32>) -> Self {
        assert!(samples.len() >= 2, "wave table needs at least two samples");
        let mut frames = AudioFrames::with_size(samples.len(), 1);
        frames.as_mut_slice().copy_from_slice(&samples);

        if !samples.len().is_power_of_two() {
            let corrected = samples.len().next_power_of_two();
            error!(
                len = samples.len(),
                corrected, "wave table length is not a power of two, resampling"
            );
            frames.resample(corrected, 1);
        }

        // Append the guard sample.
        let size = frames.frames();
        frames.resize(size + 1, 1);
        *frames.at_mut(size, 0) = frames.at(0, 0);
        Self { frames }
    }

    /// Cycle length, excluding the guard sample. Always a power of two.
    pub fn size(&self) -> usize {
        self.frames.frames() - 1
    }

    #[inline]
    fn at(&self, index: usize) -> f32 {
        self.frames[index]
    }
}

/// The process-wide sine cycle used by every `SineWave`.
fn shared_sine_table() -> &'static Arc<WaveTable> {
    static TABLE: OnceLock<Arc<WaveTable>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let resolution = 4096;
        let cycle = (0..resolution)
            .map(|i| (std::f64::consts::TAU * i as f64 / resolution as f64).sin() as f32)
            .collect();
        Arc::new(WaveTable::new(cycle))
    })
}

/// Interpolating wavetable oscillator with an audio-rate frequency input.
pub struct TableLookupOscNode {
    table: Arc<WaveTable>,
    freq: Signal,
    freq_frames: AudioFrames,
    /// Phase in table-index units, 0..table size.
    phase: f64,
}

impl TableLookupOscNode {
    pub fn new(table: Arc<WaveTable>, freq: impl Into<Signal>) -> Self {
        Self {
            table,
            freq: freq.into(),
            freq_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
            phase: 0.0,
        }
    }

    /// Reset the phase to the start of the cycle.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

impl AudioNode for TableLookupOscNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.freq.tick(&mut self.freq_frames, ctx);

        let table_size = self.table.size() as f64;
        let rate = table_size / ctx.sample_rate as f64;

        for i in 0..output.frames() {
            let index = self.phase as usize;
            let frac = (self.phase - index as f64) as f32;
            let a = self.table.at(index);
            let b = self.table.at(index + 1);
            output[i] = a + frac * (b - a);

            self.phase =
                (self.phase + self.freq_frames[i] as f64 * rate).rem_euclid(table_size);
        }
    }
}

#[derive(Clone)]
pub struct TableLookupOsc {
    handle: NodeHandle<TableLookupOscNode>,
}

impl TableLookupOsc {
    pub fn new(table: Arc<WaveTable>, freq: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(TableLookupOscNode::new(table, freq)),
        }
    }
}

impl From<TableLookupOsc> for Signal {
    fn from(osc: TableLookupOsc) -> Signal {
        osc.handle.signal()
    }
}

/// Sine oscillator over the shared table.
#[derive(Clone)]
pub struct SineWave {
    handle: NodeHandle<TableLookupOscNode>,
}

impl SineWave {
    pub fn new(freq: impl Into<Signal>) -> Self {
        Self {
            handle: NodeHandle::new(TableLookupOscNode::new(
                shared_sine_table().clone(),
                freq,
            )),
        }
    }
}

impl From<SineWave> for Signal {
    fn from(sine: SineWave) -> Signal {
        sine.handle.signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_matches_reference_within_table_error() {
        let sine: Signal = SineWave::new(440.0).into();
        let mut ctx = SynthesisContext::new(44_100.0);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);

        let mut sample_index = 0_usize;
        for _ in 0..8 {
            ctx.advance();
            sine.tick(&mut frames, &ctx);
            for i in 0..frames.frames() {
                let expected =
                    (std::f64::consts::TAU * 440.0 * sample_index as f64 / 44_100.0).sin();
                assert!(
                    (frames[i] as f64 - expected).abs() < 1e-4,
                    "sample {sample_index}"
                );
                sample_index += 1;
            }
        }
    }

    #[test]
    fn non_power_of_two_table_is_corrected() {
        let table = WaveTable::new(vec![0.0; 1000]);
        assert_eq!(table.size(), 1024);
    }

    #[test]
    fn guard_sample_wraps_cleanly() {
        let table = WaveTable::new(vec![0.5, -0.5, 0.25, -0.25]);
        assert_eq!(table.size(), 4);
        assert_eq!(table.at(4), table.at(0));
    }
}
