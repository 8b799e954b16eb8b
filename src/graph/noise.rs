use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};

/// White noise: uniform random samples in ±1.
pub struct NoiseNode {
    rng: fastrand::Rng,
}

impl AudioNode for NoiseNode {
    fn render_block(&mut self, output: &mut AudioFrames, _ctx: &SynthesisContext) {
        for sample in output.as_mut_slice() {
            *sample = self.rng.f32() * 2.0 - 1.0;
        }
    }
}

#[derive(Clone)]
pub struct Noise {
    handle: NodeHandle<NoiseNode>,
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise {
    pub fn new() -> Self {
        Self {
            handle: NodeHandle::new(NoiseNode {
                rng: fastrand::Rng::new(),
            }),
        }
    }

    /// Deterministic stream, for tests and reproducible renders.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            handle: NodeHandle::new(NoiseNode {
                rng: fastrand::Rng::with_seed(seed),
            }),
        }
    }
}

impl From<Noise> for Signal {
    fn from(noise: Noise) -> Signal {
        noise.handle.signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SYNTHESIS_BLOCK_SIZE;

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut ctx = SynthesisContext::new(44_100.0);
        ctx.advance();
        let mut a = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        let mut b = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        Signal::from(Noise::with_seed(7)).tick(&mut a, &ctx);
        Signal::from(Noise::with_seed(7)).tick(&mut b, &ctx);
        assert_eq!(a.as_slice(), b.as_slice());
        assert!(a.as_slice().iter().all(|s| s.abs() <= 1.0));
    }
}
