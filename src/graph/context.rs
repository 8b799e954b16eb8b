use crate::SYNTHESIS_BLOCK_SIZE;

/// Clock for one synthesis graph, owned by its root and advanced exactly
/// once per output block. Every tick within a block observes the same
/// `elapsed_frames`, which is what node memoization keys on: a node asked
/// twice at the same frame index returns its cached block instead of
/// recomputing, making shared subgraphs free.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext {
    pub sample_rate: f32,
    /// Frames elapsed since the root started. At 44.1 kHz a u64 outlasts
    /// the hardware.
    pub elapsed_frames: u64,
    /// `elapsed_frames` in seconds.
    pub elapsed_time: f64,
    /// Forces nodes to compute fresh output regardless of the frame index.
    /// True only from construction until the first `advance`, so freshly
    /// built graphs produce real output instead of stale defaults.
    pub force_new_output: bool,
}

impl SynthesisContext {
    pub fn new(sample_rate: f32) -> Self {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive"
        );
        Self {
            sample_rate,
            elapsed_frames: 0,
            elapsed_time: 0.0,
            force_new_output: true,
        }
    }

    /// Advance by one synthesis block. Called by the owning root only.
    pub fn advance(&mut self) {
        self.elapsed_frames += SYNTHESIS_BLOCK_SIZE as u64;
        self.elapsed_time = self.elapsed_frames as f64 / self.sample_rate as f64;
        self.force_new_output = false;
    }

    /// A context at time zero with forced output, detached from any root.
    /// Used to prime nodes in isolation, e.g. reading a control's initial
    /// value before wiring it into a smoother.
    pub fn detached() -> Self {
        Self::new(44_100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_blocks_and_time() {
        let mut ctx = SynthesisContext::new(64_000.0);
        assert!(ctx.force_new_output);
        ctx.advance();
        assert!(!ctx.force_new_output);
        assert_eq!(ctx.elapsed_frames, SYNTHESIS_BLOCK_SIZE as u64);
        assert!((ctx.elapsed_time - SYNTHESIS_BLOCK_SIZE as f64 / 64_000.0).abs() < 1e-12);
    }
}
