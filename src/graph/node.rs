use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::SYNTHESIS_BLOCK_SIZE;

/// Lock a node mutex without ever propagating a panic onto the audio
/// thread. A poisoned node keeps ticking with whatever state it had.
pub(crate) fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Audio-rate node behavior: fill one synthesis block per tick.
///
/// Implementations only define how a block is computed; caching, sharing,
/// and the decision of *whether* to compute are handled once by the
/// memoizing wrapper every handle carries. `render_block` is invoked at
/// most once per distinct `elapsed_frames` value.
pub trait AudioNode: Send + 'static {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext);

    /// Stereo-ness of this node's output, fixed at wiring time. Nodes that
    /// process an input typically return the input's stereo-ness so width
    /// propagates downstream.
    fn is_stereo(&self) -> bool {
        false
    }
}

/// The single memoization point for audio-rate nodes.
struct BlockMemo<N> {
    last_frame_index: u64,
    output: AudioFrames,
    node: N,
}

impl<N: AudioNode> BlockMemo<N> {
    fn new(node: N) -> Self {
        let channels = if node.is_stereo() { 2 } else { 1 };
        Self {
            last_frame_index: 0,
            output: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, channels),
            node,
        }
    }
}

/// Object-safe tick surface for type-erased handles.
trait TickBlock: Send {
    fn tick(&mut self, frames: &mut AudioFrames, ctx: &SynthesisContext);
    fn channels(&self) -> usize;
}

impl<N: AudioNode> TickBlock for BlockMemo<N> {
    fn tick(&mut self, frames: &mut AudioFrames, ctx: &SynthesisContext) {
        if ctx.force_new_output || self.last_frame_index != ctx.elapsed_frames {
            self.node.render_block(&mut self.output, ctx);
            self.last_frame_index = ctx.elapsed_frames;

            // Numerical corruption is logged, never fatal; the corrupted
            // value plays through rather than stalling the callback.
            if !self.output[0].is_finite() {
                warn!("non-finite sample in freshly computed block");
            }
        }
        frames.copy_from(&self.output);
    }

    fn channels(&self) -> usize {
        self.output.channels()
    }
}

/// Shared, type-erased handle to an audio-rate node. Cloning aliases the
/// same node instance; this is how one subgraph feeds several parents
/// without recomputation or drift. The last handle dropped releases the
/// node.
#[derive(Clone)]
pub struct Signal {
    shared: Arc<Mutex<dyn TickBlock>>,
}

impl Signal {
    pub fn new<N: AudioNode>(node: N) -> Self {
        NodeHandle::new(node).signal()
    }

    /// Render the node's block for `ctx` into `frames`, recomputing only if
    /// this is the first request for the current block. `frames` may have a
    /// different channel count than the node; the copy reconciles.
    pub fn tick(&self, frames: &mut AudioFrames, ctx: &SynthesisContext) {
        lock_unpoisoned(&self.shared).tick(frames, ctx);
    }

    pub fn is_stereo(&self) -> bool {
        lock_unpoisoned(&self.shared).channels() == 2
    }

    /// Whether two handles alias the same node instance.
    pub fn shares_node_with(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("stereo", &self.is_stereo())
            .finish()
    }
}

/// Typed counterpart of [`Signal`]: same shared node, but retains access to
/// the concrete node type so wrappers can expose mutating surfaces (mixer
/// inputs, settable values) after the node is wired into a graph.
pub struct NodeHandle<N: AudioNode> {
    shared: Arc<Mutex<BlockMemo<N>>>,
}

impl<N: AudioNode> NodeHandle<N> {
    pub fn new(node: N) -> Self {
        Self {
            shared: Arc::new(Mutex::new(BlockMemo::new(node))),
        }
    }

    /// A type-erased handle aliasing the same node.
    pub fn signal(&self) -> Signal {
        let shared: Arc<Mutex<dyn TickBlock>> = self.shared.clone();
        Signal { shared }
    }

    /// Run `f` with exclusive access to the node. Mutations made here are
    /// serialized against ticking by the node's own lock.
    pub fn with_node<R>(&self, f: impl FnOnce(&mut N) -> R) -> R {
        f(&mut lock_unpoisoned(&self.shared).node)
    }
}

impl<N: AudioNode> Clone for NodeHandle<N> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<N: AudioNode> From<NodeHandle<N>> for Signal {
    fn from(handle: NodeHandle<N>) -> Signal {
        handle.signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingNode {
        computed: usize,
    }

    impl AudioNode for CountingNode {
        fn render_block(&mut self, output: &mut AudioFrames, _ctx: &SynthesisContext) {
            self.computed += 1;
            output.fill(self.computed as f32);
        }
    }

    #[test]
    fn tick_is_memoized_per_block() {
        let handle = NodeHandle::new(CountingNode { computed: 0 });
        let signal = handle.signal();
        let mut ctx = SynthesisContext::new(44_100.0);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);

        ctx.advance();
        signal.tick(&mut frames, &ctx);
        let first: Vec<f32> = frames.as_slice().to_vec();
        signal.tick(&mut frames, &ctx);

        assert_eq!(handle.with_node(|n| n.computed), 1);
        assert_eq!(frames.as_slice(), &first[..]);

        ctx.advance();
        signal.tick(&mut frames, &ctx);
        assert_eq!(handle.with_node(|n| n.computed), 2);
    }

    #[test]
    fn force_new_output_recomputes() {
        let handle = NodeHandle::new(CountingNode { computed: 0 });
        let signal = handle.signal();
        let ctx = SynthesisContext::new(44_100.0);
        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);

        // Both ticks are at frame 0, but the context still carries the
        // construction-time force flag.
        signal.tick(&mut frames, &ctx);
        signal.tick(&mut frames, &ctx);
        assert_eq!(handle.with_node(|n| n.computed), 2);
    }

    #[test]
    fn cloned_handles_alias_one_node() {
        let a = Signal::new(CountingNode { computed: 0 });
        let b = a.clone();
        assert!(a.shares_node_with(&b));
    }
}
