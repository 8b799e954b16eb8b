use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/// Summing bus with dynamic input management.
///
/// Like an adder, but inputs can be added and removed while the graph is
/// running: the handle's lock serializes structural changes against the
/// audio thread's tick, so a mutation lands exactly on a block boundary
/// from the graph's point of view. Inputs are identified by node identity:
/// removing a signal removes the first input aliasing the same node.
///
/// Output is always stereo; mono inputs are reconciled up when ticked into
/// the stereo workspace.
pub struct MixerNode {
    inputs: Vec<Signal>,
    workspace: AudioFrames,
}

impl AudioNode for MixerNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        output.clear();
        for input in &self.inputs {
            input.tick(&mut self.workspace, ctx);
            *output += &self.workspace;
        }
    }

    fn is_stereo(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct Mixer {
    handle: NodeHandle<MixerNode>,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            handle: NodeHandle::new(MixerNode {
                inputs: Vec::new(),
                workspace: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2),
            }),
        }
    }

    pub fn add_input(&self, input: impl Into<Signal>) {
        let input = input.into();
        self.handle.with_node(|node| node.inputs.push(input));
    }

    /// Remove the first input aliasing the same node as `input`. Unknown
    /// signals are ignored.
    pub fn remove_input(&self, input: &Signal) {
        self.handle.with_node(|node| {
            if let Some(position) = node
                .inputs
                .iter()
                .position(|candidate| candidate.shares_node_with(input))
            {
                node.inputs.remove(position);
            }
        });
    }

    pub fn num_inputs(&self) -> usize {
        self.handle.with_node(|node| node.inputs.len())
    }
}

impl From<Mixer> for Signal {
    fn from(mixer: Mixer) -> Signal {
        mixer.handle.signal()
    }
}
