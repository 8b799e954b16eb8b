use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::graph::context::SynthesisContext;
use crate::graph::node::lock_unpoisoned;

/// One control-rate tick's worth of output: a scalar plus a discrete edge.
///
/// `triggered` means "new information since the last tick": a changed
/// value, or a discrete event firing. Consumers re-read `value` every tick
/// but only *react* on edges; `triggered == false` never means "the value
/// is zero".
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub value: f32,
    pub triggered: bool,
}

/// Control-rate node behavior: one output per synthesis block.
///
/// Like audio nodes, implementations only compute; memoization against the
/// context clock is layered on once, by the wrapper inside every handle.
pub trait ControlNode: Send + 'static {
    fn compute(&mut self, ctx: &SynthesisContext) -> ControlOutput;
}

/// The single memoization point for control-rate nodes.
struct ControlMemo<N> {
    last_frame_index: u64,
    output: ControlOutput,
    node: N,
}

trait TickControl: Send {
    fn tick(&mut self, ctx: &SynthesisContext) -> ControlOutput;
}

impl<N: ControlNode> TickControl for ControlMemo<N> {
    fn tick(&mut self, ctx: &SynthesisContext) -> ControlOutput {
        if ctx.force_new_output || self.last_frame_index != ctx.elapsed_frames {
            self.last_frame_index = ctx.elapsed_frames;
            self.output = self.node.compute(ctx);

            if !self.output.value.is_finite() {
                warn!("non-finite control value");
            }
        }
        self.output
    }
}

/// Shared, type-erased handle to a control-rate node. Clones alias the same
/// node, so a control signal wired into several parameters is evaluated
/// once per block and every consumer sees the same value/edge pair.
#[derive(Clone)]
pub struct Control {
    shared: Arc<Mutex<dyn TickControl>>,
}

impl Control {
    pub fn new<N: ControlNode>(node: N) -> Self {
        ControlHandle::new(node).control()
    }

    pub fn tick(&self, ctx: &SynthesisContext) -> ControlOutput {
        lock_unpoisoned(&self.shared).tick(ctx)
    }

    /// Output for a detached, forced tick at time zero. Used to initialize
    /// other nodes (see `smoothed`).
    pub fn initial_output(&self) -> ControlOutput {
        self.tick(&SynthesisContext::detached())
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control").finish()
    }
}

/// Typed counterpart of [`Control`]; see [`crate::graph::node::NodeHandle`].
pub struct ControlHandle<N: ControlNode> {
    shared: Arc<Mutex<ControlMemo<N>>>,
}

impl<N: ControlNode> ControlHandle<N> {
    pub fn new(node: N) -> Self {
        Self {
            shared: Arc::new(Mutex::new(ControlMemo {
                last_frame_index: 0,
                output: ControlOutput::default(),
                node,
            })),
        }
    }

    pub fn control(&self) -> Control {
        let shared: Arc<Mutex<dyn TickControl>> = self.shared.clone();
        Control { shared }
    }

    pub fn with_node<R>(&self, f: impl FnOnce(&mut N) -> R) -> R {
        f(&mut lock_unpoisoned(&self.shared).node)
    }
}

impl<N: ControlNode> Clone for ControlHandle<N> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<N: ControlNode> From<ControlHandle<N>> for Control {
    fn from(handle: ControlHandle<N>) -> Control {
        handle.control()
    }
}

/// A settable scalar. Raises its edge on every `set`, and a forced tick
/// re-arms the edge so the first clocked block after (re)construction also
/// reports it.
pub struct ControlValueNode {
    value: f32,
    changed: bool,
}

impl ControlNode for ControlValueNode {
    fn compute(&mut self, ctx: &SynthesisContext) -> ControlOutput {
        let output = ControlOutput {
            value: self.value,
            triggered: self.changed || ctx.force_new_output,
        };
        self.changed = ctx.force_new_output;
        output
    }
}

/// Handle for setting a value from outside the graph (UI, sequencer).
#[derive(Clone)]
pub struct ControlValue {
    handle: ControlHandle<ControlValueNode>,
}

impl ControlValue {
    pub fn new(value: f32) -> Self {
        Self {
            handle: ControlHandle::new(ControlValueNode {
                value,
                changed: true,
            }),
        }
    }

    pub fn set(&self, value: f32) {
        self.handle.with_node(|node| {
            node.value = value;
            node.changed = true;
        });
    }

    /// Current value, read directly without affecting tick state.
    pub fn value(&self) -> f32 {
        self.handle.with_node(|node| node.value)
    }
}

impl From<ControlValue> for Control {
    fn from(value: ControlValue) -> Control {
        value.handle.control()
    }
}

impl From<f32> for Control {
    fn from(value: f32) -> Control {
        ControlValue::new(value).into()
    }
}

/// Fires its edge exactly once per `trigger` call.
pub struct ControlTriggerNode {
    value: f32,
    fire: bool,
}

impl ControlNode for ControlTriggerNode {
    fn compute(&mut self, _ctx: &SynthesisContext) -> ControlOutput {
        let output = ControlOutput {
            value: self.value,
            triggered: self.fire,
        };
        self.fire = false;
        output
    }
}

#[derive(Clone)]
pub struct ControlTrigger {
    handle: ControlHandle<ControlTriggerNode>,
}

impl Default for ControlTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlTrigger {
    pub fn new() -> Self {
        Self {
            handle: ControlHandle::new(ControlTriggerNode {
                value: 0.0,
                fire: false,
            }),
        }
    }

    /// Fire the edge, carrying `value`, on the next computed block.
    pub fn trigger(&self, value: f32) {
        self.handle.with_node(|node| {
            node.value = value;
            node.fire = true;
        });
    }
}

impl From<ControlTrigger> for Control {
    fn from(trigger: ControlTrigger) -> Control {
        trigger.handle.control()
    }
}
