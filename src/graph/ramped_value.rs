use tracing::warn;

use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::control::Control;
use crate::graph::node::{AudioNode, NodeHandle, Signal};

/// Audio-rate linear ramp toward a control target.
///
/// The canonical consumer of the control edge contract: `target`, `length`,
/// and `value` are re-read every block, but a new ramp only starts on an
/// edge. `target`/`length` edges start a ramp from the current output to
/// the target over the length; a `value` edge aborts the ramp and jumps.
/// Between edges the node just keeps ramping (or holding), which is what
/// makes per-block parameter smoothing cheap.
pub struct RampedValueNode {
    target: Control,
    length: Control,
    value: Control,

    target_value: f32,
    last: f32,
    increment: f32,

    count: u64,
    length_samples: u64,
    finished: bool,
}

impl RampedValueNode {
    fn jump_to(&mut self, value: f32) {
        // Abort any ramp in flight and sit at the new value.
        self.finished = true;
        self.last = value;
        self.target_value = value;
        self.increment = 0.0;
        self.count = 0;
    }

    fn retarget(&mut self, target: f32, length_samples: u64) {
        self.target_value = target;
        self.count = 0;

        if length_samples == 0 || target == self.last {
            self.last = target;
            self.increment = 0.0;
            self.finished = true;
        } else {
            self.length_samples = length_samples;
            self.increment = (target - self.last) / length_samples as f32;
            self.finished = false;
        }

        if !self.increment.is_finite() {
            warn!("non-finite ramp increment");
        }
    }
}

impl AudioNode for RampedValueNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        let value = self.value.tick(ctx);
        if value.triggered {
            self.jump_to(value.value);
        }

        let length = self.length.tick(ctx);
        let target = self.target.tick(ctx);
        if length.triggered || target.triggered {
            let length_samples = (length.value * ctx.sample_rate) as u64;
            self.retarget(target.value, length_samples);
        }

        let frames = output.frames() as u64;
        if self.count == self.length_samples {
            self.finished = true;
        }

        if self.finished {
            output.fill(self.last);
            return;
        }

        let remainder = self.length_samples.saturating_sub(self.count);
        if remainder < frames {
            // The ramp ends inside this block.
            for i in 0..remainder as usize {
                self.last += self.increment;
                output[i] = self.last;
            }
            for i in remainder as usize..frames as usize {
                output[i] = self.target_value;
            }
            self.count = self.length_samples;
            self.last = self.target_value;
            self.finished = true;
        } else {
            for i in 0..frames as usize {
                self.last += self.increment;
                output[i] = self.last;
            }
            self.count += frames;
        }
    }
}

#[derive(Clone)]
pub struct RampedValue {
    handle: NodeHandle<RampedValueNode>,
}

impl RampedValue {
    pub fn new(initial: f32, length_seconds: f32) -> Self {
        Self {
            handle: NodeHandle::new(RampedValueNode {
                target: Control::from(initial),
                length: Control::from(length_seconds),
                value: Control::from(initial),
                target_value: initial,
                last: initial,
                increment: 0.0,
                count: 0,
                length_samples: 0,
                finished: true,
            }),
        }
    }

    /// Ramp toward `target` whenever it reports an edge.
    pub fn target(self, target: impl Into<Control>) -> Self {
        self.handle.with_node(|node| node.target = target.into());
        self
    }

    /// Ramp duration in seconds; an edge restarts the current ramp with the
    /// new length.
    pub fn length(self, length: impl Into<Control>) -> Self {
        self.handle.with_node(|node| node.length = length.into());
        self
    }

    /// Jump immediately on an edge, aborting any ramp in flight.
    pub fn value(self, value: impl Into<Control>) -> Self {
        self.handle.with_node(|node| node.value = value.into());
        self
    }

    pub fn is_finished(&self) -> bool {
        self.handle.with_node(|node| node.finished)
    }
}

impl From<RampedValue> for Signal {
    fn from(ramp: RampedValue) -> Signal {
        ramp.handle.signal()
    }
}

impl Control {
    /// Audio-rate version of this control that glides to each new value
    /// over `length_seconds` instead of stepping.
    pub fn smoothed(&self, length_seconds: f32) -> Signal {
        RampedValue::new(self.initial_output().value, length_seconds)
            .target(self.clone())
            .into()
    }
}
