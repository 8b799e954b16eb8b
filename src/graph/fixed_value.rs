use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::control::{Control, ControlValue};
use crate::graph::node::{AudioNode, NodeHandle, Signal};

/// Audio-rate bridge for a control signal: a block filled with the
/// control's current value.
///
/// The block is only rewritten when the control reports an edge: the
/// cached output already holds the right samples otherwise. This is what
/// every literal parameter (`440.0` as a frequency input) compiles down to,
/// so the common case costs one control tick per block and no sample
/// writes.
pub struct FixedValueNode {
    value: Control,
}

impl AudioNode for FixedValueNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        let value = self.value.tick(ctx);
        if value.triggered {
            output.fill(value.value);
        }
    }
}

#[derive(Clone)]
pub struct FixedValue {
    handle: NodeHandle<FixedValueNode>,
}

impl FixedValue {
    pub fn new(value: impl Into<Control>) -> Self {
        Self {
            handle: NodeHandle::new(FixedValueNode {
                value: value.into(),
            }),
        }
    }
}

impl From<FixedValue> for Signal {
    fn from(fixed: FixedValue) -> Signal {
        fixed.handle.signal()
    }
}

impl From<Control> for Signal {
    fn from(control: Control) -> Signal {
        FixedValue::new(control).into()
    }
}

impl From<f32> for Signal {
    fn from(value: f32) -> Signal {
        FixedValue::new(value).into()
    }
}

impl From<ControlValue> for Signal {
    fn from(value: ControlValue) -> Signal {
        FixedValue::new(Control::from(value)).into()
    }
}
