use crate::graph::context::SynthesisContext;
use crate::graph::control::{Control, ControlHandle, ControlNode, ControlOutput};
use crate::graph::fixed_value::FixedValue;
use crate::graph::node::Signal;

/// Descriptor for a parameter exposed on a [`crate::synth::Synth`]: what a
/// host UI needs to build a control for it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

/// A named, ranged control value. Behaves like a `ControlValue` on the
/// graph side; the range only matters for `set_normalized` and for
/// clamping direct sets.
pub struct ParameterNode {
    info: ParameterInfo,
    value: f32,
    changed: bool,
}

impl ControlNode for ParameterNode {
    fn compute(&mut self, ctx: &SynthesisContext) -> ControlOutput {
        let output = ControlOutput {
            value: self.value,
            triggered: self.changed || ctx.force_new_output,
        };
        self.changed = ctx.force_new_output;
        output
    }
}

#[derive(Clone)]
pub struct ControlParameter {
    handle: ControlHandle<ParameterNode>,
}

impl ControlParameter {
    pub fn new(name: &str, initial: f32, min: f32, max: f32) -> Self {
        assert!(min < max, "parameter {name}: empty range");
        let initial = initial.clamp(min, max);
        Self {
            handle: ControlHandle::new(ParameterNode {
                info: ParameterInfo {
                    name: name.to_owned(),
                    min,
                    max,
                    default: initial,
                },
                value: initial,
                changed: true,
            }),
        }
    }

    /// Set the value, clamped to the declared range.
    pub fn set(&self, value: f32) {
        self.handle.with_node(|node| {
            node.value = value.clamp(node.info.min, node.info.max);
            node.changed = true;
        });
    }

    /// Set from a 0..1 position mapped across the declared range.
    pub fn set_normalized(&self, normalized: f32) {
        self.handle.with_node(|node| {
            let normalized = normalized.clamp(0.0, 1.0);
            node.value = node.info.min + normalized * (node.info.max - node.info.min);
            node.changed = true;
        });
    }

    /// Current value, read directly without affecting tick state.
    pub fn value(&self) -> f32 {
        self.handle.with_node(|node| node.value)
    }

    pub fn name(&self) -> String {
        self.handle.with_node(|node| node.info.name.clone())
    }

    pub fn info(&self) -> ParameterInfo {
        self.handle.with_node(|node| node.info.clone())
    }
}

impl From<ControlParameter> for Control {
    fn from(parameter: ControlParameter) -> Control {
        parameter.handle.control()
    }
}

impl From<ControlParameter> for Signal {
    fn from(parameter: ControlParameter) -> Signal {
        FixedValue::new(Control::from(parameter)).into()
    }
}
