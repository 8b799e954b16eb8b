use std::ops::{Add, Div, Mul, Sub};

use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::control::{Control, ControlNode, ControlOutput};
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/*
Arithmetic Combinators
======================

Wiring sugar: `a + b`, `a * 0.5`, `440.0 + lfo` build small combinator
nodes, so arbitrary expression trees of handles become graphs. Stereo-ness
propagates: a combinator is stereo when any operand is, and mono operands
are reconciled up by the tick copy.

Operands of different kinds mix freely because everything converges on
`Signal`: floats become constant blocks, controls become `FixedValue`
bridges, and control-with-control expressions stay at control rate via the
`Control` operator overloads (much cheaper than lifting both sides to audio
rate just to add two scalars per block).
*/

fn stereo_any(inputs: &[Signal]) -> bool {
    inputs.iter().any(Signal::is_stereo)
}

fn workspace(stereo: bool) -> AudioFrames {
    AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, if stereo { 2 } else { 1 })
}

/// Sums any number of inputs.
pub struct AdderNode {
    inputs: Vec<Signal>,
    workspace: AudioFrames,
    stereo: bool,
}

impl AudioNode for AdderNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        output.clear();
        for input in &self.inputs {
            input.tick(&mut self.workspace, ctx);
            *output += &self.workspace;
        }
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }
}

#[derive(Clone)]
pub struct Adder {
    handle: NodeHandle<AdderNode>,
}

impl Adder {
    pub fn new(inputs: Vec<Signal>) -> Self {
        let stereo = stereo_any(&inputs);
        Self {
            handle: NodeHandle::new(AdderNode {
                inputs,
                workspace: workspace(stereo),
                stereo,
            }),
        }
    }
}

/// Multiplies any number of inputs (amplitude or ring modulation).
pub struct MultiplierNode {
    inputs: Vec<Signal>,
    workspace: AudioFrames,
    stereo: bool,
}

impl AudioNode for MultiplierNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        let mut inputs = self.inputs.iter();
        match inputs.next() {
            Some(first) => first.tick(output, ctx),
            None => {
                output.clear();
                return;
            }
        }
        for input in inputs {
            input.tick(&mut self.workspace, ctx);
            *output *= &self.workspace;
        }
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }
}

#[derive(Clone)]
pub struct Multiplier {
    handle: NodeHandle<MultiplierNode>,
}

impl Multiplier {
    pub fn new(inputs: Vec<Signal>) -> Self {
        let stereo = stereo_any(&inputs);
        Self {
            handle: NodeHandle::new(MultiplierNode {
                inputs,
                workspace: workspace(stereo),
                stereo,
            }),
        }
    }
}

/// `left - right`.
pub struct SubtractorNode {
    left: Signal,
    right: Signal,
    workspace: AudioFrames,
    stereo: bool,
}

impl AudioNode for SubtractorNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.left.tick(output, ctx);
        self.right.tick(&mut self.workspace, ctx);
        *output -= &self.workspace;
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }
}

#[derive(Clone)]
pub struct Subtractor {
    handle: NodeHandle<SubtractorNode>,
}

impl Subtractor {
    pub fn new(left: Signal, right: Signal) -> Self {
        let stereo = left.is_stereo() || right.is_stereo();
        Self {
            handle: NodeHandle::new(SubtractorNode {
                left,
                right,
                workspace: workspace(stereo),
                stereo,
            }),
        }
    }
}

/// `left / right`. Division by zero produces non-finite samples, which the
/// memoization layer logs and passes through.
pub struct DividerNode {
    left: Signal,
    right: Signal,
    workspace: AudioFrames,
    stereo: bool,
}

impl AudioNode for DividerNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.left.tick(output, ctx);
        self.right.tick(&mut self.workspace, ctx);
        *output /= &self.workspace;
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }
}

#[derive(Clone)]
pub struct Divider {
    handle: NodeHandle<DividerNode>,
}

impl Divider {
    pub fn new(left: Signal, right: Signal) -> Self {
        let stereo = left.is_stereo() || right.is_stereo();
        Self {
            handle: NodeHandle::new(DividerNode {
                left,
                right,
                workspace: workspace(stereo),
                stereo,
            }),
        }
    }
}

macro_rules! impl_wrapper_into_signal {
    ($($wrapper:ident),+) => {
        $(impl From<$wrapper> for Signal {
            fn from(wrapper: $wrapper) -> Signal {
                wrapper.handle.signal()
            }
        })+
    };
}

impl_wrapper_into_signal!(Adder, Multiplier, Subtractor, Divider);

impl<R: Into<Signal>> Add<R> for Signal {
    type Output = Signal;

    fn add(self, rhs: R) -> Signal {
        Adder::new(vec![self, rhs.into()]).into()
    }
}

impl<R: Into<Signal>> Sub<R> for Signal {
    type Output = Signal;

    fn sub(self, rhs: R) -> Signal {
        Subtractor::new(self, rhs.into()).into()
    }
}

impl<R: Into<Signal>> Mul<R> for Signal {
    type Output = Signal;

    fn mul(self, rhs: R) -> Signal {
        Multiplier::new(vec![self, rhs.into()]).into()
    }
}

impl<R: Into<Signal>> Div<R> for Signal {
    type Output = Signal;

    fn div(self, rhs: R) -> Signal {
        Divider::new(self, rhs.into()).into()
    }
}

macro_rules! impl_scalar_lhs_signal_op {
    ($($trait:ident, $method:ident);+ $(;)?) => {
        $(impl $trait<Signal> for f32 {
            type Output = Signal;

            fn $method(self, rhs: Signal) -> Signal {
                Signal::from(self).$method(rhs)
            }
        })+
    };
}

impl_scalar_lhs_signal_op! {
    Add, add;
    Sub, sub;
    Mul, mul;
    Div, div;
}

/// Control-rate arithmetic: combine two controls without lifting either to
/// audio rate. The edge flag is the union of the operands' edges.
#[derive(Clone, Copy)]
enum CombineOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

pub struct ControlCombineNode {
    op: CombineOp,
    left: Control,
    right: Control,
}

impl ControlNode for ControlCombineNode {
    fn compute(&mut self, ctx: &SynthesisContext) -> ControlOutput {
        let left = self.left.tick(ctx);
        let right = self.right.tick(ctx);
        let value = match self.op {
            CombineOp::Add => left.value + right.value,
            CombineOp::Subtract => left.value - right.value,
            CombineOp::Multiply => left.value * right.value,
            CombineOp::Divide => left.value / right.value,
        };
        ControlOutput {
            value,
            triggered: left.triggered || right.triggered,
        }
    }
}

fn combine(op: CombineOp, left: Control, right: Control) -> Control {
    Control::new(ControlCombineNode { op, left, right })
}

macro_rules! impl_control_op {
    ($($trait:ident, $method:ident, $op:expr);+ $(;)?) => {
        $(
            impl<R: Into<Control>> $trait<R> for Control {
                type Output = Control;

                fn $method(self, rhs: R) -> Control {
                    combine($op, self, rhs.into())
                }
            }

            impl $trait<Control> for f32 {
                type Output = Control;

                fn $method(self, rhs: Control) -> Control {
                    combine($op, Control::from(self), rhs)
                }
            }
        )+
    };
}

impl_control_op! {
    Add, add, CombineOp::Add;
    Sub, sub, CombineOp::Subtract;
    Mul, mul, CombineOp::Multiply;
    Div, div, CombineOp::Divide;
}
