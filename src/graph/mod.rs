//! Composable building blocks for constructing synthesis graphs.
//!
//! Nodes come in two rates. Audio-rate nodes fill one block of samples per
//! tick; control-rate nodes produce a single value plus a "new information"
//! edge flag. Both are memoized against the owning root's clock, so a node
//! shared by several parents computes once per block and every parent sees
//! the same output. Handles (`Signal`, `Control`) are cheap clones aliasing
//! the underlying node; graphs stay acyclic at the handle level, feedback
//! only ever lives inside a node's private state.

/// Add/subtract/multiply/divide nodes and the operator sugar on handles.
pub mod arithmetic;
/// Anti-aliased oscillators built on the minBLEP table.
pub mod bandlimited;
/// The per-root clock every tick call observes.
pub mod context;
/// Control-rate node trait, memoization, and basic control sources.
pub mod control;
/// Feedback delay effect; the worked example of the effect seam.
pub mod delay;
/// Audio-rate bridge for control signals.
pub mod fixed_value;
/// Periodic trigger source driven by tempo.
pub mod metro;
/// Summing bus with dynamic input add/remove.
pub mod mixer;
/// White noise source.
pub mod noise;
/// Audio-rate node trait, memoization, and shared handles.
pub mod node;
/// Naive (non-bandlimited) oscillators.
pub mod oscillator;
/// Audio-rate linear smoothing of control values.
pub mod ramped_value;
/// Wavetable oscillator and the shared sine table.
pub mod table_osc;

pub use arithmetic::{Adder, Divider, Multiplier, Subtractor};
pub use bandlimited::{BandlimitedRect, BandlimitedSaw};
pub use context::SynthesisContext;
pub use control::{Control, ControlHandle, ControlNode, ControlOutput, ControlTrigger, ControlValue};
pub use delay::BasicDelay;
pub use fixed_value::FixedValue;
pub use metro::ControlMetro;
pub use mixer::Mixer;
pub use noise::Noise;
pub use node::{AudioNode, NodeHandle, Signal};
pub use oscillator::{AngularWave, RectWave, SawtoothWave};
pub use ramped_value::RampedValue;
pub use table_osc::{SineWave, TableLookupOsc, WaveTable};
