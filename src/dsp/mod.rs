//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free on the per-block hot path and are
//! realtime-safe once constructed. They stay focused on storage and
//! signal-processing math; scheduling, memoization, and node wiring live in
//! the `graph` module.

/// Circular buffer with fractional-offset reads.
pub mod delay_line;
/// Flush-to-zero control for the audio thread.
pub mod denormal;
/// Multi-channel interleaved sample buffer.
pub mod frames;
/// Minimum-phase bandlimited step table and its runtime ring buffer.
pub mod min_blep;

pub use delay_line::DelayLine;
pub use frames::AudioFrames;
pub use min_blep::{BlepRing, MinBlepTable};
