pub mod dsp;
pub mod graph; // Composable audio-rate and control-rate graph nodes
pub mod synth; // Graph root pulled by the audio callback

/// Number of frames computed per tick. Control-rate nodes update once per
/// block, so this is also the control update period. Keep it a power of two
/// smaller than the hardware buffer size.
pub const SYNTHESIS_BLOCK_SIZE: usize = 64;
