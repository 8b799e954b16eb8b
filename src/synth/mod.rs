//! Graph root: the object the audio callback pulls.
//!
//! A [`Synth`] owns the context clock for its graph, renders one block at a
//! time from its output node, and slices those blocks into whatever buffer
//! length the hardware asks for. Everything behind the root sits under one
//! lock, so ticking and structural mutation are mutually exclusive; with
//! the `rtrb` feature, parameter traffic can bypass that lock through a
//! lock-free command queue drained at block boundaries.

#[cfg(feature = "rtrb")]
pub mod command;
pub mod parameter;

#[cfg(feature = "rtrb")]
pub use command::{CommandSender, SynthCommand};
pub use parameter::{ControlParameter, ParameterInfo};

use std::sync::{Arc, Mutex};

use tracing::error;
#[cfg(feature = "rtrb")]
use tracing::warn;

use crate::dsp::denormal;
use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::control::Control;
use crate::graph::node::{lock_unpoisoned, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

struct SynthState {
    context: SynthesisContext,
    output: Option<Signal>,
    /// Last computed block, stereo. `read_position` is the interleaved
    /// sample cursor into it, retained across fill calls so arbitrary
    /// hardware buffer sizes work against the fixed block size.
    block: AudioFrames,
    read_position: usize,
    /// Controls ticked every block even when nothing in the graph consumes
    /// them (timers, sequencer clocks).
    aux_controls: Vec<Control>,
    parameters: Vec<ControlParameter>,
    #[cfg(feature = "rtrb")]
    commands: Option<command::CommandReceiver>,
}

impl SynthState {
    /// Compute the next block into `self.block` and advance the clock.
    fn render_block(&mut self) {
        #[cfg(feature = "rtrb")]
        self.drain_commands();

        match &self.output {
            Some(output) => output.tick(&mut self.block, &self.context),
            None => self.block.clear(),
        }
        for control in &self.aux_controls {
            control.tick(&self.context);
        }
        self.context.advance();
    }

    #[cfg(feature = "rtrb")]
    fn drain_commands(&mut self) {
        let Some(receiver) = self.commands.as_mut() else {
            return;
        };
        while let Ok(command) = receiver.pop() {
            match command {
                SynthCommand::SetParameter { index, value } => {
                    match self.parameters.get(index) {
                        Some(parameter) => parameter.set(value),
                        None => warn!(index, "command for unknown parameter"),
                    }
                }
                SynthCommand::SetParameterNormalized { index, value } => {
                    match self.parameters.get(index) {
                        Some(parameter) => parameter.set_normalized(value),
                        None => warn!(index, "command for unknown parameter"),
                    }
                }
                SynthCommand::ForceNewOutput => {
                    self.context.force_new_output = true;
                }
            }
        }
    }
}

/// Mutex-guarded graph root. Clones share the same instance, so the audio
/// callback can hold one handle while UI/control code holds others.
#[derive(Clone)]
pub struct Synth {
    shared: Arc<Mutex<SynthState>>,
}

impl Synth {
    pub fn new(sample_rate: f32) -> Self {
        let block = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 2);
        let read_position = block.len();
        Self {
            shared: Arc::new(Mutex::new(SynthState {
                context: SynthesisContext::new(sample_rate),
                output: None,
                block,
                read_position,
                aux_controls: Vec::new(),
                parameters: Vec::new(),
                #[cfg(feature = "rtrb")]
                commands: None,
            })),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        lock_unpoisoned(&self.shared).context.sample_rate
    }

    pub fn set_output(&self, output: impl Into<Signal>) {
        let output = output.into();
        lock_unpoisoned(&self.shared).output = Some(output);
    }

    pub fn clear_output(&self) {
        lock_unpoisoned(&self.shared).output = None;
    }

    /// Tick a control every block regardless of graph wiring.
    pub fn add_aux_control(&self, control: impl Into<Control>) {
        let control = control.into();
        lock_unpoisoned(&self.shared).aux_controls.push(control);
    }

    /// Register a named parameter. The returned handle is live: it can be
    /// wired into the graph and set from any thread.
    pub fn add_parameter(&self, name: &str, initial: f32, min: f32, max: f32) -> ControlParameter {
        let parameter = ControlParameter::new(name, initial, min, max);
        lock_unpoisoned(&self.shared)
            .parameters
            .push(parameter.clone());
        parameter
    }

    pub fn parameter(&self, name: &str) -> Option<ControlParameter> {
        lock_unpoisoned(&self.shared)
            .parameters
            .iter()
            .find(|parameter| parameter.name() == name)
            .cloned()
    }

    /// Registration index of a parameter, for building commands.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        lock_unpoisoned(&self.shared)
            .parameters
            .iter()
            .position(|parameter| parameter.name() == name)
    }

    /// Set a parameter by name. Logs and returns false if no parameter with
    /// that name is registered.
    pub fn set_parameter(&self, name: &str, value: f32) -> bool {
        match self.parameter(name) {
            Some(parameter) => {
                parameter.set(value);
                true
            }
            None => {
                error!(name, "set_parameter: no such parameter");
                false
            }
        }
    }

    pub fn parameters(&self) -> Vec<ControlParameter> {
        lock_unpoisoned(&self.shared).parameters.clone()
    }

    /// Force every node to produce fresh output on the next block.
    pub fn force_new_output(&self) {
        lock_unpoisoned(&self.shared).context.force_new_output = true;
    }

    /// Install a lock-free command queue and return its sender. Commands
    /// are drained at the next block boundary, on the audio thread, while
    /// it already holds the root lock, so they never interleave mid-block.
    #[cfg(feature = "rtrb")]
    pub fn command_channel(&self, capacity: usize) -> CommandSender {
        let (sender, receiver) = command::command_queue(capacity);
        lock_unpoisoned(&self.shared).commands = Some(receiver);
        sender
    }

    /// Render exactly one block into `frames` (channel-reconciled) and
    /// advance the clock.
    pub fn tick(&self, frames: &mut AudioFrames) {
        let mut state = lock_unpoisoned(&self.shared);
        state.render_block();
        frames.copy_from(&state.block);
        // The whole block is spoken for; the next fill starts fresh.
        state.read_position = state.block.len();
    }

    /// Fill an arbitrary-length interleaved buffer, pulling blocks from the
    /// graph as needed. The read cursor into the current block persists
    /// across calls, so hardware period sizes need not divide the block
    /// size. The lock is taken per block, not per call: structural changes
    /// land between blocks even inside one long fill.
    pub fn fill_buffer_of_floats(&self, out: &mut [f32], n_channels: usize) {
        denormal::enable_flush_to_zero();

        if n_channels == 0 {
            error!("fill_buffer_of_floats with zero channels");
            return;
        }
        let n_frames = out.len() / n_channels;
        let mut channel_mismatch_logged = false;

        let mut frame = 0;
        while frame < n_frames {
            let mut state = lock_unpoisoned(&self.shared);
            if state.read_position >= state.block.len() {
                state.render_block();
                state.read_position = 0;
            }

            let block_channels = state.block.channels();
            if n_channels > block_channels && !channel_mismatch_logged {
                error!(
                    requested = n_channels,
                    available = block_channels,
                    "more output channels than the synth renders"
                );
                channel_mismatch_logged = true;
            }

            let frames_available = (state.block.len() - state.read_position) / block_channels;
            let count = frames_available.min(n_frames - frame);

            for _ in 0..count {
                let base = state.read_position;
                let out_base = frame * n_channels;
                if n_channels == block_channels {
                    for channel in 0..n_channels {
                        out[out_base + channel] = state.block[base + channel];
                    }
                } else if n_channels < block_channels {
                    // Average the extra synth channels down.
                    let mut sum = 0.0;
                    for channel in 0..block_channels {
                        sum += state.block[base + channel];
                    }
                    out[out_base] = sum / block_channels as f32;
                } else {
                    // More hardware channels than rendered: fill what
                    // exists, zero the rest.
                    for channel in 0..n_channels {
                        out[out_base + channel] = if channel < block_channels {
                            state.block[base + channel]
                        } else {
                            0.0
                        };
                    }
                }
                state.read_position += block_channels;
                frame += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::oscillator::SawtoothWave;

    fn ramp_synth(sample_rate: f32) -> Synth {
        let synth = Synth::new(sample_rate);
        // Low enough that one cycle spans many blocks, so discontinuities
        // can't hide a cursor bug.
        synth.set_output(SawtoothWave::new(10.0));
        synth
    }

    #[test]
    fn fill_is_continuous_across_odd_buffer_sizes() {
        let synth = ramp_synth(44_100.0);
        let mut first = vec![0.0_f32; 2 * 100];
        let mut second = vec![0.0_f32; 2 * 100];
        synth.fill_buffer_of_floats(&mut first, 2);
        synth.fill_buffer_of_floats(&mut second, 2);

        let mut combined: Vec<f32> = Vec::new();
        combined.extend(first.chunks(2).map(|frame| frame[0]));
        combined.extend(second.chunks(2).map(|frame| frame[0]));

        // A 10 Hz saw moves by ~4.5e-4 per sample; any block-boundary
        // glitch is orders of magnitude larger.
        for pair in combined.windows(2) {
            assert!(
                (pair[1] - pair[0]).abs() < 1e-2,
                "discontinuity {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn mono_fill_averages_stereo_block() {
        let synth = Synth::new(44_100.0);
        synth.set_output(0.5);
        let mut out = vec![0.0_f32; 300];
        synth.fill_buffer_of_floats(&mut out, 1);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn silent_without_output_node() {
        let synth = Synth::new(48_000.0);
        let mut out = vec![1.0_f32; 128];
        synth.fill_buffer_of_floats(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn named_parameters_round_trip() {
        let synth = Synth::new(44_100.0);
        let cutoff = synth.add_parameter("cutoff", 1_000.0, 20.0, 20_000.0);
        assert_eq!(synth.parameter_index("cutoff"), Some(0));
        assert!(synth.set_parameter("cutoff", 2_000.0));
        assert_eq!(cutoff.value(), 2_000.0);
        assert!(!synth.set_parameter("resonance", 0.5));
        assert!(synth.parameter("resonance").is_none());
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn commands_apply_at_block_boundaries() {
        let synth = Synth::new(44_100.0);
        let gain = synth.add_parameter("gain", 0.0, 0.0, 1.0);
        synth.set_output(Signal::from(Control::from(gain.clone())));

        let mut sender = synth.command_channel(16);
        sender.send(SynthCommand::SetParameter {
            index: 0,
            value: 0.75,
        });

        let mut frames = AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        synth.tick(&mut frames);
        assert!(frames.as_slice().iter().all(|&s| s == 0.75));
        assert_eq!(gain.value(), 0.75);

        // Unknown indices are absorbed, not fatal.
        sender.send(SynthCommand::SetParameter {
            index: 9,
            value: 1.0,
        });
        synth.tick(&mut frames);
    }
}
