use tracing::warn;

/// Structural/parameter changes shipped from a control thread to the audio
/// thread without taking the root lock. All variants are `Copy`: applying
/// or dropping one never touches the heap on the audio side.
///
/// Parameters are addressed by registration index (the order of
/// `Synth::add_parameter` calls) so commands stay allocation-free; resolve
/// names once at setup time with `Synth::parameter_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthCommand {
    SetParameter { index: usize, value: f32 },
    SetParameterNormalized { index: usize, value: f32 },
    ForceNewOutput,
}

/// Producer half of a synth's command queue. Single producer: clone-free by
/// design, hand it to the one control thread that drives the synth.
pub struct CommandSender {
    producer: rtrb::Producer<SynthCommand>,
}

impl CommandSender {
    /// Returns false (and logs) when the queue is full; the command is
    /// dropped rather than blocking the caller.
    pub fn send(&mut self, command: SynthCommand) -> bool {
        match self.producer.push(command) {
            Ok(()) => true,
            Err(_) => {
                warn!(?command, "synth command queue full, dropping");
                false
            }
        }
    }
}

pub(crate) type CommandReceiver = rtrb::Consumer<SynthCommand>;

pub(crate) fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    (CommandSender { producer }, consumer)
}
