use crate::dsp::delay_line::DelayLine;
use crate::dsp::frames::AudioFrames;
use crate::graph::context::SynthesisContext;
use crate::graph::node::{AudioNode, NodeHandle, Signal};
use crate::SYNTHESIS_BLOCK_SIZE;

/// Feedback delay around a fractional [`DelayLine`].
///
/// This is the worked example of the effect pattern: the node owns an
/// input `Signal`, becomes stereo when its input is, and pre-ticks the
/// input into a dry buffer before processing. Per frame and channel the
/// order is read the tap, write dry + feedback, advance. Read-before-write
/// is what keeps a short delay from eating its own output a frame early.
///
/// `delay_time` is an audio-rate input so it can be modulated (chorus and
/// flanger territory); `feedback` and `mix` ride along at audio rate too.
/// The line's capacity is fixed at construction from `max_delay`, which is
/// why the constructor needs the sample rate up front.
pub struct BasicDelayNode {
    input: Signal,
    delay_time: Signal,
    feedback: Signal,
    mix: Signal,

    dry_frames: AudioFrames,
    time_frames: AudioFrames,
    feedback_frames: AudioFrames,
    mix_frames: AudioFrames,
    line: DelayLine,
    stereo: bool,
}

impl AudioNode for BasicDelayNode {
    fn render_block(&mut self, output: &mut AudioFrames, ctx: &SynthesisContext) {
        self.input.tick(&mut self.dry_frames, ctx);
        self.delay_time.tick(&mut self.time_frames, ctx);
        self.feedback.tick(&mut self.feedback_frames, ctx);
        self.mix.tick(&mut self.mix_frames, ctx);

        let channels = self.dry_frames.channels();
        for frame in 0..output.frames() {
            let delay_time = self.time_frames[frame];
            let feedback = self.feedback_frames[frame];
            let mix = self.mix_frames[frame].clamp(0.0, 1.0);

            for channel in 0..channels {
                let delayed = self.line.tick_out(delay_time, channel);
                let dry = self.dry_frames.at(frame, channel);
                self.line.tick_in(dry + delayed * feedback, channel);
                *output.at_mut(frame, channel) = dry * (1.0 - mix) + delayed * mix;
            }
            self.line.advance();
        }
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }
}

#[derive(Clone)]
pub struct BasicDelay {
    handle: NodeHandle<BasicDelayNode>,
}

impl BasicDelay {
    /// `max_delay` (seconds) fixes the line's capacity.
    pub fn new(
        input: impl Into<Signal>,
        delay_time: impl Into<Signal>,
        max_delay: f32,
        sample_rate: f32,
    ) -> Self {
        let input = input.into();
        let stereo = input.is_stereo();
        let channels = if stereo { 2 } else { 1 };
        let mut line = DelayLine::new();
        line.initialize(max_delay, channels, sample_rate);

        let mono = || AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1);
        Self {
            handle: NodeHandle::new(BasicDelayNode {
                input,
                delay_time: delay_time.into(),
                feedback: Signal::from(0.0),
                mix: Signal::from(0.5),
                dry_frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, channels),
                time_frames: mono(),
                feedback_frames: mono(),
                mix_frames: mono(),
                line,
                stereo,
            }),
        }
    }

    pub fn feedback(self, feedback: impl Into<Signal>) -> Self {
        self.handle
            .with_node(|node| node.feedback = feedback.into());
        self
    }

    /// 0.0 = dry only, 1.0 = delayed signal only. Defaults to an equal mix.
    pub fn mix(self, mix: impl Into<Signal>) -> Self {
        self.handle.with_node(|node| node.mix = mix.into());
        self
    }
}

impl From<BasicDelay> for Signal {
    fn from(delay: BasicDelay) -> Signal {
        delay.handle.signal()
    }
}
