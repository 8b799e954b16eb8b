use tracing::warn;

use crate::dsp::frames::AudioFrames;
use crate::SYNTHESIS_BLOCK_SIZE;

/*
Fractional Delay Line
=====================

A circular buffer over AudioFrames with independent write-then-advance and
arbitrary-offset reads. This is the primitive under every delay, comb
filter, and reverb tap.

The single-sample API is deliberately one-purposed:

  tick_out(delay_time, channel)   read, does not move any head
  tick_in(sample, channel)        write at the write head, does not move it
  advance()                       move both heads forward one frame

Keeping the three steps separate is what makes feedback structures
(read-before-write) expressible without extra buffers.

The read head is cached against the last requested delay time: a constant
delay advances the read head in lockstep with the write head, costing one
add per frame. Reading at several different offsets per block (multi-tap)
recomputes the offset on each change, which is the intended use.

Precondition inherited from the design: if the requested delay time changes,
`tick_out` must be called with the new time before the next `advance()`.
Advancing first leaves the cached read head one frame ahead of where the new
delay expects it until the next `tick_out` recomputes it.
*/

#[derive(Debug)]
pub struct DelayLine {
    frames: AudioFrames,
    sample_rate: f32,
    interpolates: bool,
    write_head: usize,
    read_head: f32,
    last_delay_time: f32,
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayLine {
    pub fn new() -> Self {
        Self {
            frames: AudioFrames::with_size(SYNTHESIS_BLOCK_SIZE, 1),
            sample_rate: 44_100.0,
            interpolates: true,
            write_head: 0,
            read_head: 0.0,
            last_delay_time: 0.0,
        }
    }

    /// Allocate capacity for `max_delay` seconds. Must be called before
    /// use; the capacity is binding, later delay requests beyond it clamp.
    pub fn initialize(&mut self, max_delay: f32, channels: usize, sample_rate: f32) {
        assert!(sample_rate > 0.0, "sample rate must be positive");
        let capacity = ((max_delay * sample_rate) as usize).max(2);
        self.frames.resize_with_value(capacity, channels, 0.0);
        self.sample_rate = sample_rate;
        self.write_head = 0;
        self.read_head = 0.0;
        self.last_delay_time = 0.0;
    }

    pub fn set_interpolates(&mut self, interpolates: bool) {
        self.interpolates = interpolates;
    }

    pub fn capacity(&self) -> usize {
        self.frames.frames()
    }

    pub fn channels(&self) -> usize {
        self.frames.channels()
    }

    /// Zero the stored samples without moving the heads.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// One delayed sample at `delay_time` seconds behind the write head.
    /// Linearly interpolated unless interpolation is disabled. Does not
    /// advance any head.
    #[inline]
    pub fn tick_out(&mut self, delay_time: f32, channel: usize) -> f32 {
        let capacity = self.frames.frames();
        if delay_time != self.last_delay_time {
            let delay_samples = delay_time * self.sample_rate;
            if delay_samples > capacity as f32 {
                warn!(
                    delay_time,
                    capacity, "requested delay exceeds allocated capacity, clamping"
                );
            }
            let delay_samples = delay_samples.clamp(0.0, capacity as f32);
            self.read_head = self.write_head as f32 - delay_samples;
            if self.read_head < 0.0 {
                self.read_head += capacity as f32;
            }
            self.last_delay_time = delay_time;
        }

        let stride = self.frames.channels();
        if self.interpolates {
            let index = self.read_head as usize;
            let frac = self.read_head - index as f32;

            // Occasionally lands one past the end from floating point
            // rounding of the read head.
            let mut sample_a = index * stride + channel;
            if sample_a >= self.frames.len() {
                sample_a -= self.frames.len();
            }
            let mut sample_b = sample_a + stride;
            if sample_b >= self.frames.len() {
                sample_b -= self.frames.len();
            }

            let a = self.frames[sample_a];
            let b = self.frames[sample_b];
            a + frac * (b - a)
        } else {
            self.frames[(self.read_head as usize) * stride + channel]
        }
    }

    /// Write one sample at the write head. Does not advance any head.
    #[inline]
    pub fn tick_in(&mut self, sample: f32, channel: usize) {
        let stride = self.frames.channels();
        self.frames[self.write_head * stride + channel] = sample;
    }

    /// Move both heads forward one frame. The read head advance assumes the
    /// delay time is unchanged since the last `tick_out`.
    #[inline]
    pub fn advance(&mut self) {
        self.write_head += 1;
        if self.write_head >= self.frames.frames() {
            self.write_head = 0;
        }

        self.read_head += 1.0;
        if self.read_head >= self.frames.frames() as f32 {
            self.read_head -= self.frames.frames() as f32;
        }
    }
}
