use std::ops::{AddAssign, DivAssign, Index, IndexMut, MulAssign, SubAssign};

use tracing::error;

/*
Interleaved Frame Buffer
========================

AudioFrames is the unit of data exchanged between graph nodes: a flat f32
buffer holding `frames × channels` samples, interleaved
(`frame * channels + channel`). Channel counts are 1 (mono) or 2 (stereo).

Two rules keep it realtime-safe:

1. Grow-only backing storage. `resize` may change the logical dimensions at
   any time, but the underlying allocation never shrinks, so repeated
   resizes between the same sizes are free. Nothing on the per-block path
   resizes at all.

2. A fixed channel-reconciliation law. Mono generators feed stereo effects
   (and vice versa) constantly, so every copy between mismatched buffers
   follows the same rule:

     source has fewer channels  →  its channel 0 is broadcast to all
                                   destination channels
     source has more channels   →  the extra channels are averaged down

   The compound-assignment operators follow the spirit of the same rule:
   a stereo target consumes a mono source by applying each sample to both
   channels; a mono target consumes a stereo source through its channel 0.
*/

#[derive(Debug, Default, Clone)]
pub struct AudioFrames {
    data: Vec<f32>,
    n_frames: usize,
    n_channels: usize,
}

/// Channel counts outside 1..=2 are a configuration error. Log and clamp so
/// synthesis can continue with degraded output instead of halting audio.
fn checked_channels(n_channels: usize) -> usize {
    if (1..=2).contains(&n_channels) {
        n_channels
    } else {
        error!(n_channels, "unsupported channel count, clamping");
        n_channels.clamp(1, 2)
    }
}

impl AudioFrames {
    /// An empty buffer. Call `resize` before use.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(n_frames: usize, n_channels: usize) -> Self {
        let mut frames = Self::default();
        frames.resize_with_value(n_frames, n_channels, 0.0);
        frames
    }

    pub fn with_value(n_frames: usize, n_channels: usize, value: f32) -> Self {
        let mut frames = Self::default();
        frames.resize_with_value(n_frames, n_channels, value);
        frames
    }

    pub fn frames(&self) -> usize {
        self.n_frames
    }

    pub fn channels(&self) -> usize {
        self.n_channels
    }

    /// Total number of samples (`frames × channels`).
    pub fn len(&self) -> usize {
        self.n_frames * self.n_channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len()]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        let len = self.len();
        &mut self.data[..len]
    }

    /// Change the logical dimensions. Existing content that still fits is
    /// preserved; samples beyond the previous high-water mark are zeroed,
    /// samples re-exposed within it are unspecified (use
    /// `resize_with_value` to initialize). The backing allocation only ever
    /// grows.
    pub fn resize(&mut self, n_frames: usize, n_channels: usize) {
        let n_channels = checked_channels(n_channels);
        let len = n_frames * n_channels;
        if len > self.data.len() {
            self.data.resize(len, 0.0);
        }
        self.n_frames = n_frames;
        self.n_channels = n_channels;
    }

    /// Like `resize`, but assigns `value` to every sample.
    pub fn resize_with_value(&mut self, n_frames: usize, n_channels: usize, value: f32) {
        self.resize(n_frames, n_channels);
        self.as_mut_slice().fill(value);
    }

    pub fn clear(&mut self) {
        self.as_mut_slice().fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.as_mut_slice().fill(value);
    }

    /// Sample at (frame, channel).
    #[inline]
    pub fn at(&self, frame: usize, channel: usize) -> f32 {
        debug_assert!(frame < self.n_frames && channel < self.n_channels);
        self.data[frame * self.n_channels + channel]
    }

    #[inline]
    pub fn at_mut(&mut self, frame: usize, channel: usize) -> &mut f32 {
        debug_assert!(frame < self.n_frames && channel < self.n_channels);
        &mut self.data[frame * self.n_channels + channel]
    }

    /// Copy one channel's samples over another's, in place.
    pub fn copy_channel(&mut self, src: usize, dst: usize) {
        debug_assert!(src < self.n_channels && dst < self.n_channels);
        if src == dst {
            return;
        }
        let stride = self.n_channels;
        for frame in 0..self.n_frames {
            self.data[frame * stride + dst] = self.data[frame * stride + src];
        }
    }

    /// Broadcast channel 0 into every other channel.
    pub fn fill_channels(&mut self) {
        for channel in 1..self.n_channels {
            self.copy_channel(0, channel);
        }
    }

    /// Fill from `src`, applying the channel-reconciliation law when channel
    /// counts differ. Frame counts must match.
    pub fn copy_from(&mut self, src: &AudioFrames) {
        if src.frames() != self.n_frames {
            error!(
                src = src.frames(),
                dst = self.n_frames,
                "frame count mismatch in copy, skipping"
            );
            return;
        }
        let src_channels = src.channels();
        if self.n_channels == src_channels {
            self.as_mut_slice().copy_from_slice(src.as_slice());
        } else if self.n_channels < src_channels {
            // Average source channels down.
            let scale = 1.0 / src_channels as f32;
            for frame in 0..self.n_frames {
                let mut sum = 0.0;
                for channel in 0..src_channels {
                    sum += src.at(frame, channel);
                }
                self.data[frame * self.n_channels] = sum * scale;
            }
        } else {
            // Copy the single source channel, then broadcast.
            for frame in 0..self.n_frames {
                self.data[frame * self.n_channels] = src.at(frame, 0);
            }
            self.fill_channels();
        }
    }

    /// Linearly interpolated sample at a fractional frame position. The
    /// position must lie within `0.0..=frames - 1`; no wrapping is performed.
    pub fn interpolate(&self, frame: f32, channel: usize) -> f32 {
        debug_assert!(frame >= 0.0 && frame <= (self.n_frames - 1) as f32);
        let index = frame as usize;
        let frac = frame - index as f32;
        let a = self.at(index, channel);
        if frac == 0.0 {
            return a;
        }
        let b = self.at((index + 1).min(self.n_frames - 1), channel);
        a + frac * (b - a)
    }

    /// Resize while stretching or shrinking the existing content to fit the
    /// new frame count. Offline use only (lookup-table correction); this is
    /// the one operation allowed to reallocate freely.
    pub fn resample(&mut self, n_frames: usize, n_channels: usize) {
        let n_channels = checked_channels(n_channels);
        if n_channels != self.n_channels {
            error!("resample cannot change channel count, resizing instead");
            self.resize(n_frames, n_channels);
            return;
        }
        if n_frames == self.n_frames || self.n_frames == 0 || n_frames == 0 {
            self.resize(n_frames, n_channels);
            return;
        }
        let mut resampled = vec![0.0; n_frames * n_channels];
        let step = (self.n_frames - 1) as f32 / (n_frames - 1).max(1) as f32;
        for (frame, chunk) in resampled.chunks_exact_mut(n_channels).enumerate() {
            // Rounding can push the last position a hair past the end.
            let position = (frame as f32 * step).min((self.n_frames - 1) as f32);
            for (channel, sample) in chunk.iter_mut().enumerate() {
                *sample = self.interpolate(position, channel);
            }
        }
        self.data = resampled;
        self.n_frames = n_frames;
    }
}

impl Index<usize> for AudioFrames {
    type Output = f32;

    #[inline]
    fn index(&self, sample: usize) -> &f32 {
        debug_assert!(sample < self.len());
        &self.data[sample]
    }
}

impl IndexMut<usize> for AudioFrames {
    #[inline]
    fn index_mut(&mut self, sample: usize) -> &mut f32 {
        debug_assert!(sample < self.len());
        &mut self.data[sample]
    }
}

/// Compound assignment against another buffer of equal frame count. With
/// mismatched channel counts, a mono target consumes the source's channel 0
/// and a stereo target applies each mono source sample to both channels.
macro_rules! impl_frames_op {
    ($assign:ident, $method:ident, $op:tt) => {
        impl $assign<&AudioFrames> for AudioFrames {
            fn $method(&mut self, rhs: &AudioFrames) {
                if rhs.frames() != self.n_frames {
                    error!(
                        src = rhs.frames(),
                        dst = self.n_frames,
                        "frame count mismatch in arithmetic, skipping"
                    );
                    return;
                }
                let rhs_channels = rhs.channels();
                if self.n_channels == rhs_channels {
                    for (dst, src) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
                        *dst $op *src;
                    }
                } else if self.n_channels < rhs_channels {
                    for frame in 0..self.n_frames {
                        self.data[frame] $op rhs.at(frame, 0);
                    }
                } else {
                    for frame in 0..self.n_frames {
                        let value = rhs.at(frame, 0);
                        for channel in 0..self.n_channels {
                            self.data[frame * self.n_channels + channel] $op value;
                        }
                    }
                }
            }
        }
    };
}

impl_frames_op!(AddAssign, add_assign, +=);
impl_frames_op!(SubAssign, sub_assign, -=);
impl_frames_op!(MulAssign, mul_assign, *=);
impl_frames_op!(DivAssign, div_assign, /=);
