use std::sync::OnceLock;

use rustfft::{num_complex::Complex, FftPlanner};

/*
Minimum-Phase Bandlimited Step (minBLEP)
========================================

A naive phase-accumulator oscillator (saw, rect) jumps at each cycle edge.
A jump contains energy at every frequency, so sampling it aliases: energy
above Nyquist folds back down as inharmonic garbage.

The fix is to replace each ideal step with a *bandlimited* step: the
integral of a windowed sinc, which is what an ideal lowpass filter turns a
step into. Stored oversampled in a table, a slice of it can be mixed into
the output wherever a discontinuity lands -- including *between* two output
samples, which is why the table is oversampled and why the injection code
interpolates by the fractional crossing offset.

A plain bandlimited step is symmetric around its midpoint (linear phase),
so half of the correction rings *before* the discontinuity. Reconstructing
the minimum-phase version concentrates the energy at the start instead:

  1. windowed sinc            sinc spanning ±Z zero crossings, Blackman
                              window, length 2·Z·Os (Os = oversampling)
  2. real cepstrum            FFT -> log|X| -> inverse FFT
  3. fold + exponentiate      keep bin 0 (and N/2 for even N), double the
                              rest of the lower half, zero the upper half;
                              FFT -> complex exp -> inverse FFT
  4. integrate + normalize    running sum, scaled so the step settles at
                              exactly 1.0

Table construction is offline and shared process-wide; only the small
per-oscillator ring buffer exists at synthesis time. The transforms use
rustfft; the reference implementation used a direct O(n²) DFT, which
computes the same thing.
*/

/// Zero crossings on either side of the shared table's sinc kernel.
const SHARED_ZERO_CROSSINGS: usize = 16;
/// Oversampling factor of the shared table.
const SHARED_OVERSAMPLING: usize = 32;

#[inline]
fn sinc(x: f32) -> f32 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f32::consts::PI * x;
        px.sin() / px
    }
}

fn blackman_window(length: usize) -> Vec<f32> {
    let m = (length - 1) as f32;
    (0..length)
        .map(|i| {
            let f = 2.0 * std::f32::consts::PI * i as f32 / m;
            0.42 - 0.5 * f.cos() + 0.08 * (2.0 * f).cos()
        })
        .collect()
}

/// Inverse transform of the log-magnitude spectrum.
fn real_cepstrum(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let mut planner = FftPlanner::<f32>::new();

    let mut spectrum: Vec<Complex<f32>> =
        signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    // ln of an exactly-zero bin is -inf; clamp to the smallest normal.
    for bin in spectrum.iter_mut() {
        let magnitude = bin.norm().max(f32::MIN_POSITIVE);
        *bin = Complex::new(magnitude.ln(), 0.0);
    }

    planner.plan_fft_inverse(n).process(&mut spectrum);
    spectrum.iter().map(|bin| bin.re / n as f32).collect()
}

/// Reconstruct the minimum-phase signal whose spectrum magnitude matches the
/// signal the cepstrum was taken from.
fn minimum_phase(cepstrum: &[f32]) -> Vec<f32> {
    let n = cepstrum.len();
    let nd2 = n / 2;
    let mut planner = FftPlanner::<f32>::new();

    // Fold: causal part doubled, anticausal part zeroed.
    let mut folded = vec![Complex::new(0.0_f32, 0.0); n];
    folded[0] = Complex::new(cepstrum[0], 0.0);
    for i in 1..nd2 {
        folded[i] = Complex::new(2.0 * cepstrum[i], 0.0);
    }
    if n % 2 == 0 {
        folded[nd2] = Complex::new(cepstrum[nd2], 0.0);
    }

    planner.plan_fft_forward(n).process(&mut folded);
    for bin in folded.iter_mut() {
        *bin = (*bin).exp();
    }
    planner.plan_fft_inverse(n).process(&mut folded);

    folded.iter().map(|bin| bin.re / n as f32).collect()
}

/// Build a minBLEP table of length `2·zero_crossings·oversampling + 1`,
/// rising from 0 to exactly 1.0 at the final sample.
pub fn generate_min_blep(zero_crossings: usize, oversampling: usize) -> Vec<f32> {
    let n = 2 * zero_crossings * oversampling + 1;
    let m = n - 1;

    // Windowed sinc spanning [-zero_crossings, +zero_crossings).
    let span = (2 * zero_crossings) as f32;
    let mut kernel: Vec<f32> = (0..m)
        .map(|i| sinc(-(zero_crossings as f32) + span * i as f32 / m as f32))
        .collect();
    for (sample, window) in kernel.iter_mut().zip(blackman_window(m)) {
        *sample *= window;
    }

    let impulse = minimum_phase(&real_cepstrum(&kernel));

    // Integrate into a step and hold the final value one extra sample so
    // interpolated reads at the very end stay in range.
    let mut table = Vec::with_capacity(n);
    let mut sum = 0.0;
    for sample in &impulse {
        sum += sample;
        table.push(sum);
    }
    table.push(sum);

    let scale = 1.0 / table[m];
    for sample in &mut table {
        *sample *= scale;
    }
    table
}

/// An immutable minBLEP table plus the parameters runtime injection needs.
/// One table is shared by every bandlimited oscillator instance.
#[derive(Debug)]
pub struct MinBlepTable {
    data: Vec<f32>,
    zero_crossings: usize,
    oversampling: usize,
}

impl MinBlepTable {
    pub fn generate(zero_crossings: usize, oversampling: usize) -> Self {
        assert!(
            zero_crossings > 0 && oversampling > 1,
            "degenerate minBLEP parameters"
        );
        Self {
            data: generate_min_blep(zero_crossings, oversampling),
            zero_crossings,
            oversampling,
        }
    }

    /// The process-wide table, built on first use.
    pub fn shared() -> &'static MinBlepTable {
        static SHARED: OnceLock<MinBlepTable> = OnceLock::new();
        SHARED.get_or_init(|| Self::generate(SHARED_ZERO_CROSSINGS, SHARED_OVERSAMPLING))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn oversampling(&self) -> usize {
        self.oversampling
    }

    /// Frames a correction spans at the output rate; also the ring buffer
    /// length. Sized so the deepest table read lands on the last sample.
    pub fn ring_frames(&self) -> usize {
        2 * self.zero_crossings
    }

    #[inline]
    fn at(&self, index: usize) -> f32 {
        self.data[index]
    }
}

/// Per-oscillator ring buffer that accumulates overlapping step corrections
/// and plays them back one sample per output frame.
#[derive(Debug)]
pub struct BlepRing {
    buffer: Vec<f32>,
    index: usize,
    /// Number of slots ahead of `index` holding live correction data.
    live: usize,
}

impl BlepRing {
    pub fn for_table(table: &MinBlepTable) -> Self {
        Self {
            buffer: vec![0.0; table.ring_frames()],
            index: 0,
            live: 0,
        }
    }

    /// Inject one bandlimited step starting at the current output frame.
    /// `offset` is the fractional crossing position within the current
    /// sample, in 0..1; it selects which table phase is read so the
    /// correction lands exactly where the discontinuity did. `scale` is the
    /// signed height of the discontinuity being cancelled.
    pub fn add(&mut self, table: &MinBlepTable, offset: f32, scale: f32) {
        let oversampling = table.oversampling();
        // Offsets outside the current sample (possible when a modulated
        // edge moves between blocks) clamp to the table boundary.
        let table_offset = (oversampling as f32 * offset).clamp(0.0, oversampling as f32);
        let frac = table_offset.fract();
        let mut table_index = table_offset as usize;

        let frames = self.buffer.len();
        let mut slot = self.index;
        for i in 0..frames - 1 {
            let a = table.at(table_index);
            let b = table.at(table_index + 1);
            let step = a + frac * (b - a);
            let correction = scale * (1.0 - step);
            if i < self.live {
                // Overlaps a still-playing correction.
                self.buffer[slot] += correction;
            } else {
                // Past the live region: overwrite stale data.
                self.buffer[slot] = correction;
            }
            table_index += oversampling;
            slot += 1;
            if slot == frames {
                slot = 0;
            }
        }
        self.live = frames - 1;
    }

    /// Correction for the current output frame; advances the ring. Returns
    /// zero once all injected corrections have fully played out.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.live == 0 {
            return 0.0;
        }
        let correction = self.buffer[self.index];
        self.live -= 1;
        self.index += 1;
        if self.index == self.buffer.len() {
            self.index = 0;
        }
        correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_settles_at_unity() {
        let table = generate_min_blep(8, 16);
        assert_eq!(table.len(), 2 * 8 * 16 + 1);
        let last = *table.last().unwrap();
        assert!((last - 1.0).abs() < 1e-5, "final sample {last}");
    }

    #[test]
    fn table_rises_monotonically_within_overshoot() {
        let table = generate_min_blep(8, 16);
        // Minimum-phase reconstruction is allowed small local overshoot but
        // the step must start low, end at one, and never swing wild.
        assert!(table[0].abs() < 0.2, "start {}", table[0]);
        let mut max_backstep = 0.0_f32;
        for pair in table.windows(2) {
            max_backstep = max_backstep.max(pair[0] - pair[1]);
        }
        assert!(max_backstep < 0.1, "backstep {max_backstep}");
        let peak = table.iter().fold(0.0_f32, |a, &b| a.max(b));
        assert!(peak < 1.25, "overshoot {peak}");
    }

    #[test]
    fn ring_drains_to_zero() {
        let table = MinBlepTable::generate(4, 8);
        let mut ring = BlepRing::for_table(&table);
        ring.add(&table, 0.5, 1.0);

        let frames = table.ring_frames();
        // The correction starts by cancelling most of the remaining step.
        let first = ring.next();
        assert!(first > 0.0 && first <= 1.25, "first correction {first}");
        for _ in 1..frames - 1 {
            ring.next();
        }
        // Live region exhausted.
        assert_eq!(ring.next(), 0.0);
    }

    #[test]
    fn overlapping_corrections_accumulate() {
        let table = MinBlepTable::generate(4, 8);

        let mut single = BlepRing::for_table(&table);
        single.add(&table, 0.0, 1.0);
        single.next();
        let tail = single.next();

        let mut overlapped = BlepRing::for_table(&table);
        overlapped.add(&table, 0.0, 1.0);
        overlapped.next();
        overlapped.add(&table, 0.0, 1.0);
        let combined = overlapped.next();

        // Second injection lands on top of the first one's tail instead of
        // replacing it.
        let head = 1.0 - table.at(0);
        assert!((combined - (tail + head)).abs() < 1e-5);
    }

    #[test]
    fn shared_table_is_reused() {
        let a = MinBlepTable::shared() as *const MinBlepTable;
        let b = MinBlepTable::shared() as *const MinBlepTable;
        assert_eq!(a, b);
    }
}
