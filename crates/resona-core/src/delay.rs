//! Circular delay line with fractional-sample reads.
//!
//! The delay line wraps an [`AuxBuffer`] as a ring. Capacity is derived from
//! the maximum delay an opcode declared at initialize time; the write cursor
//! advances modulo capacity and the fill depth tracks how much real history
//! exists. A read at delay `d` returns silence until `d + 1` samples have
//! been written, so a freshly reset line never replays stale memory.
//!
//! # Interpolation
//!
//! Fractional delays are reconstructed by a kernel selected once per note:
//!
//! - [`Interpolation::Truncate`] - nearest earlier sample, no smoothing
//! - [`Interpolation::Linear`] - weighted average of the two surrounding
//!   samples (default)
//! - [`Interpolation::Cubic`] - 4-point cubic Lagrange over a symmetric
//!   window, smoother for modulated delay times
//!
//! Window samples that fall outside the written history (either before the
//! earliest write or after the most recent one) are treated as zero,
//! consistent with the integer-read policy.

use crate::auxbuf::{AllocError, AuxBuffer};

/// Interpolation kernel for fractional delay reads.
///
/// Fixed for the life of a note; chosen at initialize time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Truncate to the nearest earlier sample.
    Truncate,
    /// Linear interpolation between two samples.
    #[default]
    Linear,
    /// 4-point cubic Lagrange interpolation.
    Cubic,
}

impl Interpolation {
    /// Map a numeric quality selector onto a kernel: 0 and 1 select linear,
    /// anything higher selects cubic. Truncation is only ever requested
    /// explicitly.
    pub fn from_quality(quality: u32) -> Self {
        if quality >= 2 {
            Self::Cubic
        } else {
            Self::Linear
        }
    }
}

/// Circular delay line over instance-owned auxiliary storage.
///
/// # Memory
///
/// Storage is sized by [`allocate`](Self::allocate) (or a constructor) at
/// initialize time and never reallocates during perform. Resizing discards
/// all history, equivalent to a fresh allocation with a reset.
///
/// # Example
///
/// ```rust
/// use resona_core::DelayLine;
///
/// let mut delay = DelayLine::with_capacity(64).unwrap();
/// delay.write(1.0);
/// assert_eq!(delay.read(0), 1.0);
/// assert_eq!(delay.read(5), 0.0); // nothing written 5 samples ago yet
/// ```
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: AuxBuffer,
    write_pos: usize,
    filled: usize,
    interpolation: Interpolation,
}

impl DelayLine {
    /// Create an unallocated delay line. Call [`allocate`](Self::allocate)
    /// from an initialize routine before use.
    pub const fn new() -> Self {
        Self {
            buffer: AuxBuffer::new(),
            write_pos: 0,
            filled: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Create a delay line holding `capacity` samples (at least 1).
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut line = Self::new();
        line.allocate(capacity, true)?;
        Ok(line)
    }

    /// Create a delay line from sample rate and maximum delay in seconds.
    ///
    /// Capacity is rounded up, plus one sample so a read at exactly the
    /// maximum delay stays in range.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Result<Self, AllocError> {
        let samples = libm::ceilf(sample_rate * max_seconds) as usize + 1;
        Self::with_capacity(samples)
    }

    /// Size the ring to exactly `capacity` samples (clamped to at least 1).
    ///
    /// A capacity change preserves no history: cursors reset and the new
    /// storage is silent. With unchanged capacity, `reset` selects between
    /// zero-filling and keeping contents plus cursors intact -- the storage
    /// preservation path for re-initialization without audio interruption.
    ///
    /// Only legal at initialize time, never mid-perform.
    pub fn allocate(&mut self, capacity: usize, reset: bool) -> Result<(), AllocError> {
        let capacity = capacity.max(1);
        let resized = self.buffer.len() != capacity;
        self.buffer.ensure(capacity, reset)?;
        if resized || reset {
            self.write_pos = 0;
            self.filled = 0;
        }
        Ok(())
    }

    /// Select the interpolation kernel for fractional reads.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// The configured interpolation kernel.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Append a sample at the write cursor and advance it.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        let cap = self.buffer.len();
        debug_assert!(cap > 0, "delay line used before allocation");
        if cap == 0 {
            return;
        }
        self.buffer.as_mut_slice()[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % cap;
        if self.filled < cap {
            self.filled += 1;
        }
    }

    /// Sample at integer offset `delay` behind the write cursor, where the
    /// most recently written sample is delay 0. Positions never written (or
    /// beyond capacity) read as zero.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let cap = self.buffer.len();
        if delay >= self.filled || delay >= cap {
            return 0.0;
        }
        self.buffer.as_slice()[(self.write_pos + cap - delay - 1) % cap]
    }

    /// Signed-offset variant used by interpolation windows: offsets before
    /// the most recent write (negative) or past the written history are zero.
    #[inline]
    fn sample_at(&self, offset: i64) -> f32 {
        if offset < 0 {
            return 0.0;
        }
        self.read(offset as usize)
    }

    /// Reconstruct the sample at fractional delay `d = n + f` with the
    /// configured kernel. `d` is clamped to `[0, capacity - 1]`.
    #[inline]
    pub fn read_frac(&self, delay_samples: f32) -> f32 {
        debug_assert!(delay_samples >= 0.0);

        let cap = self.buffer.len();
        if cap == 0 {
            return 0.0;
        }
        let delay = delay_samples.clamp(0.0, (cap - 1) as f32);
        let n = delay as i64;
        let frac = delay - n as f32;

        match self.interpolation {
            Interpolation::Truncate => self.sample_at(n),

            Interpolation::Linear => {
                let a = self.sample_at(n);
                let b = self.sample_at(n + 1);
                a + (b - a) * frac
            }

            Interpolation::Cubic => {
                // Window centered on the interval [n, n+1]; y0 is one sample
                // newer, y3 two samples older.
                let y0 = self.sample_at(n - 1);
                let y1 = self.sample_at(n);
                let y2 = self.sample_at(n + 1);
                let y3 = self.sample_at(n + 2);

                let t = frac;
                let t2 = t * t;
                let t3 = t2 * t;

                let a0 = y3 - y2 - y0 + y1;
                let a1 = y0 - y1 - a0;
                let a2 = y2 - y0;

                a0 * t3 + a1 * t2 + a2 * t + y1
            }
        }
    }

    /// Zero all contents and reset cursors; capacity is unchanged.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.write_pos = 0;
        self.filled = 0;
    }

    /// Ring capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of samples ever written, saturating at capacity.
    pub fn depth(&self) -> usize {
        self.filled
    }
}
