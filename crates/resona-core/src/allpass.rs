//! Allpass filter section for reverb diffusion.
//!
//! A Schroeder allpass delays and recirculates a signal without altering its
//! magnitude spectrum. Chained after the comb bank it smears the impulse
//! response into a dense, smooth tail.

use crate::auxbuf::AllocError;
use crate::delay::DelayLine;
use crate::math::flush_denormal;

/// Schroeder allpass section with feedback/feedforward coefficient `g`:
///
/// ```text
/// y = -g * x + delay.read(loop_len - 1)
/// delay.write(x + g * y)
/// ```
///
/// Stable for `|g| < 1`; values near 0.7 are typical for diffusion.
///
/// # Example
///
/// ```rust
/// use resona_core::AllpassFilter;
///
/// let mut allpass = AllpassFilter::new(225).unwrap();
/// allpass.set_gain(0.7);
/// let out = allpass.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    delay: DelayLine,
    gain: f32,
}

impl AllpassFilter {
    /// Create an allpass whose loop length is `delay_samples` (at least 1).
    pub fn new(delay_samples: usize) -> Result<Self, AllocError> {
        Ok(Self {
            delay: DelayLine::with_capacity(delay_samples)?,
            gain: 0.7,
        })
    }

    /// Set the feedback/feedforward coefficient, clamped to `[-0.99, 0.99]`.
    #[inline]
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(-0.99, 0.99);
    }

    /// Current coefficient.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.read(self.delay.capacity() - 1);
        let output = -self.gain * input + delayed;
        self.delay.write(flush_denormal(input + self.gain * output));
        output
    }

    /// Zero the delay state.
    pub fn clear(&mut self) {
        self.delay.clear();
    }

    /// Loop length in samples.
    pub fn capacity(&self) -> usize {
        self.delay.capacity()
    }
}
