//! Feedback comb filter section for reverberation networks.
//!
//! A comb section recirculates its delayed output through a one-pole lowpass
//! (the damping memory) back into the delay line, producing periodic
//! resonances whose decay is set by the feedback gain. Several combs in
//! parallel form the body of a Schroeder-style reverberator.

use crate::auxbuf::AllocError;
use crate::delay::DelayLine;
use crate::math::flush_denormal;

/// Feedback comb with high-frequency damping.
///
/// The feedback path runs through a one-pole lowpass that blends the current
/// delayed sample with the previous damped value:
///
/// ```text
/// y           = delay.read(loop_len - 1)
/// filterstore = y * (1 - damp) + filterstore * damp
/// delay.write(x + feedback * filterstore)
/// ```
///
/// `damp = 0` leaves the recirculation bright; higher values absorb high
/// frequencies faster, like air and soft surfaces in a real room.
///
/// # Example
///
/// ```rust
/// use resona_core::CombFilter;
///
/// let mut comb = CombFilter::new(1000).unwrap();
/// comb.set_feedback(0.8);
/// comb.set_damp(0.3);
/// let out = comb.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: DelayLine,
    feedback: f32,
    damp: f32,
    filterstore: f32,
}

impl CombFilter {
    /// Create a comb whose loop length is `delay_samples` (at least 1).
    pub fn new(delay_samples: usize) -> Result<Self, AllocError> {
        Ok(Self {
            delay: DelayLine::with_capacity(delay_samples)?,
            feedback: 0.5,
            damp: 0.0,
            filterstore: 0.0,
        })
    }

    /// Set the feedback gain, clamped to `[0, 0.99]` for stability.
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    /// Current feedback gain.
    #[inline]
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Set the damping blend coefficient, clamped to `[0, 1]`.
    ///
    /// 0 = no damping (bright), 1 = full damping (dark).
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Current damping coefficient.
    #[inline]
    pub fn damp(&self) -> f32 {
        self.damp
    }

    /// Process one sample. Returns the delayed (undamped) output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let y = self.delay.read(self.delay.capacity() - 1);

        self.filterstore = flush_denormal(y * (1.0 - self.damp) + self.filterstore * self.damp);
        self.delay.write(input + self.feedback * self.filterstore);

        y
    }

    /// Zero all delay and damping state.
    pub fn clear(&mut self) {
        self.delay.clear();
        self.filterstore = 0.0;
    }

    /// Loop length in samples.
    pub fn capacity(&self) -> usize {
        self.delay.capacity()
    }
}
