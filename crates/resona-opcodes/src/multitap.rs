//! Multi-tap delay opcode over one shared delay line.
//!
//! A variable number of read taps (fixed per note, bounded by [`MAX_TAPS`])
//! share a single write history. Each perform step writes the input exactly
//! once, then every tap reads its own delay offset from the same,
//! most-recently-written state.

use alloc::vec::Vec;

use resona_core::{DelayLine, EngineContext, InitError, Interpolation, Opcode, sanitize};

/// Upper bound on the number of taps one instance may request.
pub const MAX_TAPS: usize = 32;

/// One read tap: a delay time and an optional gain (1.0 when absent).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapSpec {
    /// Delay behind the write cursor, in seconds.
    pub delay_seconds: f32,
    /// Gain applied to this tap's read, if any.
    pub gain: Option<f32>,
}

impl TapSpec {
    /// A unity-gain tap at the given delay.
    pub fn at(delay_seconds: f32) -> Self {
        Self {
            delay_seconds,
            gain: None,
        }
    }

    /// A tap with an explicit gain.
    pub fn with_gain(delay_seconds: f32, gain: f32) -> Self {
        Self {
            delay_seconds,
            gain: Some(gain),
        }
    }
}

/// Multi-tap delay opcode.
///
/// ## Slots
///
/// | Slot | Rate | Meaning |
/// |------|------|---------|
/// | input 0 | audio | signal to delay |
/// | output 0 | audio | sum of all taps (combined form) |
/// | output 0..n | audio | one slot per tap (multi-output form) |
///
/// The form is chosen by the number of output slots the scheduler wires up:
/// one slot yields the combined sum, `tap_count` slots yield independent
/// per-tap outputs drawn from the same shared write history.
///
/// The tap set is fixed for the note's lifetime; changing it between notes
/// re-sizes the shared buffer at the next initialize.
#[derive(Debug, Clone)]
pub struct MultiTap {
    delay: DelayLine,
    taps: Vec<TapSpec>,
    /// Per-tap delay in samples, derived at initialize.
    tap_samples: Vec<f32>,
    interpolation: Interpolation,
    storage_reset: bool,
}

impl MultiTap {
    /// Create a multi-tap delay with the given tap set.
    ///
    /// Validation and buffer sizing happen at [`initialize`](Opcode::initialize).
    pub fn new(taps: Vec<TapSpec>) -> Self {
        Self {
            delay: DelayLine::new(),
            taps,
            tap_samples: Vec::new(),
            interpolation: Interpolation::Linear,
            storage_reset: true,
        }
    }

    /// Select the fractional-read kernel, fixed per note at initialize.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// The configured taps.
    pub fn taps(&self) -> &[TapSpec] {
        &self.taps
    }
}

impl Opcode for MultiTap {
    fn name(&self) -> &'static str {
        "multitap"
    }

    fn initialize(&mut self, ctx: &EngineContext<'_>) -> Result<(), InitError> {
        let sr = ctx.sample_rate();
        if sr <= 0.0 {
            return Err(InitError::InvalidSampleRate(sr));
        }
        if self.taps.is_empty() {
            return Err(InitError::NoTaps);
        }
        if self.taps.len() > MAX_TAPS {
            return Err(InitError::TooManyTaps {
                requested: self.taps.len(),
                max: MAX_TAPS,
            });
        }

        let mut longest = 0.0f32;
        for tap in &self.taps {
            if tap.delay_seconds < 0.0 {
                return Err(InitError::NegativeDelay(tap.delay_seconds));
            }
            longest = longest.max(tap.delay_seconds);
        }

        let capacity = libm::ceilf(sr * longest) as usize + 1;
        self.delay.allocate(capacity, self.storage_reset)?;
        self.delay.set_interpolation(self.interpolation);

        self.tap_samples.clear();
        self.tap_samples
            .extend(self.taps.iter().map(|t| t.delay_seconds * sr));
        Ok(())
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let signal = inputs[0];
        let per_tap = outputs.len() > 1;

        for i in 0..signal.len() {
            // One write per sample, before any tap reads: every tap sees the
            // same, current history.
            self.delay.write(sanitize(signal[i]));

            if per_tap {
                // Pair slots with taps; a miswired surplus on either side is
                // ignored rather than read out of bounds.
                for ((out, tap), &delay) in
                    outputs.iter_mut().zip(&self.taps).zip(&self.tap_samples)
                {
                    let gain = tap.gain.unwrap_or(1.0);
                    out[i] = self.delay.read_frac(delay) * gain;
                }
            } else {
                let mut sum = 0.0;
                for (t, &delay) in self.tap_samples.iter().enumerate() {
                    let gain = self.taps[t].gain.unwrap_or(1.0);
                    sum += self.delay.read_frac(delay) * gain;
                }
                outputs[0][i] = sum;
            }
        }
    }

    fn set_storage_reset(&mut self, reset: bool) {
        self.storage_reset = reset;
    }
}
