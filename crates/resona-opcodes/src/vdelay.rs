//! Variable delay opcode with an audio-rate delay-time input.
//!
//! The delay time is a signal, not a constant: every sample may request a
//! different (fractional) delay, clamped to the maximum declared at
//! initialize time. Sweeping the delay time produces chorus, flanging, and
//! Doppler-style pitch effects.

use resona_core::{DelayLine, EngineContext, InitError, Interpolation, Opcode, sanitize, slot_value};

/// Variable delay line opcode.
///
/// ## Slots
///
/// | Slot | Rate | Meaning |
/// |------|------|---------|
/// | input 0 | audio | signal to delay |
/// | input 1 | audio or control | delay time in seconds |
/// | output 0 | audio | delayed signal |
///
/// The maximum delay and the interpolation kernel are fixed per note at
/// initialize time.
///
/// # Example
///
/// ```rust
/// use resona_core::{EngineContext, Opcode};
/// use resona_opcodes::VDelay;
///
/// let ctx = EngineContext::new(44100.0, 4);
/// let mut vdelay = VDelay::new(1.0);
/// vdelay.initialize(&ctx).unwrap();
///
/// let signal = [1.0f32, 0.0, 0.0, 0.0];
/// let delay_time = [0.0f32]; // control-rate: zero delay
/// let mut out = [0.0f32; 4];
/// let mut outputs: [&mut [f32]; 1] = [&mut out];
/// vdelay.perform(&[&signal, &delay_time], &mut outputs);
/// assert_eq!(out[0], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct VDelay {
    delay: DelayLine,
    max_delay_seconds: f32,
    interpolation: Interpolation,
    storage_reset: bool,
    sample_rate: f32,
}

impl VDelay {
    /// Create a variable delay holding up to `max_delay_seconds` of signal.
    ///
    /// Linear interpolation by default; storage is allocated at
    /// [`initialize`](Opcode::initialize).
    pub fn new(max_delay_seconds: f32) -> Self {
        Self {
            delay: DelayLine::new(),
            max_delay_seconds,
            interpolation: Interpolation::Linear,
            storage_reset: true,
            sample_rate: 0.0,
        }
    }

    /// Select the fractional-read kernel. Takes effect at the next
    /// initialize and stays fixed for the note's lifetime.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// Change the maximum delay. A growth takes effect at the next
    /// initialize and discards all history (fresh allocation).
    pub fn set_max_delay(&mut self, seconds: f32) {
        self.max_delay_seconds = seconds;
    }

    /// Maximum delay in seconds.
    pub fn max_delay(&self) -> f32 {
        self.max_delay_seconds
    }
}

impl Opcode for VDelay {
    fn name(&self) -> &'static str {
        "vdelay"
    }

    fn initialize(&mut self, ctx: &EngineContext<'_>) -> Result<(), InitError> {
        let sr = ctx.sample_rate();
        if sr <= 0.0 {
            return Err(InitError::InvalidSampleRate(sr));
        }
        if self.max_delay_seconds <= 0.0 {
            return Err(InitError::NonPositiveMaxDelay(self.max_delay_seconds));
        }

        let capacity = libm::ceilf(sr * self.max_delay_seconds) as usize + 1;
        self.delay.allocate(capacity, self.storage_reset)?;
        self.delay.set_interpolation(self.interpolation);
        self.sample_rate = sr;
        Ok(())
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let signal = inputs[0];
        let delay_time = inputs[1];
        let out = &mut *outputs[0];
        let max_samples = (self.delay.capacity() - 1) as f32;

        for i in 0..out.len() {
            // Write first: delay 0 refers to the current input sample.
            self.delay.write(sanitize(signal[i]));

            let requested = sanitize(slot_value(delay_time, i)) * self.sample_rate;
            out[i] = self.delay.read_frac(requested.clamp(0.0, max_samples));
        }
    }

    fn set_storage_reset(&mut self, reset: bool) {
        self.storage_reset = reset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_block(op: &mut VDelay, signal: &[f32], delay_time: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; signal.len()];
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        op.perform(&[signal, delay_time], &mut outputs);
        out
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let ctx = EngineContext::new(1000.0, 8);
        let mut op = VDelay::new(0.1);
        op.initialize(&ctx).unwrap();

        let signal = [1.0, 0.5, -0.5, 0.25, 0.0, 0.0, 0.0, 0.0];
        let out = run_block(&mut op, &signal, &[0.0]);
        assert_eq!(out, signal.to_vec());
    }

    #[test]
    fn test_integer_delay_timing() {
        let ctx = EngineContext::new(1000.0, 16);
        let mut op = VDelay::new(0.1);
        op.initialize(&ctx).unwrap();

        // 5 ms at 1 kHz = 5 samples
        let mut signal = [0.0f32; 16];
        signal[0] = 1.0;
        let out = run_block(&mut op, &signal, &[0.005]);

        assert_eq!(out[5], 1.0);
        assert_eq!(out[4], 0.0);
        assert_eq!(out[6], 0.0);
    }

    #[test]
    fn test_audio_rate_delay_time() {
        let ctx = EngineContext::new(1000.0, 8);
        let mut op = VDelay::new(0.1);
        op.initialize(&ctx).unwrap();

        let signal = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        // Per-sample delay times: 0 samples, then 1, then 2...
        let times = [0.0, 0.001, 0.002, 0.003, 0.0, 0.0, 0.0, 0.0];
        let out = run_block(&mut op, &signal, &times);

        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 1.0); // one sample back
        assert_eq!(out[2], 1.0); // two samples back
        assert_eq!(out[3], 1.0);
        assert_eq!(out[4], 5.0); // back to zero delay
    }

    #[test]
    fn test_delay_clamped_to_max() {
        let ctx = EngineContext::new(1000.0, 4);
        let mut op = VDelay::new(0.004);
        op.initialize(&ctx).unwrap();

        // Requesting far more than the maximum must not panic; it clamps.
        let signal = [1.0, 0.0, 0.0, 0.0];
        let out = run_block(&mut op, &signal, &[10.0]);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_non_finite_input_becomes_silence() {
        let ctx = EngineContext::new(1000.0, 4);
        let mut op = VDelay::new(0.01);
        op.initialize(&ctx).unwrap();

        let signal = [f32::NAN, 1.0, f32::INFINITY, 0.5];
        let out = run_block(&mut op, &signal, &[0.0]);
        assert_eq!(out, vec![0.0, 1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let mut op = VDelay::new(1.0);
        assert_eq!(
            op.initialize(&EngineContext::new(0.0, 8)),
            Err(InitError::InvalidSampleRate(0.0))
        );

        let mut op = VDelay::new(-1.0);
        assert_eq!(
            op.initialize(&EngineContext::new(48000.0, 8)),
            Err(InitError::NonPositiveMaxDelay(-1.0))
        );
    }

    #[test]
    fn test_storage_reset_true_silences_history() {
        let ctx = EngineContext::new(1000.0, 4);
        let mut op = VDelay::new(0.004);
        op.initialize(&ctx).unwrap();

        run_block(&mut op, &[1.0, 1.0, 1.0, 1.0], &[0.0]);
        op.initialize(&ctx).unwrap();

        // Reading back the full delay range finds only silence
        let out = run_block(&mut op, &[0.0, 0.0, 0.0, 0.0], &[0.003]);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn test_storage_reset_false_preserves_history() {
        let ctx = EngineContext::new(1000.0, 4);

        let mut control = VDelay::new(0.008);
        control.initialize(&ctx).unwrap();

        let mut reinit = VDelay::new(0.008);
        reinit.initialize(&ctx).unwrap();

        let first = [0.1, 0.2, 0.3, 0.4];
        run_block(&mut control, &first, &[0.0]);
        run_block(&mut reinit, &first, &[0.0]);

        // Recompilation: re-initialize with storage reset disabled
        reinit.set_storage_reset(false);
        reinit.initialize(&ctx).unwrap();

        let second = [0.0f32; 4];
        let times = [0.004, 0.004, 0.004, 0.004];
        let expected = run_block(&mut control, &second, &times);
        let got = run_block(&mut reinit, &second, &times);
        assert_eq!(got, expected, "history must survive bit-for-bit");
    }
}
