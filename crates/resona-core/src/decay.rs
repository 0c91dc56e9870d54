//! Reverb coefficient derivation.
//!
//! A comb section with loop time `t` recirculates `T / t` times over a
//! requested reverberation time `T`. For its envelope to reach the reference
//! attenuation after exactly `T` seconds, the per-pass feedback gain must
//! satisfy `gain ^ (T / t) = attenuation`, i.e.
//!
//! ```text
//! gain = attenuation ^ (t / T)
//! ```
//!
//! The reference attenuation is -60 dB (0.001), the conventional RT60
//! threshold. All math stays in `f32`, the same precision as the signal
//! path, so the realized decay curve matches what the coefficients promise.

use libm::powf;

/// Reference attenuation the reverberation time is measured against:
/// -60 dB.
pub const REFERENCE_ATTENUATION: f32 = 0.001;

/// Feedback gain for a comb with loop time `delay_seconds` so its envelope
/// falls to [`REFERENCE_ATTENUATION`] after `decay_seconds`.
///
/// Both times must be strictly positive; initialize-time validation
/// guarantees that before this is called.
#[inline]
pub fn comb_feedback(delay_seconds: f32, decay_seconds: f32) -> f32 {
    comb_feedback_toward(REFERENCE_ATTENUATION, delay_seconds, decay_seconds)
}

/// Feedback gain targeting an arbitrary per-section attenuation.
///
/// The generalized reverb substitutes each section's table-supplied target
/// gain for the fixed -60 dB reference.
#[inline]
pub fn comb_feedback_toward(target: f32, delay_seconds: f32, decay_seconds: f32) -> f32 {
    powf(target, delay_seconds / decay_seconds)
}

/// Map the caller-facing high-frequency damping parameter onto the one-pole
/// blend coefficient used in the comb feedback path.
///
/// The parameter already lives in `[0, 1]`; out-of-range values are clamped
/// (initialize rejects them, perform clamps and continues).
#[inline]
pub fn damping_coeff(hf_damping: f32) -> f32 {
    hf_damping.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_reaches_reference_at_decay_time() {
        // gain^(T/t) must equal the reference attenuation
        let t = 0.03;
        let big_t = 2.0;
        let gain = comb_feedback(t, big_t);
        let after_decay = powf(gain, big_t / t);
        assert!(
            (after_decay - REFERENCE_ATTENUATION).abs() < 1e-5,
            "got {after_decay}"
        );
    }

    #[test]
    fn test_longer_decay_means_higher_gain() {
        let t = 0.03;
        assert!(comb_feedback(t, 4.0) > comb_feedback(t, 1.0));
        assert!(comb_feedback(t, 1.0) > comb_feedback(t, 0.25));
    }

    #[test]
    fn test_longer_loops_need_higher_gain() {
        // Fewer recirculations per second need less attenuation per pass
        assert!(comb_feedback(0.05, 2.0) > comb_feedback(0.02, 2.0));
    }

    #[test]
    fn test_gain_below_unity() {
        for &t in &[0.005, 0.03, 0.08] {
            for &big_t in &[0.1, 1.0, 10.0] {
                let g = comb_feedback(t, big_t);
                assert!(g > 0.0 && g < 1.0, "gain {g} for t={t}, T={big_t}");
            }
        }
    }

    #[test]
    fn test_custom_target() {
        // A gentler target attenuation yields a higher per-pass gain
        let loose = comb_feedback_toward(0.1, 0.03, 2.0);
        let tight = comb_feedback_toward(0.001, 0.03, 2.0);
        assert!(loose > tight);
    }

    #[test]
    fn test_damping_coeff_clamps() {
        assert_eq!(damping_coeff(0.5), 0.5);
        assert_eq!(damping_coeff(-1.0), 0.0);
        assert_eq!(damping_coeff(2.0), 1.0);
    }
}
