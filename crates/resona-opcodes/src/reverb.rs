//! Schroeder-style reverberation opcode.
//!
//! A bank of parallel feedback combs (summed) feeds a serial chain of
//! allpass diffusers. Comb feedback gains are derived from the requested
//! reverberation time so the tail reaches -60 dB after that many seconds;
//! a one-pole lowpass in each comb's feedback path supplies
//! frequency-dependent damping.
//!
//! Two construction paths share one network type:
//!
//! - [`Reverb::classic`] builds the fixed topology of six combs and five
//!   allpasses with built-in loop times.
//! - [`Reverb::with_tables`] reads section counts, loop times, and target
//!   gains from caller-supplied function tables, resolved through the
//!   engine context at initialize time.

use alloc::vec::Vec;

use resona_core::{
    AllpassFilter, CombFilter, EngineContext, InitError, Opcode, comb_feedback_toward,
    damping_coeff, REFERENCE_ATTENUATION, sanitize, slot_value,
};

/// Upper bound on comb or allpass sections in one network.
pub const MAX_SECTIONS: usize = 32;

/// Built-in comb loop times in seconds, mutually inharmonic to avoid
/// coincident resonances.
const CLASSIC_COMB_TIMES: [f32; 6] = [0.0297, 0.0371, 0.0411, 0.0437, 0.0497, 0.0533];

/// Built-in allpass loop times in seconds.
const CLASSIC_ALLPASS_TIMES: [f32; 5] = [0.0051, 0.0077, 0.01, 0.0126, 0.0153];

/// Diffusion coefficient for the built-in allpass chain.
const CLASSIC_ALLPASS_GAIN: f32 = 0.7;

/// Function-table identifiers for the generalized variant's section
/// constants.
///
/// Each `times` table holds at least `count` loop times in seconds; each
/// `gains` table holds at least `count` target gains. Comb target gains are
/// per-section reference attenuations fed to the coefficient solver;
/// allpass gains are used directly as diffusion coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTables {
    /// Number of comb sections.
    pub comb_count: usize,
    /// Table of comb loop times.
    pub comb_times: usize,
    /// Table of comb target gains.
    pub comb_gains: usize,
    /// Number of allpass sections.
    pub allpass_count: usize,
    /// Table of allpass loop times.
    pub allpass_times: usize,
    /// Table of allpass gains.
    pub allpass_gains: usize,
}

/// Where a network's section constants come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topology {
    Classic,
    Tables(SectionTables),
}

/// One comb section plus the constants its coefficients derive from.
#[derive(Debug, Clone)]
struct CombSection {
    filter: CombFilter,
    loop_time: f32,
    target_gain: f32,
}

/// Reverberation opcode.
///
/// ## Slots
///
/// | Slot | Rate | Meaning |
/// |------|------|---------|
/// | input 0 | audio | dry signal |
/// | input 1 | control | reverberation time in seconds |
/// | input 2 | control | high-frequency damping, `[0, 1]` |
/// | output 0 | audio | wet signal |
///
/// The time and damping slots are read once per control period; when either
/// differs from the previous period's value, every section coefficient is
/// recomputed before the first sample of the block is processed. Unchanged
/// parameters skip the recomputation entirely.
#[derive(Debug, Clone)]
pub struct Reverb {
    topology: Topology,
    combs: Vec<CombSection>,
    allpasses: Vec<AllpassFilter>,
    /// Sum normalization, 1 / comb count.
    scale: f32,
    /// Initial values validated at initialize time.
    decay_time: f32,
    damping: f32,
    /// Parameter cache: coefficients are recomputed only on change.
    prev_time: f32,
    prev_damping: f32,
    storage_reset: bool,
}

impl Reverb {
    /// The fixed six-comb/five-allpass network.
    pub fn classic(decay_time: f32, damping: f32) -> Self {
        Self {
            topology: Topology::Classic,
            combs: Vec::new(),
            allpasses: Vec::new(),
            scale: 1.0,
            decay_time,
            damping,
            prev_time: 0.0,
            prev_damping: -1.0,
            storage_reset: true,
        }
    }

    /// A network whose section constants come from function tables.
    pub fn with_tables(decay_time: f32, damping: f32, tables: SectionTables) -> Self {
        Self {
            topology: Topology::Tables(tables),
            ..Self::classic(decay_time, damping)
        }
    }

    /// Number of comb sections (0 before the first initialize).
    pub fn comb_count(&self) -> usize {
        self.combs.len()
    }

    /// Number of allpass sections (0 before the first initialize).
    pub fn allpass_count(&self) -> usize {
        self.allpasses.len()
    }

    /// Resolve `count` entries from the table store, validating presence
    /// and length.
    fn resolve<'a>(
        ctx: &EngineContext<'a>,
        table: usize,
        count: usize,
    ) -> Result<&'a [f32], InitError> {
        let data = ctx.table(table).ok_or(InitError::TableMissing(table))?;
        if data.len() < count {
            return Err(InitError::TableTooShort {
                table,
                len: data.len(),
                need: count,
            });
        }
        Ok(&data[..count])
    }

    /// Gather the section constants for the configured topology.
    #[allow(clippy::type_complexity)]
    fn section_plan(
        &self,
        ctx: &EngineContext<'_>,
    ) -> Result<(Vec<(f32, f32)>, Vec<(f32, f32)>), InitError> {
        match self.topology {
            Topology::Classic => Ok((
                CLASSIC_COMB_TIMES
                    .iter()
                    .map(|&t| (t, REFERENCE_ATTENUATION))
                    .collect(),
                CLASSIC_ALLPASS_TIMES
                    .iter()
                    .map(|&t| (t, CLASSIC_ALLPASS_GAIN))
                    .collect(),
            )),
            Topology::Tables(spec) => {
                if spec.comb_count == 0 {
                    return Err(InitError::NoSections);
                }
                if spec.comb_count > MAX_SECTIONS {
                    return Err(InitError::TooManySections {
                        requested: spec.comb_count,
                        max: MAX_SECTIONS,
                    });
                }
                if spec.allpass_count > MAX_SECTIONS {
                    return Err(InitError::TooManySections {
                        requested: spec.allpass_count,
                        max: MAX_SECTIONS,
                    });
                }

                let comb_times = Self::resolve(ctx, spec.comb_times, spec.comb_count)?;
                let comb_gains = Self::resolve(ctx, spec.comb_gains, spec.comb_count)?;
                let allpass_times = Self::resolve(ctx, spec.allpass_times, spec.allpass_count)?;
                let allpass_gains = Self::resolve(ctx, spec.allpass_gains, spec.allpass_count)?;

                for &t in comb_times.iter().chain(allpass_times.iter()) {
                    if t <= 0.0 {
                        return Err(InitError::InvalidSectionTime(t));
                    }
                }

                Ok((
                    comb_times.iter().copied().zip(comb_gains.iter().copied()).collect(),
                    allpass_times
                        .iter()
                        .copied()
                        .zip(allpass_gains.iter().copied())
                        .collect(),
                ))
            }
        }
    }

    /// True if the existing network matches the planned one, so storage can
    /// be carried across a re-initialize.
    fn layout_matches(&self, sr: f32, combs: &[(f32, f32)], allpasses: &[(f32, f32)]) -> bool {
        self.combs.len() == combs.len()
            && self.allpasses.len() == allpasses.len()
            && self
                .combs
                .iter()
                .zip(combs)
                .all(|(s, &(t, _))| s.filter.capacity() == loop_samples(sr, t))
            && self
                .allpasses
                .iter()
                .zip(allpasses)
                .all(|(f, &(t, _))| f.capacity() == loop_samples(sr, t))
    }

    /// Derive every section coefficient from the decay time and damping.
    fn update_coefficients(&mut self, decay_time: f32, damping: f32) {
        for section in &mut self.combs {
            section.filter.set_feedback(comb_feedback_toward(
                section.target_gain,
                section.loop_time,
                decay_time,
            ));
            section.filter.set_damp(damping);
        }
        self.prev_time = decay_time;
        self.prev_damping = damping;
    }
}

/// Ring capacity for a loop time at a sample rate, at least one sample.
fn loop_samples(sr: f32, loop_time: f32) -> usize {
    (libm::ceilf(sr * loop_time) as usize).max(1)
}

impl Opcode for Reverb {
    fn name(&self) -> &'static str {
        match self.topology {
            Topology::Classic => "reverb",
            Topology::Tables(_) => "reverbx",
        }
    }

    fn initialize(&mut self, ctx: &EngineContext<'_>) -> Result<(), InitError> {
        let sr = ctx.sample_rate();
        if sr <= 0.0 {
            return Err(InitError::InvalidSampleRate(sr));
        }
        if self.decay_time <= 0.0 {
            return Err(InitError::NonPositiveDecay(self.decay_time));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(InitError::DampingOutOfRange(self.damping));
        }

        let (comb_plan, allpass_plan) = self.section_plan(ctx)?;

        if self.layout_matches(sr, &comb_plan, &allpass_plan) {
            // Compatible buffers already exist: clear in place or carry the
            // tail across, but never reallocate.
            if self.storage_reset {
                for section in &mut self.combs {
                    section.filter.clear();
                }
                for allpass in &mut self.allpasses {
                    allpass.clear();
                }
            }
            for (section, &(t, g)) in self.combs.iter_mut().zip(&comb_plan) {
                section.loop_time = t;
                section.target_gain = g;
            }
        } else {
            self.combs = comb_plan
                .iter()
                .map(|&(t, g)| {
                    Ok(CombSection {
                        filter: CombFilter::new(loop_samples(sr, t))?,
                        loop_time: t,
                        target_gain: g,
                    })
                })
                .collect::<Result<_, InitError>>()?;
            self.allpasses = allpass_plan
                .iter()
                .map(|&(t, _)| AllpassFilter::new(loop_samples(sr, t)).map_err(InitError::from))
                .collect::<Result<_, InitError>>()?;
        }

        for (allpass, &(_, g)) in self.allpasses.iter_mut().zip(&allpass_plan) {
            allpass.set_gain(g);
        }
        self.scale = 1.0 / self.combs.len() as f32;

        // Coefficients are in place before the first perform call.
        let (time, damp) = (self.decay_time, self.damping);
        self.update_coefficients(time, damp);
        Ok(())
    }

    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let signal = inputs[0];
        // Control inputs get the same non-finite recovery as the audio slot:
        // a NaN here would otherwise enter the comb coefficients and ring in
        // the feedback paths long after finite values return.
        let time = sanitize(slot_value(inputs[1], 0));
        let damping = damping_coeff(sanitize(slot_value(inputs[2], 0)));
        let out = &mut *outputs[0];

        // Re-derive coefficients only when a parameter actually moved, and
        // always before the block's first sample.
        if time > 0.0 && (time != self.prev_time || damping != self.prev_damping) {
            self.update_coefficients(time, damping);
        }

        for i in 0..out.len() {
            let x = sanitize(signal[i]);

            let mut wet = 0.0;
            for section in &mut self.combs {
                wet += section.filter.process(x);
            }
            wet *= self.scale;

            for allpass in &mut self.allpasses {
                wet = allpass.process(wet);
            }
            out[i] = wet;
        }
    }

    fn set_storage_reset(&mut self, reset: bool) {
        self.storage_reset = reset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::TableSource;

    struct Tables(Vec<(usize, Vec<f32>)>);

    impl TableSource for Tables {
        fn table(&self, id: usize) -> Option<&[f32]> {
            self.0
                .iter()
                .find(|(tid, _)| *tid == id)
                .map(|(_, data)| &data[..])
        }
    }

    fn run(op: &mut Reverb, signal: &[f32], time: f32, damping: f32) -> Vec<f32> {
        let mut out = vec![0.0f32; signal.len()];
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        op.perform(&[signal, &[time], &[damping]], &mut outputs);
        out
    }

    #[test]
    fn test_classic_topology() {
        let ctx = EngineContext::new(48000.0, 64);
        let mut reverb = Reverb::classic(2.0, 0.0);
        reverb.initialize(&ctx).unwrap();
        assert_eq!(reverb.comb_count(), 6);
        assert_eq!(reverb.allpass_count(), 5);
    }

    #[test]
    fn test_zero_in_zero_out() {
        let ctx = EngineContext::new(48000.0, 256);
        let mut reverb = Reverb::classic(2.0, 0.3);
        reverb.initialize(&ctx).unwrap();

        for _ in 0..32 {
            let out = run(&mut reverb, &[0.0; 256], 2.0, 0.3);
            assert!(out.iter().all(|&s| s == 0.0), "spontaneous energy");
        }
    }

    #[test]
    fn test_impulse_produces_tail() {
        let ctx = EngineContext::new(48000.0, 256);
        let mut reverb = Reverb::classic(2.0, 0.0);
        reverb.initialize(&ctx).unwrap();

        let mut impulse = [0.0f32; 256];
        impulse[0] = 1.0;
        run(&mut reverb, &impulse, 2.0, 0.0);

        // Half a second in, the tail is still audible
        let mut energy = 0.0f32;
        for _ in 0..94 {
            for s in run(&mut reverb, &[0.0; 256], 2.0, 0.0) {
                energy += s * s;
            }
        }
        assert!(energy > 1e-6, "tail died too early: {energy}");
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let ctx = EngineContext::new(48000.0, 64);

        let mut reverb = Reverb::classic(0.0, 0.0);
        assert_eq!(
            reverb.initialize(&ctx),
            Err(InitError::NonPositiveDecay(0.0))
        );

        let mut reverb = Reverb::classic(2.0, 1.5);
        assert_eq!(
            reverb.initialize(&ctx),
            Err(InitError::DampingOutOfRange(1.5))
        );

        let mut reverb = Reverb::classic(2.0, 0.0);
        assert_eq!(
            reverb.initialize(&EngineContext::new(-1.0, 64)),
            Err(InitError::InvalidSampleRate(-1.0))
        );
    }

    #[test]
    fn test_table_variant_builds_requested_sections() {
        let tables = Tables(vec![
            (1, vec![0.03, 0.041]),
            (2, vec![0.001, 0.001]),
            (3, vec![0.005]),
            (4, vec![0.6]),
        ]);
        let ctx = EngineContext::with_tables(48000.0, 64, &tables);

        let spec = SectionTables {
            comb_count: 2,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 1,
            allpass_times: 3,
            allpass_gains: 4,
        };
        let mut reverb = Reverb::with_tables(1.5, 0.2, spec);
        reverb.initialize(&ctx).unwrap();
        assert_eq!(reverb.comb_count(), 2);
        assert_eq!(reverb.allpass_count(), 1);

        let mut impulse = [0.0f32; 64];
        impulse[0] = 1.0;
        let out = run(&mut reverb, &impulse, 1.5, 0.2);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_table_validation() {
        let tables = Tables(vec![(1, vec![0.03]), (2, vec![0.001])]);
        let ctx = EngineContext::with_tables(48000.0, 64, &tables);

        // Missing table
        let spec = SectionTables {
            comb_count: 1,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 1,
            allpass_times: 9,
            allpass_gains: 9,
        };
        let mut reverb = Reverb::with_tables(1.0, 0.0, spec);
        assert_eq!(reverb.initialize(&ctx), Err(InitError::TableMissing(9)));

        // Table shorter than the section count
        let spec = SectionTables {
            comb_count: 3,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 0,
            allpass_times: 1,
            allpass_gains: 2,
        };
        let mut reverb = Reverb::with_tables(1.0, 0.0, spec);
        assert_eq!(
            reverb.initialize(&ctx),
            Err(InitError::TableTooShort {
                table: 1,
                len: 1,
                need: 3
            })
        );

        // Zero comb sections
        let spec = SectionTables {
            comb_count: 0,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 0,
            allpass_times: 1,
            allpass_gains: 2,
        };
        let mut reverb = Reverb::with_tables(1.0, 0.0, spec);
        assert_eq!(reverb.initialize(&ctx), Err(InitError::NoSections));

        // Section count over the limit
        let spec = SectionTables {
            comb_count: MAX_SECTIONS + 1,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 0,
            allpass_times: 1,
            allpass_gains: 2,
        };
        let mut reverb = Reverb::with_tables(1.0, 0.0, spec);
        assert_eq!(
            reverb.initialize(&ctx),
            Err(InitError::TooManySections {
                requested: MAX_SECTIONS + 1,
                max: MAX_SECTIONS,
            })
        );
    }

    #[test]
    fn test_nonpositive_section_time_rejected() {
        let tables = Tables(vec![(1, vec![0.0]), (2, vec![0.001])]);
        let ctx = EngineContext::with_tables(48000.0, 64, &tables);
        let spec = SectionTables {
            comb_count: 1,
            comb_times: 1,
            comb_gains: 2,
            allpass_count: 0,
            allpass_times: 1,
            allpass_gains: 2,
        };
        let mut reverb = Reverb::with_tables(1.0, 0.0, spec);
        assert_eq!(
            reverb.initialize(&ctx),
            Err(InitError::InvalidSectionTime(0.0))
        );
    }

    #[test]
    fn test_coefficient_recompute_on_parameter_change() {
        let ctx = EngineContext::new(48000.0, 64);
        let mut reverb = Reverb::classic(2.0, 0.0);
        reverb.initialize(&ctx).unwrap();
        let initial = reverb.combs[0].filter.feedback();

        // Unchanged parameters leave coefficients alone
        run(&mut reverb, &[0.0; 64], 2.0, 0.0);
        assert_eq!(reverb.combs[0].filter.feedback(), initial);

        // A longer decay raises every comb's feedback before processing
        run(&mut reverb, &[0.0; 64], 4.0, 0.0);
        assert!(reverb.combs[0].filter.feedback() > initial);
        assert_eq!(reverb.prev_time, 4.0);
    }

    #[test]
    fn test_non_finite_control_inputs_recover() {
        let ctx = EngineContext::new(48000.0, 256);
        let mut reverb = Reverb::classic(2.0, 0.3);
        reverb.initialize(&ctx).unwrap();

        let mut impulse = [0.0f32; 256];
        impulse[0] = 1.0;
        run(&mut reverb, &impulse, 2.0, 0.3);

        // One block of poisoned control values must not stick to the note
        let out = run(&mut reverb, &[0.0; 256], f32::NAN, f32::NAN);
        assert!(out.iter().all(|s| s.is_finite()), "NaN leaked into output");

        for _ in 0..50 {
            let out = run(&mut reverb, &[0.0; 256], 2.0, 0.0);
            assert!(
                out.iter().all(|s| s.is_finite()),
                "tail stayed poisoned after finite parameters returned"
            );
        }
    }

    #[test]
    fn test_storage_reset_false_preserves_tail() {
        let ctx = EngineContext::new(48000.0, 256);

        let mut control = Reverb::classic(2.0, 0.0);
        control.initialize(&ctx).unwrap();
        let mut reinit = Reverb::classic(2.0, 0.0);
        reinit.initialize(&ctx).unwrap();

        let mut impulse = [0.0f32; 256];
        impulse[0] = 1.0;
        run(&mut control, &impulse, 2.0, 0.0);
        run(&mut reinit, &impulse, 2.0, 0.0);

        reinit.set_storage_reset(false);
        reinit.initialize(&ctx).unwrap();

        let expected = run(&mut control, &[0.0; 256], 2.0, 0.0);
        let got = run(&mut reinit, &[0.0; 256], 2.0, 0.0);
        assert_eq!(got, expected, "tail must survive re-initialize");
    }

    #[test]
    fn test_storage_reset_true_silences_tail() {
        let ctx = EngineContext::new(48000.0, 256);
        let mut reverb = Reverb::classic(2.0, 0.0);
        reverb.initialize(&ctx).unwrap();

        let mut impulse = [0.0f32; 256];
        impulse[0] = 1.0;
        run(&mut reverb, &impulse, 2.0, 0.0);

        reverb.initialize(&ctx).unwrap();
        let out = run(&mut reverb, &[0.0; 256], 2.0, 0.0);
        assert!(out.iter().all(|&s| s == 0.0), "reset must silence the tail");
    }
}
