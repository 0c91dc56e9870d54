//! Resona Registry - the catalog of built-in opcodes.
//!
//! The registry maps stable identifiers to [`OpcodeDescriptor`]s that a
//! scheduler can browse (name, slot layout, rates) and to factories that
//! build fresh instances. [`OpcodeRegistry::activate`] runs the full
//! activation path for a note: construct, initialize against an
//! [`EngineContext`], and report any configuration failure to an
//! [`ErrorSink`] before returning it to the caller.

use resona_core::{EngineContext, ErrorSink, InitError, Opcode, Rate};
use resona_opcodes::{MultiTap, Reverb, TapSpec, VDelay};
use thiserror::Error;

/// What one input or output slot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// One sample per frame of the control period.
    Audio,
    /// One value per control period.
    Control,
}

/// A named input or output slot of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    /// Short name shown in diagnostics.
    pub name: &'static str,
    /// What the slot carries.
    pub kind: SlotKind,
}

impl SlotSpec {
    /// An audio-rate slot.
    pub const fn audio(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Audio,
        }
    }

    /// A control-rate slot.
    pub const fn control(name: &'static str) -> Self {
        Self {
            name,
            kind: SlotKind::Control,
        }
    }
}

/// Builds a fresh, default-configured instance of an opcode.
///
/// Callers tune the instance (delay bounds, tap sets, section tables)
/// before handing it to the scheduler; the defaults are listed in each
/// descriptor's `description`.
pub type OpcodeFactory = fn() -> Box<dyn Opcode + Send>;

/// Catalog entry for one opcode.
#[derive(Clone)]
pub struct OpcodeDescriptor {
    /// Stable identifier used in scores and patches.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// One-line summary, including the factory's default configuration.
    pub description: &'static str,
    /// The rate(s) the opcode runs at.
    pub rates: &'static [Rate],
    /// Input slot layout.
    pub inputs: &'static [SlotSpec],
    /// Output slot layout.
    pub outputs: &'static [SlotSpec],
    /// Instance factory.
    pub factory: OpcodeFactory,
}

impl core::fmt::Debug for OpcodeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpcodeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rates", &self.rates)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Activation failure: either the identifier is unknown or the opcode
/// rejected its configuration at initialize time.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// No descriptor registered under the identifier.
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    /// The opcode's initialize pass failed.
    #[error("opcode '{opcode}' failed to initialize")]
    Init {
        /// Identifier of the failing opcode.
        opcode: &'static str,
        /// The initialize-time failure.
        #[source]
        source: InitError,
    },
}

/// An [`ErrorSink`] that forwards reports to the `tracing` subscriber at
/// error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&mut self, opcode: &str, message: &str) {
        tracing::error!(opcode, message, "opcode initialization failed");
    }
}

const BUILTINS: &[OpcodeDescriptor] = &[
    OpcodeDescriptor {
        id: "vdelay",
        name: "Variable Delay",
        description: "Delay with an audio-rate delay-time input; default maximum 1 s, linear interpolation",
        rates: &[Rate::Audio],
        inputs: &[SlotSpec::audio("signal"), SlotSpec::audio("delay_time")],
        outputs: &[SlotSpec::audio("delayed")],
        factory: || Box::new(VDelay::new(1.0)),
    },
    OpcodeDescriptor {
        id: "multitap",
        name: "Multi-Tap Delay",
        description: "Shared delay line with multiple read taps; default is one unity tap at 0.5 s",
        rates: &[Rate::Audio],
        inputs: &[SlotSpec::audio("signal")],
        outputs: &[SlotSpec::audio("taps")],
        factory: || Box::new(MultiTap::new(vec![TapSpec::at(0.5)])),
    },
    OpcodeDescriptor {
        id: "reverb",
        name: "Reverb",
        description: "Six-comb/five-allpass reverberator; default 2 s decay, 0.5 damping",
        rates: &[Rate::Audio],
        inputs: &[
            SlotSpec::audio("signal"),
            SlotSpec::control("decay_time"),
            SlotSpec::control("damping"),
        ],
        outputs: &[SlotSpec::audio("wet")],
        factory: || Box::new(Reverb::classic(2.0, 0.5)),
    },
];

/// The opcode catalog.
///
/// Starts populated with the built-ins; host code may register additional
/// descriptors under new identifiers.
#[derive(Debug, Clone)]
pub struct OpcodeRegistry {
    descriptors: Vec<OpcodeDescriptor>,
}

impl Default for OpcodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OpcodeRegistry {
    /// A registry holding the built-in opcodes.
    pub fn new() -> Self {
        Self {
            descriptors: BUILTINS.to_vec(),
        }
    }

    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Register a descriptor. A duplicate identifier replaces the earlier
    /// entry.
    pub fn register(&mut self, descriptor: OpcodeDescriptor) {
        if let Some(existing) = self.descriptors.iter_mut().find(|d| d.id == descriptor.id) {
            *existing = descriptor;
        } else {
            self.descriptors.push(descriptor);
        }
    }

    /// Look up a descriptor by identifier.
    pub fn get(&self, id: &str) -> Option<&OpcodeDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// All registered descriptors, in registration order.
    pub fn all(&self) -> &[OpcodeDescriptor] {
        &self.descriptors
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Build a fresh, uninitialized instance of the opcode.
    pub fn create(&self, id: &str) -> Result<Box<dyn Opcode + Send>, ActivationError> {
        let descriptor = self
            .get(id)
            .ok_or_else(|| ActivationError::UnknownOpcode(id.to_owned()))?;
        Ok((descriptor.factory)())
    }

    /// Build and initialize an instance for one note activation.
    ///
    /// A configuration failure is reported to `sink` and returned; the note
    /// is skipped, the engine keeps running.
    pub fn activate(
        &self,
        id: &str,
        ctx: &EngineContext<'_>,
        sink: &mut dyn ErrorSink,
    ) -> Result<Box<dyn Opcode + Send>, ActivationError> {
        let mut opcode = self.create(id)?;
        if let Err(source) = opcode.initialize(ctx) {
            let name = opcode.name();
            sink.report(name, &source.to_string());
            return Err(ActivationError::Init {
                opcode: name,
                source,
            });
        }
        tracing::debug!(
            opcode = opcode.name(),
            sample_rate = ctx.sample_rate(),
            block_len = ctx.block_len(),
            "opcode activated"
        );
        Ok(opcode)
    }
}
