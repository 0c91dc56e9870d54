//! The opcode lifecycle contract.
//!
//! Every processing unit exposes exactly two entry points. The scheduler
//! calls [`initialize`](Opcode::initialize) once per note activation, then
//! [`perform`](Opcode::perform) once per control period for the life of the
//! note. Initialize sizes buffers and computes initial coefficients;
//! perform advances internal state and writes the output slots. Perform
//! must never allocate and never fail -- a bad input sample is replaced
//! with silence locally.
//!
//! ## Slot convention
//!
//! Input and output slots are slices of `f32`. An audio-rate slot carries
//! [`EngineContext::block_len`] samples per perform call; a control-rate
//! slot carries exactly one value for the whole period. [`slot_value`]
//! reads either kind uniformly. The slot layout of each opcode is fixed at
//! initialize time and documented on the opcode type; the registry's
//! descriptor repeats it for the scheduler.

use crate::auxbuf::AllocError;
use crate::context::EngineContext;

/// The time grid an opcode runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rate {
    /// One output sample per audio frame (fine grid); perform processes a
    /// full block per call.
    Audio,
    /// One output value per control period (coarse grid).
    Control,
    /// Runs only at initialize time and produces no perform output.
    Init,
}

/// Initialize-time failure. Fatal to the note's activation: the scheduler
/// reports it through the error sink and the note never starts.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// The engine context carries a non-positive sample rate.
    InvalidSampleRate(f32),
    /// A delay or tap time input is negative.
    NegativeDelay(f32),
    /// The maximum delay sizing a buffer must be strictly positive.
    NonPositiveMaxDelay(f32),
    /// The requested reverberation time must be strictly positive.
    NonPositiveDecay(f32),
    /// The high-frequency damping parameter lies outside `[0, 1]`.
    DampingOutOfRange(f32),
    /// More taps requested than the implementation supports.
    TooManyTaps {
        /// Number of taps requested.
        requested: usize,
        /// Implementation limit.
        max: usize,
    },
    /// A multi-tap opcode needs at least one tap.
    NoTaps,
    /// More reverb sections requested than the implementation supports.
    TooManySections {
        /// Number of sections requested.
        requested: usize,
        /// Implementation limit.
        max: usize,
    },
    /// A reverb network needs at least one comb section.
    NoSections,
    /// A required function table was not found in the table store.
    TableMissing(usize),
    /// A function table holds fewer entries than the declared section count.
    TableTooShort {
        /// Table identifier.
        table: usize,
        /// Entries the table holds.
        len: usize,
        /// Entries required.
        need: usize,
    },
    /// A table-supplied section delay time is not strictly positive.
    InvalidSectionTime(f32),
    /// Buffer allocation failed.
    Alloc(AllocError),
}

impl From<AllocError> for InitError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSampleRate(sr) => write!(f, "sample rate must be positive, got {sr}"),
            Self::NegativeDelay(d) => write!(f, "delay time must not be negative, got {d}"),
            Self::NonPositiveMaxDelay(d) => {
                write!(f, "maximum delay must be positive, got {d}")
            }
            Self::NonPositiveDecay(t) => {
                write!(f, "reverberation time must be positive, got {t}")
            }
            Self::DampingOutOfRange(d) => {
                write!(f, "damping must lie in [0, 1], got {d}")
            }
            Self::TooManyTaps { requested, max } => {
                write!(f, "{requested} taps requested, limit is {max}")
            }
            Self::NoTaps => write!(f, "at least one tap is required"),
            Self::TooManySections { requested, max } => {
                write!(f, "{requested} reverb sections requested, limit is {max}")
            }
            Self::NoSections => write!(f, "at least one comb section is required"),
            Self::TableMissing(id) => write!(f, "function table {id} not found"),
            Self::TableTooShort { table, len, need } => {
                write!(f, "function table {table} holds {len} entries, need {need}")
            }
            Self::InvalidSectionTime(t) => {
                write!(f, "section delay time must be positive, got {t}")
            }
            Self::Alloc(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

/// A pluggable unit of signal processing with an initialize/perform contract.
///
/// One value of an implementing type is one *instance*: it owns all private
/// state for one active use inside one note, and its buffers are released
/// when the value is dropped at note end.
///
/// # Contract
///
/// - `initialize` is called once per note activation, and again on
///   recompilation. It validates parameters, sizes auxiliary buffers, and
///   zero-fills delay state unless [`set_storage_reset`](Self::set_storage_reset)
///   disabled the reset and a compatible buffer already exists.
/// - `perform` is called once per control period, processes one block, and
///   must not allocate. It is never called concurrently with `initialize`
///   on the same instance.
pub trait Opcode {
    /// Unique opcode name, as registered with the scheduler.
    fn name(&self) -> &'static str;

    /// The grid this instance's output advances on.
    fn rate(&self) -> Rate {
        Rate::Audio
    }

    /// Validate parameters, size buffers, compute initial coefficients.
    ///
    /// Errors abort activation of the note.
    fn initialize(&mut self, ctx: &EngineContext<'_>) -> Result<(), InitError>;

    /// Process one control period worth of signal.
    ///
    /// `inputs` and `outputs` follow the slot convention described at the
    /// module level; the expected layout is documented per opcode. Non-finite
    /// input samples are substituted with silence, never propagated.
    fn perform(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);

    /// Control whether the next initialize zero-fills internal state.
    ///
    /// `true` (the default) forces all delay state to silence. `false`
    /// preserves state across a re-initialize with unchanged structure,
    /// allowing recompilation without an audible interruption.
    fn set_storage_reset(&mut self, _reset: bool) {}
}

/// Read slot `i` from a slice that may be audio-rate (one value per sample)
/// or control-rate (a single value for the whole block).
#[inline]
pub fn slot_value(slot: &[f32], i: usize) -> f32 {
    if slot.len() == 1 { slot[0] } else { slot[i] }
}
