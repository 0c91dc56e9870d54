//! Engine context threaded through every initialize and perform call.
//!
//! Rather than process-wide globals for the sample rate, control period,
//! and table store, everything a note needs arrives through an explicit
//! [`EngineContext`] value owned by the scheduler. The context is valid for
//! the life of the note: the scheduler guarantees the sample rate and block
//! length never change while the note is active.

/// Read access to externally managed function tables.
///
/// The generalized reverb consumes its per-section delay times and target
/// gains as ordered scalar sequences resolved by table identifier. How the
/// tables are loaded or stored is a collaborator concern; the core only ever
/// borrows their contents during initialize.
pub trait TableSource {
    /// Look up a table by identifier. Returns `None` if no such table exists.
    fn table(&self, id: usize) -> Option<&[f32]>;
}

/// A [`TableSource`] holding no tables at all.
///
/// The default for contexts built with [`EngineContext::new`]; any table
/// lookup fails, which surfaces as an initialize error in opcodes that
/// require one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableSource for NoTables {
    fn table(&self, _id: usize) -> Option<&[f32]> {
        None
    }
}

static NO_TABLES: NoTables = NoTables;

/// Sink for human-readable initialize-time error messages.
///
/// The core reports why a note failed to start without knowing how the
/// message is displayed or logged. Perform-time degradations (non-finite
/// samples) are recovered silently and never reach the sink.
pub trait ErrorSink {
    /// Report one initialize-time failure for the named opcode.
    fn report(&mut self, opcode: &str, message: &str);
}

/// An [`ErrorSink`] that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ErrorSink for NullSink {
    fn report(&mut self, _opcode: &str, _message: &str) {}
}

/// Per-note engine context: sample rate, perform block length, and the
/// function-table store.
///
/// Opcodes capture what they need from the context at initialize time
/// (buffer capacities, coefficient bases) and read the block length each
/// perform call. Audio-rate slots carry `block_len` samples per call;
/// control-rate slots carry exactly one.
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    sample_rate: f32,
    block_len: usize,
    tables: &'a dyn TableSource,
}

impl core::fmt::Debug for EngineContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineContext")
            .field("sample_rate", &self.sample_rate)
            .field("block_len", &self.block_len)
            .finish_non_exhaustive()
    }
}

impl<'a> EngineContext<'a> {
    /// Create a context with no function tables.
    ///
    /// Opcodes validate the sample rate themselves at initialize time, so an
    /// out-of-range value here surfaces as a configuration error rather than
    /// a panic.
    pub fn new(sample_rate: f32, block_len: usize) -> Self {
        Self {
            sample_rate,
            block_len,
            tables: &NO_TABLES,
        }
    }

    /// Create a context backed by the given table store.
    pub fn with_tables(sample_rate: f32, block_len: usize, tables: &'a dyn TableSource) -> Self {
        Self {
            sample_rate,
            block_len,
            tables,
        }
    }

    /// Sample rate in samples per second.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of audio samples each perform call processes.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Resolve a function table by identifier.
    #[inline]
    pub fn table(&self, id: usize) -> Option<&'a [f32]> {
        self.tables.table(id)
    }
}
