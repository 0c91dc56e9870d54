//! Auxiliary sample storage owned by one opcode instance.
//!
//! Every stateful opcode sizes its working memory once, inside its
//! initialize routine, and never reallocates during perform. [`AuxBuffer`]
//! makes that discipline explicit: [`ensure`](AuxBuffer::ensure) is the only
//! way to (re)size the storage, and it reports allocation failure instead of
//! aborting so the scheduler can refuse to start the note.

use alloc::vec::Vec;

/// Allocation failure while sizing an [`AuxBuffer`].
///
/// Treated as fatal to note activation, on the same path as a configuration
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    /// Number of samples that could not be allocated.
    pub samples: usize,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "failed to allocate {} samples of opcode storage", self.samples)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

/// Contiguous scalar storage for one opcode instance.
///
/// The buffer is exclusively owned by the instance that requested it and is
/// released when the note ends (on drop). Its size is fixed once allocated;
/// only an explicit [`ensure`](AuxBuffer::ensure) call between notes may
/// change it.
///
/// # Example
///
/// ```rust
/// use resona_core::AuxBuffer;
///
/// let mut aux = AuxBuffer::new();
/// aux.ensure(1024, true).unwrap();
/// assert_eq!(aux.len(), 1024);
/// assert!(aux.as_slice().iter().all(|&s| s == 0.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuxBuffer {
    data: Vec<f32>,
}

impl AuxBuffer {
    /// Create an empty buffer. No storage is held until [`ensure`](Self::ensure).
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Size the buffer to exactly `len` samples.
    ///
    /// A size change always produces fresh, zeroed storage (old contents are
    /// not preserved). When the size is unchanged, `clear` selects between
    /// zero-filling in place and keeping the existing contents untouched --
    /// the latter is what lets a re-initialize with storage reset disabled
    /// carry history across without an audio interruption.
    ///
    /// Call only from initialize routines, never from perform.
    pub fn ensure(&mut self, len: usize, clear: bool) -> Result<(), AllocError> {
        if self.data.len() != len {
            let mut fresh = Vec::new();
            fresh
                .try_reserve_exact(len)
                .map_err(|_| AllocError { samples: len })?;
            fresh.resize(len, 0.0);
            self.data = fresh;
        } else if clear {
            self.data.fill(0.0);
        }
        Ok(())
    }

    /// Zero-fill the buffer without changing its size.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no storage has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the samples.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Write access to the samples.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_allocates_zeroed() {
        let mut aux = AuxBuffer::new();
        assert!(aux.is_empty());

        aux.ensure(16, false).unwrap();
        assert_eq!(aux.len(), 16);
        assert!(aux.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_ensure_same_size_preserves_without_clear() {
        let mut aux = AuxBuffer::new();
        aux.ensure(8, true).unwrap();
        aux.as_mut_slice()[3] = 0.5;

        aux.ensure(8, false).unwrap();
        assert_eq!(aux.as_slice()[3], 0.5);
    }

    #[test]
    fn test_ensure_same_size_clears_when_asked() {
        let mut aux = AuxBuffer::new();
        aux.ensure(8, true).unwrap();
        aux.as_mut_slice()[3] = 0.5;

        aux.ensure(8, true).unwrap();
        assert!(aux.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_ensure_resize_discards_history() {
        let mut aux = AuxBuffer::new();
        aux.ensure(8, false).unwrap();
        aux.as_mut_slice()[0] = 1.0;

        // Growing gives fresh zeroed storage even without clear
        aux.ensure(32, false).unwrap();
        assert_eq!(aux.len(), 32);
        assert!(aux.as_slice().iter().all(|&s| s == 0.0));
    }
}
