//! Resona Core - opcode contract and DSP primitives for a score-driven
//! synthesis engine.
//!
//! This crate defines the contract between the note scheduler and a unit of
//! signal processing (an *opcode*), plus the hard building blocks the built-in
//! opcodes are made of.
//!
//! # Core Abstractions
//!
//! ## Opcode Lifecycle
//!
//! - [`Opcode`] - initialize/perform contract every processing unit honors
//! - [`EngineContext`] - sample rate, block length, and table lookup for one note
//! - [`Rate`] - the time grid an opcode runs on (audio, control, init-only)
//! - [`InitError`] - initialize-time configuration failures
//!
//! ## Storage
//!
//! - [`AuxBuffer`] - growable scalar storage, sized at initialize, owned by
//!   one opcode instance, never reallocated mid-perform
//! - [`DelayLine`] - circular buffer over an [`AuxBuffer`] with integer and
//!   fractional (interpolated) reads and explicit fill-depth tracking
//!
//! ## Filters
//!
//! - [`CombFilter`] - feedback comb with one-pole damping memory
//! - [`AllpassFilter`] - Schroeder allpass diffusion section
//!
//! ## Coefficient Derivation
//!
//! - [`comb_feedback`] / [`comb_feedback_toward`] - per-section feedback gain
//!   from a requested reverberation time
//!
//! ## Collaborator Seams
//!
//! - [`TableSource`] - function-table store the generalized reverb reads
//!   section constants from
//! - [`ErrorSink`] - where initialize-time diagnostics are sent
//!
//! # Example
//!
//! ```rust
//! use resona_core::{DelayLine, Interpolation};
//!
//! let mut delay = DelayLine::with_capacity(4410).unwrap();
//! delay.set_interpolation(Interpolation::Linear);
//! delay.write(1.0);
//! assert_eq!(delay.read(0), 1.0);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocation on the perform path; all sizing happens
//!   at initialize time
//! - **No ambient state**: everything an opcode needs arrives through
//!   [`EngineContext`]
//! - **no_std compatible**: pure `core`/`alloc` with `libm` for math

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod allpass;
pub mod auxbuf;
pub mod comb;
pub mod context;
pub mod decay;
pub mod delay;
pub mod math;
pub mod opcode;

// Re-export main types at crate root
pub use allpass::AllpassFilter;
pub use auxbuf::{AllocError, AuxBuffer};
pub use comb::CombFilter;
pub use context::{EngineContext, ErrorSink, NullSink, TableSource};
pub use decay::{REFERENCE_ATTENUATION, comb_feedback, comb_feedback_toward, damping_coeff};
pub use delay::{DelayLine, Interpolation};
pub use math::{flush_denormal, sanitize};
pub use opcode::{InitError, Opcode, Rate, slot_value};
