//! Resona Opcodes - built-in delay and reverberation processing units.
//!
//! Every type here implements the [`Opcode`](resona_core::Opcode) contract
//! from resona-core: one `initialize` per note activation, one `perform` per
//! control period, allocation only at initialize time.
//!
//! - [`VDelay`] - variable delay with an audio-rate delay-time input and
//!   selectable fractional interpolation
//! - [`MultiTap`] - up to [`MAX_TAPS`] read taps over one shared delay line,
//!   with combined or per-tap outputs
//! - [`Reverb`] - Schroeder-style reverberator; [`Reverb::classic`] builds
//!   the fixed six-comb/five-allpass network, [`Reverb::with_tables`] takes
//!   section constants from caller-supplied function tables
//!
//! ## Example
//!
//! ```rust
//! use resona_core::{EngineContext, Opcode};
//! use resona_opcodes::Reverb;
//!
//! let ctx = EngineContext::new(48000.0, 64);
//! let mut reverb = Reverb::classic(2.0, 0.3);
//! reverb.initialize(&ctx).unwrap();
//!
//! let input = [0.0f32; 64];
//! let time = [2.0f32];
//! let damping = [0.3f32];
//! let mut wet = [0.0f32; 64];
//! let mut outputs: [&mut [f32]; 1] = [&mut wet];
//! reverb.perform(&[&input, &time, &damping], &mut outputs);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod multitap;
pub mod reverb;
pub mod vdelay;

// Re-export main types at crate root
pub use multitap::{MAX_TAPS, MultiTap, TapSpec};
pub use reverb::{MAX_SECTIONS, Reverb, SectionTables};
pub use vdelay::VDelay;
