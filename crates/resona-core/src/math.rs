//! Small math helpers shared by the signal path.
//!
//! Everything here is allocation-free and `no_std` compatible.

/// Flush denormal-range values to zero.
///
/// Feedback paths decay asymptotically toward zero and eventually produce
/// IEEE 754 subnormals, which are dramatically slower to process on most
/// CPUs. Values below the 1e-20 threshold carry no audible information.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Replace a non-finite sample with silence.
///
/// Perform routines never abort a running note: a NaN or infinity arriving
/// on an input slot is substituted with zero and processing continues.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}
