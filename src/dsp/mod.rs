// DSP primitives for the haptic signal path

pub mod biquad;
pub mod tone;

pub use biquad::BiquadLowPass;
pub use tone::ToneGenerator;

/// Hard clipping
///
/// Strict clamp into [-1, 1]. Haptic actuators respond to amplitude, not
/// timbre, so the harmonics a hard clip introduces are irrelevant here and
/// the exact ±1.0 ceiling is part of the output contract.
#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Flush denormals to zero
///
/// Denormal numbers (very close to 0) can cause serious CPU stalls on some
/// processors. Threshold: 1e-15, far below the 32-bit float noise floor.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}
