// Atomic parameters - Lock-free sharing between the control surface,
// the controller poller and the audio callback.
//
// Every field is an independent scalar: the audio callback reads each one
// once per buffer and no invariant spans two fields, so per-field atomic
// load/store is enough. No locks anywhere near the real-time path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Thread-safe f32 parameter using atomic operations
/// Converts f32 to u32 bits for atomic storage
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// Set the value (control surface / poller side)
    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get the value (audio callback side)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Active source for the signal processor.
///
/// Dispatched as an explicit tag in the callback, not by swapping trait
/// objects, so the real-time branch stays predictable and allocation-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticMode {
    Loopback = 0,
    TestTone = 1,
}

impl From<u8> for HapticMode {
    fn from(value: u8) -> Self {
        match value {
            1 => HapticMode::TestTone,
            _ => HapticMode::Loopback,
        }
    }
}

/// Default gain applied after filtering.
pub const DEFAULT_GAIN: f32 = 1.5;
/// Default low-pass cutoff in Hz.
pub const DEFAULT_FILTER_CUTOFF_HZ: f32 = 60.0;
/// Default synthetic tone frequency in Hz.
pub const DEFAULT_TEST_TONE_HZ: f32 = 25.0;

/// Shared haptic tuning parameters.
///
/// Cloning the store clones handles to the same underlying atomics; the
/// pipeline, the HID poller and the HTTP handlers all hold one.
#[derive(Clone)]
pub struct HapticParams {
    gain: AtomicF32,
    filter_cutoff_hz: AtomicF32,
    test_tone_hz: AtomicF32,
    mode: Arc<AtomicU8>,
}

impl HapticParams {
    pub fn new() -> Self {
        Self {
            gain: AtomicF32::new(DEFAULT_GAIN),
            filter_cutoff_hz: AtomicF32::new(DEFAULT_FILTER_CUTOFF_HZ),
            test_tone_hz: AtomicF32::new(DEFAULT_TEST_TONE_HZ),
            mode: Arc::new(AtomicU8::new(HapticMode::Loopback as u8)),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_gain(&self, value: f32) {
        self.gain.set(value.max(0.0));
    }

    pub fn filter_cutoff_hz(&self) -> f32 {
        self.filter_cutoff_hz.get()
    }

    pub fn set_filter_cutoff_hz(&self, hz: f32) {
        self.filter_cutoff_hz.set(hz);
    }

    pub fn test_tone_hz(&self) -> f32 {
        self.test_tone_hz.get()
    }

    pub fn set_test_tone_hz(&self, hz: f32) {
        self.test_tone_hz.set(hz);
    }

    pub fn mode(&self) -> HapticMode {
        HapticMode::from(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: HapticMode) {
        self.mode.store(mode as u8, Ordering::Relaxed);
    }
}

impl Default for HapticParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = HapticParams::new();
        assert_eq!(params.gain(), 1.5);
        assert_eq!(params.filter_cutoff_hz(), 60.0);
        assert_eq!(params.test_tone_hz(), 25.0);
        assert_eq!(params.mode(), HapticMode::Loopback);
    }

    #[test]
    fn test_clones_share_storage() {
        let params = HapticParams::new();
        let other = params.clone();

        other.set_gain(3.25);
        other.set_mode(HapticMode::TestTone);

        assert_eq!(params.gain(), 3.25);
        assert_eq!(params.mode(), HapticMode::TestTone);
    }

    #[test]
    fn test_gain_never_negative() {
        let params = HapticParams::new();
        params.set_gain(-2.0);
        assert_eq!(params.gain(), 0.0);
    }

    #[test]
    fn test_atomic_f32_roundtrip() {
        let value = AtomicF32::new(0.1);
        value.set(-42.5);
        assert_eq!(value.get(), -42.5);
    }
}
