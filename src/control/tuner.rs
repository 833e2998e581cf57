// Button-driven parameter tuning
//
// D-pad up/down steps the active frequency: the test tone frequency while
// the tone generator is selected, the filter cutoff otherwise. R1/L1 step
// the output gain. All adjustments are edge-triggered so a held button
// moves one step per press.

use tracing::info;

use crate::audio::parameters::{HapticMode, HapticParams};
use crate::control::edge::EdgeDetector;
use crate::hid::report::{Button, ButtonSet};

pub const FREQUENCY_MIN_HZ: f32 = 25.0;
pub const FREQUENCY_MAX_HZ: f32 = 60.0;
pub const FREQUENCY_STEP_HZ: f32 = 5.0;

pub const GAIN_MIN: f32 = 0.0;
pub const GAIN_MAX: f32 = 5.0;
pub const GAIN_STEP: f32 = 0.25;

pub struct ParameterTuner {
    params: HapticParams,
    edges: EdgeDetector,
}

impl ParameterTuner {
    pub fn new(params: HapticParams) -> Self {
        Self {
            params,
            edges: EdgeDetector::new(),
        }
    }

    /// Feed one button snapshot; applies any tuning edges it contains.
    pub fn apply(&mut self, buttons: ButtonSet) {
        let edges = self.edges.rising(buttons);
        if edges.is_empty() {
            return;
        }

        if edges.contains(Button::DpadUp) {
            self.step_frequency(FREQUENCY_STEP_HZ);
        }
        if edges.contains(Button::DpadDown) {
            self.step_frequency(-FREQUENCY_STEP_HZ);
        }
        if edges.contains(Button::R1) {
            self.step_gain(GAIN_STEP);
        }
        if edges.contains(Button::L1) {
            self.step_gain(-GAIN_STEP);
        }
    }

    fn step_frequency(&mut self, delta: f32) {
        match self.params.mode() {
            HapticMode::TestTone => {
                let freq = (self.params.test_tone_hz() + delta)
                    .clamp(FREQUENCY_MIN_HZ, FREQUENCY_MAX_HZ);
                self.params.set_test_tone_hz(freq);
                info!(frequency_hz = freq, "tone frequency adjusted");
            }
            HapticMode::Loopback => {
                let cutoff = (self.params.filter_cutoff_hz() + delta)
                    .clamp(FREQUENCY_MIN_HZ, FREQUENCY_MAX_HZ);
                self.params.set_filter_cutoff_hz(cutoff);
                info!(cutoff_hz = cutoff, "filter cutoff adjusted");
            }
        }
    }

    fn step_gain(&mut self, delta: f32) {
        let gain = (self.params.gain() + delta).clamp(GAIN_MIN, GAIN_MAX);
        self.params.set_gain(gain);
        info!(gain, "gain adjusted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(buttons: &[Button]) -> ButtonSet {
        let mut set = ButtonSet::default();
        for &b in buttons {
            set.insert(b);
        }
        set
    }

    fn press(tuner: &mut ParameterTuner, button: Button) {
        tuner.apply(set_of(&[button]));
        tuner.apply(set_of(&[]));
    }

    #[test]
    fn test_dpad_steps_cutoff_in_loopback() {
        let params = HapticParams::new();
        params.set_mode(HapticMode::Loopback);
        let mut tuner = ParameterTuner::new(params.clone());

        let before = params.filter_cutoff_hz();
        press(&mut tuner, Button::DpadDown);
        assert_eq!(params.filter_cutoff_hz(), before - FREQUENCY_STEP_HZ);
        // Tone frequency untouched
        assert_eq!(params.test_tone_hz(), 25.0);
    }

    #[test]
    fn test_dpad_steps_tone_in_test_mode() {
        let params = HapticParams::new();
        params.set_mode(HapticMode::TestTone);
        let mut tuner = ParameterTuner::new(params.clone());

        let cutoff_before = params.filter_cutoff_hz();
        press(&mut tuner, Button::DpadUp);
        assert_eq!(params.test_tone_hz(), 30.0);
        assert_eq!(params.filter_cutoff_hz(), cutoff_before);
    }

    #[test]
    fn test_frequency_clamps() {
        let params = HapticParams::new();
        params.set_mode(HapticMode::TestTone);
        let mut tuner = ParameterTuner::new(params.clone());

        for _ in 0..20 {
            press(&mut tuner, Button::DpadDown);
        }
        assert_eq!(params.test_tone_hz(), FREQUENCY_MIN_HZ);

        for _ in 0..20 {
            press(&mut tuner, Button::DpadUp);
        }
        assert_eq!(params.test_tone_hz(), FREQUENCY_MAX_HZ);
    }

    #[test]
    fn test_gain_steps_and_clamps() {
        let params = HapticParams::new();
        let mut tuner = ParameterTuner::new(params.clone());

        press(&mut tuner, Button::R1);
        assert!((params.gain() - 1.75).abs() < 1e-6);
        press(&mut tuner, Button::L1);
        assert!((params.gain() - 1.5).abs() < 1e-6);

        // Saturate upward: converges to exactly the ceiling
        for _ in 0..40 {
            press(&mut tuner, Button::R1);
        }
        assert_eq!(params.gain(), GAIN_MAX);

        for _ in 0..40 {
            press(&mut tuner, Button::L1);
        }
        assert_eq!(params.gain(), GAIN_MIN);
    }

    #[test]
    fn test_held_button_adjusts_once() {
        let params = HapticParams::new();
        let mut tuner = ParameterTuner::new(params.clone());

        let held = set_of(&[Button::R1]);
        tuner.apply(held);
        tuner.apply(held);
        tuner.apply(held);
        assert!((params.gain() - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_simultaneous_edges_both_apply() {
        let params = HapticParams::new();
        params.set_mode(HapticMode::Loopback);
        let mut tuner = ParameterTuner::new(params.clone());

        tuner.apply(set_of(&[Button::DpadUp, Button::R1]));
        // Cutoff already at the ceiling by default, so it stays put
        assert_eq!(params.filter_cutoff_hz(), FREQUENCY_MAX_HZ);
        assert!((params.gain() - 1.75).abs() < 1e-6);
    }
}
