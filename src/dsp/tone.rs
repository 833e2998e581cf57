// Sine tone generator for manual actuator testing

use std::f32::consts::PI;

/// Amplitude of the generated tone. Half scale leaves headroom for the gain
/// stage without immediately clipping.
pub const TONE_AMPLITUDE: f32 = 0.5;

/// Phase-accumulator sine generator.
///
/// The output is already band-limited (a pure sine), which is why the signal
/// processor never runs it through the low-pass.
pub struct ToneGenerator {
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
    amplitude: f32,
}

impl ToneGenerator {
    pub fn new(sample_rate: f32, frequency_hz: f32) -> Self {
        let mut tone = Self {
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
            amplitude: TONE_AMPLITUDE,
        };
        tone.set_frequency(frequency_hz);
        tone
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.phase_increment = frequency_hz / self.sample_rate;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.amplitude * (self.phase * 2.0 * PI).sin();

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;
    const EPSILON: f32 = 0.001;

    #[test]
    fn test_frequency_sets_phase_increment() {
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 25.0);
        tone.set_frequency(40.0);

        let expected = 40.0 / SAMPLE_RATE;
        assert!((tone.phase_increment - expected).abs() < EPSILON);
    }

    #[test]
    fn test_starts_at_zero_crossing() {
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 25.0);
        assert!(tone.next_sample().abs() < EPSILON);
    }

    #[test]
    fn test_amplitude_bounded() {
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 60.0);
        for _ in 0..10000 {
            let sample = tone.next_sample();
            assert!(sample.abs() <= TONE_AMPLITUDE + EPSILON);
        }
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 25.0);
        for _ in 0..100 {
            tone.next_sample();
        }
        tone.reset();
        assert!(tone.next_sample().abs() < EPSILON);
    }

    #[test]
    fn test_matches_reference_sine() {
        let mut tone = ToneGenerator::new(SAMPLE_RATE, 25.0);
        for i in 0..2000 {
            let expected = TONE_AMPLITUDE * (2.0 * PI * 25.0 * i as f32 / SAMPLE_RATE).sin();
            let actual = tone.next_sample();
            assert!(
                (actual - expected).abs() < 0.01,
                "sample {i}: expected {expected}, got {actual}"
            );
        }
    }
}
