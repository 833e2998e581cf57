// Biquad low-pass filter (RBJ cookbook, Q = 1)
//
// Two-pole low-pass used to isolate the rumble band of the loopback signal
// before it reaches the actuators. Transposed direct form II: two state
// variables, five coefficients.
//
// References:
// - Robert Bristow-Johnson, "Cookbook formulae for audio EQ biquad filter
//   coefficients"
//
// `set_cutoff()` rebuilds the whole coefficient set but deliberately leaves
// the delay line untouched, so sweeping the cutoff while audio is flowing
// stays click-free and never resets the signal history.

use std::f32::consts::PI;

use crate::dsp::flush_denormals_to_zero;

/// Fixed quality factor of the low-pass.
const Q: f32 = 1.0;

pub struct BiquadLowPass {
    sample_rate: f32,
    cutoff_hz: f32,

    // Normalized coefficients (a0 divided out)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Delay line
    z1: f32,
    z2: f32,
}

impl BiquadLowPass {
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            cutoff_hz,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.update_coefficients(cutoff_hz);
        filter
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Change the cutoff frequency.
    ///
    /// Recomputes every coefficient in one go; the delay line is preserved
    /// so the output stays continuous across the change.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.update_coefficients(cutoff_hz);
    }

    /// Reset the delay line (fresh session)
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    fn update_coefficients(&mut self, cutoff_hz: f32) {
        // Keep the pole locations numerically sane whatever the caller asks for
        let safe_cutoff = cutoff_hz.clamp(1.0, self.sample_rate * 0.45);

        let w0 = 2.0 * PI * safe_cutoff / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * Q);

        let a0 = 1.0 + alpha;
        self.b0 = ((1.0 - cos_w0) / 2.0) / a0;
        self.b1 = (1.0 - cos_w0) / a0;
        self.b2 = ((1.0 - cos_w0) / 2.0) / a0;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = flush_denormals_to_zero(self.b1 * input - self.a1 * output + self.z2);
        self.z2 = flush_denormals_to_zero(self.b2 * input - self.a2 * output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate a sine wave at a given frequency
    fn generate_sine(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate;
                (2.0 * PI * frequency * t).sin()
            })
            .collect()
    }

    /// Compute RMS (root mean square) level of a signal
    fn compute_rms(signal: &[f32]) -> f32 {
        let sum_squares: f32 = signal.iter().map(|x| x * x).sum();
        (sum_squares / signal.len() as f32).sqrt()
    }

    #[test]
    fn test_zero_in_zero_out() {
        let mut filter = BiquadLowPass::new(48000.0, 60.0);
        for _ in 0..1000 {
            assert_eq!(filter.process(0.0), 0.0);
        }
    }

    #[test]
    fn test_dc_passes_through() {
        let mut filter = BiquadLowPass::new(48000.0, 60.0);

        let mut last_output = 0.0;
        for _ in 0..48000 {
            last_output = filter.process(1.0);
        }

        // A low-pass passes DC with unity gain
        assert!((last_output - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_high_frequency_attenuated() {
        let sample_rate = 48000.0;
        let mut filter = BiquadLowPass::new(sample_rate, 60.0);

        let input = generate_sine(2000.0, sample_rate, 9600);
        let output: Vec<f32> = input.iter().map(|&s| filter.process(s)).collect();

        let attenuation = compute_rms(&output[2400..]) / compute_rms(&input[2400..]);
        assert!(
            attenuation < 0.01,
            "2kHz through a 60Hz low-pass should be crushed, got {attenuation}"
        );
    }

    #[test]
    fn test_low_frequency_passes() {
        let sample_rate = 48000.0;
        let mut filter = BiquadLowPass::new(sample_rate, 60.0);

        let input = generate_sine(20.0, sample_rate, 48000);
        let output: Vec<f32> = input.iter().map(|&s| filter.process(s)).collect();

        let attenuation = compute_rms(&output[9600..]) / compute_rms(&input[9600..]);
        assert!(
            attenuation > 0.8,
            "20Hz through a 60Hz low-pass should pass, got {attenuation}"
        );
    }

    #[test]
    fn test_set_cutoff_preserves_delay_line() {
        let mut filter = BiquadLowPass::new(48000.0, 60.0);

        // Charge the delay line with DC
        for _ in 0..48000 {
            filter.process(1.0);
        }
        let before = filter.process(1.0);

        filter.set_cutoff(40.0);
        let after = filter.process(1.0);

        // Continuity: no jump at the coefficient swap
        assert!(
            (after - before).abs() < 0.05,
            "output jumped from {before} to {after} on cutoff change"
        );
        assert_eq!(filter.cutoff_hz(), 40.0);
    }

    #[test]
    fn test_stability_under_cutoff_sweep() {
        let mut filter = BiquadLowPass::new(48000.0, 25.0);

        for i in 0..10000 {
            if i % 100 == 0 {
                let cutoff = 25.0 + (i / 100) as f32 % 36.0;
                filter.set_cutoff(cutoff);
            }
            let output = filter.process(0.5);
            assert!(output.is_finite());
        }
    }

    #[test]
    fn test_extreme_cutoff_is_clamped() {
        // Absurd cutoffs must not produce unstable poles
        let mut filter = BiquadLowPass::new(48000.0, 1_000_000.0);
        for _ in 0..1000 {
            assert!(filter.process(0.5).is_finite());
        }

        let mut filter = BiquadLowPass::new(48000.0, -5.0);
        for _ in 0..1000 {
            assert!(filter.process(0.5).is_finite());
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = BiquadLowPass::new(48000.0, 60.0);
        for _ in 0..100 {
            filter.process(1.0);
        }
        filter.reset();
        assert_eq!(filter.process(0.0), 0.0);
    }
}
