// Stream format description and sample encoding helpers
//
// The render endpoint dictates the wire encoding of every sample. A value
// that is numerically right but encoded wrong silently corrupts or mutes the
// actuators, so the conversions here pin the exact bit patterns and the
// callback path converts through cpal's `FromSample`, which matches them.

use cpal::SampleFormat;
use serde::Serialize;

/// Sample encodings the pipeline can render to. Reported as-is in the
/// status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    Pcm16,
    Float32,
}

impl SampleEncoding {
    /// Map a cpal stream format onto a supported encoding.
    pub fn from_sample_format(format: SampleFormat) -> Option<Self> {
        match format {
            SampleFormat::I16 => Some(SampleEncoding::Pcm16),
            SampleFormat::F32 => Some(SampleEncoding::Float32),
            _ => None,
        }
    }
}

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX], clamping out-of-range input
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);

    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Convert i16 sample to f32
///
/// Maps [i16::MIN, i16::MAX] to [-1.0, 1.0]
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    if sample >= 0 {
        sample as f32 / i16::MAX as f32
    } else {
        sample as f32 / -(i16::MIN as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_sample_format() {
        assert_eq!(
            SampleEncoding::from_sample_format(SampleFormat::I16),
            Some(SampleEncoding::Pcm16)
        );
        assert_eq!(
            SampleEncoding::from_sample_format(SampleFormat::F32),
            Some(SampleEncoding::Float32)
        );
        assert_eq!(SampleEncoding::from_sample_format(SampleFormat::U8), None);
    }

    #[test]
    fn test_encoding_serializes_to_wire_name() {
        assert_eq!(
            serde_json::to_value(SampleEncoding::Pcm16).unwrap(),
            serde_json::json!("pcm16")
        );
        assert_eq!(
            serde_json::to_value(SampleEncoding::Float32).unwrap(),
            serde_json::json!("float32")
        );
    }

    #[test]
    fn test_f32_to_i16_endpoints() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);

        // Out-of-range input clamps instead of wrapping
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), i16::MIN);
    }

    #[test]
    fn test_i16_roundtrip() {
        for &original in &[-1.0f32, -0.5, -0.1, 0.0, 0.1, 0.5, 0.9, 1.0] {
            let back = i16_to_f32(f32_to_i16(original));
            assert!(
                (back - original).abs() < 0.001,
                "roundtrip failed for {original}: got {back}"
            );
        }
    }
}
