// Channel mapper - places the processed stereo pair into the actuator slots
//
// The controller's audio endpoint exposes N >= 4 channels: 0/1 drive its
// speaker, 2/3 drive the haptic actuators. Each output frame gets the
// processed left/right samples in slots 2 and 3 and exact silence everywhere
// else, so the speaker channels are never touched.
//
// The write is generic over the endpoint's native sample type; conversion
// goes through cpal's `FromSample`, which produces the endpoint's exact bit
// pattern for a given value (a numeric near-miss here silently corrupts or
// mutes the actuators).

use cpal::{FromSample, Sample};

use crate::audio::processor::SignalProcessor;

/// Channel index carrying the left actuator signal.
pub const ACTUATOR_LEFT_CHANNEL: usize = 2;
/// Channel index carrying the right actuator signal.
pub const ACTUATOR_RIGHT_CHANNEL: usize = 3;

const SOURCE_CHANNELS: usize = 2;

pub struct ChannelMapper {
    output_channels: usize,
    staging: Vec<f32>,
}

impl ChannelMapper {
    pub fn new(output_channels: usize) -> Self {
        Self {
            output_channels,
            staging: Vec::new(),
        }
    }

    /// Fill one output buffer from the processor.
    ///
    /// Returns the number of frames actually carrying signal; if the source
    /// underran, the remaining frames are fully zeroed so the endpoint never
    /// renders stale data.
    pub fn map_into<T>(&mut self, processor: &mut SignalProcessor, output: &mut [T]) -> usize
    where
        T: Sample + FromSample<f32>,
    {
        let channels = self.output_channels;
        let frames_requested = output.len() / channels;
        let samples_needed = frames_requested * SOURCE_CHANNELS;

        // Output frame counts can change between callbacks; track them
        if self.staging.len() != samples_needed {
            self.staging.resize(samples_needed, 0.0);
        }

        let samples_read = processor.read(&mut self.staging[..samples_needed]);
        let frames_read = samples_read / SOURCE_CHANNELS;

        let silence = T::from_sample(0.0f32);
        for (i, frame) in output.chunks_mut(channels).enumerate() {
            if i < frames_read {
                for (channel, slot) in frame.iter_mut().enumerate() {
                    *slot = match channel {
                        ACTUATOR_LEFT_CHANNEL => T::from_sample(self.staging[i * 2]),
                        ACTUATOR_RIGHT_CHANNEL => T::from_sample(self.staging[i * 2 + 1]),
                        _ => silence,
                    };
                }
            } else {
                for slot in frame.iter_mut() {
                    *slot = silence;
                }
            }
        }

        frames_read
    }
}
