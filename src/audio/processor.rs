// Signal processor - the per-buffer shaping stage of the haptic path
//
// Runs inside the render callback. Reads the shared parameters once per
// call, selects the active source (captured loopback audio or the internal
// test tone), low-pass filters loopback samples, applies gain and hard-clips.
//
// Filter coefficients are owned by this struct and therefore by the render
// callback thread. A cutoff change lands as a single atomic scalar in the
// shared store; the next `read` notices the new value and rebuilds both
// channels' coefficient sets wholesale before touching any sample, so a
// transform in progress can never observe a half-updated filter. Delay lines
// survive the rebuild (continuity across frequency changes).

use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Split};

use crate::audio::parameters::{HapticMode, HapticParams};
use crate::dsp::{BiquadLowPass, ToneGenerator, hard_clip};

/// One interleaved stereo frame. Transporting whole frames through the ring
/// keeps left/right alignment intact even when the ring fills up mid-push.
pub type StereoFrame = (f32, f32);

pub type FrameProducer = ringbuf::HeapProd<StereoFrame>;
pub type FrameConsumer = ringbuf::HeapCons<StereoFrame>;

/// Lock-free frame channel between the capture and render callbacks.
pub fn frame_channel(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let rb = HeapRb::<StereoFrame>::new(capacity);
    rb.split()
}

pub struct SignalProcessor {
    live: FrameConsumer,
    tone: ToneGenerator,
    filters: [BiquadLowPass; 2],
    params: HapticParams,
}

impl SignalProcessor {
    pub fn new(live: FrameConsumer, sample_rate: f32, params: HapticParams) -> Self {
        let cutoff = params.filter_cutoff_hz();
        Self {
            live,
            tone: ToneGenerator::new(sample_rate, params.test_tone_hz()),
            filters: [
                BiquadLowPass::new(sample_rate, cutoff),
                BiquadLowPass::new(sample_rate, cutoff),
            ],
            params,
        }
    }

    /// Fill `buf` with processed interleaved stereo samples.
    ///
    /// Returns the number of samples actually produced, always a multiple of
    /// two. A short count means the capture side underran; zero is a valid
    /// return and not an error.
    pub fn read(&mut self, buf: &mut [f32]) -> usize {
        // Parameters are sampled once per call; a mode switch therefore
        // takes effect on the next read, never mid-buffer.
        let mode = self.params.mode();
        let gain = self.params.gain();

        let cutoff = self.params.filter_cutoff_hz();
        if cutoff != self.filters[0].cutoff_hz() {
            for filter in &mut self.filters {
                filter.set_cutoff(cutoff);
            }
        }

        let frames_requested = buf.len() / 2;
        let produced = match mode {
            HapticMode::Loopback => {
                let mut frames = 0;
                while frames < frames_requested {
                    match self.live.try_pop() {
                        Some((left, right)) => {
                            buf[frames * 2] = left;
                            buf[frames * 2 + 1] = right;
                            frames += 1;
                        }
                        None => break,
                    }
                }
                frames * 2
            }
            HapticMode::TestTone => {
                self.tone.set_frequency(self.params.test_tone_hz());
                for frame in buf[..frames_requested * 2].chunks_exact_mut(2) {
                    let sample = self.tone.next_sample();
                    frame[0] = sample;
                    frame[1] = sample;
                }
                frames_requested * 2
            }
        };

        for (i, sample) in buf[..produced].iter_mut().enumerate() {
            if mode == HapticMode::Loopback {
                // Test tones are pure sines; only loopback gets filtered
                *sample = self.filters[i & 1].process(*sample);
            }
            *sample *= gain;
            *sample = hard_clip(*sample);
        }

        produced
    }
}
