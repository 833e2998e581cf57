// Streaming stereo resampler
//
// Brings the capture stream to the render endpoint's sample rate. Capture
// callbacks deliver buffers of unpredictable length, so incoming frames are
// queued in a FIFO and fed to the FFT engine in the fixed-size blocks it
// requires. Nothing is dropped or zero-padded between blocks: stream
// continuity is preserved apart from the engine's inherent latency.

use rubato::{FftFixedInOut, Resampler, ResamplerConstructionError};
use std::collections::VecDeque;

/// Errors produced while resampling captured audio.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    /// The underlying FFT engine rejected a processing block.
    #[error("failed to resample captured samples: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// FFT-based streaming resampler for interleaved stereo f32.
///
/// Construction allocates all internal buffers; the processing path only
/// grows the FIFO, bounded by one block of backlog.
pub struct StereoResampler {
    resampler: FftFixedInOut<f32>,
    queued: [VecDeque<f32>; 2],

    input: Vec<Vec<f32>>,
    output: Vec<Vec<f32>>,
    interleaved: Vec<f32>,
}

impl StereoResampler {
    /// Creates a resampler converting `from_rate` to `to_rate`.
    ///
    /// `block_size` controls the internal FFT chunk (latency/efficiency
    /// trade-off); it imposes no constraint on caller buffer sizes.
    ///
    /// Allocates; call during pipeline setup, never from an audio callback.
    pub fn new(
        from_rate: u32,
        to_rate: u32,
        block_size: usize,
    ) -> Result<Self, ResamplerConstructionError> {
        let resampler = FftFixedInOut::new(from_rate as usize, to_rate as usize, block_size, 2)?;

        let input = resampler.input_buffer_allocate(true);
        let output = resampler.output_buffer_allocate(true);
        let max_out = resampler.output_frames_max();

        Ok(Self {
            resampler,
            queued: [VecDeque::with_capacity(block_size * 2), VecDeque::with_capacity(block_size * 2)],
            input,
            output,
            interleaved: Vec::with_capacity(max_out * 2),
        })
    }

    /// Feed interleaved stereo input; emit resampled interleaved stereo.
    ///
    /// The callback is invoked zero or more times with contiguous output.
    /// Returns the number of output frames produced during this call.
    pub fn process(
        &mut self,
        interleaved_input: &[f32],
        emit: &mut dyn FnMut(&[f32]),
    ) -> Result<usize, ResampleError> {
        for pair in interleaved_input.chunks_exact(2) {
            self.queued[0].push_back(pair[0]);
            self.queued[1].push_back(pair[1]);
        }

        let mut total_frames = 0usize;
        loop {
            let wanted = self.resampler.input_frames_next();
            if self.queued[0].len() < wanted {
                break;
            }

            for (channel, queue) in self.queued.iter_mut().enumerate() {
                self.input[channel].clear();
                while self.input[channel].len() < wanted {
                    match queue.pop_front() {
                        Some(sample) => self.input[channel].push(sample),
                        None => break,
                    }
                }
            }

            let (_, frames_written) =
                self.resampler
                    .process_into_buffer(&self.input, &mut self.output, None)?;

            if frames_written > 0 {
                self.interleaved.clear();
                for i in 0..frames_written {
                    self.interleaved.push(self.output[0][i]);
                    self.interleaved.push(self.output[1][i]);
                }
                emit(&self.interleaved);
                total_frames += frames_written;
            }
        }

        Ok(total_frames)
    }
}
