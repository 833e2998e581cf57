// Haptic pipeline - capture -> (resample) -> process -> map -> render
//
// # Format support
//
// The render side is built generically over the endpoint's native sample
// format (F32 or I16); processing happens in f32 and conversion occurs at
// the moment of writing the output buffer, without allocation. The capture
// side accepts any format cpal can deliver and converts to f32 on the way
// into the ring.
//
// # Threading
//
// cpal's `Stream` is not `Send` (CoreAudio), so the pipeline itself lives on
// a dedicated engine thread owned by `PipelineHandle`; the HTTP handlers
// talk to it over a command/reply channel. Inside the audio callbacks:
// no allocations, no I/O, no blocking locks.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::audio::device::{MIN_ACTUATOR_CHANNELS, RenderEndpointFinder};
use crate::audio::mapper::ChannelMapper;
use crate::audio::parameters::HapticParams;
use crate::audio::processor::{FrameConsumer, FrameProducer, SignalProcessor, frame_channel};
use crate::audio::resampler::StereoResampler;
use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};

/// Frames of backlog between the capture and render callbacks
/// (about 680 ms at 48 kHz; render overruns simply drop the excess).
const FRAME_RING_CAPACITY: usize = 1 << 15;

/// Internal FFT block of the resampler, in input frames.
const RESAMPLER_BLOCK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("haptic pipeline is already running")]
    AlreadyRunning,

    #[error("no render endpoint matching \"{0}\" found; connect the controller via USB")]
    RenderEndpointNotFound(String),

    #[error(
        "render endpoint \"{name}\" exposes {channels} channels but at least {min} are \
         required; switch it to quadraphonic output"
    )]
    NotEnoughChannels {
        name: String,
        channels: u16,
        min: u16,
    },

    #[error("unsupported render sample format {0:?}")]
    UnsupportedSampleFormat(SampleFormat),

    #[error("no capture device available for loopback")]
    NoCaptureDevice,

    #[error("failed to query stream configuration: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to construct resampler: {0}")]
    Resampler(#[from] rubato::ResamplerConstructionError),

    #[error("audio engine thread is gone")]
    EngineGone,
}

struct RunningStreams {
    capture: Stream,
    render: Stream,
}

pub struct HapticPipeline {
    params: HapticParams,
    finder: RenderEndpointFinder,
    endpoint_filter: String,
    status: AtomicDeviceStatus,
    running: Option<RunningStreams>,
}

impl HapticPipeline {
    pub fn new(
        params: HapticParams,
        endpoint_filter: impl Into<String>,
        status: AtomicDeviceStatus,
    ) -> Self {
        let endpoint_filter = endpoint_filter.into();
        Self {
            params,
            finder: RenderEndpointFinder::new(endpoint_filter.clone()),
            endpoint_filter,
            status,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Wire and start both streams. Returns once capture and render are
    /// running; every session starts from fresh filter, tone and ring state.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.running.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        let render_device = self
            .finder
            .find()
            .ok_or_else(|| PipelineError::RenderEndpointNotFound(self.endpoint_filter.clone()))?;
        let render_name = render_device.name().unwrap_or_else(|_| "Unknown".to_string());
        let render_config = render_device.default_output_config()?;

        if render_config.channels() < MIN_ACTUATOR_CHANNELS {
            return Err(PipelineError::NotEnoughChannels {
                name: render_name,
                channels: render_config.channels(),
                min: MIN_ACTUATOR_CHANNELS,
            });
        }

        let render_rate = render_config.sample_rate().0;
        let render_channels = render_config.channels() as usize;

        tracing::info!(
            render = %render_name,
            render_rate,
            render_channels,
            render_format = ?render_config.sample_format(),
            "starting haptic pipeline"
        );

        let (capture, consumer) = self.open_capture(render_rate)?;

        let processor = SignalProcessor::new(consumer, render_rate as f32, self.params.clone());
        let mapper = ChannelMapper::new(render_channels);

        let render = match render_config.sample_format() {
            SampleFormat::F32 => Self::build_render_stream::<f32>(
                &render_device,
                &render_config.config(),
                processor,
                mapper,
                self.status.clone(),
            ),
            SampleFormat::I16 => Self::build_render_stream::<i16>(
                &render_device,
                &render_config.config(),
                processor,
                mapper,
                self.status.clone(),
            ),
            other => Err(PipelineError::UnsupportedSampleFormat(other)),
        }?;

        capture.play()?;
        render.play()?;

        self.status.set(DeviceStatus::Connected);
        self.running = Some(RunningStreams { capture, render });
        Ok(())
    }

    /// Halt capture and render. Synchronous: after this returns, no callback
    /// runs anymore and the device can be discarded or reconfigured.
    pub fn stop(&mut self) {
        if let Some(streams) = self.running.take() {
            let _ = streams.capture.pause();
            let _ = streams.render.pause();
            drop(streams);
            tracing::info!("haptic pipeline stopped");
        }
        self.status.set(DeviceStatus::Searching);
    }

    /// Open the capture side: loopback on the default render device first,
    /// and when the host cannot build that stream (non-WASAPI backends
    /// typically reject an input stream on an output device), retry on the
    /// default input device.
    fn open_capture(&self, render_rate: u32) -> Result<(Stream, FrameConsumer), PipelineError> {
        if let Some(device) = self.finder.loopback_device() {
            match Self::capture_on(
                &device,
                device.default_output_config(),
                render_rate,
                self.status.clone(),
            ) {
                Ok(pair) => return Ok(pair),
                Err(err) => {
                    tracing::warn!(
                        "loopback capture unavailable ({err}); trying the default input device"
                    );
                }
            }
        }

        let device = self
            .finder
            .fallback_input_device()
            .ok_or(PipelineError::NoCaptureDevice)?;
        Self::capture_on(
            &device,
            device.default_input_config(),
            render_rate,
            self.status.clone(),
        )
    }

    /// Build a capture stream on one specific device, resampling to the
    /// render rate when the rates differ. Every attempt gets its own frame
    /// ring: the producer is consumed by the stream closure, so a failed
    /// attempt leaves nothing behind.
    fn capture_on(
        device: &Device,
        config: Result<cpal::SupportedStreamConfig, cpal::DefaultStreamConfigError>,
        render_rate: u32,
        status: AtomicDeviceStatus,
    ) -> Result<(Stream, FrameConsumer), PipelineError> {
        let config = config?;
        let capture_rate = config.sample_rate().0;
        let capture_channels = config.channels() as usize;

        let (producer, consumer) = frame_channel(FRAME_RING_CAPACITY);

        // Resampling only when the rates actually differ
        let resampler = if capture_rate != render_rate {
            Some(StereoResampler::new(capture_rate, render_rate, RESAMPLER_BLOCK)?)
        } else {
            None
        };

        tracing::info!(
            capture_rate,
            capture_channels,
            resampling = resampler.is_some(),
            "opening capture stream"
        );

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::build_capture_stream::<f32>(
                device,
                &config.config(),
                capture_channels,
                producer,
                resampler,
                status,
            ),
            SampleFormat::I16 => Self::build_capture_stream::<i16>(
                device,
                &config.config(),
                capture_channels,
                producer,
                resampler,
                status,
            ),
            SampleFormat::U16 => Self::build_capture_stream::<u16>(
                device,
                &config.config(),
                capture_channels,
                producer,
                resampler,
                status,
            ),
            other => Err(PipelineError::UnsupportedSampleFormat(other)),
        }?;

        Ok((stream, consumer))
    }

    /// Capture callback: convert to f32, keep the first two channels, feed
    /// the resampler when present, push whole stereo frames into the ring.
    fn build_capture_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut producer: FrameProducer,
        mut resampler: Option<StereoResampler>,
        status: AtomicDeviceStatus,
    ) -> Result<Stream, PipelineError>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        use ringbuf::traits::Producer;

        let mut scratch: Vec<f32> = Vec::with_capacity(RESAMPLER_BLOCK * 2);

        let stream = device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                match &mut resampler {
                    Some(resampler) => {
                        scratch.clear();
                        for frame in data.chunks(channels) {
                            let (left, right) = stereo_of(frame);
                            scratch.push(left);
                            scratch.push(right);
                        }
                        let result = resampler.process(&scratch, &mut |out| {
                            for pair in out.chunks_exact(2) {
                                // Ring full: render side is behind, drop the rest
                                let _ = producer.try_push((pair[0], pair[1]));
                            }
                        });
                        if let Err(e) = result {
                            tracing::warn!("capture resampling failed: {e}");
                        }
                    }
                    None => {
                        for frame in data.chunks(channels) {
                            let _ = producer.try_push(stereo_of(frame));
                        }
                    }
                }
            },
            move |err| {
                tracing::error!("capture stream error: {err}");
                status.set(DeviceStatus::Error);
            },
            None,
        )?;
        Ok(stream)
    }

    /// Render callback: let the mapper pull processed samples and serialize
    /// them into the endpoint's native format.
    fn build_render_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut processor: SignalProcessor,
        mut mapper: ChannelMapper,
        status: AtomicDeviceStatus,
    ) -> Result<Stream, PipelineError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mapper.map_into(&mut processor, data);
            },
            move |err| {
                tracing::error!("render stream error: {err}");
                status.set(DeviceStatus::Error);
            },
            None,
        )?;
        Ok(stream)
    }
}

impl Drop for HapticPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// First two channels of an interleaved frame, mono duplicated when needed.
#[inline]
fn stereo_of<T>(frame: &[T]) -> (f32, f32)
where
    T: SizedSample,
    f32: FromSample<T>,
{
    match frame {
        [] => (0.0, 0.0),
        [mono] => {
            let s = f32::from_sample(*mono);
            (s, s)
        }
        [left, right, ..] => (f32::from_sample(*left), f32::from_sample(*right)),
    }
}

enum EngineRequest {
    Start(mpsc::Sender<Result<(), PipelineError>>),
    Stop(mpsc::Sender<()>),
    IsRunning(mpsc::Sender<bool>),
    Shutdown,
}

/// Owning handle to the engine thread.
///
/// All methods are synchronous and safe to call from any thread; they block
/// until the engine has actually performed the request, which gives `stop`
/// its "no callbacks after return" guarantee.
pub struct PipelineHandle {
    tx: mpsc::Sender<EngineRequest>,
    thread: Option<JoinHandle<()>>,
    status: AtomicDeviceStatus,
}

impl PipelineHandle {
    pub fn spawn(params: HapticParams, endpoint_filter: impl Into<String>) -> Self {
        let endpoint_filter = endpoint_filter.into();
        let (tx, rx) = mpsc::channel::<EngineRequest>();
        let status = AtomicDeviceStatus::default();
        let engine_status = status.clone();

        // `Stream` is !Send: the pipeline is built and lives entirely on the
        // engine thread.
        let thread = thread::spawn(move || {
            let mut pipeline = HapticPipeline::new(params, endpoint_filter, engine_status);
            while let Ok(request) = rx.recv() {
                match request {
                    EngineRequest::Start(reply) => {
                        let _ = reply.send(pipeline.start());
                    }
                    EngineRequest::Stop(reply) => {
                        pipeline.stop();
                        let _ = reply.send(());
                    }
                    EngineRequest::IsRunning(reply) => {
                        let _ = reply.send(pipeline.is_running());
                    }
                    EngineRequest::Shutdown => {
                        pipeline.stop();
                        break;
                    }
                }
            }
        });

        Self {
            tx,
            thread: Some(thread),
            status,
        }
    }

    pub fn start(&self) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(EngineRequest::Start(reply_tx))
            .map_err(|_| PipelineError::EngineGone)?;
        reply_rx.recv().map_err(|_| PipelineError::EngineGone)?
    }

    pub fn stop(&self) -> Result<(), PipelineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(EngineRequest::Stop(reply_tx))
            .map_err(|_| PipelineError::EngineGone)?;
        reply_rx.recv().map_err(|_| PipelineError::EngineGone)
    }

    pub fn is_running(&self) -> bool {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(EngineRequest::IsRunning(reply_tx)).is_err() {
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }

    pub fn status(&self) -> AtomicDeviceStatus {
        self.status.clone()
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineRequest::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
