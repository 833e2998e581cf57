// Haptic bridge - routes desktop audio into a game controller's actuators
//
// The signal path: loopback capture of whatever the desktop plays, optional
// resampling to the controller's render rate, low-pass + gain + clip, then
// mapping onto channels 2/3 of the controller's multi-channel audio
// endpoint. A parallel HID thread decodes the controller's own input
// reports so its buttons can tune the signal path live, and a small HTTP
// API exposes the same knobs to external clients.

pub mod audio;
pub mod connection;
pub mod control;
pub mod dsp;
pub mod hid;
pub mod server;

pub use audio::parameters::{HapticMode, HapticParams};
pub use audio::pipeline::{HapticPipeline, PipelineError, PipelineHandle};
pub use connection::status::{AtomicDeviceStatus, DeviceStatus};
pub use control::{EdgeDetector, ParameterTuner};
pub use hid::{ControllerPoller, decode_report};
