use std::sync::{Arc, RwLock};

use crate::audio::parameters::HapticParams;
use crate::audio::pipeline::PipelineHandle;
use crate::connection::status::AtomicDeviceStatus;
use crate::hid::report::ControllerInputState;

/// Shared state behind every HTTP handler.
///
/// Everything in here is a cheap handle: atomics, an `Arc`'d lock and the
/// engine-thread channel. Cloning per request costs nothing.
#[derive(Clone)]
pub struct AppState {
    pub params: HapticParams,
    pub pipeline: Arc<PipelineHandle>,
    pub controller_state: Arc<RwLock<ControllerInputState>>,
    pub controller_status: AtomicDeviceStatus,
    pub endpoint_filter: String,
}
