// Controller poller - background HID read loop
//
// Owns the raw HID device on a dedicated thread: opens it by vendor/product
// id, blocks on reads with a short timeout so shutdown stays responsive,
// decodes each report, republishes the decoded state wholesale and feeds the
// button snapshot to the parameter tuner. Disconnects drop back into a retry
// loop rather than killing the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};
use crate::control::ParameterTuner;
use crate::hid::report::{self, ControllerInputState};

/// Sony Interactive Entertainment.
pub const DUALSENSE_VID: u16 = 0x054C;
/// DualSense wireless controller.
pub const DUALSENSE_PID: u16 = 0x0CE6;

/// Read timeout per attempt; bounds shutdown latency.
const READ_TIMEOUT_MS: i32 = 250;
/// Pause between open attempts while the controller is absent.
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct ControllerPoller {
    thread: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    status: AtomicDeviceStatus,
    state: Arc<RwLock<ControllerInputState>>,
}

impl ControllerPoller {
    /// Spawn the poll thread. Returns immediately; connection happens in
    /// the background and is reflected through [`ControllerPoller::status`].
    pub fn spawn(vendor_id: u16, product_id: u16, mut tuner: ParameterTuner) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let status = AtomicDeviceStatus::default();
        let state = Arc::new(RwLock::new(ControllerInputState::default()));

        let thread_running = Arc::clone(&running);
        let thread_status = status.clone();
        let thread_state = Arc::clone(&state);

        let thread = thread::spawn(move || {
            poll_loop(
                vendor_id,
                product_id,
                &thread_running,
                &thread_status,
                &thread_state,
                &mut tuner,
            );
        });

        Self {
            thread: Some(thread),
            running,
            status,
            state,
        }
    }

    pub fn status(&self) -> AtomicDeviceStatus {
        self.status.clone()
    }

    pub fn state(&self) -> Arc<RwLock<ControllerInputState>> {
        Arc::clone(&self.state)
    }

    /// Ask the poll thread to exit and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ControllerPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    vendor_id: u16,
    product_id: u16,
    running: &AtomicBool,
    status: &AtomicDeviceStatus,
    state: &RwLock<ControllerInputState>,
    tuner: &mut ParameterTuner,
) {
    // One HID backend handle for the lifetime of the thread; the library
    // allows only a single live instance per process.
    let mut api = match HidApi::new() {
        Ok(api) => api,
        Err(err) => {
            warn!(error = %err, "HID backend unavailable, controller input disabled");
            status.set(DeviceStatus::Error);
            return;
        }
    };

    while running.load(Ordering::Relaxed) {
        status.set(DeviceStatus::Searching);

        let device = match open_device(&mut api, vendor_id, product_id) {
            Some(device) => device,
            None => {
                stop_aware_sleep(running, RETRY_INTERVAL);
                continue;
            }
        };

        info!(
            vendor_id = format_args!("{vendor_id:04x}"),
            product_id = format_args!("{product_id:04x}"),
            "controller connected"
        );
        status.set(DeviceStatus::Connected);

        read_until_disconnect(&device, running, state, tuner);

        if running.load(Ordering::Relaxed) {
            warn!("controller disconnected, retrying");
            // Publish a neutral state so stale stick values never linger
            if let Ok(mut guard) = state.write() {
                *guard = ControllerInputState::default();
            }
        }
    }

    status.set(DeviceStatus::Searching);
    debug!("controller poller exiting");
}

fn open_device(api: &mut HidApi, vendor_id: u16, product_id: u16) -> Option<HidDevice> {
    if let Err(err) = api.refresh_devices() {
        debug!(error = %err, "device list refresh failed");
    }
    api.open(vendor_id, product_id).ok()
}

fn read_until_disconnect(
    device: &HidDevice,
    running: &AtomicBool,
    state: &RwLock<ControllerInputState>,
    tuner: &mut ParameterTuner,
) {
    let mut buf = [0u8; report::RAW_REPORT_LEN];

    while running.load(Ordering::Relaxed) {
        let read = match device.read_timeout(&mut buf, READ_TIMEOUT_MS) {
            Ok(0) => continue, // timeout, re-check the stop flag
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "HID read failed");
                return;
            }
        };

        let Some(decoded) = report::decode_report(&buf[..read]) else {
            continue;
        };

        tuner.apply(decoded.buttons);

        if let Ok(mut guard) = state.write() {
            *guard = decoded;
        }
    }
}

fn stop_aware_sleep(running: &AtomicBool, total: Duration) {
    let step = Duration::from_millis(50);
    let mut slept = Duration::ZERO;
    while slept < total && running.load(Ordering::Relaxed) {
        thread::sleep(step);
        slept += step;
    }
}
