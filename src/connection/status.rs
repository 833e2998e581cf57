// Shared device status, published atomically across threads

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state of an external endpoint (audio render device or HID
/// controller). `Searching` covers both "not found yet" and "lost, retrying".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Searching = 0,
    Connected = 1,
    Error = 2,
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => DeviceStatus::Connected,
            2 => DeviceStatus::Error,
            _ => DeviceStatus::Searching,
        }
    }
}

/// Atomic wrapper to share the status between threads
#[derive(Clone)]
pub struct AtomicDeviceStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicDeviceStatus {
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> DeviceStatus {
        DeviceStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: DeviceStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == DeviceStatus::Connected
    }
}

impl Default for AtomicDeviceStatus {
    fn default() -> Self {
        Self::new(DeviceStatus::Searching)
    }
}
