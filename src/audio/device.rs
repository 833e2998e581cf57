// Render endpoint discovery
//
// The controller shows up among the regular audio render endpoints; it is
// located by a case-insensitive name substring ("Wireless Controller" by
// default) and must expose at least four channels, otherwise its actuator
// slots do not exist and the OS is presenting it in plain stereo mode.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use crate::audio::format::SampleEncoding;

/// Minimum channel count for a usable actuator endpoint.
pub const MIN_ACTUATOR_CHANNELS: u16 = 4;

/// What `/status` reports about the render endpoint: its name plus the
/// channel count, rate and encoding a pipeline start would get. `encoding`
/// is `None` when the endpoint's native format is one we cannot render to.
#[derive(Clone, Debug)]
pub struct RenderEndpointInfo {
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub encoding: Option<SampleEncoding>,
}

pub struct RenderEndpointFinder {
    host: Host,
    name_filter: String,
}

impl RenderEndpointFinder {
    pub fn new(name_filter: impl Into<String>) -> Self {
        Self {
            host: cpal::default_host(),
            name_filter: name_filter.into().to_lowercase(),
        }
    }

    /// Find the first active render endpoint whose name contains the filter.
    pub fn find(&self) -> Option<Device> {
        let devices = self.host.output_devices().ok()?;
        for device in devices {
            if let Ok(name) = device.name()
                && name.to_lowercase().contains(&self.name_filter)
            {
                return Some(device);
            }
        }
        None
    }

    /// Non-destructive probe used by status polling.
    pub fn probe(&self) -> Option<RenderEndpointInfo> {
        let device = self.find()?;
        let name = device.name().ok()?;
        let config = device.default_output_config().ok()?;

        if config.channels() < MIN_ACTUATOR_CHANNELS {
            tracing::warn!(
                device = %name,
                channels = config.channels(),
                "controller endpoint found but not in multi-channel mode; \
                 reconfigure it to quadraphonic output"
            );
        }

        Some(RenderEndpointInfo {
            name,
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
            encoding: SampleEncoding::from_sample_format(config.sample_format()),
        })
    }

    /// The loopback side: an input stream opened on the default render
    /// device captures whatever the desktop is playing (WASAPI convention).
    pub fn loopback_device(&self) -> Option<Device> {
        self.host.default_output_device()
    }

    /// Plain capture for hosts that refuse to open a loopback stream.
    pub fn fallback_input_device(&self) -> Option<Device> {
        self.host.default_input_device()
    }
}
