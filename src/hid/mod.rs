pub mod poller;
pub mod report;

pub use poller::{ControllerPoller, DUALSENSE_PID, DUALSENSE_VID};
pub use report::{Button, ButtonSet, ControllerInputState, decode_report};
