// Raw input report decoding
//
// Fixed byte-offset layout of the controller's USB input report. This is a
// hard external contract; getting any offset wrong decodes the physical
// device incorrectly:
//
//   byte 1..=4   four stick axes, 0-255, zero-centered at 128
//   byte 8       bits 0-3: directional hat (0-7 clockwise from up),
//                bits 4-7: Square, Cross, Circle, Triangle
//   byte 9       bits 0-7: L1, R1, L2, R2, Create, Options, L3, R3
//   byte 10      bits 0-1: PS, Touchpad

use serde::Serialize;

/// Stick deflections below this fraction of full scale are reported as
/// exactly zero to suppress idle jitter.
pub const STICK_DEADZONE: f32 = 0.05;

/// Shortest report that still contains every field we decode.
pub const REPORT_MIN_LEN: usize = 11;

/// Size of the raw report snapshot kept alongside the decoded state.
pub const RAW_REPORT_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Button {
    DpadUp,
    DpadRight,
    DpadDown,
    DpadLeft,
    Square,
    Cross,
    Circle,
    Triangle,
    L1,
    R1,
    L2,
    R2,
    Create,
    Options,
    L3,
    R3,
    Ps,
    Touchpad,
}

impl Button {
    pub const ALL: [Button; 18] = [
        Button::DpadUp,
        Button::DpadRight,
        Button::DpadDown,
        Button::DpadLeft,
        Button::Square,
        Button::Cross,
        Button::Circle,
        Button::Triangle,
        Button::L1,
        Button::R1,
        Button::L2,
        Button::R2,
        Button::Create,
        Button::Options,
        Button::L3,
        Button::R3,
        Button::Ps,
        Button::Touchpad,
    ];

    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::DpadUp => "DpadUp",
            Button::DpadRight => "DpadRight",
            Button::DpadDown => "DpadDown",
            Button::DpadLeft => "DpadLeft",
            Button::Square => "Square",
            Button::Cross => "Cross",
            Button::Circle => "Circle",
            Button::Triangle => "Triangle",
            Button::L1 => "L1",
            Button::R1 => "R1",
            Button::L2 => "L2",
            Button::R2 => "R2",
            Button::Create => "Create",
            Button::Options => "Options",
            Button::L3 => "L3",
            Button::R3 => "R3",
            Button::Ps => "PS",
            Button::Touchpad => "Touchpad",
        }
    }
}

/// Set of currently pressed buttons (membership only, no ordering).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonSet(u32);

impl ButtonSet {
    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Buttons present in `self` but not in `other`.
    pub fn difference(self, other: ButtonSet) -> ButtonSet {
        ButtonSet(self.0 & !other.0)
    }

    pub fn names(self) -> Vec<&'static str> {
        Button::ALL
            .iter()
            .filter(|b| self.contains(**b))
            .map(|b| b.name())
            .collect()
    }
}

/// Decoded controller state, rebuilt wholesale from every report.
#[derive(Debug, Clone)]
pub struct ControllerInputState {
    /// lsX, lsY, rsX, rsY in [-1, 1], deadzone applied.
    pub sticks: [f32; 4],
    pub buttons: ButtonSet,
    pub raw: [u8; RAW_REPORT_LEN],
}

impl Default for ControllerInputState {
    fn default() -> Self {
        Self {
            sticks: [0.0; 4],
            buttons: ButtonSet::default(),
            raw: [0; RAW_REPORT_LEN],
        }
    }
}

/// Normalize a raw axis byte and apply the deadzone.
#[inline]
fn normalize_axis(raw: u8) -> f32 {
    let value = (raw as f32 - 128.0) / 128.0;
    if value.abs() < STICK_DEADZONE { 0.0 } else { value }
}

/// Decode one raw input report. Returns `None` for truncated reports.
pub fn decode_report(data: &[u8]) -> Option<ControllerInputState> {
    if data.len() < REPORT_MIN_LEN {
        return None;
    }

    let sticks = [
        normalize_axis(data[1]),
        normalize_axis(data[2]),
        normalize_axis(data[3]),
        normalize_axis(data[4]),
    ];

    let mut buttons = ButtonSet::default();

    // Hat: 0-7 clockwise starting at up, anything above 7 means released
    match data[8] & 0x0F {
        0 => buttons.insert(Button::DpadUp),
        1 => {
            buttons.insert(Button::DpadUp);
            buttons.insert(Button::DpadRight);
        }
        2 => buttons.insert(Button::DpadRight),
        3 => {
            buttons.insert(Button::DpadRight);
            buttons.insert(Button::DpadDown);
        }
        4 => buttons.insert(Button::DpadDown),
        5 => {
            buttons.insert(Button::DpadDown);
            buttons.insert(Button::DpadLeft);
        }
        6 => buttons.insert(Button::DpadLeft),
        7 => {
            buttons.insert(Button::DpadLeft);
            buttons.insert(Button::DpadUp);
        }
        _ => {}
    }

    let face = data[8];
    if face & 0x10 != 0 {
        buttons.insert(Button::Square);
    }
    if face & 0x20 != 0 {
        buttons.insert(Button::Cross);
    }
    if face & 0x40 != 0 {
        buttons.insert(Button::Circle);
    }
    if face & 0x80 != 0 {
        buttons.insert(Button::Triangle);
    }

    let shoulder = data[9];
    for (bit, button) in [
        Button::L1,
        Button::R1,
        Button::L2,
        Button::R2,
        Button::Create,
        Button::Options,
        Button::L3,
        Button::R3,
    ]
    .iter()
    .enumerate()
    {
        if shoulder & (1 << bit) != 0 {
            buttons.insert(*button);
        }
    }

    let system = data[10];
    if system & 0x01 != 0 {
        buttons.insert(Button::Ps);
    }
    if system & 0x02 != 0 {
        buttons.insert(Button::Touchpad);
    }

    let mut raw = [0u8; RAW_REPORT_LEN];
    let len = data.len().min(RAW_REPORT_LEN);
    raw[..len].copy_from_slice(&data[..len]);

    Some(ControllerInputState {
        sticks,
        buttons,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(sticks: [u8; 4], b8: u8, b9: u8, b10: u8) -> [u8; 12] {
        let mut data = [0u8; 12];
        data[0] = 0x01; // report id
        data[1..5].copy_from_slice(&sticks);
        data[8] = b8;
        data[9] = b9;
        data[10] = b10;
        data
    }

    fn neutral() -> [u8; 12] {
        report_with([128; 4], 0x08, 0, 0)
    }

    #[test]
    fn test_truncated_report_rejected() {
        assert!(decode_report(&[0u8; 10]).is_none());
        assert!(decode_report(&[]).is_none());
        assert!(decode_report(&neutral()).is_some());
    }

    #[test]
    fn test_centered_sticks_decode_to_zero() {
        let state = decode_report(&neutral()).unwrap();
        assert_eq!(state.sticks, [0.0; 4]);
        assert!(state.buttons.is_empty());
    }

    #[test]
    fn test_deadzone_boundary() {
        // 6/128 = 0.0469 < 0.05 -> forced to zero
        let state = decode_report(&report_with([134, 122, 128, 128], 0x08, 0, 0)).unwrap();
        assert_eq!(state.sticks[0], 0.0);
        assert_eq!(state.sticks[1], 0.0);

        // 7/128 = 0.0547 >= 0.05 -> passes through unmodified
        let state = decode_report(&report_with([135, 121, 128, 128], 0x08, 0, 0)).unwrap();
        assert_eq!(state.sticks[0], 7.0 / 128.0);
        assert_eq!(state.sticks[1], -7.0 / 128.0);
    }

    #[test]
    fn test_full_deflection() {
        let state = decode_report(&report_with([0, 255, 0, 255], 0x08, 0, 0)).unwrap();
        assert_eq!(state.sticks[0], -1.0);
        assert_eq!(state.sticks[1], 127.0 / 128.0);
    }

    #[test]
    fn test_hat_directions() {
        let up = decode_report(&report_with([128; 4], 0x00, 0, 0)).unwrap();
        assert!(up.buttons.contains(Button::DpadUp));
        assert!(!up.buttons.contains(Button::DpadRight));

        let up_right = decode_report(&report_with([128; 4], 0x01, 0, 0)).unwrap();
        assert!(up_right.buttons.contains(Button::DpadUp));
        assert!(up_right.buttons.contains(Button::DpadRight));

        let left_up = decode_report(&report_with([128; 4], 0x07, 0, 0)).unwrap();
        assert!(left_up.buttons.contains(Button::DpadLeft));
        assert!(left_up.buttons.contains(Button::DpadUp));

        let released = decode_report(&report_with([128; 4], 0x08, 0, 0)).unwrap();
        assert!(!released.buttons.contains(Button::DpadUp));
        assert!(!released.buttons.contains(Button::DpadLeft));
    }

    #[test]
    fn test_face_buttons() {
        let state = decode_report(&report_with([128; 4], 0x08 | 0x10 | 0x80, 0, 0)).unwrap();
        assert!(state.buttons.contains(Button::Square));
        assert!(state.buttons.contains(Button::Triangle));
        assert!(!state.buttons.contains(Button::Cross));
        assert!(!state.buttons.contains(Button::Circle));
    }

    #[test]
    fn test_shoulder_and_system_buttons() {
        let state = decode_report(&report_with([128; 4], 0x08, 0b0010_0011, 0x03)).unwrap();
        assert!(state.buttons.contains(Button::L1));
        assert!(state.buttons.contains(Button::R1));
        assert!(state.buttons.contains(Button::Options));
        assert!(!state.buttons.contains(Button::L2));
        assert!(state.buttons.contains(Button::Ps));
        assert!(state.buttons.contains(Button::Touchpad));
    }

    #[test]
    fn test_raw_snapshot_preserved() {
        let mut data = neutral();
        data[11] = 0xAB;
        let state = decode_report(&data).unwrap();
        assert_eq!(state.raw[0], 0x01);
        assert_eq!(state.raw[11], 0xAB);
        assert_eq!(state.raw[12], 0);
    }

    #[test]
    fn test_button_set_difference() {
        let mut a = ButtonSet::default();
        a.insert(Button::R1);
        a.insert(Button::Cross);

        let mut b = ButtonSet::default();
        b.insert(Button::Cross);

        let diff = a.difference(b);
        assert!(diff.contains(Button::R1));
        assert!(!diff.contains(Button::Cross));
    }

    #[test]
    fn test_button_names() {
        let mut set = ButtonSet::default();
        set.insert(Button::Ps);
        set.insert(Button::DpadUp);
        let names = set.names();
        assert!(names.contains(&"PS"));
        assert!(names.contains(&"DpadUp"));
        assert_eq!(names.len(), 2);
    }
}
