//! Protocol types and message definitions

/// Message type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0x01,
    SetName = 0x02,
    Control = 0x20,
}

impl MessageType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x01 => Some(MessageType::Hello),
            0x02 => Some(MessageType::SetName),
            0x20 => Some(MessageType::Control),
            _ => None,
        }
    }
}

/// Where a controller's input originates.
///
/// Carried in the handshake so the accepting side can report what kind of
/// device is behind each connection: an MFi controller forwarded by another
/// device, a raw HID device, or a purely remote (on-screen) controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControllerType {
    Mfi = 1,
    Hid = 2,
    Remote = 3,
}

impl ControllerType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            1 => Some(ControllerType::Mfi),
            2 => Some(ControllerType::Hid),
            3 => Some(ControllerType::Remote),
            _ => None,
        }
    }
}

/// Physical button/stick complement of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum GamepadLayout {
    /// D-pad and a single button (e.g. a TV remote)
    Micro = 1,
    /// D-pad, four face buttons, two shoulders
    #[default]
    Regular = 2,
    /// Regular plus thumbsticks and triggers
    Extended = 3,
}

impl GamepadLayout {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            1 => Some(GamepadLayout::Micro),
            2 => Some(GamepadLayout::Regular),
            3 => Some(GamepadLayout::Extended),
            _ => None,
        }
    }
}

/// Identifies one named control on a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlId {
    Dpad = 0x01,
    LeftThumbstick = 0x02,
    RightThumbstick = 0x03,
    ButtonA = 0x10,
    ButtonB = 0x11,
    ButtonX = 0x12,
    ButtonY = 0x13,
    LeftShoulder = 0x14,
    RightShoulder = 0x15,
    LeftTrigger = 0x16,
    RightTrigger = 0x17,
}

impl ControlId {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x01 => Some(ControlId::Dpad),
            0x02 => Some(ControlId::LeftThumbstick),
            0x03 => Some(ControlId::RightThumbstick),
            0x10 => Some(ControlId::ButtonA),
            0x11 => Some(ControlId::ButtonB),
            0x12 => Some(ControlId::ButtonX),
            0x13 => Some(ControlId::ButtonY),
            0x14 => Some(ControlId::LeftShoulder),
            0x15 => Some(ControlId::RightShoulder),
            0x16 => Some(ControlId::LeftTrigger),
            0x17 => Some(ControlId::RightTrigger),
            _ => None,
        }
    }

    /// Two-axis controls carry a second value on the wire
    pub fn is_joystick(&self) -> bool {
        matches!(
            self,
            ControlId::Dpad | ControlId::LeftThumbstick | ControlId::RightThumbstick
        )
    }
}

/// Connection lifecycle of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    /// Whether moving to `to` is a legal transition.
    ///
    /// Allowed: Disconnected -> Connecting -> Connected -> Disconnected,
    /// plus Connecting -> Disconnected for a failed attempt. Same-state
    /// writes are treated as no-ops by callers, not transitions.
    pub fn can_transition(&self, to: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
        )
    }
}

/// One wire update to a single named control.
///
/// Ephemeral: exists only as a message in flight and as the argument to a
/// change callback. `value2` is present for two-axis controls, `pressed`
/// for buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValue {
    pub controller_index: u16,
    pub control: ControlId,
    pub value: f32,
    pub value2: Option<f32>,
    pub pressed: Option<bool>,
    /// Microseconds since the Unix epoch, stamped by the sender
    pub timestamp: u64,
}

/// Per-connection handshake, sent once for each controller the peer streams.
///
/// Must arrive before any control data so the acceptor can assign identity.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloMessage {
    pub version: u8,
    pub controller_type: ControllerType,
    pub layout: GamepadLayout,
    /// Index the peer will tag its control values with; the acceptor
    /// assigns a roster-unique one if this collides or is absent
    pub requested_index: Option<u16>,
    pub name: Option<String>,
}

/// Renames an already-announced controller
#[derive(Debug, Clone, PartialEq)]
pub struct SetNameMessage {
    pub controller_index: u16,
    pub name: Option<String>,
}

/// All PadLink protocol messages
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(HelloMessage),
    SetName(SetNameMessage),
    Control(ControlValue),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_roundtrip() {
        for code in 0u8..=0xFF {
            if let Some(id) = ControlId::from_u8(code) {
                assert_eq!(id as u8, code);
            }
        }
        assert!(ControlId::from_u8(0x04).is_none());
        assert!(ControlId::from_u8(0x18).is_none());
    }

    #[test]
    fn test_joystick_controls() {
        assert!(ControlId::Dpad.is_joystick());
        assert!(ControlId::LeftThumbstick.is_joystick());
        assert!(!ControlId::ButtonA.is_joystick());
        assert!(!ControlId::LeftTrigger.is_joystick());
    }

    #[test]
    fn test_status_transitions() {
        use ConnectionStatus::*;
        assert!(Disconnected.can_transition(Connecting));
        assert!(Connecting.can_transition(Connected));
        assert!(Connecting.can_transition(Disconnected));
        assert!(Connected.can_transition(Disconnected));

        // Connecting may never be skipped on the way up
        assert!(!Disconnected.can_transition(Connected));
        assert!(!Connected.can_transition(Connecting));
    }
}
