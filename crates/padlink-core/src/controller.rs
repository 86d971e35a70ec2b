//! The controller aggregate
//!
//! A [`Controller`] is the logical image of one physical input device: ten
//! input primitives plus identity and connection status. It has no
//! networking knowledge; the owning session mutates it by applying decoded
//! [`ControlValue`]s, and the consuming application observes it through the
//! per-control `on_change` callbacks.

use crate::input::{ButtonInput, JoystickInput};
use crate::types::{ConnectionStatus, ControlId, ControlValue, GamepadLayout};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Sink receiving every control change on a controller, used by the sending
/// side to serialize local input onto the wire
pub type ControlSink = Arc<dyn Fn(ControlValue) + Send + Sync>;

pub struct Controller {
    index: u16,
    name: RwLock<Option<String>>,
    layout: RwLock<GamepadLayout>,
    status: RwLock<ConnectionStatus>,

    pub dpad: JoystickInput,

    pub button_a: ButtonInput,
    pub button_b: ButtonInput,
    pub button_x: ButtonInput,
    pub button_y: ButtonInput,

    pub left_thumbstick: JoystickInput,
    pub right_thumbstick: JoystickInput,

    pub left_shoulder: ButtonInput,
    pub right_shoulder: ButtonInput,
    pub left_trigger: ButtonInput,
    pub right_trigger: ButtonInput,
}

impl Controller {
    /// Create a disconnected controller with the given roster index
    pub fn new(index: u16) -> Self {
        Self {
            index,
            name: RwLock::new(None),
            layout: RwLock::new(GamepadLayout::default()),
            status: RwLock::new(ConnectionStatus::Disconnected),
            dpad: JoystickInput::new(),
            button_a: ButtonInput::new(),
            button_b: ButtonInput::new(),
            button_x: ButtonInput::new(),
            button_y: ButtonInput::new(),
            left_thumbstick: JoystickInput::new(),
            right_thumbstick: JoystickInput::new(),
            left_shoulder: ButtonInput::new(),
            right_shoulder: ButtonInput::new(),
            left_trigger: ButtonInput::new(),
            right_trigger: ButtonInput::new(),
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        *self.name.write() = Some(name.into());
        self
    }

    pub fn with_layout(self, layout: GamepadLayout) -> Self {
        *self.layout.write() = layout;
        self
    }

    /// Initial status for controllers born connected (acceptor side)
    pub fn with_status(self, status: ConnectionStatus) -> Self {
        *self.status.write() = status;
        self
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        *self.name.write() = name;
    }

    pub fn layout(&self) -> GamepadLayout {
        *self.layout.read()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Move the controller along the connection state machine.
    ///
    /// Writing the current status again is a no-op; an illegal transition
    /// is rejected without changing state.
    pub fn set_status(&self, to: ConnectionStatus) -> Result<()> {
        let mut status = self.status.write();
        if *status == to {
            return Ok(());
        }
        if !status.can_transition(to) {
            return Err(Error::InvalidTransition { from: *status, to });
        }
        *status = to;
        Ok(())
    }

    /// Apply one decoded control value to the matching input primitive.
    ///
    /// The primitive's change-only policy decides whether callbacks fire.
    pub fn apply(&self, cv: &ControlValue) -> Result<()> {
        if cv.controller_index != self.index {
            return Err(Error::IndexMismatch {
                expected: self.index,
                got: cv.controller_index,
            });
        }

        match cv.control {
            ControlId::Dpad => self.dpad.set_axes(cv.value, cv.value2.unwrap_or(0.0)),
            ControlId::LeftThumbstick => {
                self.left_thumbstick.set_axes(cv.value, cv.value2.unwrap_or(0.0))
            }
            ControlId::RightThumbstick => {
                self.right_thumbstick.set_axes(cv.value, cv.value2.unwrap_or(0.0))
            }
            ControlId::ButtonA => self.button_a.set_value(cv.value, cv.pressed_or_inferred()),
            ControlId::ButtonB => self.button_b.set_value(cv.value, cv.pressed_or_inferred()),
            ControlId::ButtonX => self.button_x.set_value(cv.value, cv.pressed_or_inferred()),
            ControlId::ButtonY => self.button_y.set_value(cv.value, cv.pressed_or_inferred()),
            ControlId::LeftShoulder => {
                self.left_shoulder.set_value(cv.value, cv.pressed_or_inferred())
            }
            ControlId::RightShoulder => {
                self.right_shoulder.set_value(cv.value, cv.pressed_or_inferred())
            }
            ControlId::LeftTrigger => {
                self.left_trigger.set_value(cv.value, cv.pressed_or_inferred())
            }
            ControlId::RightTrigger => {
                self.right_trigger.set_value(cv.value, cv.pressed_or_inferred())
            }
        }

        Ok(())
    }

    /// Install an observer on every input primitive that emits a
    /// [`ControlValue`] tagged with this controller's index for each change.
    ///
    /// Used by the sending side to turn local input into wire messages.
    /// Replaces any previously installed sink.
    pub fn observe(&self, sink: ControlSink) {
        let index = self.index;

        let joystick = |control: ControlId| {
            let sink = sink.clone();
            move |x: f32, y: f32| {
                sink(ControlValue {
                    controller_index: index,
                    control,
                    value: x,
                    value2: Some(y),
                    pressed: None,
                    timestamp: crate::now(),
                })
            }
        };
        let button = |control: ControlId| {
            let sink = sink.clone();
            move |value: f32, pressed: bool| {
                sink(ControlValue {
                    controller_index: index,
                    control,
                    value,
                    value2: None,
                    pressed: Some(pressed),
                    timestamp: crate::now(),
                })
            }
        };

        self.dpad.observe(Box::new(joystick(ControlId::Dpad)));
        self.left_thumbstick
            .observe(Box::new(joystick(ControlId::LeftThumbstick)));
        self.right_thumbstick
            .observe(Box::new(joystick(ControlId::RightThumbstick)));

        self.button_a.observe(Box::new(button(ControlId::ButtonA)));
        self.button_b.observe(Box::new(button(ControlId::ButtonB)));
        self.button_x.observe(Box::new(button(ControlId::ButtonX)));
        self.button_y.observe(Box::new(button(ControlId::ButtonY)));
        self.left_shoulder
            .observe(Box::new(button(ControlId::LeftShoulder)));
        self.right_shoulder
            .observe(Box::new(button(ControlId::RightShoulder)));
        self.left_trigger
            .observe(Box::new(button(ControlId::LeftTrigger)));
        self.right_trigger
            .observe(Box::new(button(ControlId::RightTrigger)));
    }

    /// Remove the sink installed by [`observe`](Self::observe)
    pub fn clear_observers(&self) {
        self.dpad.clear_observer();
        self.left_thumbstick.clear_observer();
        self.right_thumbstick.clear_observer();
        self.button_a.clear_observer();
        self.button_b.clear_observer();
        self.button_x.clear_observer();
        self.button_y.clear_observer();
        self.left_shoulder.clear_observer();
        self.right_shoulder.clear_observer();
        self.left_trigger.clear_observer();
        self.right_trigger.clear_observer();
    }
}

impl ControlValue {
    /// Digital reading for buttons whose sender omitted the pressed flag
    fn pressed_or_inferred(&self) -> bool {
        self.pressed
            .unwrap_or((self.value - 1.0).abs() < crate::VALUE_EPSILON)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("index", &self.index)
            .field("name", &*self.name.read())
            .field("layout", &*self.layout.read())
            .field("status", &*self.status.read())
            .finish()
    }
}
