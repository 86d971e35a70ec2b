//! Input primitives
//!
//! [`ButtonInput`] and [`JoystickInput`] hold the last-known value of one
//! physical control and invoke a change callback when, and only when, a new
//! value actually differs from the previous one. Redundant writes are
//! silent, so consumers never see callback noise for unchanged state.
//!
//! The application-facing callback is registered with `on_change`; the
//! owning session additionally installs an internal observer to tap changes
//! for serialization. Both fire synchronously on the task performing the
//! update.

use parking_lot::Mutex;

/// Changes smaller than this do not count as a new value
pub const VALUE_EPSILON: f32 = 1e-6;

/// Application callback for a button: `(value, pressed)`
pub type ButtonChangedHandler = Box<dyn Fn(f32, bool) + Send + Sync>;

/// Application callback for a joystick: `(x_axis, y_axis)`
pub type JoystickChangedHandler = Box<dyn Fn(f32, f32) + Send + Sync>;

/// A single pressure-sensitive button.
///
/// `value` is in `[0, 1]`; `pressed` is the digital reading.
#[derive(Default)]
pub struct ButtonInput {
    state: Mutex<(f32, bool)>,
    handler: Mutex<Option<ButtonChangedHandler>>,
    observer: Mutex<Option<ButtonChangedHandler>>,
}

impl ButtonInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f32 {
        self.state.lock().0
    }

    pub fn pressed(&self) -> bool {
        self.state.lock().1
    }

    /// Register the application change callback, replacing any previous one
    pub fn on_change(&self, handler: impl Fn(f32, bool) + Send + Sync + 'static) {
        *self.handler.lock() = Some(Box::new(handler));
    }

    pub fn clear_on_change(&self) {
        *self.handler.lock() = None;
    }

    /// Update the button, firing callbacks only if the value moved by more
    /// than [`VALUE_EPSILON`] or the pressed flag flipped.
    pub fn set_value(&self, value: f32, pressed: bool) {
        let changed = {
            let mut state = self.state.lock();
            let changed = (state.0 - value).abs() > VALUE_EPSILON || state.1 != pressed;
            *state = (value, pressed);
            changed
        };

        if changed {
            if let Some(handler) = self.handler.lock().as_ref() {
                handler(value, pressed);
            }
            if let Some(observer) = self.observer.lock().as_ref() {
                observer(value, pressed);
            }
        }
    }

    pub(crate) fn observe(&self, observer: ButtonChangedHandler) {
        *self.observer.lock() = Some(observer);
    }

    pub(crate) fn clear_observer(&self) {
        *self.observer.lock() = None;
    }
}

/// A two-axis control (thumbstick or d-pad).
///
/// Axes are in `[-1, 1]`; the d-pad reports -1/0/1 per axis.
#[derive(Default)]
pub struct JoystickInput {
    state: Mutex<(f32, f32)>,
    handler: Mutex<Option<JoystickChangedHandler>>,
    observer: Mutex<Option<JoystickChangedHandler>>,
}

impl JoystickInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x_axis(&self) -> f32 {
        self.state.lock().0
    }

    pub fn y_axis(&self) -> f32 {
        self.state.lock().1
    }

    /// Register the application change callback, replacing any previous one
    pub fn on_change(&self, handler: impl Fn(f32, f32) + Send + Sync + 'static) {
        *self.handler.lock() = Some(Box::new(handler));
    }

    pub fn clear_on_change(&self) {
        *self.handler.lock() = None;
    }

    /// Update both axes, firing callbacks only if either moved by more than
    /// [`VALUE_EPSILON`].
    pub fn set_axes(&self, x_axis: f32, y_axis: f32) {
        let changed = {
            let mut state = self.state.lock();
            let changed =
                (state.0 - x_axis).abs() > VALUE_EPSILON || (state.1 - y_axis).abs() > VALUE_EPSILON;
            *state = (x_axis, y_axis);
            changed
        };

        if changed {
            if let Some(handler) = self.handler.lock().as_ref() {
                handler(x_axis, y_axis);
            }
            if let Some(observer) = self.observer.lock().as_ref() {
                observer(x_axis, y_axis);
            }
        }
    }

    pub(crate) fn observe(&self, observer: JoystickChangedHandler) {
        *self.observer.lock() = Some(observer);
    }

    pub(crate) fn clear_observer(&self) {
        *self.observer.lock() = None;
    }
}
