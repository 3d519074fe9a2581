use crate::error::{BatteryError, Result};

/// Stick deflection below this magnitude is treated as centered.
pub const DEAD_ZONE: f32 = 0.1;

/// One 2-axis analog reading, taken once per tick and shared by every
/// consumer so the pointer and a chased target never see different values
/// within the same tick. Components are in [-1.0, 1.0] after dead-zoning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSample {
    pub x: f32,
    pub y: f32,
}

impl AxisSample {
    /// Builds a sample from raw axis values, zeroing anything inside the
    /// dead zone.
    pub fn from_raw(x: f32, y: f32) -> Self {
        let x = if x.abs() < DEAD_ZONE { 0.0 } else { x };
        let y = if y.abs() < DEAD_ZONE { 0.0 } else { y };
        Self { x, y }
    }

    /// True when the stick is at rest on both axes.
    pub fn is_centered(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Source of the per-tick analog sample. The engine polls this exactly once
/// per tick and treats the result as read-only.
pub trait AnalogInput {
    fn sample(&mut self) -> AxisSample;
}

/// Keyboard-backed axes for hosts without a physical stick: arrow keys act
/// as full deflection on the corresponding axis. State is driven by the
/// window event loop.
#[derive(Debug, Default)]
pub struct KeyboardAxes {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl KeyboardAxes {
    /// Opens the default input backend, failing when the host exposes no
    /// way to produce axis samples.
    pub fn open(has_event_source: bool) -> Result<Self> {
        if !has_event_source {
            return Err(BatteryError::NoInputDeviceDetected);
        }
        Ok(Self::default())
    }

    pub fn set_left(&mut self, held: bool) {
        self.left = held;
    }

    pub fn set_right(&mut self, held: bool) {
        self.right = held;
    }

    pub fn set_up(&mut self, held: bool) {
        self.up = held;
    }

    pub fn set_down(&mut self, held: bool) {
        self.down = held;
    }
}

impl AnalogInput for KeyboardAxes {
    fn sample(&mut self) -> AxisSample {
        let x = (self.right as i8 - self.left as i8) as f32;
        let y = (self.down as i8 - self.up as i8) as f32;
        AxisSample::from_raw(x, y)
    }
}
