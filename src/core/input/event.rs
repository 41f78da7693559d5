//=========================================================================
// Device Input Events
//=========================================================================
//
// Payloads for input from hot-pluggable devices (gamepads, joysticks).
//
// The platform layer reports these against the OS instance id of the
// device; the render loop resolves that id to a stable `DeviceHandle`
// before forwarding the event to the producer thread.
//
//=========================================================================

//=== DeviceHandle ========================================================

/// Stable logical handle for an attached input device.
///
/// Handles are allocated from a monotonically increasing counter and are
/// never reused, even when the OS recycles its own device indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub(crate) u64);

impl DeviceHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

//=== DeviceInput =========================================================

/// A single raw input from a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceInput {
    /// Digital button pressed or released.
    Button { button: u32, pressed: bool },

    /// Analog axis moved. `value` is normalized to `-1.0..=1.0`.
    Axis { axis: u32, value: f32 },

    /// Hat switch changed. `value` is the platform's direction bitmask.
    Hat { hat: u32, value: u8 },
}

impl DeviceInput {
    /// Builds an axis event from a raw signed 16-bit reading.
    pub fn axis_from_raw(axis: u32, raw: i16) -> Self {
        let value = if raw < 0 {
            f32::from(raw) / 32768.0
        } else {
            f32::from(raw) / 32767.0
        };
        Self::Axis { axis, value }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
