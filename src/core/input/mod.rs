//=========================================================================
// Input Devices
//=========================================================================
//
// Hot-pluggable input device tracking for the render loop.
//
// Components:
// - `event`:           DeviceHandle and raw DeviceInput payloads
// - `device_registry`: OS index → stable logical handle mapping
//
//=========================================================================

//=== Module Declarations =================================================

pub mod event;
mod device_registry;

//=== Public API ==========================================================

pub use device_registry::InputDeviceRegistry;
pub use event::{DeviceHandle, DeviceInput};
