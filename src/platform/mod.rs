//=========================================================================
// Platform Subsystem
//
// Window, graphics context and OS event primitives used by the render
// loop, behind one trait with an implementation per target.
//
// Architecture:
// ```text
//  Consumer Thread:
//  ┌──────────────────────────────────────────────┐
//  │  RenderLoop                                  │
//  │   ├─ poll_events() ──▶ BackendEvent batch    │
//  │   ├─ create_mesh_data / execute_pass /       │
//  │   │  destroy_mesh_data / present             │
//  │   └─ apply_config()                          │
//  │              │                               │
//  │              ▼                               │
//  │  Box<dyn DisplayBackend>                     │
//  │   ├─ WinitBackend<R: SurfaceRenderer>        │
//  │   └─ HeadlessBackend (recording)             │
//  └──────────────────────────────────────────────┘
// ```
//
// Key Design Decisions:
// - **Selected at startup**: the loop only sees `dyn DisplayBackend`
// - **Not Send**: a backend lives and dies on the consumer thread
// - **Events are pulled**: the loop pumps once per iteration, so OS events
//   are handled at one well-defined point in the frame
//
//=========================================================================

//=== Submodules ==========================================================

pub mod headless;

#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub mod desktop;

//=== Internal Imports ====================================================

use crate::config::{DisplayConfig, RenderLoopConfig};
use crate::core::frame::{FrameDefinition, MeshData, MeshDataId, RenderPass};
use crate::core::input::DeviceInput;
use crate::error::BackendError;

//=== SurfaceInfo =========================================================

/// Drawable surface state reported after creation or reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInfo {
    /// Drawable size in physical pixels.
    pub physical_size: (u32, u32),
    pub scale_factor: f64,

    /// Whether presents are actually synchronized to the display.
    pub vsync_active: bool,
}

impl SurfaceInfo {
    /// Drawable size in logical (scale-independent) units.
    pub fn logical_size(&self) -> (f64, f64) {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        (
            f64::from(self.physical_size.0) / scale,
            f64::from(self.physical_size.1) / scale,
        )
    }
}

//=== DeviceDescriptor ====================================================

/// An input device as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// OS device index. Recycled by the OS after a detach.
    pub os_index: u32,

    /// OS instance id carried by raw input events from this device.
    pub instance_id: u64,

    pub name: String,
}

//=== BackendEvent ========================================================

/// OS-level events surfaced by [`DisplayBackend::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Drawable size or scale factor changed.
    Resized {
        physical_width: u32,
        physical_height: u32,
        scale_factor: f64,
    },

    /// User or OS asked the window to close. May arrive more than once
    /// for a single user action.
    CloseRequested,

    DeviceAdded(DeviceDescriptor),
    DeviceRemoved { os_index: u32 },

    /// Raw input tagged with the OS instance id of its device.
    DeviceInput { instance_id: u64, input: DeviceInput },

    /// Window minimized, occluded or app backgrounded.
    Hidden,
    Shown,

    /// The rendering surface became invalid and must be recreated.
    SurfaceLost,
}

//=== DisplayBackend ======================================================

/// Window/context/event primitives the render loop is written against.
///
/// Every graphics call happens on the consumer thread inside its draw
/// window.
pub trait DisplayBackend {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Creates the window and graphics context.
    fn create(&mut self, config: &RenderLoopConfig) -> Result<SurfaceInfo, BackendError>;

    /// Tears down the context and window. Idempotent.
    fn destroy(&mut self);

    /// Appends every pending OS event to `out`. Never blocks.
    fn poll_events(&mut self, out: &mut Vec<BackendEvent>);

    /// Input devices attached right now.
    fn enumerate_devices(&mut self) -> Vec<DeviceDescriptor>;

    fn create_mesh_data(&mut self, mesh: &MeshData) -> Result<(), BackendError>;

    fn destroy_mesh_data(&mut self, id: MeshDataId) -> Result<(), BackendError>;

    /// Encodes and submits one render pass of `frame`.
    fn execute_pass(
        &mut self,
        frame: &FrameDefinition,
        pass: &RenderPass,
    ) -> Result<(), BackendError>;

    /// Presents the finished frame.
    fn present(&mut self) -> Result<(), BackendError>;

    /// Applies new display settings, rebuilding the surface if needed.
    fn apply_config(&mut self, config: &DisplayConfig) -> Result<SurfaceInfo, BackendError>;

    fn supports_fullscreen(&self) -> bool {
        false
    }

    fn supports_vsync(&self) -> bool {
        false
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_size_divides_by_scale() {
        let info = SurfaceInfo {
            physical_size: (1600, 1200),
            scale_factor: 2.0,
            vsync_active: false,
        };
        assert_eq!(info.logical_size(), (800.0, 600.0));
    }

    #[test]
    fn logical_size_tolerates_bogus_scale() {
        let info = SurfaceInfo {
            physical_size: (640, 480),
            scale_factor: 0.0,
            vsync_active: false,
        };
        assert_eq!(info.logical_size(), (640.0, 480.0));
    }
}
