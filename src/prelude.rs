//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_render::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Pipeline facade
pub use crate::engine::{Pipeline, PipelineBuilder, Producer};

// Configuration
pub use crate::config::{DisplayConfig, RenderLoopConfig, VSyncMode};

// Frame model
pub use crate::core::frame::{FrameDefinition, MeshData, MeshDataId, PassKind, ResourceRef};

// Loop and handoff
pub use crate::core::bridge::RenderEvent;
pub use crate::core::render_loop::{LoopState, ProducerHandle, RenderLoop};

// Input devices
pub use crate::core::input::{DeviceHandle, DeviceInput};

// Backends
pub use crate::platform::{BackendEvent, DisplayBackend, SurfaceInfo};

// Errors
pub use crate::error::{BackendError, GraphicsError, HandoffError, RenderLoopError};
