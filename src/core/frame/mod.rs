//=========================================================================
// Frame Model
//=========================================================================
//
// Everything the consumer needs to draw one frame without reaching back
// into simulation state.
//
// Components:
// - `definition`: FrameDefinition and its state blocks
// - `pass`:       RenderPass, PassKind draw order, DrawCommand
// - `resource`:   referenced resources and mesh create/destroy requests
// - `pool`:       producer-side recycling of torn-down definitions
//
//=========================================================================

//=== Module Declarations =================================================

mod definition;
mod pass;
mod pool;
mod resource;

//=== Public API ==========================================================

pub use definition::{
    CameraMode, CameraState, FrameDefinition, GraphicsQuality, Mat4, PassBuilder, ShadowParams,
    Vec3, VisualState, IDENTITY,
};
pub use pass::{DrawCommand, PassKind, RenderPass};
pub use pool::{FramePool, FrameRecycler};
pub use resource::{FrameResource, FrameStamp, IndexSize, MeshData, MeshDataId, ResourceRef};
