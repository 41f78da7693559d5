//=========================================================================
// Frame Resources
//=========================================================================
//
// Handles a FrameDefinition uses to keep GPU-side data alive and to
// schedule its creation/destruction on the consumer thread.
//
// - FrameResource / FrameStamp: shared assets and mesh buffers referenced
//   by a frame. The stamp records the last frame number that registered
//   the resource, so each frame takes exactly one reference.
// - MeshData / MeshDataId: create requests and destroy requests applied
//   by the consumer around the frame's draw.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

//=== FrameStamp ==========================================================

/// Last frame number that registered a resource.
///
/// Written only by the producer while building frames.
#[derive(Debug)]
pub struct FrameStamp(AtomicI64);

impl FrameStamp {
    /// A stamp no frame has touched yet.
    pub const UNTOUCHED: i64 = i64::MIN;

    pub const fn new() -> Self {
        Self(AtomicI64::new(Self::UNTOUCHED))
    }

    pub fn last_frame(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    /// Marks the resource as touched by `frame_number`.
    ///
    /// Returns `false` if it was already touched by that frame.
    pub fn touch(&self, frame_number: i64) -> bool {
        self.0.swap(frame_number, Ordering::AcqRel) != frame_number
    }
}

impl Default for FrameStamp {
    fn default() -> Self {
        Self::new()
    }
}

//=== FrameResource =======================================================

/// A shared resource a frame must keep alive until it has been drawn.
pub trait FrameResource: Send + Sync {
    fn frame_stamp(&self) -> &FrameStamp;

    /// Human-readable label for logs.
    fn label(&self) -> &str {
        "resource"
    }
}

/// Shared-ownership handle to a frame resource.
pub type ResourceRef = Arc<dyn FrameResource>;

//=== MeshDataId ==========================================================

/// Identifier of GPU-side mesh data owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshDataId(pub u64);

impl fmt::Display for MeshDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

//=== MeshData ============================================================

/// Index element width for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSize {
    U16,
    U32,
}

/// A request to create mesh data on the GPU.
///
/// The payloads are opaque to the pipeline; the backend decodes them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub id: MeshDataId,
    pub vertices: Vec<u8>,
    pub indices: Vec<u8>,
    pub index_size: IndexSize,
    /// Dynamic meshes are re-uploaded often; static ones once.
    pub dynamic: bool,
}

impl MeshData {
    pub fn new(id: MeshDataId) -> Self {
        Self {
            id,
            vertices: Vec::new(),
            indices: Vec::new(),
            index_size: IndexSize::U16,
            dynamic: false,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
