//=========================================================================
// Render Passes
//=========================================================================
//
// A render pass is an ordered container of draw commands targeting one
// rendering stage. Passes are owned by their FrameDefinition and reused
// across frames (clearing keeps the command buffer's capacity).
//
// Draw order on the consumer:
//
// ```text
//   LightShadow → Light → BeautyBackground → Beauty
//     → Overlay3d → Overlay → OverlayFront → OverlayFixed → OverlayFlat
//     → Blit → VrCover
// ```
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::resource::MeshDataId;

//=== PassKind ============================================================

/// Rendering stage a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    LightShadow,
    Light,
    BeautyBackground,
    Beauty,
    Overlay3d,
    Overlay,
    OverlayFront,
    OverlayFixed,
    OverlayFlat,
    Blit,
    VrCover,
}

impl PassKind {
    pub const COUNT: usize = 11;

    /// Fixed consumer-side execution order.
    pub const DRAW_ORDER: [PassKind; Self::COUNT] = [
        PassKind::LightShadow,
        PassKind::Light,
        PassKind::BeautyBackground,
        PassKind::Beauty,
        PassKind::Overlay3d,
        PassKind::Overlay,
        PassKind::OverlayFront,
        PassKind::OverlayFixed,
        PassKind::OverlayFlat,
        PassKind::Blit,
        PassKind::VrCover,
    ];

    /// Slot of this kind inside a frame's pass storage.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            PassKind::Overlay3d
                | PassKind::Overlay
                | PassKind::OverlayFront
                | PassKind::OverlayFixed
                | PassKind::OverlayFlat
        )
    }
}

//=== DrawCommand =========================================================

/// One entry of a pass's command buffer.
///
/// The pipeline does not interpret commands beyond the mesh they
/// reference; encoding them into GPU calls is the backend's job.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Draw previously created mesh data.
    DrawMesh { mesh: MeshDataId, material: u32 },

    /// Column-major model transform applied to following draws.
    SetTransform([f32; 16]),

    /// Scissor rectangle in logical pixels: x, y, width, height.
    SetScissor([f32; 4]),

    /// Backend-specific payload.
    Raw(Vec<u8>),
}

impl DrawCommand {
    pub fn mesh(&self) -> Option<MeshDataId> {
        match self {
            DrawCommand::DrawMesh { mesh, .. } => Some(*mesh),
            _ => None,
        }
    }
}

//=== RenderPass ==========================================================

/// Draw commands for one rendering stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    kind: PassKind,
    commands: Vec<DrawCommand>,
}

impl RenderPass {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            commands: Vec::new(),
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Meshes referenced by this pass's draw commands.
    pub fn referenced_meshes(&self) -> impl Iterator<Item = MeshDataId> + '_ {
        self.commands.iter().filter_map(DrawCommand::mesh)
    }

    pub(super) fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Drops all commands, keeping the buffer's capacity.
    pub(super) fn clear(&mut self) {
        self.commands.clear();
    }

    pub(super) fn capacity(&self) -> usize {
        self.commands.capacity()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
