//=========================================================================
// Frame Definition
//=========================================================================
//
// A flattened, self-contained description of one frame. Built by the
// producer thread, frozen with `finalize()`, handed to the consumer and
// drawn there without touching live simulation state.
//
// Lifecycle:
// ```text
//   FramePool::acquire / new()
//        │  (producer: populate passes, timing, state, lifecycle lists)
//        ▼
//   finalize()  ──publish──▶  consumer: creates → passes → destroys
//                                       │
//                                       ▼
//                              reset() + recycle to pool
// ```
//
// Contract violations (mutating after `finalize()`, finalizing while a
// pass is still being defined) trip debug assertions. Release builds log
// and ignore the offending call.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::Arc;

use log::error;

//=== Internal Dependencies ===============================================

use super::pass::{DrawCommand, PassKind, RenderPass};
use super::resource::{MeshData, MeshDataId, ResourceRef};

//=== Math Aliases ========================================================

pub type Vec3 = [f32; 3];
pub type Mat4 = [f32; 16];

pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

//=== Enums ===============================================================

/// Resolved graphics quality tier of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum GraphicsQuality {
    #[default]
    Low,
    Medium,
    High,
    Higher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraMode {
    #[default]
    Follow,
    Orbit,
}

//=== State Blocks ========================================================

/// Camera basis and shake captured at frame build time.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub mode: CameraMode,
    pub position: Vec3,
    pub target: Vec3,
    pub shake_offset: Vec3,
    pub vr_near_clip: f32,
    pub vr_overlay_screen: Mat4,
    pub vr_overlay_screen_fixed: Mat4,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            mode: CameraMode::Follow,
            position: [0.0; 3],
            target: [0.0; 3],
            shake_offset: [0.0; 3],
            vr_near_clip: 0.0,
            vr_overlay_screen: IDENTITY,
            vr_overlay_screen_fixed: IDENTITY,
        }
    }
}

/// Global color grading for the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualState {
    pub tint: Vec3,
    pub ambient: Vec3,
    pub vignette_outer: Vec3,
    pub vignette_inner: Vec3,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            tint: [1.0; 3],
            ambient: [1.0; 3],
            vignette_outer: [1.0; 3],
            vignette_inner: [1.0; 3],
        }
    }
}

/// Shadow projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowParams {
    pub offset: Vec3,
    pub scale: [f32; 2],
    pub ortho: bool,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            scale: [1.0, 1.0],
            ortho: false,
        }
    }
}

//=== FrameDefinition =====================================================

/// Immutable-after-finalize snapshot of one frame.
pub struct FrameDefinition {
    passes: Vec<RenderPass>,

    frame_number: i64,
    app_time_millis: i64,
    display_time_millis: i64,
    display_time_elapsed_millis: i64,

    camera: CameraState,
    visual: VisualState,
    shadow: ShadowParams,
    quality: GraphicsQuality,
    needs_clear: bool,
    orbiting: bool,
    tv_border: bool,
    vr_mode: bool,

    mesh_data_creates: Vec<MeshData>,
    mesh_data_destroys: Vec<MeshDataId>,
    resources: Vec<ResourceRef>,

    finalized: bool,
    defining_pass: bool,
}

impl FrameDefinition {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self {
            passes: PassKind::DRAW_ORDER.iter().map(|k| RenderPass::new(*k)).collect(),
            frame_number: 0,
            app_time_millis: 0,
            display_time_millis: 0,
            display_time_elapsed_millis: 0,
            camera: CameraState::default(),
            visual: VisualState::default(),
            shadow: ShadowParams::default(),
            quality: GraphicsQuality::default(),
            needs_clear: false,
            orbiting: false,
            tv_border: false,
            vr_mode: false,
            mesh_data_creates: Vec::new(),
            mesh_data_destroys: Vec::new(),
            resources: Vec::new(),
            finalized: false,
            defining_pass: false,
        }
    }

    //--- Lifecycle --------------------------------------------------------

    /// Returns the definition to an empty, reusable state.
    ///
    /// Pass and list storage keep their capacity. Resource references are
    /// released here.
    pub fn reset(&mut self) {
        for pass in &mut self.passes {
            pass.clear();
        }
        self.frame_number = 0;
        self.app_time_millis = 0;
        self.display_time_millis = 0;
        self.display_time_elapsed_millis = 0;
        self.camera = CameraState::default();
        self.visual = VisualState::default();
        self.shadow = ShadowParams::default();
        self.quality = GraphicsQuality::default();
        self.needs_clear = false;
        self.orbiting = false;
        self.tv_border = false;
        self.vr_mode = false;
        self.mesh_data_creates.clear();
        self.mesh_data_destroys.clear();
        self.resources.clear();
        self.finalized = false;
        self.defining_pass = false;
    }

    /// Freezes the definition. Called once by the producer before publish.
    pub fn finalize(&mut self) {
        debug_assert!(!self.finalized, "FrameDefinition finalized twice");
        debug_assert!(
            !self.defining_pass,
            "FrameDefinition finalized while a render pass was still being defined"
        );
        if self.defining_pass {
            error!(target: "render", "frame {} finalized mid-pass", self.frame_number);
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Guards every mutator. Returns whether the mutation may proceed.
    fn check_mutable(&self, what: &str) -> bool {
        debug_assert!(
            !self.finalized,
            "FrameDefinition::{} called after finalize()",
            what
        );
        if self.finalized {
            error!(
                target: "render",
                "ignoring {} on finalized frame {}", what, self.frame_number
            );
            return false;
        }
        true
    }

    //--- Passes -----------------------------------------------------------

    /// Starts appending commands to the pass of `kind`.
    ///
    /// The frame counts as "defining a pass" until the builder drops.
    pub fn begin_pass(&mut self, kind: PassKind) -> PassBuilder<'_> {
        let enabled = self.check_mutable("begin_pass");
        if enabled {
            self.defining_pass = true;
        }
        PassBuilder {
            frame: self,
            kind,
            enabled,
        }
    }

    pub fn pass(&self, kind: PassKind) -> &RenderPass {
        &self.passes[kind.index()]
    }

    /// Passes in consumer draw order.
    pub fn passes(&self) -> impl Iterator<Item = &RenderPass> {
        PassKind::DRAW_ORDER.iter().map(move |k| &self.passes[k.index()])
    }

    /// Fixed overlay pass in VR, regular overlay pass otherwise.
    pub fn overlay_fixed_kind(&self) -> PassKind {
        if self.vr_mode {
            PassKind::OverlayFixed
        } else {
            PassKind::Overlay
        }
    }

    /// Flat overlay pass in VR, regular overlay pass otherwise.
    pub fn overlay_flat_kind(&self) -> PassKind {
        if self.vr_mode {
            PassKind::OverlayFlat
        } else {
            PassKind::Overlay
        }
    }

    pub fn is_defining_pass(&self) -> bool {
        self.defining_pass
    }

    //--- Resource Lifecycle -----------------------------------------------

    /// Registers a referenced resource once per frame number.
    ///
    /// The first registration for this frame clones the handle, keeping the
    /// resource alive until the frame is torn down. Later calls with the
    /// same resource are no-ops. Returns whether the resource was added.
    pub fn add_resource_reference(&mut self, resource: &ResourceRef) -> bool {
        if !self.check_mutable("add_resource_reference") {
            return false;
        }
        if !resource.frame_stamp().touch(self.frame_number) {
            return false;
        }
        self.resources.push(Arc::clone(resource));
        true
    }

    pub fn add_mesh_data_create(&mut self, mesh: MeshData) {
        if self.check_mutable("add_mesh_data_create") {
            self.mesh_data_creates.push(mesh);
        }
    }

    pub fn add_mesh_data_destroy(&mut self, id: MeshDataId) {
        if self.check_mutable("add_mesh_data_destroy") {
            self.mesh_data_destroys.push(id);
        }
    }

    /// Moves the lifecycle lists of an undrawn, `older` frame to the front
    /// of this frame's lists, so a skipped frame's creates and destroys
    /// still reach the consumer.
    pub(crate) fn absorb_lifecycle(&mut self, older: &mut FrameDefinition) {
        if older.mesh_data_creates.is_empty() && older.mesh_data_destroys.is_empty() {
            return;
        }
        older.mesh_data_creates.append(&mut self.mesh_data_creates);
        std::mem::swap(&mut self.mesh_data_creates, &mut older.mesh_data_creates);
        older.mesh_data_destroys.append(&mut self.mesh_data_destroys);
        std::mem::swap(&mut self.mesh_data_destroys, &mut older.mesh_data_destroys);
    }

    /// Whether the frame carries any mesh create or destroy requests.
    pub fn has_lifecycle_work(&self) -> bool {
        !self.mesh_data_creates.is_empty() || !self.mesh_data_destroys.is_empty()
    }

    pub fn mesh_data_creates(&self) -> &[MeshData] {
        &self.mesh_data_creates
    }

    pub fn mesh_data_destroys(&self) -> &[MeshDataId] {
        &self.mesh_data_destroys
    }

    pub fn resources(&self) -> &[ResourceRef] {
        &self.resources
    }

    //--- Timing -----------------------------------------------------------

    pub fn frame_number(&self) -> i64 {
        self.frame_number
    }

    /// Sets the sequence number. Must precede `add_resource_reference`.
    pub fn set_frame_number(&mut self, frame_number: i64) {
        if self.check_mutable("set_frame_number") {
            self.frame_number = frame_number;
        }
    }

    /// Wall-clock time this frame originated at.
    pub fn app_time_millis(&self) -> i64 {
        self.app_time_millis
    }

    pub fn set_app_time_millis(&mut self, millis: i64) {
        if self.check_mutable("set_app_time_millis") {
            self.app_time_millis = millis;
        }
    }

    /// Smoothly incrementing time; prefer this for animation.
    pub fn display_time_millis(&self) -> i64 {
        self.display_time_millis
    }

    /// Display time this frame represents since the previous one.
    pub fn display_time_elapsed_millis(&self) -> i64 {
        self.display_time_elapsed_millis
    }

    pub fn set_display_time(&mut self, millis: i64, elapsed_millis: i64) {
        if self.check_mutable("set_display_time") {
            self.display_time_millis = millis;
            self.display_time_elapsed_millis = elapsed_millis;
        }
    }

    //--- Camera / Visual State --------------------------------------------

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        if self.check_mutable("set_camera") {
            self.camera = camera;
        }
    }

    pub fn visual(&self) -> &VisualState {
        &self.visual
    }

    pub fn set_visual(&mut self, visual: VisualState) {
        if self.check_mutable("set_visual") {
            self.visual = visual;
        }
    }

    pub fn shadow(&self) -> &ShadowParams {
        &self.shadow
    }

    pub fn set_shadow(&mut self, shadow: ShadowParams) {
        if self.check_mutable("set_shadow") {
            self.shadow = shadow;
        }
    }

    pub fn quality(&self) -> GraphicsQuality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: GraphicsQuality) {
        if self.check_mutable("set_quality") {
            self.quality = quality;
        }
    }

    /// Effects needing a depth texture should check this before drawing.
    pub fn has_depth_texture(&self) -> bool {
        self.quality >= GraphicsQuality::High
    }

    pub fn needs_clear(&self) -> bool {
        self.needs_clear
    }

    pub fn set_needs_clear(&mut self, value: bool) {
        if self.check_mutable("set_needs_clear") {
            self.needs_clear = value;
        }
    }

    pub fn orbiting(&self) -> bool {
        self.orbiting
    }

    pub fn set_orbiting(&mut self, value: bool) {
        if self.check_mutable("set_orbiting") {
            self.orbiting = value;
        }
    }

    pub fn tv_border(&self) -> bool {
        self.tv_border
    }

    pub fn set_tv_border(&mut self, value: bool) {
        if self.check_mutable("set_tv_border") {
            self.tv_border = value;
        }
    }

    pub fn vr_mode(&self) -> bool {
        self.vr_mode
    }

    pub fn set_vr_mode(&mut self, value: bool) {
        if self.check_mutable("set_vr_mode") {
            self.vr_mode = value;
        }
    }

    #[cfg(test)]
    pub(crate) fn pass_capacity(&self, kind: PassKind) -> usize {
        self.passes[kind.index()].capacity()
    }
}

impl Default for FrameDefinition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDefinition")
            .field("frame_number", &self.frame_number)
            .field("display_time_millis", &self.display_time_millis)
            .field("quality", &self.quality)
            .field("creates", &self.mesh_data_creates.len())
            .field("destroys", &self.mesh_data_destroys.len())
            .field("resources", &self.resources.len())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

//=== PassBuilder =========================================================

/// Appends draw commands to one pass of a frame under construction.
pub struct PassBuilder<'a> {
    frame: &'a mut FrameDefinition,
    kind: PassKind,
    enabled: bool,
}

impl PassBuilder<'_> {
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn push(&mut self, command: DrawCommand) -> &mut Self {
        if self.enabled {
            self.frame.passes[self.kind.index()].push(command);
        }
        self
    }

    pub fn draw_mesh(&mut self, mesh: MeshDataId, material: u32) -> &mut Self {
        self.push(DrawCommand::DrawMesh { mesh, material })
    }

    /// Ends the pass. Equivalent to dropping the builder.
    pub fn finish(self) {}
}

impl Drop for PassBuilder<'_> {
    fn drop(&mut self) {
        if self.enabled {
            self.frame.defining_pass = false;
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::resource::{FrameResource, FrameStamp};

    struct TestAsset {
        stamp: FrameStamp,
    }

    impl FrameResource for TestAsset {
        fn frame_stamp(&self) -> &FrameStamp {
            &self.stamp
        }
    }

    fn asset() -> ResourceRef {
        Arc::new(TestAsset { stamp: FrameStamp::new() })
    }

    //=====================================================================
    // Resource References
    //=====================================================================

    #[test]
    fn add_resource_reference_is_idempotent_within_a_frame() {
        let res = asset();
        let mut frame = FrameDefinition::new();
        frame.set_frame_number(10);

        assert!(frame.add_resource_reference(&res));
        assert!(!frame.add_resource_reference(&res));

        assert_eq!(frame.resources().len(), 1);
        assert_eq!(Arc::strong_count(&res), 2, "exactly one lifetime bump");
    }

    #[test]
    fn resource_is_registered_again_in_the_next_frame() {
        let res = asset();

        let mut first = FrameDefinition::new();
        first.set_frame_number(1);
        first.add_resource_reference(&res);

        let mut second = FrameDefinition::new();
        second.set_frame_number(2);
        assert!(second.add_resource_reference(&res));

        assert_eq!(Arc::strong_count(&res), 3);
        assert_eq!(res.frame_stamp().last_frame(), 2);
    }

    #[test]
    fn reset_releases_references() {
        let res = asset();
        let mut frame = FrameDefinition::new();
        frame.set_frame_number(3);
        frame.add_resource_reference(&res);

        frame.reset();

        assert!(frame.resources().is_empty());
        assert_eq!(Arc::strong_count(&res), 1);
    }

    //=====================================================================
    // Reset / Finalize
    //=====================================================================

    #[test]
    fn reset_clears_state_but_keeps_pass_storage() {
        let mut frame = FrameDefinition::new();
        frame.set_frame_number(9);
        frame.set_display_time(1000, 16);
        frame.set_needs_clear(true);
        frame.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        frame.add_mesh_data_destroy(MeshDataId(0));
        {
            let mut beauty = frame.begin_pass(PassKind::Beauty);
            for i in 0..32 {
                beauty.draw_mesh(MeshDataId(i), 0);
            }
        }
        frame.finalize();
        let cap = frame.pass_capacity(PassKind::Beauty);

        frame.reset();

        assert!(!frame.is_finalized());
        assert_eq!(frame.frame_number(), 0);
        assert_eq!(frame.display_time_millis(), 0);
        assert!(!frame.needs_clear());
        assert!(frame.mesh_data_creates().is_empty());
        assert!(frame.mesh_data_destroys().is_empty());
        assert!(frame.pass(PassKind::Beauty).is_empty());
        assert_eq!(frame.pass_capacity(PassKind::Beauty), cap);
    }

    #[test]
    fn pass_builder_clears_defining_flag_on_drop() {
        let mut frame = FrameDefinition::new();
        {
            let mut overlay = frame.begin_pass(PassKind::Overlay);
            overlay.push(DrawCommand::Raw(vec![0xAB]));
        }
        assert!(!frame.is_defining_pass());
        frame.finalize();
        assert!(frame.is_finalized());
        assert_eq!(frame.pass(PassKind::Overlay).len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "still being defined")]
    fn finalize_mid_pass_asserts() {
        let mut frame = FrameDefinition::new();
        std::mem::forget(frame.begin_pass(PassKind::Beauty));
        frame.finalize();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "after finalize()")]
    fn mutation_after_finalize_asserts() {
        let mut frame = FrameDefinition::new();
        frame.finalize();
        frame.set_needs_clear(true);
    }

    //=====================================================================
    // Accessors
    //=====================================================================

    #[test]
    fn passes_iterate_in_draw_order() {
        let frame = FrameDefinition::new();
        let kinds: Vec<_> = frame.passes().map(RenderPass::kind).collect();
        assert_eq!(kinds, PassKind::DRAW_ORDER.to_vec());
    }

    #[test]
    fn overlay_kinds_follow_vr_mode() {
        let mut frame = FrameDefinition::new();
        assert_eq!(frame.overlay_fixed_kind(), PassKind::Overlay);
        assert_eq!(frame.overlay_flat_kind(), PassKind::Overlay);

        frame.set_vr_mode(true);
        assert_eq!(frame.overlay_fixed_kind(), PassKind::OverlayFixed);
        assert_eq!(frame.overlay_flat_kind(), PassKind::OverlayFlat);
    }

    #[test]
    fn depth_texture_requires_high_quality() {
        let mut frame = FrameDefinition::new();
        frame.set_quality(GraphicsQuality::Medium);
        assert!(!frame.has_depth_texture());
        frame.set_quality(GraphicsQuality::High);
        assert!(frame.has_depth_texture());
        frame.set_quality(GraphicsQuality::Higher);
        assert!(frame.has_depth_texture());
    }

    #[test]
    fn defaults_match_neutral_grading() {
        let frame = FrameDefinition::new();
        assert_eq!(frame.visual().tint, [1.0; 3]);
        assert_eq!(frame.shadow().scale, [1.0, 1.0]);
        assert_eq!(frame.camera().vr_overlay_screen, IDENTITY);
        assert_eq!(frame.camera().mode, CameraMode::Follow);
    }

    #[test]
    fn absorb_lifecycle_prepends_older_requests() {
        let mut older = FrameDefinition::new();
        older.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        older.add_mesh_data_destroy(MeshDataId(10));

        let mut newer = FrameDefinition::new();
        newer.add_mesh_data_create(MeshData::new(MeshDataId(2)));
        newer.finalize();

        newer.absorb_lifecycle(&mut older);

        let ids: Vec<_> = newer.mesh_data_creates().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MeshDataId(1), MeshDataId(2)]);
        assert_eq!(newer.mesh_data_destroys(), &[MeshDataId(10)]);
        assert!(!older.has_lifecycle_work());
    }
}
