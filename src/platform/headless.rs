//=========================================================================
// Headless Backend
//=========================================================================
//
// Display backend with no window and no GPU.
//
// Records every call into a shared `CallLog` and replays OS events pushed
// through a `HeadlessControl`. Used for CI, servers, validation runs and
// the render loop's own tests.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

//=== Internal Dependencies ===============================================

use super::{BackendEvent, DeviceDescriptor, DisplayBackend, SurfaceInfo};
use crate::config::{DisplayConfig, RenderLoopConfig, VSyncMode};
use crate::core::frame::{FrameDefinition, MeshData, MeshDataId, PassKind, RenderPass};
use crate::error::BackendError;

//=== BackendCall =========================================================

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create,
    Destroy,
    CreateMesh(MeshDataId),
    DestroyMesh(MeshDataId),
    Pass { frame: i64, kind: PassKind },
    Present,
    ApplyConfig { fullscreen: bool },
    /// Free-form entry, e.g. pushed by a graphics op under test.
    Marker(String),
}

//=== CallLog =============================================================

/// Shared, ordered record of backend calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<BackendCall>>>);

impl CallLog {
    pub fn push(&self, call: BackendCall) {
        self.0.lock().push(call);
    }

    pub fn snapshot(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.0.lock().iter().filter(|call| pred(call)).count()
    }

    /// Position of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&BackendCall) -> bool) -> Option<usize> {
        self.0.lock().iter().position(pred)
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

//=== HeadlessControl =====================================================

#[derive(Debug, Default)]
struct ControlState {
    events: VecDeque<BackendEvent>,
    present_failures: VecDeque<BackendError>,
    pass_failures: VecDeque<BackendError>,
    destroy_mesh_failures: Vec<(MeshDataId, BackendError)>,
}

/// Drives a headless backend from outside: queue OS events, inject
/// call failures. Usable from any thread. A failed call is not logged.
#[derive(Debug, Clone, Default)]
pub struct HeadlessControl(Arc<Mutex<ControlState>>);

impl HeadlessControl {
    pub fn push_event(&self, event: BackendEvent) {
        self.0.lock().events.push_back(event);
    }

    /// Makes the next `present` fail with `error`.
    pub fn fail_next_present(&self, error: BackendError) {
        self.0.lock().present_failures.push_back(error);
    }

    /// Makes the next `execute_pass` fail with `error`.
    pub fn fail_next_pass(&self, error: BackendError) {
        self.0.lock().pass_failures.push_back(error);
    }

    /// Makes the next `destroy_mesh_data(id)` fail with `error`.
    pub fn fail_next_destroy_mesh(&self, id: MeshDataId, error: BackendError) {
        self.0.lock().destroy_mesh_failures.push((id, error));
    }

    pub fn pending_events(&self) -> usize {
        self.0.lock().events.len()
    }
}

//=== HeadlessBackend =====================================================

/// Recording backend without window or GPU.
pub struct HeadlessBackend {
    log: CallLog,
    control: HeadlessControl,
    devices: Vec<DeviceDescriptor>,
    surface: Option<SurfaceInfo>,
    scale_factor: f64,
    vsync_supported: bool,
    create_failure: Option<BackendError>,
}

impl HeadlessBackend {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            control: HeadlessControl::default(),
            devices: Vec::new(),
            surface: None,
            scale_factor: 1.0,
            vsync_supported: false,
            create_failure: None,
        }
    }

    /// Devices reported by the initial enumeration.
    pub fn with_devices(mut self, devices: Vec<DeviceDescriptor>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Pretend presents can be synchronized to a display.
    pub fn with_vsync_support(mut self, supported: bool) -> Self {
        self.vsync_supported = supported;
        self
    }

    /// Makes the first `create` call fail.
    pub fn with_create_failure(mut self, error: BackendError) -> Self {
        self.create_failure = Some(error);
        self
    }

    //--- Handles ----------------------------------------------------------

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn control(&self) -> HeadlessControl {
        self.control.clone()
    }

    pub fn surface(&self) -> Option<SurfaceInfo> {
        self.surface
    }

    //--- Internal Helpers -------------------------------------------------

    fn vsync_active(&self, display: &DisplayConfig) -> bool {
        self.vsync_supported && display.vsync != VSyncMode::Off
    }

    fn require_surface(&self) -> Result<SurfaceInfo, BackendError> {
        self.surface.ok_or(BackendError::NoSurface)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

//=== DisplayBackend ======================================================

impl DisplayBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create(&mut self, config: &RenderLoopConfig) -> Result<SurfaceInfo, BackendError> {
        if let Some(error) = self.create_failure.take() {
            return Err(error);
        }

        let (width, height) = config.initial_size;
        let info = SurfaceInfo {
            physical_size: (
                (f64::from(width) * self.scale_factor).round() as u32,
                (f64::from(height) * self.scale_factor).round() as u32,
            ),
            scale_factor: self.scale_factor,
            vsync_active: self.vsync_active(&config.display),
        };

        info!(
            target: "platform",
            "Headless surface created: {}x{} @ {}x",
            info.physical_size.0,
            info.physical_size.1,
            info.scale_factor
        );
        self.surface = Some(info);
        self.log.push(BackendCall::Create);
        Ok(info)
    }

    fn destroy(&mut self) {
        if self.surface.take().is_some() {
            debug!(target: "platform", "Headless surface destroyed");
            self.log.push(BackendCall::Destroy);
        }
    }

    fn poll_events(&mut self, out: &mut Vec<BackendEvent>) {
        let mut control = self.control.0.lock();
        while let Some(event) = control.events.pop_front() {
            match &event {
                BackendEvent::Resized {
                    physical_width,
                    physical_height,
                    scale_factor,
                } => {
                    if let Some(surface) = self.surface.as_mut() {
                        surface.physical_size = (*physical_width, *physical_height);
                        surface.scale_factor = *scale_factor;
                    }
                }
                BackendEvent::DeviceAdded(device) => self.devices.push(device.clone()),
                BackendEvent::DeviceRemoved { os_index } => {
                    self.devices.retain(|d| d.os_index != *os_index);
                }
                _ => {}
            }
            out.push(event);
        }
    }

    fn enumerate_devices(&mut self) -> Vec<DeviceDescriptor> {
        self.devices.clone()
    }

    fn create_mesh_data(&mut self, mesh: &MeshData) -> Result<(), BackendError> {
        self.require_surface()?;
        self.log.push(BackendCall::CreateMesh(mesh.id));
        Ok(())
    }

    fn destroy_mesh_data(&mut self, id: MeshDataId) -> Result<(), BackendError> {
        self.require_surface()?;
        {
            let mut control = self.control.0.lock();
            let failures = &mut control.destroy_mesh_failures;
            if let Some(at) = failures.iter().position(|(failing, _)| *failing == id) {
                return Err(failures.remove(at).1);
            }
        }
        self.log.push(BackendCall::DestroyMesh(id));
        Ok(())
    }

    fn execute_pass(
        &mut self,
        frame: &FrameDefinition,
        pass: &RenderPass,
    ) -> Result<(), BackendError> {
        self.require_surface()?;
        if let Some(error) = self.control.0.lock().pass_failures.pop_front() {
            return Err(error);
        }
        self.log.push(BackendCall::Pass {
            frame: frame.frame_number(),
            kind: pass.kind(),
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.require_surface()?;
        if let Some(error) = self.control.0.lock().present_failures.pop_front() {
            return Err(error);
        }
        self.log.push(BackendCall::Present);
        Ok(())
    }

    fn apply_config(&mut self, config: &DisplayConfig) -> Result<SurfaceInfo, BackendError> {
        let vsync_active = self.vsync_active(config);
        let surface = self.surface.as_mut().ok_or(BackendError::NoSurface)?;
        surface.vsync_active = vsync_active;
        self.log.push(BackendCall::ApplyConfig {
            fullscreen: config.fullscreen,
        });
        Ok(*surface)
    }

    fn supports_vsync(&self) -> bool {
        self.vsync_supported
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
