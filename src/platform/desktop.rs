//=========================================================================
// Desktop Backend (winit)
//=========================================================================
//
// Native window backend built on winit's pump-style event loop.
//
// The render loop owns the iteration, so instead of handing control to
// `run_app` the backend pumps winit once per `poll_events` call with a
// zero timeout. Window creation happens inside the pump (`resumed` /
// `about_to_wait`), which is where winit 0.30 allows it.
//
// GPU work is delegated to a `SurfaceRenderer`; this file only owns the
// window and translates OS events.
//
// Notes:
// - winit allows one event loop per process; it is created on first
//   `create` and kept across surface recreation.
// - winit has no gamepad support, so `enumerate_devices` reports nothing
//   and no device events are produced here.
//
//=========================================================================

//=== External Crates =====================================================

use std::sync::Arc;
use std::time::Duration;

use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

//=== Internal Imports ====================================================

use super::{BackendEvent, DeviceDescriptor, DisplayBackend, SurfaceInfo};
use crate::config::{DisplayConfig, RenderLoopConfig};
use crate::core::frame::{FrameDefinition, MeshData, MeshDataId, RenderPass};
use crate::error::BackendError;

//=== SurfaceRenderer =====================================================

/// GPU side of the desktop backend.
pub trait SurfaceRenderer {
    /// Builds the rendering surface for `window`. Returns whether presents
    /// are synchronized to the display.
    fn create_surface(
        &mut self,
        window: Arc<Window>,
        config: &DisplayConfig,
    ) -> Result<bool, BackendError>;

    fn destroy_surface(&mut self);

    fn resize(&mut self, physical_width: u32, physical_height: u32);

    fn create_mesh_data(&mut self, mesh: &MeshData) -> Result<(), BackendError>;

    fn destroy_mesh_data(&mut self, id: MeshDataId) -> Result<(), BackendError>;

    fn execute_pass(
        &mut self,
        frame: &FrameDefinition,
        pass: &RenderPass,
    ) -> Result<(), BackendError>;

    fn present(&mut self) -> Result<(), BackendError>;
}

/// Renderer that draws nothing. Useful to bring up a window before a GPU
/// renderer exists.
#[derive(Debug, Default)]
pub struct NullRenderer {
    window: Option<Arc<Window>>,
}

impl SurfaceRenderer for NullRenderer {
    fn create_surface(
        &mut self,
        window: Arc<Window>,
        _config: &DisplayConfig,
    ) -> Result<bool, BackendError> {
        self.window = Some(window);
        Ok(false)
    }

    fn destroy_surface(&mut self) {
        self.window = None;
    }

    fn resize(&mut self, _physical_width: u32, _physical_height: u32) {}

    fn create_mesh_data(&mut self, _mesh: &MeshData) -> Result<(), BackendError> {
        Ok(())
    }

    fn destroy_mesh_data(&mut self, _id: MeshDataId) -> Result<(), BackendError> {
        Ok(())
    }

    fn execute_pass(
        &mut self,
        _frame: &FrameDefinition,
        _pass: &RenderPass,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        if let Some(window) = &self.window {
            window.pre_present_notify();
        }
        Ok(())
    }
}

//=== WindowState =========================================================

/// winit application handler; lives across pumps.
#[derive(Default)]
struct WindowState {
    window: Option<Arc<Window>>,

    /// Attributes for a window that should exist but does not yet.
    want_window: Option<WindowAttributes>,

    creation_error: Option<BackendError>,
    pending: Vec<BackendEvent>,
}

impl WindowState {
    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attrs) = self.want_window.take() else {
            return;
        };

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let size = window.inner_size();
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    size.width,
                    size.height,
                    window.scale_factor()
                );
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                self.creation_error = Some(BackendError::WindowCreation(e.to_string()));
            }
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.ensure_window(event_loop);
        if self.window.is_some() {
            self.pending.push(BackendEvent::Shown);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        debug!(target: "platform", "Application suspended");
        self.pending.push(BackendEvent::Hidden);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.pending.push(BackendEvent::CloseRequested);
            }

            WindowEvent::Resized(size) => {
                let scale_factor = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                self.pending.push(BackendEvent::Resized {
                    physical_width: size.width,
                    physical_height: size.height,
                    scale_factor,
                });
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.pending.push(BackendEvent::Resized {
                        physical_width: size.width,
                        physical_height: size.height,
                        scale_factor,
                    });
                }
            }

            WindowEvent::Occluded(true) => self.pending.push(BackendEvent::Hidden),
            WindowEvent::Occluded(false) => self.pending.push(BackendEvent::Shown),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.ensure_window(event_loop);
    }
}

//=== WinitBackend ========================================================

/// Desktop display backend: one winit window plus a [`SurfaceRenderer`].
pub struct WinitBackend<R: SurfaceRenderer> {
    event_loop: Option<EventLoop<()>>,
    state: WindowState,
    renderer: R,
    display: DisplayConfig,
    vsync_active: bool,
    exited: bool,
}

impl<R: SurfaceRenderer> WinitBackend<R> {
    /// Pumps allowed while waiting for the window to appear.
    const CREATE_PUMPS: usize = 200;
    const CREATE_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

    pub fn new(renderer: R) -> Self {
        Self {
            event_loop: None,
            state: WindowState::default(),
            renderer,
            display: DisplayConfig::default(),
            vsync_active: false,
            exited: false,
        }
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.state.window.as_ref()
    }

    fn pump(&mut self, timeout: Duration) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };

        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(timeout), &mut self.state)
        {
            if !self.exited {
                info!(target: "platform", "Event loop exited with code {}", code);
                self.exited = true;
                self.state.pending.push(BackendEvent::CloseRequested);
            }
        }
    }

    fn surface_info(&self, window: &Window) -> SurfaceInfo {
        let size = window.inner_size();
        SurfaceInfo {
            physical_size: (size.width, size.height),
            scale_factor: window.scale_factor(),
            vsync_active: self.vsync_active,
        }
    }

    fn window_attributes(config: &RenderLoopConfig) -> WindowAttributes {
        let (width, height) = config.initial_size;
        let attrs = Window::default_attributes()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(width, height));

        if config.display.fullscreen {
            attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
        } else {
            attrs
        }
    }
}

//=== DisplayBackend ======================================================

impl<R: SurfaceRenderer> DisplayBackend for WinitBackend<R> {
    fn name(&self) -> &str {
        "winit"
    }

    fn create(&mut self, config: &RenderLoopConfig) -> Result<SurfaceInfo, BackendError> {
        if self.event_loop.is_none() {
            let event_loop =
                EventLoop::new().map_err(|e| BackendError::WindowCreation(e.to_string()))?;
            debug!(target: "platform", "winit event loop created");
            self.event_loop = Some(event_loop);
        }

        self.state.creation_error = None;
        self.state.want_window = Some(Self::window_attributes(config));

        for _ in 0..Self::CREATE_PUMPS {
            self.pump(Self::CREATE_PUMP_TIMEOUT);
            if let Some(error) = self.state.creation_error.take() {
                return Err(error);
            }
            if self.state.window.is_some() {
                break;
            }
        }

        let window = self
            .state
            .window
            .clone()
            .ok_or_else(|| BackendError::WindowCreation("window never appeared".into()))?;

        self.vsync_active = self
            .renderer
            .create_surface(Arc::clone(&window), &config.display)
            .map_err(|e| {
                self.state.window = None;
                e
            })?;
        self.display = config.display.clone();

        Ok(self.surface_info(&window))
    }

    fn destroy(&mut self) {
        self.renderer.destroy_surface();
        if self.state.window.take().is_some() {
            debug!(target: "platform", "Window destroyed");
        }
    }

    fn poll_events(&mut self, out: &mut Vec<BackendEvent>) {
        self.pump(Duration::ZERO);

        for event in self.state.pending.drain(..) {
            if let BackendEvent::Resized {
                physical_width,
                physical_height,
                ..
            } = event
            {
                self.renderer.resize(physical_width, physical_height);
            }
            out.push(event);
        }
    }

    fn enumerate_devices(&mut self) -> Vec<DeviceDescriptor> {
        Vec::new()
    }

    fn create_mesh_data(&mut self, mesh: &MeshData) -> Result<(), BackendError> {
        self.renderer.create_mesh_data(mesh)
    }

    fn destroy_mesh_data(&mut self, id: MeshDataId) -> Result<(), BackendError> {
        self.renderer.destroy_mesh_data(id)
    }

    fn execute_pass(
        &mut self,
        frame: &FrameDefinition,
        pass: &RenderPass,
    ) -> Result<(), BackendError> {
        self.renderer.execute_pass(frame, pass)
    }

    fn present(&mut self) -> Result<(), BackendError> {
        if self.state.window.is_none() {
            return Err(BackendError::NoSurface);
        }
        self.renderer.present()
    }

    fn apply_config(&mut self, config: &DisplayConfig) -> Result<SurfaceInfo, BackendError> {
        let window = self.state.window.clone().ok_or(BackendError::NoSurface)?;

        if self.display.fullscreen != config.fullscreen {
            info!(target: "platform", "Fullscreen: {}", config.fullscreen);
            window.set_fullscreen(config.fullscreen.then_some(Fullscreen::Borderless(None)));
        }

        if self.display.needs_surface_reload(config) || self.display.vsync != config.vsync {
            debug!(target: "platform", "Rebuilding surface for new display settings");
            self.renderer.destroy_surface();
            self.vsync_active = self.renderer.create_surface(Arc::clone(&window), config)?;
        }

        self.display = config.clone();
        Ok(self.surface_info(&window))
    }

    fn supports_fullscreen(&self) -> bool {
        true
    }

    fn supports_vsync(&self) -> bool {
        true
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
//
// Only what works without a display server.
//
