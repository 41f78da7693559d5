//=========================================================================
// Render Loop
//=========================================================================
//
// Consumer-thread driver: owns the display backend, pumps OS events,
// adopts the newest published frame, draws it and paces the result.
//
// States:
// ```text
//   Starting ──create ok──▶ Running ──close / stop──▶ Draining ──▶ Stopped
//       │                                                           ▲
//       └──────────────── create failed (fatal) ────────────────────┘
// ```
//
// One Running iteration:
// ```text
//   1. poll_events      resize / close (debounced) / devices / hidden /
//                       surface lost
//   2. adopt            newest frame from the slot, never blocks
//   3. draw window      drain ops → backlog lifecycle → creates → passes
//                       → destroys → present
//                       (each create/destroy issued once; a surface loss
//                       resumes at the request that failed)
//   4. pace             FramePacer, unless vsync is really active
//   5. reconfigure      latest pending DisplayConfig, between frames
// ```
//
// Draining keeps pumping and draining ops (the producer may still enqueue
// teardown work) but accepts no new frames. It ends when the producer
// calls `request_stop`, when a second deliberate close arrives, or after
// `drain_timeout`. The final drain runs before the backend is destroyed.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::bridge::RenderEvent;
use super::frame::{FrameDefinition, FrameRecycler};
use super::graphics_queue::{GraphicsContextQueue, GraphicsOp, SurfaceHook};
use super::handoff::FrameSlot;
use super::input::InputDeviceRegistry;
use super::pacing::{Clock, FramePacer, SystemClock};
use crate::config::{DisplayConfig, RenderLoopConfig};
use crate::error::{BackendError, GraphicsError, HandoffError, RenderLoopError};
use crate::platform::{BackendEvent, DisplayBackend, SurfaceInfo};

//=== LoopState ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Draining,
    Stopped,
}

//=== LoopStats ===========================================================

/// Counters for one render loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    /// Frames presented, counting repeated draws of the same frame.
    pub presents: u64,
    pub frames_adopted: u64,
    pub frames_rejected: u64,
    pub ops_run: u64,
    pub ops_failed: u64,
    pub surface_recoveries: u64,
}

//=== Shared State ========================================================

/// State shared between the loop and every `ProducerHandle`.
struct Shared {
    slot: FrameSlot,
    queue: GraphicsContextQueue,
    reconfigure: ArcSwapOption<DisplayConfig>,
    stop_requested: AtomicBool,
    stopped: AtomicBool,
}

//=== ProducerHandle ======================================================

/// Producer-side entry points into a running [`RenderLoop`].
///
/// Cheap to clone; every method is safe to call from any thread.
#[derive(Clone)]
pub struct ProducerHandle {
    shared: Arc<Shared>,
}

impl ProducerHandle {
    /// Hands a finalized frame to the consumer. See [`FrameSlot::publish`].
    pub fn publish_frame(
        &self,
        frame: FrameDefinition,
    ) -> Result<Option<FrameDefinition>, HandoffError> {
        self.shared.slot.publish(frame)
    }

    /// Queues an operation to run in the consumer's next draw window.
    ///
    /// Returns `false` once the loop has run its final drain.
    pub fn enqueue_graphics_op<F>(&self, op: F) -> bool
    where
        F: FnOnce(&mut dyn DisplayBackend) -> Result<(), GraphicsError> + Send + 'static,
    {
        self.shared.queue.enqueue(op)
    }

    pub fn enqueue_boxed(&self, op: GraphicsOp) -> bool {
        self.shared.queue.enqueue_boxed(op)
    }

    /// Registers an op that runs now and after every surface recreation.
    pub fn add_surface_hook(&self, hook: SurfaceHook) {
        self.shared.queue.add_surface_hook(hook);
    }

    /// Requests new display settings. Only the latest request before the
    /// next iteration boundary is applied.
    pub fn request_reconfigure(&self, config: DisplayConfig) {
        self.shared.reconfigure.store(Some(Arc::new(config)));
    }

    /// Asks the loop to drain and stop. Idempotent.
    pub fn request_stop(&self) {
        if !self.shared.stop_requested.swap(true, Ordering::AcqRel) {
            debug!(target: "producer", "render loop stop requested");
        }
    }

    /// Sequence number of the last frame actually presented.
    pub fn last_drawn_frame(&self) -> Option<i64> {
        self.shared.slot.last_drawn()
    }

    pub fn frames_dropped(&self) -> u64 {
        self.shared.slot.dropped()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }
}

//=== CurrentFrame ========================================================

/// The adopted frame and how far it has been drawn.
///
/// Lifecycle progress is counted per request: a request counts once the
/// backend answered anything but `SurfaceLost`, so after a recovery the
/// draw resumes at the request that hit the lost surface.
struct CurrentFrame {
    frame: Arc<FrameDefinition>,
    creates_applied: usize,
    destroys_applied: usize,
    /// Set when the surface was lost while this frame was in flight.
    passes_dropped: bool,
}

impl CurrentFrame {
    fn new(frame: Arc<FrameDefinition>) -> Self {
        Self {
            frame,
            creates_applied: 0,
            destroys_applied: 0,
            passes_dropped: false,
        }
    }

    fn lifecycle_done(&self) -> bool {
        self.creates_applied == self.frame.mesh_data_creates().len()
            && self.destroys_applied == self.frame.mesh_data_destroys().len()
    }
}

//=== RenderLoop ==========================================================

/// Consumer-thread state machine. Not `Send`: it lives and dies on the
/// thread that owns the window.
pub struct RenderLoop {
    config: RenderLoopConfig,
    backend: Box<dyn DisplayBackend>,
    clock: Box<dyn Clock>,
    shared: Arc<Shared>,
    events: Sender<RenderEvent>,
    devices: InputDeviceRegistry,
    pacer: FramePacer,
    recycler: Option<FrameRecycler>,

    state: LoopState,
    current: Option<CurrentFrame>,
    /// Replaced or rejected frames whose lifecycle lists are not fully
    /// applied yet, in request order.
    lifecycle_backlog: VecDeque<CurrentFrame>,
    surface: Option<SurfaceInfo>,
    hidden: bool,
    last_close: Option<Instant>,
    quit_sent: bool,
    force_stop: bool,
    drain_started: Option<Instant>,

    event_buf: Vec<BackendEvent>,
    stats: LoopStats,
}

impl RenderLoop {
    //--- Construction -----------------------------------------------------

    /// Creates a loop over `backend` plus the producer's handle and event
    /// receiver.
    pub fn new(
        config: RenderLoopConfig,
        backend: Box<dyn DisplayBackend>,
    ) -> (Self, ProducerHandle, Receiver<RenderEvent>) {
        let (events, receiver) = unbounded();

        let shared = Arc::new(Shared {
            slot: FrameSlot::new(),
            queue: GraphicsContextQueue::new(config.strict_graphics_context),
            reconfigure: ArcSwapOption::empty(),
            stop_requested: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });

        let pacer = FramePacer::new(config.display.max_fps, false, config.hidden_sleep());

        let render_loop = Self {
            backend,
            clock: Box::new(SystemClock),
            shared: Arc::clone(&shared),
            devices: InputDeviceRegistry::new(events.clone()),
            events,
            pacer,
            recycler: None,
            state: LoopState::Starting,
            current: None,
            lifecycle_backlog: VecDeque::new(),
            surface: None,
            hidden: false,
            last_close: None,
            quit_sent: false,
            force_stop: false,
            drain_started: None,
            event_buf: Vec::with_capacity(16),
            stats: LoopStats::default(),
            config,
        };

        (render_loop, ProducerHandle { shared }, receiver)
    }

    /// Replaces the time source (simulated clocks in tests and replays).
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        self.with_boxed_clock(Box::new(clock))
    }

    pub fn with_boxed_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sends torn-down frames back to a producer-side pool.
    pub fn with_recycler(mut self, recycler: FrameRecycler) -> Self {
        self.recycler = Some(recycler);
        self
    }

    //--- Accessors --------------------------------------------------------

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn config(&self) -> &RenderLoopConfig {
        &self.config
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn current_frame_number(&self) -> Option<i64> {
        self.current.as_ref().map(|c| c.frame.frame_number())
    }

    /// Drawable size in logical units, once a surface exists.
    pub fn logical_size(&self) -> Option<(f64, f64)> {
        self.surface.map(|s| s.logical_size())
    }

    pub fn devices(&self) -> &InputDeviceRegistry {
        &self.devices
    }

    //--- Execution --------------------------------------------------------

    /// Runs until the loop stops. Blocks the calling thread.
    pub fn run(mut self) -> Result<LoopStats, RenderLoopError> {
        info!(target: "render", "Render loop starting on {} backend", self.backend.name());

        loop {
            match self.run_iteration() {
                Ok(LoopState::Stopped) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(target: "render", "Render loop failed: {}", e);
                    self.abort();
                    return Err(e);
                }
            }
        }

        info!(
            target: "render",
            "Render loop stopped after {} iterations ({} presents)",
            self.stats.iterations,
            self.stats.presents
        );
        Ok(self.stats)
    }

    /// Creates the window and context, then enumerates devices.
    pub fn start(&mut self) -> Result<(), RenderLoopError> {
        if self.state != LoopState::Starting {
            return Ok(());
        }

        let info = match self.backend.create(&self.config) {
            Ok(info) => info,
            Err(e) => {
                error!(target: "render", "Startup failed: {}", e);
                self.abort();
                return Err(RenderLoopError::Startup(e));
            }
        };
        self.apply_surface_info(info);

        for device in self.backend.enumerate_devices() {
            self.devices
                .on_device_added(device.os_index, device.instance_id, device.name);
        }

        self.state = LoopState::Running;
        info!(target: "render", "Render loop running");
        Ok(())
    }

    /// Runs one loop iteration, starting the loop first if needed.
    pub fn run_iteration(&mut self) -> Result<LoopState, RenderLoopError> {
        match self.state {
            LoopState::Starting => self.start()?,
            LoopState::Stopped => return Err(RenderLoopError::AlreadyStopped),
            LoopState::Running | LoopState::Draining => {}
        }

        let iteration_start = self.clock.now();
        self.stats.iterations += 1;

        if self.shared.stop_requested.load(Ordering::Acquire) {
            self.begin_draining("stop requested");
        }

        //--- 1. OS events --------------------------------------------------
        self.pump_events()?;

        //--- 2. Newest frame -----------------------------------------------
        self.adopt_frame();

        //--- 3. Draw window ------------------------------------------------
        self.draw()?;

        if self.state == LoopState::Draining && self.drain_complete() {
            self.finish();
            return Ok(self.state);
        }

        //--- 4. Pacing -----------------------------------------------------
        self.pacer
            .pace(self.clock.as_ref(), iteration_start, self.hidden);

        //--- 5. Reconfiguration --------------------------------------------
        self.apply_pending_reconfigure()?;

        Ok(self.state)
    }

    //--- Events -----------------------------------------------------------

    fn pump_events(&mut self) -> Result<(), RenderLoopError> {
        let mut events = std::mem::take(&mut self.event_buf);
        self.backend.poll_events(&mut events);

        let mut surface_lost = false;
        for event in events.drain(..) {
            match event {
                BackendEvent::Resized {
                    physical_width,
                    physical_height,
                    scale_factor,
                } => self.on_resized(physical_width, physical_height, scale_factor),
                BackendEvent::CloseRequested => self.on_close_requested(),
                BackendEvent::DeviceAdded(device) => {
                    self.devices
                        .on_device_added(device.os_index, device.instance_id, device.name);
                }
                BackendEvent::DeviceRemoved { os_index } => {
                    self.devices.on_device_removed(os_index);
                }
                BackendEvent::DeviceInput { instance_id, input } => {
                    self.devices.forward_input(instance_id, input);
                }
                BackendEvent::Hidden => self.set_hidden(true),
                BackendEvent::Shown => self.set_hidden(false),
                BackendEvent::SurfaceLost => surface_lost = true,
            }
        }
        self.event_buf = events;

        if surface_lost {
            self.recover_surface()?;
        }
        Ok(())
    }

    fn on_resized(&mut self, physical_width: u32, physical_height: u32, scale_factor: f64) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.physical_size = (physical_width, physical_height);
        surface.scale_factor = scale_factor;
        let info = *surface;
        debug!(
            target: "render",
            "Resized to {}x{} @ {}x",
            physical_width,
            physical_height,
            scale_factor
        );
        self.notify_size(info);
    }

    /// Debounced close handling.
    ///
    /// The first accepted close asks the producer to quit and starts
    /// draining. Closes within `close_debounce` of the last accepted one
    /// are duplicates. An accepted close while already draining stops the
    /// loop without waiting for the producer.
    fn on_close_requested(&mut self) {
        let now = self.clock.now();
        if let Some(last) = self.last_close {
            if now.saturating_duration_since(last) < self.config.close_debounce() {
                debug!(target: "render", "Duplicate close request ignored");
                return;
            }
        }
        self.last_close = Some(now);

        if self.state == LoopState::Draining {
            info!(target: "render", "Close requested again while draining; stopping");
            self.force_stop = true;
            return;
        }

        if !self.quit_sent {
            self.quit_sent = true;
            self.notify(RenderEvent::QuitRequested);
        }
        self.begin_draining("close requested");
    }

    fn set_hidden(&mut self, hidden: bool) {
        if self.hidden != hidden {
            debug!(target: "render", "Window {}", if hidden { "hidden" } else { "shown" });
            self.hidden = hidden;
        }
    }

    //--- Frames -----------------------------------------------------------

    fn adopt_frame(&mut self) {
        let Some(next) = self.shared.slot.take() else {
            return;
        };

        if let Some(current) = &self.current {
            let current_number = current.frame.frame_number();
            if next.frame_number() <= current_number {
                warn!(
                    target: "render",
                    "Rejecting frame {}: not newer than current frame {}",
                    next.frame_number(),
                    current_number
                );
                self.stats.frames_rejected += 1;
                if next.has_lifecycle_work() {
                    self.lifecycle_backlog.push_back(CurrentFrame::new(next));
                } else {
                    self.retire(next);
                }
                return;
            }
        }

        trace!(target: "render", "Adopted frame {}", next.frame_number());
        self.stats.frames_adopted += 1;
        if let Some(previous) = self.current.replace(CurrentFrame::new(next)) {
            if previous.lifecycle_done() {
                self.retire(previous.frame);
            } else {
                self.lifecycle_backlog.push_back(previous);
            }
        }
    }

    fn retire(&self, frame: Arc<FrameDefinition>) {
        if let (Ok(frame), Some(recycler)) = (Arc::try_unwrap(frame), &self.recycler) {
            recycler.recycle(frame);
        }
    }

    //--- Drawing ----------------------------------------------------------

    fn draw(&mut self) -> Result<(), RenderLoopError> {
        let mut finished = Vec::new();
        let outcome = {
            let queue = &self.shared.queue;
            let window = queue.open_draw_window();

            let report = window.drain_and_run(self.backend.as_mut());
            self.stats.ops_run += report.ran as u64;
            self.stats.ops_failed += report.failed as u64;

            let backlog = apply_backlog(
                self.backend.as_mut(),
                queue,
                &mut self.lifecycle_backlog,
                &mut finished,
            );
            match (backlog, self.current.as_mut()) {
                (Err(e), _) => Err(e),
                (Ok(()), Some(current)) => {
                    draw_frame(self.backend.as_mut(), queue, current, self.hidden)
                }
                (Ok(()), None) => Ok(None),
            }
        };

        for frame in finished {
            self.retire(frame);
        }

        match outcome {
            Ok(Some(frame_number)) => {
                self.stats.presents += 1;
                self.shared.slot.mark_drawn(frame_number);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(BackendError::SurfaceLost) => self.recover_surface(),
            Err(e) => {
                error!(target: "render", "Draw failed: {}", e);
                Ok(())
            }
        }
    }

    //--- Surface ----------------------------------------------------------

    /// Tears down and recreates the surface with the last configuration.
    ///
    /// The in-flight frame loses its passes but keeps its lifecycle lists,
    /// which still get applied once on the new surface.
    fn recover_surface(&mut self) -> Result<(), RenderLoopError> {
        warn!(target: "render", "Rendering surface lost; recreating");
        self.stats.surface_recoveries += 1;

        self.backend.destroy();
        let info = self
            .backend
            .create(&self.config)
            .map_err(RenderLoopError::Recovery)?;
        self.apply_surface_info(info);

        let hooks = self.shared.queue.reenqueue_surface_hooks();
        debug!(target: "render", "Re-queued {} surface hooks", hooks);

        if let Some(current) = self.current.as_mut() {
            current.passes_dropped = true;
        }
        Ok(())
    }

    fn apply_surface_info(&mut self, info: SurfaceInfo) {
        self.surface = Some(info);
        self.pacer.set_vsync_active(info.vsync_active);
        self.notify_size(info);
    }

    fn notify_size(&self, info: SurfaceInfo) {
        let (logical_width, logical_height) = info.logical_size();
        self.notify(RenderEvent::WindowResized {
            logical_width,
            logical_height,
            scale_factor: info.scale_factor,
        });
    }

    fn apply_pending_reconfigure(&mut self) -> Result<(), RenderLoopError> {
        let Some(requested) = self.shared.reconfigure.swap(None) else {
            return Ok(());
        };
        let next = DisplayConfig::clone(&requested);
        if next == self.config.display {
            return Ok(());
        }

        info!(target: "render", "Applying display settings: {:?}", next);
        let reload = self.config.display.needs_surface_reload(&next);

        let result = {
            let _window = self.shared.queue.open_draw_window();
            self.backend.apply_config(&next)
        };

        match result {
            Ok(info) => {
                self.pacer.set_max_fps(next.max_fps);
                self.config.display = next;
                self.apply_surface_info(info);
                if reload {
                    self.shared.queue.reenqueue_surface_hooks();
                }
                Ok(())
            }
            Err(BackendError::SurfaceLost) => {
                self.config.display = next;
                self.pacer.set_max_fps(self.config.display.max_fps);
                self.recover_surface()
            }
            Err(e) => {
                error!(target: "render", "Display reconfiguration failed: {}", e);
                Ok(())
            }
        }
    }

    //--- Shutdown ---------------------------------------------------------

    fn begin_draining(&mut self, reason: &str) {
        if self.state != LoopState::Running {
            return;
        }
        info!(target: "render", "Draining: {}", reason);
        self.shared.slot.close();
        self.state = LoopState::Draining;
        self.drain_started = Some(self.clock.now());
    }

    fn drain_complete(&self) -> bool {
        if self.force_stop || self.shared.stop_requested.load(Ordering::Acquire) {
            return true;
        }
        self.drain_started.is_some_and(|started| {
            self.clock.now().saturating_duration_since(started) >= self.config.drain_timeout()
        })
    }

    /// Final drain, context teardown and the `Stopped` notification.
    fn finish(&mut self) {
        self.shared.queue.close();
        if let Some(current) = self.current.take() {
            self.lifecycle_backlog.push_back(current);
        }

        let mut finished = Vec::new();
        {
            let window = self.shared.queue.open_draw_window();
            let report = window.drain_and_run(self.backend.as_mut());
            self.stats.ops_run += report.ran as u64;
            self.stats.ops_failed += report.failed as u64;

            let queue = &self.shared.queue;
            if let Err(e) = apply_backlog(
                self.backend.as_mut(),
                queue,
                &mut self.lifecycle_backlog,
                &mut finished,
            ) {
                warn!(target: "render", "Final lifecycle requests not applied: {}", e);
            }
        }

        self.backend.destroy();

        for frame in finished {
            self.retire(frame);
        }
        while let Some(pending) = self.lifecycle_backlog.pop_front() {
            debug!(
                target: "render",
                "Dropping unapplied lifecycle lists of frame {}",
                pending.frame.frame_number()
            );
            self.retire(pending.frame);
        }
        if let Some(left) = self.shared.slot.clear() {
            debug!(target: "render", "Discarding unadopted frame {}", left.frame_number());
        }

        self.state = LoopState::Stopped;
        self.shared.stopped.store(true, Ordering::Release);
        self.notify(RenderEvent::Stopped);
        info!(target: "render", "Render loop stopped");
    }

    /// Fatal-error shutdown: nothing more is accepted, pending ops still
    /// run once against whatever the backend has left.
    fn abort(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.shared.slot.close();
        self.finish();
    }

    fn notify(&self, event: RenderEvent) {
        if self.events.send(event).is_err() {
            trace!(target: "render", "Producer gone; render event dropped");
        }
    }
}

//=== Frame Drawing =======================================================

/// Draws `current` once. Returns the frame number if it was presented.
///
/// Creates run before any pass and destroys after all passes, each
/// request at most once per frame. Only `SurfaceLost` aborts the draw;
/// other backend failures are logged per call.
fn draw_frame(
    backend: &mut dyn DisplayBackend,
    queue: &GraphicsContextQueue,
    current: &mut CurrentFrame,
    hidden: bool,
) -> Result<Option<i64>, BackendError> {
    let draw_passes = !hidden && !current.passes_dropped;

    apply_creates(backend, queue, current)?;

    if draw_passes {
        let frame = &current.frame;
        for pass in frame.passes().filter(|pass| !pass.is_empty()) {
            queue.check_graphics_allowed("execute_pass");
            tolerate(backend.execute_pass(frame, pass), "execute_pass")?;
        }
    }

    apply_destroys(backend, queue, current)?;

    if !draw_passes {
        return Ok(None);
    }

    queue.check_graphics_allowed("present");
    match backend.present() {
        Ok(()) => Ok(Some(current.frame.frame_number())),
        Err(BackendError::SurfaceLost) => Err(BackendError::SurfaceLost),
        Err(e) => {
            error!(target: "render", "present failed: {}", e);
            Ok(None)
        }
    }
}

fn apply_creates(
    backend: &mut dyn DisplayBackend,
    queue: &GraphicsContextQueue,
    current: &mut CurrentFrame,
) -> Result<(), BackendError> {
    for mesh in &current.frame.mesh_data_creates()[current.creates_applied..] {
        queue.check_graphics_allowed("create_mesh_data");
        tolerate(backend.create_mesh_data(mesh), "create_mesh_data")?;
        current.creates_applied += 1;
    }
    Ok(())
}

fn apply_destroys(
    backend: &mut dyn DisplayBackend,
    queue: &GraphicsContextQueue,
    current: &mut CurrentFrame,
) -> Result<(), BackendError> {
    for id in &current.frame.mesh_data_destroys()[current.destroys_applied..] {
        queue.check_graphics_allowed("destroy_mesh_data");
        tolerate(backend.destroy_mesh_data(*id), "destroy_mesh_data")?;
        current.destroys_applied += 1;
    }
    Ok(())
}

/// Applies what is left of the backlog's lifecycle lists, oldest frame
/// first. Fully applied frames move to `finished`.
fn apply_backlog(
    backend: &mut dyn DisplayBackend,
    queue: &GraphicsContextQueue,
    backlog: &mut VecDeque<CurrentFrame>,
    finished: &mut Vec<Arc<FrameDefinition>>,
) -> Result<(), BackendError> {
    while let Some(pending) = backlog.front_mut() {
        apply_creates(backend, queue, pending)?;
        apply_destroys(backend, queue, pending)?;
        if let Some(done) = backlog.pop_front() {
            trace!(
                target: "render",
                "Applied remaining lifecycle lists of frame {}",
                done.frame.frame_number()
            );
            finished.push(done.frame);
        }
    }
    Ok(())
}

/// Lets everything but surface loss through as a logged failure.
fn tolerate(result: Result<(), BackendError>, what: &str) -> Result<(), BackendError> {
    match result {
        Err(BackendError::SurfaceLost) => Err(BackendError::SurfaceLost),
        Err(e) => {
            error!(target: "render", "{} failed: {}", what, e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{MeshData, MeshDataId, PassKind};
    use crate::core::input::DeviceInput;
    use crate::core::pacing::ManualClock;
    use crate::platform::headless::{BackendCall, CallLog, HeadlessBackend, HeadlessControl};
    use crate::platform::DeviceDescriptor;
    use std::time::Duration;

    struct Harness {
        render_loop: RenderLoop,
        handle: ProducerHandle,
        events: Receiver<RenderEvent>,
        log: CallLog,
        control: HeadlessControl,
        clock: ManualClock,
    }

    fn config() -> RenderLoopConfig {
        RenderLoopConfig {
            strict_graphics_context: true,
            ..RenderLoopConfig::default()
        }
    }

    fn harness_with(config: RenderLoopConfig, backend: HeadlessBackend) -> Harness {
        let log = backend.call_log();
        let control = backend.control();
        let clock = ManualClock::new(Duration::from_millis(1));
        let (render_loop, handle, events) = RenderLoop::new(config, Box::new(backend));
        Harness {
            render_loop: render_loop.with_clock(clock.clone()),
            handle,
            events,
            log,
            control,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(config(), HeadlessBackend::new())
    }

    fn frame(n: i64) -> FrameDefinition {
        let mut f = FrameDefinition::new();
        f.set_frame_number(n);
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(0), 0);
        f.finalize();
        f
    }

    fn events(h: &Harness) -> Vec<RenderEvent> {
        h.events.try_iter().collect()
    }

    fn marker(
        log: &CallLog,
        label: &str,
    ) -> impl FnOnce(&mut dyn DisplayBackend) -> Result<(), GraphicsError> + Send + 'static {
        let log = log.clone();
        let label = label.to_string();
        move |_: &mut dyn DisplayBackend| {
            log.push(BackendCall::Marker(label));
            Ok(())
        }
    }

    //=====================================================================
    // Startup
    //=====================================================================

    #[test]
    fn startup_reports_size_and_devices() {
        let backend = HeadlessBackend::new()
            .with_scale_factor(2.0)
            .with_devices(vec![DeviceDescriptor {
                os_index: 0,
                instance_id: 7,
                name: "Pad".into(),
            }]);
        let mut h = harness_with(config(), backend);

        h.render_loop.start().unwrap();

        assert_eq!(h.render_loop.state(), LoopState::Running);
        assert_eq!(h.render_loop.logical_size(), Some((800.0, 600.0)));
        let events = events(&h);
        assert_eq!(
            events[0],
            RenderEvent::WindowResized {
                logical_width: 800.0,
                logical_height: 600.0,
                scale_factor: 2.0,
            }
        );
        assert!(matches!(&events[1], RenderEvent::DeviceAdded { name, .. } if name == "Pad"));
        assert!(h.render_loop.devices().lookup_instance(7).is_some());
    }

    #[test]
    fn startup_failure_is_fatal() {
        let backend = HeadlessBackend::new()
            .with_create_failure(BackendError::ContextCreation("no gpu".into()));
        let mut h = harness_with(config(), backend);

        let result = h.render_loop.start();

        assert!(matches!(result, Err(RenderLoopError::Startup(_))));
        assert_eq!(h.render_loop.state(), LoopState::Stopped);
        assert!(h.handle.is_stopped());
        assert!(events(&h).contains(&RenderEvent::Stopped));
        assert!(h.handle.publish_frame(frame(1)).is_err());
        assert!(matches!(
            h.render_loop.run_iteration(),
            Err(RenderLoopError::AlreadyStopped)
        ));
    }

    //=====================================================================
    // Frame Adoption
    //=====================================================================

    #[test]
    fn draws_newest_published_frame() {
        let mut h = harness();
        for n in 1..=3 {
            h.handle.publish_frame(frame(n)).unwrap();
        }

        h.render_loop.run_iteration().unwrap();

        assert_eq!(h.handle.last_drawn_frame(), Some(3));
        assert_eq!(h.handle.frames_dropped(), 2);
        assert_eq!(
            h.log.count(|c| matches!(c, BackendCall::Pass { frame: 3, .. })),
            1
        );
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::Pass { .. })), 1);
    }

    #[test]
    fn drawn_sequence_numbers_never_decrease() {
        let mut h = harness();
        let mut drawn = Vec::new();

        for n in [1, 2, 2, 5, 3, 6] {
            if h.handle.publish_frame(frame(n)).is_ok() {
                h.render_loop.run_iteration().unwrap();
                drawn.push(h.handle.last_drawn_frame().unwrap());
            }
        }

        assert_eq!(drawn, vec![1, 2, 2, 5, 5, 6]);
        assert_eq!(h.render_loop.stats().frames_rejected, 2);
    }

    #[test]
    fn keeps_redrawing_current_frame_without_new_ones() {
        let mut h = harness();
        h.handle.publish_frame(frame(1)).unwrap();

        for _ in 0..3 {
            h.render_loop.run_iteration().unwrap();
        }

        assert_eq!(h.log.count(|c| *c == BackendCall::Present), 3);
        assert_eq!(h.render_loop.stats().frames_adopted, 1);
    }

    #[test]
    fn retired_frames_return_to_pool() {
        let pool = crate::core::frame::FramePool::new(4);
        let (render_loop, handle, _events) =
            RenderLoop::new(config(), Box::new(HeadlessBackend::new()));
        let mut render_loop = render_loop
            .with_clock(ManualClock::default())
            .with_recycler(pool.recycler());

        handle.publish_frame(frame(1)).unwrap();
        render_loop.run_iteration().unwrap();
        handle.publish_frame(frame(2)).unwrap();
        render_loop.run_iteration().unwrap();

        assert_eq!(pool.idle(), 1);
    }

    //=====================================================================
    // Draw Order / Lifecycle
    //=====================================================================

    #[test]
    fn ops_then_creates_then_passes_then_destroys() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        h.log.clear();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(5)));
        f.begin_pass(PassKind::Overlay).draw_mesh(MeshDataId(5), 0);
        f.begin_pass(PassKind::LightShadow).draw_mesh(MeshDataId(5), 0);
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(5), 1);
        f.add_mesh_data_destroy(MeshDataId(4));
        f.finalize();

        h.handle.enqueue_graphics_op(marker(&h.log, "op"));
        h.handle.publish_frame(f).unwrap();
        h.render_loop.run_iteration().unwrap();

        assert_eq!(
            h.log.snapshot(),
            vec![
                BackendCall::Marker("op".into()),
                BackendCall::CreateMesh(MeshDataId(5)),
                BackendCall::Pass { frame: 1, kind: PassKind::LightShadow },
                BackendCall::Pass { frame: 1, kind: PassKind::Beauty },
                BackendCall::Pass { frame: 1, kind: PassKind::Overlay },
                BackendCall::DestroyMesh(MeshDataId(4)),
                BackendCall::Present,
            ]
        );
    }

    #[test]
    fn repeated_draws_do_not_reapply_lifecycle() {
        let mut h = harness();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        f.add_mesh_data_destroy(MeshDataId(2));
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(1), 0);
        f.finalize();
        h.handle.publish_frame(f).unwrap();

        for _ in 0..4 {
            h.render_loop.run_iteration().unwrap();
        }

        assert_eq!(h.log.count(|c| matches!(c, BackendCall::CreateMesh(_))), 1);
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::DestroyMesh(_))), 1);
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::Pass { .. })), 4);
    }

    #[test]
    fn surface_loss_between_destroys_resumes_at_failed_request() {
        let mut h = harness();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        f.add_mesh_data_destroy(MeshDataId(20));
        f.add_mesh_data_destroy(MeshDataId(21));
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(1), 0);
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.control
            .fail_next_destroy_mesh(MeshDataId(21), BackendError::SurfaceLost);

        for _ in 0..3 {
            h.render_loop.run_iteration().unwrap();
        }

        assert_eq!(h.render_loop.stats().surface_recoveries, 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::CreateMesh(MeshDataId(1))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(20))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(21))), 1);

        let log = h.log.snapshot();
        let recreated = log.iter().rposition(|c| *c == BackendCall::Create).unwrap();
        let destroyed = log
            .iter()
            .position(|c| *c == BackendCall::DestroyMesh(MeshDataId(21)))
            .unwrap();
        assert!(destroyed > recreated);
    }

    #[test]
    fn surface_loss_during_pass_still_applies_destroys_once() {
        let mut h = harness();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        f.add_mesh_data_destroy(MeshDataId(2));
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(1), 0);
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.control.fail_next_pass(BackendError::SurfaceLost);

        for _ in 0..3 {
            h.render_loop.run_iteration().unwrap();
        }

        assert_eq!(h.render_loop.stats().surface_recoveries, 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::CreateMesh(MeshDataId(1))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(2))), 1);
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::Pass { .. })), 0);
        assert_eq!(h.handle.last_drawn_frame(), None);
    }

    #[test]
    fn rejected_frame_lifecycle_is_still_applied() {
        let mut h = harness();
        h.handle.publish_frame(frame(5)).unwrap();
        h.render_loop.run_iteration().unwrap();

        let mut stale = FrameDefinition::new();
        stale.set_frame_number(5);
        stale.add_mesh_data_create(MeshData::new(MeshDataId(8)));
        stale.add_mesh_data_destroy(MeshDataId(7));
        stale.finalize();
        h.handle.publish_frame(stale).unwrap();

        for _ in 0..2 {
            h.render_loop.run_iteration().unwrap();
        }

        assert_eq!(h.render_loop.stats().frames_rejected, 1);
        assert_eq!(h.render_loop.current_frame_number(), Some(5));
        assert_eq!(h.log.count(|c| *c == BackendCall::CreateMesh(MeshDataId(8))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(7))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::Present), 3);
    }

    #[test]
    fn lifecycle_left_by_surface_loss_survives_frame_replacement() {
        let mut h = harness();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_destroy(MeshDataId(30));
        f.add_mesh_data_destroy(MeshDataId(31));
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(0), 0);
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.control
            .fail_next_destroy_mesh(MeshDataId(31), BackendError::SurfaceLost);
        h.render_loop.run_iteration().unwrap();

        h.handle.publish_frame(frame(2)).unwrap();
        h.render_loop.run_iteration().unwrap();

        assert_eq!(h.handle.last_drawn_frame(), Some(2));
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(30))), 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(31))), 1);
    }

    #[test]
    fn hidden_window_drains_ops_and_lifecycle_but_skips_passes() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        h.control.push_event(BackendEvent::Hidden);

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(3)));
        f.begin_pass(PassKind::Beauty).draw_mesh(MeshDataId(3), 0);
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.handle.enqueue_graphics_op(marker(&h.log, "op"));

        let before = h.clock.elapsed();
        h.render_loop.run_iteration().unwrap();

        assert!(h.render_loop.is_hidden());
        assert_eq!(h.log.count(|c| *c == BackendCall::Marker("op".into())), 1);
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::CreateMesh(_))), 1);
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::Pass { .. })), 0);
        assert_eq!(h.log.count(|c| *c == BackendCall::Present), 0);
        assert_eq!(h.clock.elapsed() - before, Duration::from_millis(100));
        assert_eq!(h.handle.last_drawn_frame(), None);

        h.control.push_event(BackendEvent::Shown);
        h.render_loop.run_iteration().unwrap();
        assert_eq!(h.handle.last_drawn_frame(), Some(1));
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::CreateMesh(_))), 1);
    }

    //=====================================================================
    // Close / Shutdown
    //=====================================================================

    #[test]
    fn duplicate_close_requests_yield_one_quit() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        let _ = events(&h);

        for _ in 0..3 {
            h.control.push_event(BackendEvent::CloseRequested);
        }
        h.render_loop.run_iteration().unwrap();

        let quits = events(&h)
            .into_iter()
            .filter(|e| *e == RenderEvent::QuitRequested)
            .count();
        assert_eq!(quits, 1);
        assert_eq!(h.render_loop.state(), LoopState::Draining);
        assert!(matches!(
            h.handle.publish_frame(frame(9)),
            Err(HandoffError::Closed(_))
        ));
    }

    #[test]
    fn producer_stop_finishes_draining() {
        let mut h = harness();
        h.control.push_event(BackendEvent::CloseRequested);
        h.render_loop.run_iteration().unwrap();
        assert_eq!(h.render_loop.state(), LoopState::Draining);

        h.handle.enqueue_graphics_op(marker(&h.log, "teardown"));
        h.handle.request_stop();
        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Stopped);

        let log = h.log.snapshot();
        let n = log.len();
        assert_eq!(log[n - 2], BackendCall::Marker("teardown".into()));
        assert_eq!(log[n - 1], BackendCall::Destroy);
        assert!(h.handle.is_stopped());
        assert!(events(&h).contains(&RenderEvent::Stopped));
        assert!(!h.handle.enqueue_graphics_op(|_| Ok(())));
    }

    #[test]
    fn second_close_after_debounce_forces_stop() {
        let mut h = harness();
        h.control.push_event(BackendEvent::CloseRequested);
        h.render_loop.run_iteration().unwrap();

        h.clock.advance(Duration::from_millis(300));
        h.control.push_event(BackendEvent::CloseRequested);
        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Stopped);

        let quits = events(&h)
            .into_iter()
            .filter(|e| *e == RenderEvent::QuitRequested)
            .count();
        assert_eq!(quits, 1);
    }

    #[test]
    fn close_within_debounce_does_not_force_stop() {
        let mut h = harness();
        h.control.push_event(BackendEvent::CloseRequested);
        h.render_loop.run_iteration().unwrap();

        h.control.push_event(BackendEvent::CloseRequested);
        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Draining);
    }

    #[test]
    fn closes_ten_ms_apart_fall_in_one_debounce_window() {
        let mut h = harness_with(
            RenderLoopConfig {
                close_debounce_ms: 500,
                display: DisplayConfig {
                    max_fps: 0,
                    ..DisplayConfig::default()
                },
                ..config()
            },
            HeadlessBackend::new(),
        );
        h.control.push_event(BackendEvent::CloseRequested);
        h.render_loop.run_iteration().unwrap();

        h.clock.advance(Duration::from_millis(10));
        h.control.push_event(BackendEvent::CloseRequested);
        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Draining);
        assert!(h.clock.elapsed() < Duration::from_millis(500));

        let quits = events(&h)
            .into_iter()
            .filter(|e| *e == RenderEvent::QuitRequested)
            .count();
        assert_eq!(quits, 1);

        // The window counts from the first close, not the ignored one.
        h.clock.advance(Duration::from_millis(495));
        h.control.push_event(BackendEvent::CloseRequested);
        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Stopped);
    }

    #[test]
    fn draining_times_out_without_producer() {
        let mut h = harness_with(
            RenderLoopConfig {
                drain_timeout_ms: 100,
                ..config()
            },
            HeadlessBackend::new(),
        );
        h.control.push_event(BackendEvent::CloseRequested);

        let mut iterations = 0;
        while h.render_loop.run_iteration().unwrap() != LoopState::Stopped {
            iterations += 1;
            assert!(iterations < 20, "drain never timed out");
        }
        assert!(h.clock.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn frame_published_before_close_is_still_drawn() {
        let mut h = harness();
        h.render_loop.start().unwrap();

        let mut f = FrameDefinition::new();
        f.set_frame_number(4);
        f.add_mesh_data_destroy(MeshDataId(8));
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.handle.request_stop();

        assert_eq!(h.render_loop.run_iteration().unwrap(), LoopState::Stopped);
        assert_eq!(h.log.count(|c| *c == BackendCall::DestroyMesh(MeshDataId(8))), 1);
    }

    #[test]
    fn run_returns_stats_after_stop() {
        let (render_loop, handle, _events) =
            RenderLoop::new(config(), Box::new(HeadlessBackend::new()));
        handle.publish_frame(frame(1)).unwrap();
        handle.request_stop();

        let stats = render_loop.with_clock(ManualClock::default()).run().unwrap();

        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.presents, 1);
        assert!(handle.is_stopped());
    }

    //=====================================================================
    // Surface Loss
    //=====================================================================

    #[test]
    fn surface_loss_recreates_and_reruns_hooks() {
        let mut h = harness();
        let hook_log = h.log.clone();
        h.handle.add_surface_hook(Arc::new(move |_: &mut dyn DisplayBackend| {
            hook_log.push(BackendCall::Marker("hook".into()));
            Ok(())
        }));
        h.handle.publish_frame(frame(1)).unwrap();
        h.render_loop.run_iteration().unwrap();

        h.control.fail_next_present(BackendError::SurfaceLost);
        h.render_loop.run_iteration().unwrap();

        assert_eq!(h.render_loop.stats().surface_recoveries, 1);
        assert_eq!(h.log.count(|c| *c == BackendCall::Create), 2);
        assert_eq!(h.log.count(|c| *c == BackendCall::Destroy), 1);

        // In-flight frame's passes are dropped after recovery.
        let passes_before = h.log.count(|c| matches!(c, BackendCall::Pass { .. }));
        h.render_loop.run_iteration().unwrap();
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::Pass { .. })), passes_before);
        assert_eq!(h.log.count(|c| *c == BackendCall::Marker("hook".into())), 2);

        h.handle.publish_frame(frame(2)).unwrap();
        h.render_loop.run_iteration().unwrap();
        assert_eq!(h.handle.last_drawn_frame(), Some(2));
    }

    #[test]
    fn surface_lost_event_keeps_pending_lifecycle() {
        let mut h = harness();
        h.render_loop.start().unwrap();

        let mut f = FrameDefinition::new();
        f.set_frame_number(1);
        f.add_mesh_data_create(MeshData::new(MeshDataId(1)));
        f.finalize();
        h.handle.publish_frame(f).unwrap();
        h.control.push_event(BackendEvent::SurfaceLost);

        h.render_loop.run_iteration().unwrap();

        assert_eq!(h.log.count(|c| *c == BackendCall::Create), 2);
        assert_eq!(h.log.count(|c| *c == BackendCall::CreateMesh(MeshDataId(1))), 1);
    }

    //=====================================================================
    // Events / Devices
    //=====================================================================

    #[test]
    fn resize_reports_logical_size() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        let _ = events(&h);

        h.control.push_event(BackendEvent::Resized {
            physical_width: 1920,
            physical_height: 1080,
            scale_factor: 2.0,
        });
        h.render_loop.run_iteration().unwrap();

        assert_eq!(
            events(&h),
            vec![RenderEvent::WindowResized {
                logical_width: 960.0,
                logical_height: 540.0,
                scale_factor: 2.0,
            }]
        );
    }

    #[test]
    fn device_hot_plug_is_forwarded() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        let _ = events(&h);

        let pad = |instance_id| {
            BackendEvent::DeviceAdded(DeviceDescriptor {
                os_index: 3,
                instance_id,
                name: "Pad".into(),
            })
        };
        let press = DeviceInput::Button { button: 0, pressed: true };

        h.control.push_event(pad(30));
        h.control.push_event(BackendEvent::DeviceInput { instance_id: 30, input: press });
        h.control.push_event(BackendEvent::DeviceInput { instance_id: 99, input: press });
        h.control.push_event(BackendEvent::DeviceRemoved { os_index: 3 });
        h.control.push_event(pad(31));
        h.render_loop.run_iteration().unwrap();

        let events = events(&h);
        assert_eq!(events.len(), 4);
        let RenderEvent::DeviceAdded { handle: first, .. } = events[0].clone() else {
            panic!("expected DeviceAdded, got {:?}", events[0]);
        };
        assert_eq!(events[1], RenderEvent::DeviceInput { handle: first, input: press });
        assert_eq!(events[2], RenderEvent::DeviceRemoved { handle: first });
        let RenderEvent::DeviceAdded { handle: second, .. } = events[3].clone() else {
            panic!("expected DeviceAdded, got {:?}", events[3]);
        };
        assert_ne!(first, second);
    }

    //=====================================================================
    // Reconfiguration
    //=====================================================================

    #[test]
    fn latest_reconfigure_request_wins() {
        let mut h = harness();
        h.render_loop.start().unwrap();

        h.handle.request_reconfigure(DisplayConfig {
            max_fps: 120,
            ..DisplayConfig::default()
        });
        h.handle.request_reconfigure(DisplayConfig {
            fullscreen: true,
            max_fps: 30,
            ..DisplayConfig::default()
        });
        h.render_loop.run_iteration().unwrap();

        assert_eq!(
            h.log.count(|c| matches!(c, BackendCall::ApplyConfig { .. })),
            1
        );
        assert_eq!(
            h.log.count(|c| *c == BackendCall::ApplyConfig { fullscreen: true }),
            1
        );
        assert_eq!(h.render_loop.pacer().max_fps(), 30);
        assert!(h.render_loop.config().display.fullscreen);
    }

    #[test]
    fn fullscreen_switch_reruns_surface_hooks() {
        let mut h = harness();
        let hook_log = h.log.clone();
        h.handle.add_surface_hook(Arc::new(move |_: &mut dyn DisplayBackend| {
            hook_log.push(BackendCall::Marker("hook".into()));
            Ok(())
        }));
        h.render_loop.run_iteration().unwrap();

        h.handle.request_reconfigure(DisplayConfig {
            fullscreen: true,
            ..DisplayConfig::default()
        });
        h.render_loop.run_iteration().unwrap();
        h.render_loop.run_iteration().unwrap();

        assert_eq!(h.log.count(|c| *c == BackendCall::Marker("hook".into())), 2);
    }

    #[test]
    fn unchanged_reconfigure_is_ignored() {
        let mut h = harness();
        h.render_loop.start().unwrap();
        h.handle.request_reconfigure(DisplayConfig::default());
        h.render_loop.run_iteration().unwrap();
        assert_eq!(h.log.count(|c| matches!(c, BackendCall::ApplyConfig { .. })), 0);
    }
}
