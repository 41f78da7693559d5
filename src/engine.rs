//=========================================================================
// Render Pipeline
//
// Main entry point: wires a producer thread to the render loop.
//
// Architecture:
// ```text
//     PipelineBuilder  ──build(backend)──>  Pipeline  ──run(producer)──>
//         │                                    │
//         ├─ with_config()                     ├─ spawns the producer thread
//         ├─ with_max_fps() / with_vsync()     ├─ runs RenderLoop here
//         └─ with_frame_pool_capacity()        └─ joins the producer on exit
// ```
//
// The loop must run on the thread that owns the window (the main thread
// on most desktop platforms), so `run` blocks the caller and the producer
// gets its own thread.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::thread;
use std::time::Duration;

use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::config::{RenderLoopConfig, VSyncMode};
use crate::core::bridge::{EventCollector, TickControl};
use crate::core::frame::{FrameDefinition, FramePool};
use crate::core::pacing::Clock;
use crate::core::render_loop::{LoopStats, ProducerHandle, RenderLoop};
use crate::error::{HandoffError, RenderLoopError};
use crate::platform::DisplayBackend;

//=== PipelineBuilder =====================================================

/// Builder for configuring and constructing a [`Pipeline`].
///
/// # Default Values
///
/// - **Config**: [`RenderLoopConfig::default`] (60 fps cap, vsync auto,
///   250 ms close debounce)
/// - **Frame pool capacity**: 3 definitions
///
/// # Examples
///
/// ```no_run
/// use aetheric_render::PipelineBuilder;
/// use aetheric_render::core::frame::PassKind;
/// use aetheric_render::platform::headless::HeadlessBackend;
///
/// PipelineBuilder::new()
///     .with_max_fps(120)
///     .build(HeadlessBackend::new())
///     .run(|mut producer| {
///         for n in 1..=100 {
///             if !producer.tick() {
///                 break;
///             }
///             let mut frame = producer.next_frame();
///             frame.set_frame_number(n);
///             frame.begin_pass(PassKind::Beauty);
///             frame.finalize();
///             producer.publish(frame);
///         }
///     })
///     .unwrap();
/// ```
pub struct PipelineBuilder {
    config: RenderLoopConfig,
    frame_pool_capacity: usize,
    clock: Option<Box<dyn Clock>>,
}

impl PipelineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RenderLoopConfig::default(),
            frame_pool_capacity: 3,
            clock: None,
        }
    }

    /// Replaces the whole configuration, e.g. one loaded from TOML.
    pub fn with_config(mut self, config: RenderLoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Software frame-rate cap. `0` leaves the loop unbounded.
    pub fn with_max_fps(mut self, max_fps: u32) -> Self {
        self.config.display.max_fps = max_fps;
        self
    }

    pub fn with_vsync(mut self, vsync: VSyncMode) -> Self {
        self.config.display.vsync = vsync;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.config.display.fullscreen = fullscreen;
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.config.window_title = title.into();
        self
    }

    /// Window during which repeated close requests count as one.
    pub fn with_close_debounce(mut self, window: Duration) -> Self {
        self.config.close_debounce_ms = window.as_millis() as u64;
        self
    }

    /// How long a quit request waits for the producer before stopping.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.drain_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_strict_graphics_context(mut self, strict: bool) -> Self {
        self.config.strict_graphics_context = strict;
        self
    }

    /// Number of idle frame definitions kept for reuse.
    ///
    /// Default: 3
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_frame_pool_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Frame pool capacity must be positive");
        self.frame_pool_capacity = capacity;
        self
    }

    /// Replaces the loop's time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Builds the pipeline around `backend`.
    pub fn build(self, backend: impl DisplayBackend + 'static) -> Pipeline {
        info!(
            "Building render pipeline ({} backend, max_fps: {}, vsync: {:?})",
            backend.name(),
            self.config.display.max_fps,
            self.config.display.vsync
        );

        let (render_loop, handle, events) = RenderLoop::new(self.config, Box::new(backend));
        let render_loop = match self.clock {
            Some(clock) => render_loop.with_boxed_clock(clock),
            None => render_loop,
        };

        Pipeline {
            render_loop,
            handle,
            events: EventCollector::new(events),
            frame_pool: FramePool::new(self.frame_pool_capacity),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Producer ============================================================

/// Everything the producer thread works with.
pub struct Producer {
    handle: ProducerHandle,
    events: EventCollector,
    frame_pool: FramePool,
}

impl Producer {
    /// Collects render events for this tick. Returns `false` once the
    /// render loop asked to quit or has stopped, and on every call after.
    pub fn tick(&mut self) -> bool {
        self.events.collect_tick() == TickControl::Continue
    }

    /// An empty frame definition, reused from the pool when possible.
    pub fn next_frame(&mut self) -> FrameDefinition {
        self.frame_pool.acquire()
    }

    /// Publishes a finalized frame. Frames that never reach the consumer
    /// go back to the pool. Returns `false` once the loop is draining.
    pub fn publish(&mut self, frame: FrameDefinition) -> bool {
        match self.handle.publish_frame(frame) {
            Ok(Some(displaced)) => {
                self.frame_pool.release(displaced);
                true
            }
            Ok(None) => true,
            Err(HandoffError::Closed(frame)) => {
                self.frame_pool.release(*frame);
                false
            }
        }
    }

    pub fn handle(&self) -> &ProducerHandle {
        &self.handle
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventCollector {
        &mut self.events
    }

    pub fn frame_pool(&self) -> &FramePool {
        &self.frame_pool
    }
}

/// Asks the loop to stop when the producer finishes, even by panic.
struct StopOnExit(ProducerHandle);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.request_stop();
    }
}

//=== Pipeline ============================================================

/// A configured render loop plus the producer-side half of its channels.
///
/// Create via [`PipelineBuilder`].
///
/// # Architecture
///
/// ```text
/// Pipeline (calling thread)
///   ├─► RenderLoop        window, context, draw, pacing
///   │
///   └─► Producer thread   builds and publishes FrameDefinitions
///
/// Producer → loop: FrameSlot (latest wins), GraphicsContextQueue
/// Loop → producer: RenderEvent channel, last drawn frame number
/// ```
pub struct Pipeline {
    render_loop: RenderLoop,
    handle: ProducerHandle,
    events: EventCollector,
    frame_pool: FramePool,
}

impl Pipeline {
    /// A handle for talking to the loop from outside the producer, e.g.
    /// to request a stop from a signal handler.
    pub fn handle(&self) -> ProducerHandle {
        self.handle.clone()
    }

    /// Runs `producer` on its own thread and the render loop on this one.
    ///
    /// # Lifecycle
    ///
    /// 1. Spawns the producer thread with a [`Producer`]
    /// 2. Runs the render loop until it stops (blocks here)
    /// 3. Producer returning (or panicking) requests a stop
    /// 4. Joins the producer thread
    ///
    /// A loop failure takes precedence over a producer panic in the
    /// returned error.
    pub fn run<P>(self, producer: P) -> Result<LoopStats, RenderLoopError>
    where
        P: FnOnce(Producer) + Send + 'static,
    {
        info!("Starting render pipeline");

        //--- 1. Spawn the producer thread ---------------------------------
        let context = Producer {
            handle: self.handle.clone(),
            events: self.events,
            frame_pool: self.frame_pool,
        };
        let recycler = context.frame_pool.recycler();
        let guard = StopOnExit(self.handle.clone());

        let producer_thread = thread::Builder::new()
            .name("producer".into())
            .spawn(move || {
                let _guard = guard;
                producer(context);
            })
            .map_err(|e| {
                error!("Failed to spawn producer thread: {}", e);
                RenderLoopError::ProducerSpawn(e)
            })?;
        info!("Producer thread spawned");

        //--- 2. Run the render loop ---------------------------------------
        let result = self.render_loop.with_recycler(recycler).run();

        //--- 3. Wait for the producer -------------------------------------
        // The loop has stopped, so the producer's event channel reports
        // Stopped and a well-behaved producer returns promptly.
        let joined = producer_thread.join();
        if joined.is_err() {
            error!("Producer thread panicked");
        } else {
            info!("Producer thread terminated cleanly");
        }

        match (result, joined) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(_)) => Err(RenderLoopError::ProducerPanicked),
            (Ok(stats), Ok(())) => {
                info!("Render pipeline shutdown complete");
                Ok(stats)
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
