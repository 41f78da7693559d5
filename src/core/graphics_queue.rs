//=========================================================================
// Graphics Context Queue
//=========================================================================
//
// Strictly ordered queue of deferred graphics-context operations.
//
// Any thread may enqueue. Operations only ever run on the consumer
// thread, inside its draw window, in FIFO enqueue order:
//
// ```text
//   any thread ──enqueue()──▶ Mutex<Vec<GraphicsOp>>
//                                   │ swap out (lock held only here)
//   consumer: open_draw_window() ──▶ drain_and_run(backend)
//                                   └─ run each op outside the lock
// ```
//
// Ops enqueued while a drain is running land in the fresh pending list
// and run on the next drain. A failing or panicking op is logged and
// skipped; the rest of the batch still runs.
//
// Closing the queue rejects further enqueues atomically with respect to
// the final drain, so every accepted op runs exactly once.
//
// Strictness mode turns "graphics work outside the draw window" into a
// debug assertion. It exists to catch producer/consumer discipline bugs
// before they show up as platform-specific context errors.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use log::{error, trace, warn};
use parking_lot::Mutex;

//=== Internal Dependencies ===============================================

use crate::error::GraphicsError;
use crate::platform::DisplayBackend;

//=== Operation Types =====================================================

/// A one-shot operation that needs the graphics context.
pub type GraphicsOp =
    Box<dyn FnOnce(&mut dyn DisplayBackend) -> Result<(), GraphicsError> + Send + 'static>;

/// A reusable operation run every time the rendering surface is created.
pub type SurfaceHook =
    Arc<dyn Fn(&mut dyn DisplayBackend) -> Result<(), GraphicsError> + Send + Sync + 'static>;

//=== DrainReport =========================================================

/// Outcome of one `drain_and_run` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub ran: usize,
    pub failed: usize,
}

//=== GraphicsContextQueue ================================================

#[derive(Default)]
struct Pending {
    ops: Vec<GraphicsOp>,
    closed: bool,
}

/// Thread-safe FIFO of deferred graphics-context operations.
pub struct GraphicsContextQueue {
    pending: Mutex<Pending>,
    surface_hooks: Mutex<Vec<SurfaceHook>>,
    strict: bool,
    in_draw_window: AtomicBool,
    consumer: OnceLock<ThreadId>,
}

impl GraphicsContextQueue {
    //--- Construction -----------------------------------------------------

    pub fn new(strict: bool) -> Self {
        Self {
            pending: Mutex::new(Pending {
                ops: Vec::with_capacity(16),
                closed: false,
            }),
            surface_hooks: Mutex::new(Vec::new()),
            strict,
            in_draw_window: AtomicBool::new(false),
            consumer: OnceLock::new(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    //--- Producer Side ----------------------------------------------------

    /// Appends an operation. Callable from any thread; never waits on GPU
    /// work, only on the queue mutex for the push itself.
    ///
    /// Returns `false` (dropping `op`) once the queue is closed.
    pub fn enqueue<F>(&self, op: F) -> bool
    where
        F: FnOnce(&mut dyn DisplayBackend) -> Result<(), GraphicsError> + Send + 'static,
    {
        self.enqueue_boxed(Box::new(op))
    }

    pub fn enqueue_boxed(&self, op: GraphicsOp) -> bool {
        let mut pending = self.pending.lock();
        if pending.closed {
            warn!(target: "render::queue", "graphics op rejected: queue closed");
            return false;
        }
        pending.ops.push(op);
        true
    }

    /// Registers a hook that runs on the next drain and again after every
    /// surface recreation.
    pub fn add_surface_hook(&self, hook: SurfaceHook) {
        self.surface_hooks.lock().push(Arc::clone(&hook));
        self.enqueue(move |backend| hook(backend));
    }

    /// Queues one invocation of every surface hook, in registration order.
    pub fn reenqueue_surface_hooks(&self) -> usize {
        let hooks: Vec<SurfaceHook> = self.surface_hooks.lock().clone();
        let count = hooks.len();
        for hook in hooks {
            self.enqueue(move |backend| hook(backend));
        }
        count
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().ops.len()
    }

    /// Rejects every later enqueue. Ops already pending still run on the
    /// next drain. Idempotent.
    pub fn close(&self) {
        self.pending.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    //--- Consumer Side ----------------------------------------------------

    /// Marks the calling (consumer) thread as inside its draw window until
    /// the returned guard drops.
    pub fn open_draw_window(&self) -> DrawWindow<'_> {
        let me = thread::current().id();
        let consumer = *self.consumer.get_or_init(|| me);
        debug_assert_eq!(consumer, me, "draw window opened off the consumer thread");

        let was_open = self.in_draw_window.swap(true, Ordering::AcqRel);
        debug_assert!(!was_open, "draw window opened twice");
        DrawWindow { queue: self }
    }

    pub fn in_draw_window(&self) -> bool {
        self.in_draw_window.load(Ordering::Acquire)
            && self.consumer.get() == Some(&thread::current().id())
    }

    /// Checks that graphics-context work is currently allowed.
    ///
    /// In strict mode this is a debug assertion; outside strict mode (or in
    /// release builds) a violation is only traced.
    pub fn check_graphics_allowed(&self, what: &str) -> bool {
        let allowed = self.in_draw_window();
        if !allowed {
            if self.strict {
                debug_assert!(
                    allowed,
                    "graphics-context call `{}` outside the draw window",
                    what
                );
                warn!(target: "render::queue", "`{}` ran outside the draw window", what);
            } else {
                trace!(target: "render::queue", "`{}` ran outside the draw window", what);
            }
        }
        allowed
    }

    /// Runs every pending operation in enqueue order.
    ///
    /// The pending list is swapped out under the lock and executed outside
    /// it, so operations enqueued meanwhile (including by the running ops)
    /// wait for the next drain.
    pub fn drain_and_run(&self, backend: &mut dyn DisplayBackend) -> DrainReport {
        debug_assert!(
            self.in_draw_window(),
            "drain_and_run called outside the draw window"
        );

        let batch = std::mem::take(&mut self.pending.lock().ops);
        let mut report = DrainReport::default();

        for (index, op) in batch.into_iter().enumerate() {
            report.ran += 1;
            match catch_unwind(AssertUnwindSafe(|| op(&mut *backend))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(target: "render::queue", "graphics op #{} failed: {}", index, e);
                }
                Err(_) => {
                    report.failed += 1;
                    error!(target: "render::queue", "graphics op #{} panicked", index);
                }
            }
        }

        if report.ran > 0 {
            trace!(
                target: "render::queue",
                "drained {} graphics ops ({} failed)",
                report.ran,
                report.failed
            );
        }
        report
    }
}

impl Default for GraphicsContextQueue {
    fn default() -> Self {
        Self::new(false)
    }
}

//=== DrawWindow ==========================================================

/// RAII marker for the consumer's draw window.
pub struct DrawWindow<'a> {
    queue: &'a GraphicsContextQueue,
}

impl DrawWindow<'_> {
    /// Drains the queue inside this window.
    pub fn drain_and_run(&self, backend: &mut dyn DisplayBackend) -> DrainReport {
        self.queue.drain_and_run(backend)
    }
}

impl Drop for DrawWindow<'_> {
    fn drop(&mut self) {
        self.queue.in_draw_window.store(false, Ordering::Release);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
