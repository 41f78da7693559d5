//=========================================================================
// Core Pipeline
//
// Thread-agnostic building blocks of the render pipeline.
//
// Responsibilities:
// - Describe a frame completely (`frame`)
// - Hand the newest frame from producer to consumer (`handoff`)
// - Defer graphics-context work into the draw window (`graphics_queue`)
// - Limit the frame rate without vsync (`pacing`)
// - Track input devices behind stable handles (`input`)
// - Carry events back to the producer (`bridge`)
// - Drive all of the above on the consumer thread (`render_loop`)
//
// Notes:
// Only `render_loop` touches a `DisplayBackend` directly. Everything the
// producer calls is safe from any thread.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod bridge;
pub mod frame;
pub mod graphics_queue;
pub mod handoff;
pub mod input;
pub mod pacing;
pub mod render_loop;

//=== Public API ==========================================================

pub use graphics_queue::{DrainReport, DrawWindow, GraphicsContextQueue, GraphicsOp, SurfaceHook};
pub use handoff::FrameSlot;
pub use pacing::{Clock, FramePacer, ManualClock, SystemClock};
pub use render_loop::{LoopState, LoopStats, ProducerHandle, RenderLoop};
