//=========================================================================
// Frame Pool
//=========================================================================
//
// Recycles torn-down FrameDefinitions from the consumer back to the
// producer so pass buffers and lifecycle lists keep their allocations.
//
// Architecture:
// ```text
//   Producer                               Consumer
//   FramePool::acquire() ◀── channel ──── FrameRecycler::recycle()
//        │                                      ▲
//        └── populate → publish ──▶ draw ───────┘
// ```
//
// The channel is bounded; when full, recycled frames are simply dropped.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::trace;

//=== Internal Dependencies ===============================================

use super::FrameDefinition;

//=== FramePool ===========================================================

/// Producer-side source of empty frame definitions.
pub struct FramePool {
    recycled: Receiver<FrameDefinition>,
    recycler: Sender<FrameDefinition>,
    allocated: usize,
}

impl FramePool {
    /// Creates a pool retaining at most `capacity` idle frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Frame pool capacity must be positive");
        let (recycler, recycled) = bounded(capacity);
        Self {
            recycled,
            recycler,
            allocated: 0,
        }
    }

    /// Returns an empty frame, reusing a recycled one when available.
    pub fn acquire(&mut self) -> FrameDefinition {
        match self.recycled.try_recv() {
            Ok(mut frame) => {
                // Recyclers reset already; frames returned by a closed
                // handoff may still carry content.
                frame.reset();
                frame
            }
            Err(_) => {
                self.allocated += 1;
                trace!(target: "producer", "allocating frame definition #{}", self.allocated);
                FrameDefinition::new()
            }
        }
    }

    /// Returns a frame to the pool from the producer side.
    pub fn release(&self, frame: FrameDefinition) {
        if self.recycler.try_send(frame).is_err() {
            trace!(target: "producer", "frame pool full; dropping released frame");
        }
    }

    /// Handle for the consumer to send frames back.
    pub fn recycler(&self) -> FrameRecycler {
        FrameRecycler {
            sender: self.recycler.clone(),
        }
    }

    /// Number of definitions this pool had to allocate.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn idle(&self) -> usize {
        self.recycled.len()
    }
}

//=== FrameRecycler =======================================================

/// Consumer-side return path into a [`FramePool`].
#[derive(Clone)]
pub struct FrameRecycler {
    sender: Sender<FrameDefinition>,
}

impl FrameRecycler {
    /// Resets `frame` and hands it back to the producer's pool.
    ///
    /// Resetting here releases the frame's resource references on the
    /// consumer as soon as it is done drawing.
    pub fn recycle(&self, mut frame: FrameDefinition) {
        frame.reset();
        match self.sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                trace!(target: "render", "frame pool full; dropping recycled frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                trace!(target: "render", "frame pool gone; dropping recycled frame");
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
