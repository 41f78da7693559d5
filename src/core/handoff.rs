//=========================================================================
// Frame Handoff
//=========================================================================
//
// Single-slot, latest-wins exchange of finalized FrameDefinitions from
// the producer thread to the consumer thread.
//
// ```text
//   producer: publish(frame N+1) ──swap──▶ [ slot ] ──swap(None)──▶ consumer
//                                            │
//                   unconsumed frame N ◀─────┘ (returned for recycling)
// ```
//
// There is no queue: a slow consumer silently skips intermediate frames
// and the producer is never blocked. The slot is an atomic pointer swap
// (`arc-swap`), so publish/take are wait-free for practical purposes and
// carry acquire/release ordering for the frame's contents.
//
// A skipped frame hands its mesh create/destroy requests to the frame
// that replaced it, so GPU resource lifetimes survive frame skipping.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::{debug, trace, warn};

//=== Internal Dependencies ===============================================

use crate::core::frame::FrameDefinition;
use crate::error::HandoffError;

//=== FrameSlot ===========================================================

const NOT_DRAWN: i64 = i64::MIN;

/// Latest-wins frame exchange shared by producer and consumer.
pub struct FrameSlot {
    slot: ArcSwapOption<FrameDefinition>,
    closed: AtomicBool,
    last_drawn: AtomicI64,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            closed: AtomicBool::new(false),
            last_drawn: AtomicI64::new(NOT_DRAWN),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    //--- Producer Side ----------------------------------------------------

    /// Publishes a finalized frame, replacing any unconsumed one.
    ///
    /// Returns the displaced frame, if the consumer never picked it up, so
    /// the producer can recycle it. Its mesh create/destroy requests move
    /// into `frame` first, so skipping a frame never loses lifecycle work.
    /// Fails once the consumer is draining; the rejected frame travels back
    /// inside the error.
    ///
    /// Expects a single publishing thread.
    pub fn publish(
        &self,
        mut frame: FrameDefinition,
    ) -> Result<Option<FrameDefinition>, HandoffError> {
        debug_assert!(
            frame.is_finalized(),
            "frame {} published before finalize()",
            frame.frame_number()
        );

        if self.closed.load(Ordering::Acquire) {
            return Err(HandoffError::Closed(Box::new(frame)));
        }

        let number = frame.frame_number();
        let displaced = match self.slot.swap(None) {
            None => None,
            Some(pending) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(
                    target: "render::handoff",
                    "frame {} replaces unconsumed frame {}",
                    number,
                    pending.frame_number()
                );
                match Arc::try_unwrap(pending) {
                    Ok(mut older) => {
                        frame.absorb_lifecycle(&mut older);
                        Some(older)
                    }
                    Err(shared) => {
                        warn!(
                            target: "render::handoff",
                            "unconsumed frame {} still shared; its lifecycle work is lost",
                            shared.frame_number()
                        );
                        None
                    }
                }
            }
        };

        if let Some(raced) = self.slot.swap(Some(Arc::new(frame))) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                target: "render::handoff",
                "concurrent publish displaced frame {}",
                raced.frame_number()
            );
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        trace!(target: "render::handoff", "published frame {}", number);

        Ok(displaced)
    }

    /// Sequence number of the last frame the consumer actually drew.
    pub fn last_drawn(&self) -> Option<i64> {
        match self.last_drawn.load(Ordering::Acquire) {
            NOT_DRAWN => None,
            n => Some(n),
        }
    }

    /// Frames replaced before the consumer could adopt them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    //--- Consumer Side ----------------------------------------------------

    /// Takes the newest published frame, if any. Never blocks.
    pub fn take(&self) -> Option<Arc<FrameDefinition>> {
        self.slot.swap(None)
    }

    /// Acknowledges that `frame_number` has been drawn.
    pub fn mark_drawn(&self, frame_number: i64) {
        self.last_drawn.store(frame_number, Ordering::Release);
    }

    /// Stops accepting new frames. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(target: "render::handoff", "frame handoff closed");
        }
    }

    /// Drops whatever frame is still waiting in the slot.
    pub fn clear(&self) -> Option<Arc<FrameDefinition>> {
        self.slot.swap(None)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
