//=========================================================================
// Event Collector
//=========================================================================
//
// Producer-side collector for render events with bounded polling and
// shutdown detection.
//
// Architecture:
//   Receiver<RenderEvent> → collect_tick() → device_events / size → TickControl
//
// Bounded polling prevents a flood of device input from starving the
// producer's own tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::RenderEvent;

//=== TickControl =========================================================

/// Producer loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== EventCollector ======================================================

/// Collects render events for one producer tick.
pub struct EventCollector {
    receiver: Receiver<RenderEvent>,
    device_events: Vec<RenderEvent>,
    logical_size: Option<(f64, f64)>,
    scale_factor: f64,
    resized: bool,
    /// Latched on quit, stop or disconnect.
    quit: bool,
}

impl EventCollector {
    const MAX_EVENTS_PER_TICK: usize = 256;

    pub fn new(receiver: Receiver<RenderEvent>) -> Self {
        Self {
            receiver,
            device_events: Vec::with_capacity(8),
            logical_size: None,
            scale_factor: 1.0,
            resized: false,
            quit: false,
        }
    }

    /// Drains pending render events (bounded).
    ///
    /// Returns `Exit` once the loop asked to quit, stopped, or went away,
    /// and keeps returning it on every later tick.
    pub fn collect_tick(&mut self) -> TickControl {
        self.device_events.clear();
        self.resized = false;
        let mut drained = 0;

        while drained < Self::MAX_EVENTS_PER_TICK {
            match self.receiver.try_recv() {
                Ok(event) => {
                    drained += 1;
                    if self.handle_event(event) == TickControl::Exit {
                        self.quit = true;
                        break;
                    }
                }
                Err(TryRecvError::Disconnected) => {
                    self.quit = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= Self::MAX_EVENTS_PER_TICK {
            warn!(target: "producer", "Render event backlog: drained {} events this tick", drained);
        }

        if self.quit {
            TickControl::Exit
        } else {
            TickControl::Continue
        }
    }

    /// Whether any tick so far has returned `Exit`.
    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// Device events collected this tick, in arrival order.
    pub fn device_events(&self) -> &[RenderEvent] {
        &self.device_events
    }

    pub fn take_device_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.device_events)
    }

    /// Latest known logical drawable size.
    pub fn logical_size(&self) -> Option<(f64, f64)> {
        self.logical_size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Whether a resize arrived during the last tick.
    pub fn resized(&self) -> bool {
        self.resized
    }

    fn handle_event(&mut self, event: RenderEvent) -> TickControl {
        match event {
            RenderEvent::WindowResized {
                logical_width,
                logical_height,
                scale_factor,
            } => {
                self.logical_size = Some((logical_width, logical_height));
                self.scale_factor = scale_factor;
                self.resized = true;
                TickControl::Continue
            }
            RenderEvent::QuitRequested => {
                debug!(target: "producer", "quit requested by render loop");
                TickControl::Exit
            }
            RenderEvent::Stopped => TickControl::Exit,
            device_event => {
                self.device_events.push(device_event);
                TickControl::Continue
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
