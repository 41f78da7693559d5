//=========================================================================
// Render Bridge
//=========================================================================
//
// Contract between the render loop (consumer) and the logic thread
// (producer) for traffic flowing back to the producer.
//
// Components:
// - `interface`:       RenderEvent (the contract)
// - `event_collector`: producer-side bounded draining
//
//=========================================================================

//=== Module Declarations =================================================

mod event_collector;
mod interface;

//=== Public API ==========================================================

pub use event_collector::{EventCollector, TickControl};
pub use interface::RenderEvent;
