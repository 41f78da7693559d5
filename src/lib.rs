//=========================================================================
// Aetheric Render: Library Root
//
// Cross-thread frame pipeline: a producer thread builds immutable frame
// definitions, the thread owning the window draws the newest one.
//
// Responsibilities:
// - Expose the pipeline facade (`PipelineBuilder`, `Pipeline`)
// - Expose the building blocks (`core`) for custom loop drivers
// - Expose the display backends (`platform`) the loop draws through
//
// Typical usage:
// ```no_run
// use aetheric_render::PipelineBuilder;
// use aetheric_render::platform::headless::HeadlessBackend;
//
// fn main() {
//     PipelineBuilder::new()
//         .build(HeadlessBackend::new())
//         .run(|mut producer| while producer.tick() {})
//         .unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the frame model, the handoff, the graphics-context queue,
// pacing, device tracking and the render loop itself.
//
// `platform` defines the `DisplayBackend` contract and its headless and
// winit implementations.
//
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod platform;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` wires a producer thread to the render loop. Its types are
// re-exported below.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Pipeline, PipelineBuilder, Producer};
