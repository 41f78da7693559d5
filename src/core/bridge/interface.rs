//=========================================================================
// Render Bridge Interface
//=========================================================================
//
// Core-to-producer event types.
//
// Defines what the consumer (render) thread reports back to the producer
// (logic) thread. Frames and graphics ops travel the other way through
// `ProducerHandle`.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::input::{DeviceHandle, DeviceInput};

//=== RenderEvent =========================================================

/// Events sent from the render loop to the producer via MPSC.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// An input device was attached.
    DeviceAdded { handle: DeviceHandle, name: String },

    /// An input device was detached; `handle` is now invalid for good.
    DeviceRemoved { handle: DeviceHandle },

    /// Raw input from an attached device.
    DeviceInput {
        handle: DeviceHandle,
        input: DeviceInput,
    },

    /// Drawable size changed. Sizes are in logical (scale-independent)
    /// units.
    WindowResized {
        logical_width: f64,
        logical_height: f64,
        scale_factor: f64,
    },

    /// The user or OS asked to quit. Sent once per run.
    QuitRequested,

    /// The render loop has torn down the context and exited.
    Stopped,
}
