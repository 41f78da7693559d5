//=========================================================================
// Error Types
//=========================================================================
//
// Error enums shared across the render pipeline.
//
// Failure classes:
// - BackendError:     native window/context primitives failed
// - GraphicsError:    a deferred graphics-context operation failed
// - HandoffError:     the consumer no longer accepts frames
// - RenderLoopError:  fatal loop failures surfaced to the caller
// - ConfigError:      configuration could not be read or parsed
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::frame::FrameDefinition;

//=== BackendError ========================================================

/// Failures reported by a [`crate::platform::DisplayBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The native window could not be created.
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    /// The GPU context or rendering surface could not be created.
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    /// The rendering surface was invalidated and must be recreated.
    #[error("rendering surface lost")]
    SurfaceLost,

    /// A call was made while no surface exists.
    #[error("no rendering surface")]
    NoSurface,

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Other(String),
}

//=== GraphicsError =======================================================

/// Failure of a single queued graphics-context operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("graphics operation failed: {0}")]
    Failed(String),
}

//=== HandoffError ========================================================

/// Returned by [`crate::core::FrameSlot::publish`] once the consumer is
/// draining. The rejected frame is handed back so it can be recycled.
#[derive(Error)]
pub enum HandoffError {
    #[error("frame handoff closed; render loop is shutting down")]
    Closed(Box<FrameDefinition>),
}

impl std::fmt::Debug for HandoffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed(frame) => f
                .debug_tuple("Closed")
                .field(&frame.frame_number())
                .finish(),
        }
    }
}

//=== RenderLoopError =====================================================

/// Fatal render loop failures.
#[derive(Debug, Error)]
pub enum RenderLoopError {
    /// Window/context creation failed at `Starting`. Not retried.
    #[error("render loop startup failed: {0}")]
    Startup(#[source] BackendError),

    /// Surface recovery failed; the loop cannot continue.
    #[error("surface recovery failed: {0}")]
    Recovery(#[source] BackendError),

    /// `run` was called on a loop that already ran.
    #[error("render loop already stopped")]
    AlreadyStopped,

    /// The producer thread could not be started.
    #[error("failed to spawn producer thread: {0}")]
    ProducerSpawn(#[source] std::io::Error),

    /// The producer thread panicked. The loop still shut down cleanly.
    #[error("producer thread panicked")]
    ProducerPanicked,
}

//=== ConfigError =========================================================

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

//=========================================================================
// Unit Tests
//=========================================================================
