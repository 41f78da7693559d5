//=========================================================================
// Configuration
//=========================================================================
//
// Startup and reconfiguration settings for the render loop.
//
// Two layers:
// - DisplayConfig:     fullscreen / max_fps / vsync / quality requests.
//                      This is what `request_reconfigure` carries.
// - RenderLoopConfig:  DisplayConfig plus loop-level knobs (close debounce,
//                      strict graphics context, window title, ...).
//
// Both deserialize from TOML with every field optional:
//
// ```toml
// close_debounce_ms = 250
// strict_graphics_context = true
// drain_timeout_ms = 1000
//
// [display]
// fullscreen = false
// max_fps = 60
// vsync = "auto"
// graphics_quality = "high"
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::error::ConfigError;

//=== VSyncMode ===========================================================

/// Requested vertical sync behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VSyncMode {
    Off,
    On,
    /// Adaptive vsync where the backend supports it, regular vsync otherwise.
    #[default]
    Auto,
}

//=== Quality Requests ====================================================

/// Requested texture quality. `Auto` lets the backend pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureQualityRequest {
    #[default]
    Auto,
    Low,
    Medium,
    High,
}

/// Requested graphics quality. `Auto` lets the backend pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsQualityRequest {
    #[default]
    Auto,
    Low,
    Medium,
    High,
    Higher,
}

//=== DisplayConfig =======================================================

/// Display settings consumed at startup and on every reconfigure request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub fullscreen: bool,

    /// Software frame-rate cap. `0` means unbounded.
    pub max_fps: u32,

    pub vsync: VSyncMode,
    pub texture_quality: TextureQualityRequest,
    pub graphics_quality: GraphicsQualityRequest,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            max_fps: 60,
            vsync: VSyncMode::Auto,
            texture_quality: TextureQualityRequest::Auto,
            graphics_quality: GraphicsQualityRequest::Auto,
        }
    }
}

impl DisplayConfig {
    /// True if moving from `self` to `next` requires rebuilding the surface.
    ///
    /// Fullscreen and quality changes reload the renderer; vsync and
    /// max_fps are applied in place.
    pub fn needs_surface_reload(&self, next: &DisplayConfig) -> bool {
        self.fullscreen != next.fullscreen
            || self.texture_quality != next.texture_quality
            || self.graphics_quality != next.graphics_quality
    }
}

//=== RenderLoopConfig ====================================================

/// Full render loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLoopConfig {
    pub display: DisplayConfig,

    /// Window title used by windowed backends.
    pub window_title: String,

    /// Initial logical window size.
    pub initial_size: (u32, u32),

    /// Close events arriving within this window of an accepted close are
    /// treated as duplicates.
    pub close_debounce_ms: u64,

    /// Reject graphics-context work outside the draw window (debug assertion).
    pub strict_graphics_context: bool,

    /// Sleep per iteration while the window is hidden.
    pub hidden_sleep_ms: u64,

    /// How long the loop keeps draining after a quit request before it
    /// stops on its own, waiting for the producer's teardown ops.
    pub drain_timeout_ms: u64,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            window_title: "Aetheric".to_string(),
            initial_size: (800, 600),
            close_debounce_ms: 250,
            strict_graphics_context: cfg!(debug_assertions),
            hidden_sleep_ms: 100,
            drain_timeout_ms: 1000,
        }
    }
}

impl RenderLoopConfig {
    //--- Loading ----------------------------------------------------------

    /// Parses a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_size.0 == 0 || self.initial_size.1 == 0 {
            return Err(ConfigError::Invalid(format!(
                "initial_size must be non-zero, got {}x{}",
                self.initial_size.0, self.initial_size.1
            )));
        }
        Ok(())
    }

    //--- Durations --------------------------------------------------------

    pub fn close_debounce(&self) -> Duration {
        Duration::from_millis(self.close_debounce_ms)
    }

    pub fn hidden_sleep(&self) -> Duration {
        Duration::from_millis(self.hidden_sleep_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
