//! Editor tuning knobs, loadable from TOML.
//!
//! Every section and field has a default, so a config file only needs to list
//! what it overrides:
//!
//! ```toml
//! [brush]
//! max_size = 32
//!
//! [gestures]
//! touch_draw_delay_ms = 80
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub viewport: ViewportConfig,
    pub brush: BrushConfig,
    pub gestures: GestureConfig,
    pub stroke: StrokeConfig,
    pub playback: PlaybackConfig,
    pub history: HistoryConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Upper bound for `reset_to_fit` so tiny sprites don't fill a 4K screen.
    pub fit_max_scale: f32,
    /// Multiplier used by zoom-in / zoom-out steps (wheel, buttons).
    pub zoom_step: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 100.0,
            fit_max_scale: 32.0,
            zoom_step: 1.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub default_size: u32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 64,
            default_size: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Delay before a single touch commits to drawing; a second touch inside
    /// this window turns the gesture into a pinch.
    pub touch_draw_delay_ms: u64,
    /// Movement (screen px) considered intentional while a touch is armed.
    pub move_threshold_px: f32,
    /// Pinch distance change (screen px) below which a frame is a pure pan.
    pub pinch_noise_px: f32,
    /// Relative spread change below which brush resizing is not re-applied.
    pub spread_epsilon: f32,
    pub color_pick_hold_ms: u64,
    pub color_pick_drag_px: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_draw_delay_ms: 50,
            move_threshold_px: 5.0,
            pinch_noise_px: 1.0,
            spread_epsilon: 0.001,
            color_pick_hold_ms: 300,
            color_pick_drag_px: 15.0,
        }
    }
}

impl GestureConfig {
    pub fn touch_draw_delay(&self) -> Duration {
        Duration::from_millis(self.touch_draw_delay_ms)
    }

    pub fn color_pick_hold(&self) -> Duration {
        Duration::from_millis(self.color_pick_hold_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Canvas-pixel distance from the last sample at which a stroke switches
    /// from stamping a single point to drawing a full line segment.
    pub line_threshold_px: u32,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self { line_threshold_px: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub default_frame_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { default_frame_ms: 100 }
    }
}

impl PlaybackConfig {
    pub fn default_frame_duration(&self) -> Duration {
        Duration::from_millis(self.default_frame_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    /// 0 means unbounded
    pub max_memory_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            max_memory_bytes: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EditorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SurfaceError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let vp = &self.viewport;
        if !(vp.min_scale > 0.0 && vp.min_scale <= vp.max_scale) {
            return Err(SurfaceError::InvalidConfig(format!(
                "viewport scale range [{}, {}] must be positive and ordered",
                vp.min_scale, vp.max_scale
            )));
        }
        if vp.fit_max_scale <= 0.0 || vp.zoom_step <= 1.0 {
            return Err(SurfaceError::InvalidConfig(
                "fit_max_scale must be positive and zoom_step greater than 1".into(),
            ));
        }
        let brush = &self.brush;
        if brush.min_size == 0 || brush.min_size > brush.max_size {
            return Err(SurfaceError::InvalidConfig(format!(
                "brush size range [{}, {}] must start at 1 or more and be ordered",
                brush.min_size, brush.max_size
            )));
        }
        if !(brush.min_size..=brush.max_size).contains(&brush.default_size) {
            return Err(SurfaceError::InvalidConfig(format!(
                "default brush size {} is outside [{}, {}]",
                brush.default_size, brush.min_size, brush.max_size
            )));
        }
        if self.history.max_entries == 0 {
            return Err(SurfaceError::InvalidConfig("history max_entries must be at least 1".into()));
        }
        if self.playback.default_frame_ms == 0 {
            return Err(SurfaceError::InvalidConfig("default_frame_ms must be positive".into()));
        }
        Ok(())
    }
}
