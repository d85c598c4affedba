use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::types::Mode;

pub const DEFAULT_PATH: &str = "hand_control.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gestures: GestureConfig,
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub commands: CommandConfig,
    pub ui: UiConfig,
}

/// Gesture thresholds. Pixel values are calibrated for the reference capture size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub pinch_threshold_px: f32,
    pub area_min: i32,
    pub area_max: i32,
    pub cooldown_ms: u64,
    pub volume_range_px: (f32, f32),
    pub brightness_range_px: (f32, f32),
    pub frame_margin_px: f32,
    pub smoothing: f32,
    pub mirror_x: bool,
    pub reference_width: u32,
    pub reference_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub landmark_model: String,
    pub max_hands: usize,
    pub media_detection_confidence: f32,
    pub media_tracking_confidence: f32,
    pub mouse_detection_confidence: f32,
    pub mouse_tracking_confidence: f32,
}

/// Argument templates for the volume and brightness helpers.
/// `{percent}` (0-100), `{scalar}` (0.0-1.0) and `{u16}` (0-65535) are substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub volume: Vec<String>,
    pub brightness: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub font_family: String,
    pub font_size_pt: u32,
    pub bitmap_scale: u32,
    pub dot_size: u32,
    pub landmark_color_hex: String,
    pub skeleton_color_hex: String,
    pub show_fps: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold_px: 40.0,
            area_min: 250,
            area_max: 1000,
            cooldown_ms: 500,
            volume_range_px: (50.0, 200.0),
            brightness_range_px: (30.0, 150.0),
            frame_margin_px: 100.0,
            smoothing: 7.0,
            mirror_x: true,
            reference_width: 640,
            reference_height: 480,
        }
    }
}

impl GestureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Rescales the pixel thresholds for a capture of `width` x `height`.
    ///
    /// Lengths scale with the width ratio; the area gate scales with the pixel-count ratio.
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        if width == self.reference_width && height == self.reference_height {
            return self.clone();
        }
        let k = width as f32 / self.reference_width as f32;
        let area_k = (width as f32 * height as f32)
            / (self.reference_width as f32 * self.reference_height as f32);
        let scale_range = |(lo, hi): (f32, f32)| (lo * k, hi * k);

        Self {
            pinch_threshold_px: self.pinch_threshold_px * k,
            area_min: (self.area_min as f32 * area_k).round() as i32,
            area_max: (self.area_max as f32 * area_k).round() as i32,
            volume_range_px: scale_range(self.volume_range_px),
            brightness_range_px: scale_range(self.brightness_range_px),
            frame_margin_px: self.frame_margin_px * k,
            reference_width: width,
            reference_height: height,
            ..self.clone()
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            landmark_model: "models/hand_landmark.onnx".to_string(),
            max_hands: 1,
            media_detection_confidence: 0.7,
            media_tracking_confidence: 0.5,
            mouse_detection_confidence: 0.5,
            mouse_tracking_confidence: 0.5,
        }
    }
}

impl ModelConfig {
    /// (detection, tracking) confidence for a mode.
    pub fn confidences(&self, mode: Mode) -> (f32, f32) {
        match mode {
            Mode::Media => (self.media_detection_confidence, self.media_tracking_confidence),
            Mode::Mouse => (self.mouse_detection_confidence, self.mouse_tracking_confidence),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for CommandConfig {
    #[cfg(target_os = "macos")]
    fn default() -> Self {
        Self {
            volume: argv(&["osascript", "-e", "set volume output volume {percent}"]),
            brightness: argv(&["brightness", "{scalar}"]),
        }
    }

    #[cfg(target_os = "windows")]
    fn default() -> Self {
        Self {
            volume: argv(&["nircmd", "setsysvolume", "{u16}"]),
            brightness: argv(&[
                "powershell",
                "-NoProfile",
                "-Command",
                "(Get-WmiObject -Namespace root/WMI -Class WmiMonitorBrightnessMethods).WmiSetBrightness(1,{percent})",
            ]),
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn default() -> Self {
        Self {
            volume: argv(&["pactl", "set-sink-volume", "@DEFAULT_SINK@", "{percent}%"]),
            brightness: argv(&["brightnessctl", "--quiet", "set", "{percent}%"]),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            font_family: "DejaVuSans".to_string(),
            font_size_pt: 22,
            bitmap_scale: 3,
            dot_size: 5,
            landmark_color_hex: "#FF00FF".to_string(),
            skeleton_color_hex: "#FFFFFF".to_string(),
            show_fps: true,
        }
    }
}

impl AppConfig {
    /// Loads from `path`, falling back to defaults on a missing or unparsable file,
    /// then writes the result back so new fields show up in the file.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    info!("Loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("Error parsing {}: {}. Loading defaults.", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("Configuration file not found. Creating default at {}", path.display());
            Self::default()
        };

        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
