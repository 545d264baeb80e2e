//! Configuration types for the scanner.
//!
//! Loads settings from config.json at startup. Provides region rectangles,
//! mask thresholds, scan timing, and the gear score tables. The loaded
//! configuration is passed explicitly to every component that needs it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::equipment::score::RankThresholdTable;
use crate::equipment::stat::StatMultiplierTable;

/// Width of the reference frame every capture is rescaled to.
pub const REFERENCE_WIDTH: u32 = 2560;
/// Height of the reference frame every capture is rescaled to.
pub const REFERENCE_HEIGHT: u32 = 1369;

/// Shortest accepted scan interval in seconds.
const MIN_SCAN_INTERVAL_SECONDS: f32 = 0.1;
/// Longest accepted scan interval in seconds.
const MAX_SCAN_INTERVAL_SECONDS: f32 = 3600.0;

/// A rectangle in pixels of the 2560x1369 reference frame.
/// Origin is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RegionRect {
    /// Returns the rectangle as fractions of the reference frame: (x, y, width, height).
    pub fn to_relative(&self) -> (f32, f32, f32, f32) {
        let w = REFERENCE_WIDTH as f32;
        let h = REFERENCE_HEIGHT as f32;
        (self.x / w, self.y / h, self.width / w, self.height / h)
    }
}

/// Complete scanner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Region holding the main stat line
    #[serde(default = "default_main_stat_region")]
    pub main_stat_region: RegionRect,
    /// Region holding the sub stat lines
    #[serde(default = "default_sub_stats_region")]
    pub sub_stats_region: RegionRect,
    /// Channel level (0.0-1.0) below which a pixel counts as black
    #[serde(default = "default_black_threshold")]
    pub black_threshold: f32,
    /// Alpha level (0.0-1.0) at or above which the stencil passes a pixel
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: f32,
    /// Delay between two scan cycles
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: f32,
    /// Tesseract language id
    #[serde(default = "default_language_id")]
    pub language_id: String,
    /// Executable name of the window to capture
    #[serde(default = "default_window_process_name")]
    pub window_process_name: String,
    /// Image file to scan instead of a live window
    #[serde(default)]
    pub replay_image: Option<String>,
    /// Dump the region images of every cycle to the debug directory
    #[serde(default)]
    pub save_debug_images: bool,
    /// Run without the overlay window, logging results only
    #[serde(default)]
    pub headless: bool,
    /// Let mouse input pass through the overlay
    #[serde(default)]
    pub overlay_click_through: bool,
    #[serde(default)]
    pub rank_thresholds: RankThresholdTable,
    #[serde(default)]
    pub stat_multipliers: StatMultiplierTable,
}

fn default_main_stat_region() -> RegionRect {
    RegionRect {
        x: 0.0,
        y: 399.0,
        width: 780.0,
        height: 80.0,
    }
}

fn default_sub_stats_region() -> RegionRect {
    RegionRect {
        x: 0.0,
        y: 509.0,
        width: 780.0,
        height: 220.0,
    }
}

fn default_black_threshold() -> f32 {
    0.54
}

fn default_alpha_threshold() -> f32 {
    0.88
}

fn default_scan_interval_seconds() -> f32 {
    1.0
}

fn default_language_id() -> String {
    "eng".to_string()
}

fn default_window_process_name() -> String {
    "EpicSeven.exe".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            main_stat_region: default_main_stat_region(),
            sub_stats_region: default_sub_stats_region(),
            black_threshold: default_black_threshold(),
            alpha_threshold: default_alpha_threshold(),
            scan_interval_seconds: default_scan_interval_seconds(),
            language_id: default_language_id(),
            window_process_name: default_window_process_name(),
            replay_image: None,
            save_debug_images: false,
            headless: false,
            overlay_click_through: false,
            rank_thresholds: RankThresholdTable::default(),
            stat_multipliers: StatMultiplierTable::default(),
        }
    }
}

impl ScanConfig {
    /// Returns the scan interval as a Duration, between 100ms and one hour.
    /// A non-finite setting falls back to the default interval.
    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(clamp_scan_interval(self.scan_interval_seconds))
    }

    /// Clamps the thresholds into [0, 1] and the scan interval into its range.
    fn sanitized(mut self) -> Self {
        self.black_threshold = self.black_threshold.clamp(0.0, 1.0);
        self.alpha_threshold = self.alpha_threshold.clamp(0.0, 1.0);
        self.scan_interval_seconds = clamp_scan_interval(self.scan_interval_seconds);
        self
    }
}

fn clamp_scan_interval(seconds: f32) -> f32 {
    if seconds.is_finite() {
        seconds.clamp(MIN_SCAN_INTERVAL_SECONDS, MAX_SCAN_INTERVAL_SECONDS)
    } else {
        default_scan_interval_seconds()
    }
}

/// Loads configuration from the given path or returns defaults.
pub fn load_config_from(config_path: &Path) -> ScanConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str::<ScanConfig>(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config.sanitized();
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    ScanConfig::default()
}

/// Loads configuration from config.json next to the executable.
pub fn load_config() -> ScanConfig {
    load_config_from(&crate::paths::get_config_path())
}
