//! Overlay display state.
//!
//! Tracks the report currently shown and how its values are presented.

use chrono::{DateTime, Local};
use eframe::egui::{Color32, TextureHandle};

use crate::equipment::Classification;
use crate::scan::ScanReport;

/// Text color of a classified score.
pub fn classification_color(class: Classification) -> Color32 {
    match class {
        Classification::Below => Color32::from_rgb(230, 60, 60),
        Classification::Within => Color32::from_rgb(240, 200, 40),
        Classification::Above => Color32::from_rgb(60, 200, 80),
        Classification::Unclassified => Color32::WHITE,
    }
}

/// Per-stat scores are shown with one decimal.
pub fn format_stat_score(score: f64) -> String {
    format!("{:.1}", score)
}

/// Totals are shown with two decimals.
pub fn format_total(score: f64) -> String {
    format!("{:.2}", score)
}

/// GPU textures of the region images of the shown report.
pub struct RegionTextures {
    pub main_mask: TextureHandle,
    pub sub_mask: TextureHandle,
    pub sub_stencil: TextureHandle,
    pub sub_blended: TextureHandle,
}

/// What the overlay currently shows.
#[derive(Default)]
pub struct OverlayState {
    /// Most recent report taken from the shared slot
    pub report: Option<ScanReport>,
    /// Textures built from `report`, rebuilt when a newer report arrives
    pub textures: Option<RegionTextures>,
    /// Whether the region previews are expanded
    pub show_previews: bool,
    /// Whether the raw OCR text is expanded
    pub show_raw_text: bool,
}

impl OverlayState {
    /// Stores `report` if it is newer than the shown one. Returns true when
    /// the shown report changed.
    pub fn accept(&mut self, report: &ScanReport) -> bool {
        if self.shown_at().is_some_and(|shown| shown >= report.scanned_at) {
            return false;
        }
        self.report = Some(report.clone());
        self.textures = None;
        true
    }

    pub fn shown_at(&self) -> Option<DateTime<Local>> {
        self.report.as_ref().map(|r| r.scanned_at)
    }

    /// Status line under the scores.
    pub fn status_text(&self) -> String {
        match self.shown_at() {
            Some(at) => format!("Last scan: {}", at.format("%H:%M:%S")),
            None => "Waiting for first scan...".to_string(),
        }
    }
}
