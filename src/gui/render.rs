//! Rendering functions for the overlay sections.

use eframe::egui::{self, Color32, RichText, TextureHandle, Vec2};

use super::state::{classification_color, format_stat_score, format_total, RegionTextures};
use crate::scan::ScanReport;

const PREVIEW_WIDTH: f32 = 260.0;

/// Render the rank and main stat line.
pub fn render_header(ui: &mut egui::Ui, report: &ScanReport) {
    ui.horizontal(|ui| {
        ui.label(
            RichText::new(report.equipment.rank.to_string())
                .size(18.0)
                .strong()
                .color(Color32::WHITE),
        );
        if let Some(main) = report.equipment.main_stat() {
            ui.label(
                RichText::new(format!("{:?} {}", main.stat_type, main.value))
                    .color(Color32::LIGHT_GRAY),
            );
        }
    });
}

/// Render the four per-stat scores and both totals.
pub fn render_scores(ui: &mut egui::Ui, report: &ScanReport) {
    let score = &report.gear_score;

    egui::Grid::new("gear_scores")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            for (slot, value) in score.per_stat.iter().enumerate() {
                let label = match report.equipment.stats.get(slot) {
                    Some(stat) => format!("{:?} ({})", stat.stat_type, stat.roll_count),
                    None => "-".to_string(),
                };
                ui.label(RichText::new(label).color(Color32::LIGHT_GRAY));
                ui.label(RichText::new(format_stat_score(*value)).color(Color32::WHITE));
                ui.end_row();
            }

            ui.label(RichText::new("Total").strong().color(Color32::WHITE));
            ui.label(
                RichText::new(format_total(score.total))
                    .size(16.0)
                    .color(classification_color(score.total_class)),
            );
            ui.end_row();

            ui.label(RichText::new("Adjusted").strong().color(Color32::WHITE));
            ui.label(
                RichText::new(format_total(score.adjusted_total))
                    .size(16.0)
                    .color(classification_color(score.adjusted_class)),
            );
            ui.end_row();
        });
}

/// Render the raw OCR text in a collapsible section.
pub fn render_raw_text(ui: &mut egui::Ui, show: &mut bool, report: &ScanReport) {
    ui.checkbox(show, "OCR text");
    if *show {
        ui.label(RichText::new(&report.raw_text).monospace().color(Color32::LIGHT_GRAY));
    }
}

fn render_texture(ui: &mut egui::Ui, label: &str, texture: &TextureHandle) {
    let size = texture.size_vec2();
    let scale = PREVIEW_WIDTH / size.x.max(1.0);
    ui.label(RichText::new(label).small().color(Color32::LIGHT_GRAY));
    ui.image((texture.id(), Vec2::new(PREVIEW_WIDTH, size.y * scale)));
}

/// Render the region image previews in a collapsible section.
pub fn render_previews(ui: &mut egui::Ui, show: &mut bool, textures: Option<&RegionTextures>) {
    ui.checkbox(show, "Region previews");
    if !*show {
        return;
    }
    let Some(textures) = textures else {
        return;
    };

    render_texture(ui, "Main stat", &textures.main_mask);
    render_texture(ui, "Sub stats (mask)", &textures.sub_mask);
    render_texture(ui, "Sub stats (stencil)", &textures.sub_stencil);
    render_texture(ui, "Sub stats (blended)", &textures.sub_blended);
}
