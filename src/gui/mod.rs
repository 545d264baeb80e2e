//! Overlay window showing the latest scan result.
//!
//! The scanner publishes into a shared slot; the overlay polls it on every
//! repaint and never writes back.

pub mod render;
pub mod state;

use std::time::Duration;

use eframe::egui::{self, Color32, Vec2};
use image::{RgbaImage, RgbImage};

use crate::scan::ReportSlot;

use state::{OverlayState, RegionTextures};

/// How often the overlay checks the slot for a new report.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Overlay application.
pub struct OverlayApp {
    slot: ReportSlot,
    state: OverlayState,
}

impl OverlayApp {
    pub fn new(slot: ReportSlot) -> Self {
        Self {
            slot,
            state: OverlayState::default(),
        }
    }

    /// Copies a newer report out of the shared slot, if any.
    fn poll_report(&mut self) {
        match self.slot.lock() {
            Ok(slot) => {
                if let Some(report) = slot.as_ref() {
                    self.state.accept(report);
                }
            }
            Err(e) => crate::log(&format!("GUI: Report slot poisoned: {}", e)),
        }
    }

    /// Uploads the region images of the shown report as textures.
    fn load_textures(&mut self, ctx: &egui::Context) {
        if self.state.textures.is_some() {
            return;
        }
        let Some(report) = &self.state.report else {
            return;
        };

        let regions = &report.regions;
        self.state.textures = Some(RegionTextures {
            main_mask: rgb_texture(ctx, "main_mask", &regions.main_mask),
            sub_mask: rgba_texture(ctx, "sub_mask", &regions.sub_mask),
            sub_stencil: rgba_texture(ctx, "sub_stencil", &regions.sub_stencil),
            sub_blended: rgb_texture(ctx, "sub_blended", &regions.sub_blended),
        });
    }
}

fn rgb_texture(ctx: &egui::Context, name: &str, img: &RgbImage) -> egui::TextureHandle {
    let size = [img.width() as usize, img.height() as usize];
    let color_image = egui::ColorImage::from_rgb(size, img.as_raw());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

fn rgba_texture(ctx: &egui::Context, name: &str, img: &RgbaImage) -> egui::TextureHandle {
    let size = [img.width() as usize, img.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_report();
        if self.state.show_previews {
            self.load_textures(ctx);
        }
        ctx.request_repaint_after(POLL_INTERVAL);

        let panel_frame = egui::Frame::none()
            .fill(Color32::from_black_alpha(190))
            .inner_margin(8.0);

        let status = self.state.status_text();
        let OverlayState {
            report,
            textures,
            show_previews,
            show_raw_text,
        } = &mut self.state;

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                let Some(report) = report.as_ref() else {
                    ui.label(status_label(&status));
                    return;
                };

                render::render_header(ui, report);
                ui.separator();
                render::render_scores(ui, report);
                ui.separator();
                ui.label(status_label(&status));

                egui::ScrollArea::vertical().show(ui, |ui| {
                    render::render_raw_text(ui, show_raw_text, report);
                    render::render_previews(ui, show_previews, textures.as_ref());
                });
            });
    }
}

/// Small gray status text.
fn status_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).small().color(Color32::GRAY)
}

/// Run the overlay. Blocks until the window is closed.
pub fn run_gui(slot: ReportSlot, click_through: bool) -> eframe::Result<()> {
    crate::log("GUI: Creating native options...");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(320.0, 260.0))
            .with_min_inner_size(Vec2::new(220.0, 160.0))
            .with_title("Equipment OCR")
            .with_window_level(egui::WindowLevel::AlwaysOnTop)
            .with_transparent(true)
            .with_mouse_passthrough(click_through)
            // Disable drag-and-drop to avoid COM conflict with RoInitialize (multithreaded)
            .with_drag_and_drop(false),
        ..Default::default()
    };

    eframe::run_native(
        "Equipment OCR",
        options,
        Box::new(move |_cc| {
            crate::log("GUI: Creating overlay...");
            Ok(Box::new(OverlayApp::new(slot)))
        }),
    )
}
