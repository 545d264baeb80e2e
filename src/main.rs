//! Equipment OCR
//!
//! Periodically captures the game window, reads the equipment stat text with
//! Tesseract, and shows the item's gear score in an always-on-top overlay.

// Hide console window on Windows release builds
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

mod capture;
mod config;
mod equipment;
mod error;
mod gui;
mod ocr;
mod paths;
mod scan;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use capture::{CaptureSource, ImageFileSource};
use config::ScanConfig;
use scan::{LogSink, ReportSlot, Scanner, SharedReportSink};

const LOG_FILE_NAME: &str = "equipment_ocr.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = match panic_info.location() {
            Some(loc) => format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()),
            None => String::new(),
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);

        let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

#[cfg(windows)]
fn live_source(config: &ScanConfig) -> Result<Box<dyn CaptureSource>> {
    log(&format!(
        "Capturing window of process {}",
        config.window_process_name
    ));
    Ok(Box::new(capture::WindowCaptureSource::new(
        &config.window_process_name,
    )))
}

#[cfg(not(windows))]
fn live_source(_config: &ScanConfig) -> Result<Box<dyn CaptureSource>> {
    Err(anyhow!(
        "Live window capture is only available on Windows. Set replay_image in config.json."
    ))
}

/// Replay image if configured, the live window otherwise.
fn build_source(config: &ScanConfig) -> Result<Box<dyn CaptureSource>> {
    match &config.replay_image {
        Some(path) => Ok(Box::new(ImageFileSource::open(Path::new(path))?)),
        None => live_source(config),
    }
}

fn main() -> Result<()> {
    install_panic_hook();

    #[cfg(windows)]
    unsafe {
        windows::Win32::System::WinRT::RoInitialize(
            windows::Win32::System::WinRT::RO_INIT_MULTITHREADED,
        )?
    };

    paths::ensure_directories()?;
    log("Equipment OCR starting");

    let config = config::load_config();

    let tesseract =
        ocr::ensure_tesseract(&config.language_id).context("Failed to set up Tesseract")?;
    let engine = Box::new(ocr::TesseractEngine::new(tesseract));
    let source = build_source(&config)?;

    if config.headless {
        log("Headless mode - results are written to the log");
        let mut scanner = Scanner::new(config, source, engine, Box::new(LogSink))?;
        let stop = AtomicBool::new(false);
        scanner.run(&stop);
        return Ok(());
    }

    let slot: ReportSlot = Arc::new(Mutex::new(None));
    let click_through = config.overlay_click_through;
    let scanner = Scanner::new(
        config,
        source,
        engine,
        Box::new(SharedReportSink::new(slot.clone())),
    )?;
    let scan_handle = scan::start_scanning(scanner);

    log("Starting overlay...");
    let result = gui::run_gui(slot, click_through);
    scan_handle.stop();

    match result {
        Ok(()) => {
            log("Overlay exited normally");
            Ok(())
        }
        Err(e) => {
            log(&format!("GUI error: {}", e));
            Err(anyhow!("GUI error: {}", e))
        }
    }
}
