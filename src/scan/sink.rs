//! Destinations for scan results.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};

use crate::equipment::{Equipment, GearScoreResult};
use crate::ocr::RegionImages;

/// Everything one completed scan cycle produced.
#[derive(Clone, Debug)]
pub struct ScanReport {
    pub equipment: Equipment,
    pub gear_score: GearScoreResult,
    /// Combined OCR text of both regions
    pub raw_text: String,
    pub scanned_at: DateTime<Local>,
    pub regions: RegionImages,
}

impl ScanReport {
    /// One-line summary used in the log.
    pub fn summary(&self) -> String {
        let per_stat = self
            .gear_score
            .per_stat
            .iter()
            .map(|s| format!("{:.1}", s))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} | scores [{}] total {:.2} ({:?}) adjusted {:.2} ({:?})",
            self.equipment,
            per_stat,
            self.gear_score.total,
            self.gear_score.total_class,
            self.gear_score.adjusted_total,
            self.gear_score.adjusted_class
        )
    }
}

/// Receives the report of each completed cycle. The scanner only pushes.
///
/// A failed publish aborts that cycle only.
pub trait ResultSink: Send {
    fn publish(&self, report: &ScanReport) -> Result<()>;
}

/// Writes each report to the log.
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&self, report: &ScanReport) -> Result<()> {
        crate::log(&format!("Scan result: {}", report.summary()));
        Ok(())
    }
}

/// Latest report, shared with the overlay.
pub type ReportSlot = Arc<Mutex<Option<ScanReport>>>;

/// Replaces the shared slot's content with each new report.
pub struct SharedReportSink {
    slot: ReportSlot,
}

impl SharedReportSink {
    pub fn new(slot: ReportSlot) -> Self {
        Self { slot }
    }
}

impl ResultSink for SharedReportSink {
    fn publish(&self, report: &ScanReport) -> Result<()> {
        let mut latest = self
            .slot
            .lock()
            .map_err(|e| anyhow!("Report slot poisoned: {}", e))?;
        *latest = Some(report.clone());
        Ok(())
    }
}
