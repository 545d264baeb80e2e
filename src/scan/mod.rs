//! Periodic scanning of the captured window.

pub mod runner;
pub mod sink;
pub mod state;

pub use runner::{Scanner, start_scanning};
pub use sink::{LogSink, ReportSlot, ScanReport, SharedReportSink};
