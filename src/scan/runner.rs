//! Scan loop: capture, extract regions, recognize, parse, score, publish.
//!
//! One `Scanner` owns the capture source, the OCR engine, and the frame
//! buffer. Cycles run one at a time on a dedicated thread until the stop flag
//! is raised.

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::capture::{CaptureBufferManager, CaptureSource};
use crate::config::ScanConfig;
use crate::equipment::{GearScoreEvaluator, parse_equipment};
use crate::ocr::{self, OcrEngine};
use crate::scan::sink::{ResultSink, ScanReport};
use crate::scan::state::ScanState;

/// How often a source that is not ready yet is polled.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Longest single sleep between stop flag checks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct Scanner {
    config: ScanConfig,
    source: Box<dyn CaptureSource>,
    engine: Box<dyn OcrEngine>,
    sink: Box<dyn ResultSink>,
    buffers: CaptureBufferManager,
    evaluator: GearScoreEvaluator,
    state: ScanState,
}

impl Scanner {
    /// Creates a scanner and initializes the OCR engine for the configured language.
    pub fn new(
        config: ScanConfig,
        source: Box<dyn CaptureSource>,
        mut engine: Box<dyn OcrEngine>,
        sink: Box<dyn ResultSink>,
    ) -> Result<Self> {
        engine
            .initialize(&config.language_id)
            .with_context(|| format!("Failed to initialize OCR for '{}'", config.language_id))?;

        let evaluator = GearScoreEvaluator::new(
            config.stat_multipliers.clone(),
            config.rank_thresholds.clone(),
        );

        Ok(Self {
            config,
            source,
            engine,
            sink,
            buffers: CaptureBufferManager::new(),
            evaluator,
            state: ScanState::WaitingForSource,
        })
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Moves to `Scanning` once the source reports ready. Returns true when scanning.
    fn poll_ready(&mut self) -> bool {
        if self.state == ScanState::Scanning {
            return true;
        }
        if !self.source.is_ready() {
            return false;
        }
        self.state = ScanState::Scanning;
        crate::log(&format!("Capture source ready, state: {}", self.state));
        true
    }

    /// Runs one scan cycle.
    ///
    /// Returns `Ok(None)` when the cycle was skipped because the source had no
    /// frame. Errors abort the cycle only.
    pub fn run_cycle(&mut self) -> Result<Option<ScanReport>> {
        if !self.poll_ready() {
            return Ok(None);
        }

        let allocations = self.buffers.allocation_count();
        let frame = match self.buffers.update(self.source.as_mut()) {
            Ok(frame) => frame,
            Err(e) if e.is_skippable() => {
                crate::log(&format!("Skipping scan cycle: {}", e));
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if self.buffers.allocation_count() != allocations {
            if let Some(raw) = self.buffers.frame() {
                crate::log(&format!("Frame buffer allocated: {}x{}", raw.width, raw.height));
            }
        }

        let regions = ocr::extract_regions(&frame, &self.config)?;
        let raw_text = ocr::recognize_regions(self.engine.as_mut(), &regions);
        let equipment = parse_equipment(&raw_text);
        crate::log(&format!("Parsed equipment: {}", equipment));
        let gear_score = self.evaluator.evaluate(&equipment);

        let report = ScanReport {
            equipment,
            gear_score,
            raw_text,
            scanned_at: Local::now(),
            regions,
        };

        if self.config.save_debug_images {
            let prefix = report.scanned_at.format("%Y%m%d_%H%M%S%.3f").to_string();
            if let Err(e) =
                ocr::save_debug_images(&report.regions, &crate::paths::get_debug_dir(), &prefix)
            {
                crate::log(&format!("Failed to save debug images: {:#}", e));
            }
        }

        self.sink.publish(&report).context("Failed to publish scan result")?;
        Ok(Some(report))
    }

    /// Runs cycles until `stop` is raised.
    ///
    /// The stop flag is checked while waiting for the source and between cycles.
    pub fn run(&mut self, stop: &AtomicBool) {
        crate::log(&format!("Scanner started, state: {}", self.state()));
        let interval = self.config.scan_interval();

        while !stop.load(Ordering::SeqCst) {
            if !self.poll_ready() {
                if !sleep_unless_stopped(READY_POLL_INTERVAL, stop) {
                    break;
                }
                continue;
            }

            let started = Instant::now();
            if let Err(e) = self.run_cycle() {
                crate::log(&format!("Scan cycle failed: {:#}", e));
            }
            crate::log(&format!(
                "Scan cycle took {:.0}ms",
                started.elapsed().as_secs_f64() * 1000.0
            ));

            if !sleep_unless_stopped(interval, stop) {
                break;
            }
        }

        crate::log("Scanner stopped");
    }
}

/// Sleeps for `duration` in short slices. Returns false if `stop` was raised.
fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Handle to a scanner running on its own thread.
pub struct ScanHandle {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ScanHandle {
    /// Raises the stop flag and waits for the scan thread to finish.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.join().is_err() {
            crate::log("Scan thread panicked");
        }
    }
}

/// Starts the scan loop in a background thread.
pub fn start_scanning(mut scanner: Scanner) -> ScanHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();

    let handle = thread::spawn(move || {
        scanner.run(&thread_stop);
        crate::log("Scan thread finished");
    });

    ScanHandle { stop, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ImageFileSource;
    use crate::capture::buffer::{PixelFormat, SourceFrame};
    use crate::config::{REFERENCE_HEIGHT, REFERENCE_WIDTH};
    use crate::equipment::Classification;
    use crate::equipment::rank::EquipmentRank;
    use crate::equipment::stat::StatType;
    use crate::scan::sink::ReportSlot;
    use crate::scan::SharedReportSink;
    use image::{Rgba, RgbaImage, RgbImage};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Replays scripted text, cycling through it.
    struct ScriptedEngine {
        script: Vec<String>,
        calls: usize,
        initialized_with: Arc<Mutex<Option<String>>>,
    }

    impl ScriptedEngine {
        fn new(script: &[&str]) -> Self {
            Self {
                script: script.iter().map(|s| s.to_string()).collect(),
                calls: 0,
                initialized_with: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn initialize(&mut self, language_id: &str) -> Result<()> {
            *self.initialized_with.lock().unwrap() = Some(language_id.to_string());
            Ok(())
        }

        fn set_image(&mut self, _img: &RgbImage) -> Result<()> {
            Ok(())
        }

        fn get_text(&mut self) -> Result<String> {
            let text = self.script[self.calls % self.script.len()].clone();
            self.calls += 1;
            Ok(text)
        }
    }

    /// Ready after a number of polls; yields a queue of frame sizes.
    struct DelayedSource {
        polls_until_ready: AtomicUsize,
        sizes: VecDeque<(u32, u32)>,
        data: Vec<u8>,
    }

    impl DelayedSource {
        fn new(polls_until_ready: usize, sizes: Vec<(u32, u32)>) -> Self {
            Self {
                polls_until_ready: AtomicUsize::new(polls_until_ready),
                sizes: sizes.into(),
                data: Vec::new(),
            }
        }
    }

    impl CaptureSource for DelayedSource {
        fn is_ready(&self) -> bool {
            let remaining = self.polls_until_ready.load(Ordering::SeqCst);
            if remaining == 0 {
                return true;
            }
            self.polls_until_ready.store(remaining - 1, Ordering::SeqCst);
            false
        }

        fn frame(&mut self) -> Option<SourceFrame<'_>> {
            let (width, height) = self.sizes.pop_front()?;
            self.data = vec![30; width as usize * height as usize * 4];
            Some(SourceFrame {
                width,
                height,
                format: PixelFormat::Bgra8,
                data: &self.data,
            })
        }
    }

    fn epic_config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.language_id = "kor".to_string();
        config
    }

    fn replay_source() -> Box<dyn CaptureSource> {
        let img = RgbaImage::from_pixel(REFERENCE_WIDTH, REFERENCE_HEIGHT, Rgba([10, 10, 10, 255]));
        Box::new(ImageFileSource::from_image(&img))
    }

    #[test]
    fn test_new_initializes_engine_language() {
        let engine = ScriptedEngine::new(&[""]);
        let initialized = engine.initialized_with.clone();

        let scanner =
            Scanner::new(epic_config(), replay_source(), Box::new(engine), Box::new(crate::scan::LogSink))
                .unwrap();

        assert_eq!(initialized.lock().unwrap().as_deref(), Some("kor"));
        assert_eq!(scanner.state(), ScanState::WaitingForSource);
    }

    #[test]
    fn test_cycle_parses_and_scores() {
        let slot: ReportSlot = Arc::new(Mutex::new(None));
        let engine = ScriptedEngine::new(&[
            "Attack 100\n",
            "Epic\nDefense 50 (2)\nSpeed 4 (1)\n",
        ]);
        let mut config = epic_config();
        config.stat_multipliers = crate::equipment::stat::StatMultiplierTable::new([
            (StatType::Attack, 1.0),
            (StatType::Defense, 0.5),
            (StatType::Speed, 2.0),
        ]);

        let mut scanner = Scanner::new(
            config,
            replay_source(),
            Box::new(engine),
            Box::new(SharedReportSink::new(slot.clone())),
        )
        .unwrap();

        let report = scanner.run_cycle().unwrap().expect("cycle should produce a report");
        assert_eq!(scanner.state(), ScanState::Scanning);
        assert_eq!(report.raw_text, "Attack 100\nEpic\nDefense 50 (2)\nSpeed 4 (1)\n");

        assert_eq!(report.equipment.rank, EquipmentRank::Epic);
        assert_eq!(report.equipment.stats.len(), 3);
        assert_eq!(report.equipment.stats[1].roll_count, 2);

        assert_eq!(report.gear_score.per_stat, [100.0, 25.0, 8.0, 0.0]);
        assert_eq!(report.gear_score.total, 133.0);
        assert_eq!(report.gear_score.adjusted_total, 133.0);
        // Default Epic band is 55..65
        assert_eq!(report.gear_score.total_class, Classification::Above);

        let published = slot.lock().unwrap();
        assert_eq!(published.as_ref().unwrap().equipment, report.equipment);
    }

    #[test]
    fn test_cycle_waits_for_source() {
        let slot: ReportSlot = Arc::new(Mutex::new(None));
        let source = DelayedSource::new(2, vec![(64, 32)]);

        let mut scanner = Scanner::new(
            epic_config(),
            Box::new(source),
            Box::new(ScriptedEngine::new(&["Speed 4\n"])),
            Box::new(SharedReportSink::new(slot.clone())),
        )
        .unwrap();

        assert!(scanner.run_cycle().unwrap().is_none());
        assert!(scanner.run_cycle().unwrap().is_none());
        assert_eq!(scanner.state(), ScanState::WaitingForSource);
        assert!(slot.lock().unwrap().is_none());

        let report = scanner.run_cycle().unwrap().unwrap();
        assert_eq!(scanner.state(), ScanState::Scanning);
        assert_eq!(report.equipment.stats[0].stat_type, StatType::Speed);
    }

    #[test]
    fn test_missing_frame_skips_cycle_and_keeps_state() {
        let source = DelayedSource::new(0, vec![(64, 32)]);
        let mut scanner = Scanner::new(
            epic_config(),
            Box::new(source),
            Box::new(ScriptedEngine::new(&["Speed 4\n"])),
            Box::new(crate::scan::LogSink),
        )
        .unwrap();

        assert!(scanner.run_cycle().unwrap().is_some());
        // Frame queue is exhausted now
        assert!(scanner.run_cycle().unwrap().is_none());
        assert_eq!(scanner.state(), ScanState::Scanning);
    }

    #[test]
    fn test_background_scanner_stops() {
        let slot: ReportSlot = Arc::new(Mutex::new(None));
        let mut config = epic_config();
        config.scan_interval_seconds = 0.1;

        let scanner = Scanner::new(
            config,
            replay_source(),
            Box::new(ScriptedEngine::new(&["Health 1,500\n", "Legendary\n"])),
            Box::new(SharedReportSink::new(slot.clone())),
        )
        .unwrap();

        let handle = start_scanning(scanner);
        let deadline = Instant::now() + Duration::from_secs(30);
        while slot.lock().unwrap().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        handle.stop();

        let published = slot.lock().unwrap();
        let report = published.as_ref().expect("scanner published a report");
        assert_eq!(report.equipment.rank, EquipmentRank::Legendary);
        assert_eq!(report.equipment.stats[0].stat_type, StatType::Health);
        assert_eq!(report.equipment.stats[0].value, 1500.0);
    }

    /// Fails the first `failures_left` publishes, then records every report.
    struct FlakySink {
        failures_left: Arc<AtomicUsize>,
        published: Arc<Mutex<Vec<ScanReport>>>,
    }

    impl FlakySink {
        fn new(failures: usize) -> Self {
            Self {
                failures_left: Arc::new(AtomicUsize::new(failures)),
                published: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ResultSink for FlakySink {
        fn publish(&self, report: &ScanReport) -> Result<()> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("sink offline");
            }
            self.published.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn speed_scanner(config: ScanConfig, sink: FlakySink) -> Scanner {
        Scanner::new(
            config,
            replay_source(),
            Box::new(ScriptedEngine::new(&["Speed 4\n"])),
            Box::new(sink),
        )
        .unwrap()
    }

    #[test]
    fn test_failed_cycle_is_followed_by_next_cycle() {
        let mut scanner = speed_scanner(epic_config(), FlakySink::new(1));
        assert!(scanner.run_cycle().is_err());
        assert_eq!(scanner.state(), ScanState::Scanning);
        assert!(scanner.run_cycle().unwrap().is_some());
    }

    #[test]
    fn test_failed_cycle_does_not_stop_loop() {
        let sink = FlakySink::new(1);
        let failures_left = sink.failures_left.clone();
        let published = sink.published.clone();
        let mut config = epic_config();
        config.scan_interval_seconds = 0.1;

        let handle = start_scanning(speed_scanner(config, sink));
        let deadline = Instant::now() + Duration::from_secs(30);
        while published.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        handle.stop();

        assert_eq!(failures_left.load(Ordering::SeqCst), 0);
        let published = published.lock().unwrap();
        assert!(!published.is_empty(), "a later cycle published after the failure");
        assert_eq!(published[0].equipment.stats[0].stat_type, StatType::Speed);
    }

    #[test]
    fn test_sleep_unless_stopped() {
        let stop = AtomicBool::new(false);
        assert!(sleep_unless_stopped(Duration::from_millis(10), &stop));

        stop.store(true, Ordering::SeqCst);
        let started = Instant::now();
        assert!(!sleep_unless_stopped(Duration::from_secs(10), &stop));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
