//! Worker management for the scan and analyze stages.

use super::stages::{run_analyze_stage, run_scan_stage, AnalyzeOutcome, ScanOutcome};
use super::CleanupConfig;
use crate::core::cancel::CancellationToken;
use crate::core::classifier::ClassifierCapability;
use crate::core::report::AnalysisPayload;
use crate::core::scanner::FileRecord;
use crate::error::{CleanupError, Result};
use crate::events::{null_sender, AnalyzeEvent, Event, EventChannel, EventSender, ScanEvent};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cancels whatever run the orchestrator is currently on.
///
/// Stays valid across runs, unlike the token it wraps, which is replaced
/// each time a new run starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    fn lock(&self) -> MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request cooperative cancellation of the running stages
    pub fn cancel(&self) {
        self.lock().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().is_cancelled()
    }

    fn token(&self) -> CancellationToken {
        self.lock().clone()
    }

    fn reset(&self) {
        *self.lock() = CancellationToken::new();
    }
}

/// How a full scan-then-analyze run ended
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// `None` when the scan stage failed
    pub scan: Option<ScanSummary>,
    /// `None` when analysis never ran or failed
    pub analyze: Option<AnalyzeOutcome>,
}

/// The scan stage's result once its records moved on to analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    pub records: usize,
    pub errors: usize,
    pub cancelled: bool,
}

impl From<&ScanOutcome> for ScanSummary {
    fn from(outcome: &ScanOutcome) -> Self {
        Self {
            records: outcome.records.len(),
            errors: outcome.errors,
            cancelled: outcome.cancelled,
        }
    }
}

/// Everything a blocking run produced
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Every payload delivered, in record order
    pub payloads: Vec<AnalysisPayload>,
    /// Advisory messages: unreadable roots and stage failures
    pub messages: Vec<String>,
}

/// Runs the scan and analyze stages on their own worker threads.
///
/// At most one worker per stage is alive at a time. Starting a stage while
/// an earlier one of the same kind is still running cancels it and waits up
/// to the configured shutdown timeout before going ahead.
pub struct Orchestrator {
    config: CleanupConfig,
    events: EventSender,
    cancel: CancelHandle,
    scan_worker: Option<JoinHandle<Option<ScanOutcome>>>,
    analyze_worker: Option<JoinHandle<Option<AnalyzeOutcome>>>,
}

impl Orchestrator {
    /// Create an orchestrator whose events go nowhere
    pub fn new(config: CleanupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            events: null_sender(),
            cancel: CancelHandle::default(),
            scan_worker: None,
            analyze_worker: None,
        })
    }

    /// Send stage events to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// A handle that can cancel from any thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cooperative cancellation of the running stages
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether a stage worker is still running
    pub fn is_busy(&self) -> bool {
        let running = |finished: Option<bool>| finished == Some(false);
        running(self.scan_worker.as_ref().map(JoinHandle::is_finished))
            || running(self.analyze_worker.as_ref().map(JoinHandle::is_finished))
    }

    /// Start scanning the configured roots.
    ///
    /// Any earlier scan or analysis is cancelled first.
    pub fn start_scan(&mut self) -> Result<()> {
        self.stop_workers();

        let config = self.config.clone();
        let cancel = self.cancel.token();
        let events = self.events.clone();
        let failure_events = self.events.clone();

        let handle = spawn_stage(
            "cleanup-scan",
            move |message| failure_events.scan(ScanEvent::Failed { message }),
            move || run_scan_stage(&config, &cancel, &events),
        )?;
        self.scan_worker = Some(handle);
        Ok(())
    }

    /// Block until the scan worker exits. `None` if there was none or it
    /// failed.
    pub fn wait_scan(&mut self) -> Option<ScanOutcome> {
        self.scan_worker.take()?.join().ok().flatten()
    }

    /// Start analysing `records` with the configured classifier.
    pub fn start_analyze(&mut self, records: Vec<FileRecord>) -> Result<()> {
        let capability = ClassifierCapability::from_config(&self.config.classifier);
        self.start_analyze_with(records, capability)
    }

    /// Start analysing `records` with an explicit classifier capability.
    pub fn start_analyze_with(
        &mut self,
        records: Vec<FileRecord>,
        capability: ClassifierCapability,
    ) -> Result<()> {
        if let Some(previous) = self.analyze_worker.take() {
            if !previous.is_finished() {
                self.cancel.cancel();
                self.settle(previous, "analyze");
                self.cancel.reset();
            }
        }

        let config = self.config.clone();
        let cancel = self.cancel.token();
        let events = self.events.clone();
        let failure_events = self.events.clone();

        let handle = spawn_stage(
            "cleanup-analyze",
            move |message| failure_events.analyze(AnalyzeEvent::Failed { message }),
            move || run_analyze_stage(records, &config, capability, &cancel, &events),
        )?;
        self.analyze_worker = Some(handle);
        Ok(())
    }

    /// Block until the analyze worker exits
    pub fn wait_analyze(&mut self) -> Option<AnalyzeOutcome> {
        self.analyze_worker.take()?.join().ok().flatten()
    }

    /// Scan, then analyze unless the scan was cancelled or failed.
    ///
    /// Blocks the calling thread while the workers run; cancel through a
    /// [`CancelHandle`] from elsewhere.
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.start_scan()?;
        let Some(scan) = self.wait_scan() else {
            return Ok(RunOutcome::default());
        };

        let summary = ScanSummary::from(&scan);
        if scan.cancelled || self.cancel.is_cancelled() {
            info!("scan cancelled; analysis skipped");
            return Ok(RunOutcome {
                scan: Some(summary),
                analyze: None,
            });
        }

        self.start_analyze(scan.records)?;
        Ok(RunOutcome {
            scan: Some(summary),
            analyze: self.wait_analyze(),
        })
    }

    /// Like [`Orchestrator::run`], but collects every payload and advisory
    /// message instead of sending events to the configured sender.
    pub fn run_blocking(&mut self) -> Result<RunReport> {
        let (sender, receiver) = EventChannel::new();
        let previous = std::mem::replace(&mut self.events, sender);
        let result = self.run();
        self.events = previous;
        let outcome = result?;

        let mut report = RunReport {
            outcome,
            ..RunReport::default()
        };
        for event in receiver.drain() {
            match event {
                Event::Analyze(AnalyzeEvent::Batch(batch)) => report.payloads.extend(batch),
                Event::Scan(ScanEvent::Error { path, message }) => {
                    report.messages.push(format!("{}: {}", path.display(), message))
                }
                Event::Scan(ScanEvent::Failed { message })
                | Event::Analyze(AnalyzeEvent::Failed { message }) => report.messages.push(message),
                _ => {}
            }
        }
        Ok(report)
    }

    /// Cancel running workers, wait for them (bounded) and reset the token.
    fn stop_workers(&mut self) {
        if self.is_busy() {
            self.cancel.cancel();
        }
        if let Some(handle) = self.scan_worker.take() {
            self.settle(handle, "scan");
        }
        if let Some(handle) = self.analyze_worker.take() {
            self.settle(handle, "analyze");
        }
        self.cancel.reset();
    }

    /// Join a finished worker. A running one gets the shutdown timeout and
    /// is detached if it still has not exited.
    fn settle<T>(&self, handle: JoinHandle<T>, stage: &str) {
        let deadline = Instant::now() + self.config.shutdown_timeout();
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(stage, "worker did not stop in time; detaching it");
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
        let _ = handle.join();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.is_busy() {
            self.cancel.cancel();
        }
    }
}

/// Run `work` on a named thread. An error or a panic becomes exactly one
/// failure notification and a `None` result.
fn spawn_stage<T, W, F>(name: &str, on_failure: F, work: W) -> Result<JoinHandle<Option<T>>>
where
    T: Send + 'static,
    W: FnOnce() -> Result<T> + Send + 'static,
    F: FnOnce(String) + Send + 'static,
{
    let stage = name.to_string();
    thread::Builder::new()
        .name(stage.clone())
        .spawn(move || match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!(stage = %stage, error = %e, "stage failed");
                on_failure(e.to_string());
                None
            }
            Err(payload) => {
                let message = format!("{} worker panicked: {}", stage, panic_message(&*payload));
                error!(stage = %stage, "{}", message);
                on_failure(message);
                None
            }
        })
        .map_err(CleanupError::Io)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{
        Classification, ClassifierInput, ContentLabel, ImageClassifier,
    };
    use crate::error::ClassifyError;
    use crate::events::{EventChannel, StageProgress};
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Labels every image a photo and cancels the run on its `cancel_on`th call.
    struct CancellingClassifier {
        handle: CancelHandle,
        calls: AtomicUsize,
        cancel_on: usize,
    }

    impl ImageClassifier for CancellingClassifier {
        fn name(&self) -> &str {
            "cancelling"
        }

        fn classify(
            &self,
            _input: &ClassifierInput<'_>,
            _labels: &[ContentLabel],
        ) -> std::result::Result<Classification, ClassifyError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_on {
                self.handle.cancel();
            }
            Ok(Classification::new(ContentLabel::Photo, 0.9))
        }
    }

    fn config_for(dir: &TempDir) -> CleanupConfig {
        CleanupConfig {
            roots: vec![dir.path().to_path_buf()],
            ..CleanupConfig::default()
        }
    }

    #[test]
    fn run_scans_then_analyzes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.tmp"), "beta").unwrap();
        let mut orchestrator = Orchestrator::new(config_for(&dir)).unwrap();

        let report = orchestrator.run_blocking().unwrap();

        assert_eq!(report.outcome.scan.unwrap().records, 2);
        assert_eq!(report.outcome.analyze.unwrap().processed, 2);
        assert_eq!(report.payloads.len(), 2);
        assert!(!orchestrator.is_busy());
    }

    #[test]
    fn cancelled_scan_reports_consistently() {
        let dir = TempDir::new().unwrap();
        for i in 0..200 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }
        let (sender, receiver) = EventChannel::new();
        let mut orchestrator = Orchestrator::new(config_for(&dir))
            .unwrap()
            .with_events(sender);

        orchestrator.start_scan().unwrap();
        orchestrator.cancel();
        let scan = orchestrator.wait_scan().unwrap();

        let events = receiver.drain();
        let completed = events.iter().find_map(|e| match e {
            Event::Scan(ScanEvent::Completed {
                total_records,
                cancelled,
            }) => Some((*total_records, *cancelled)),
            _ => None,
        });
        assert_eq!(completed, Some((scan.records.len(), scan.cancelled)));
        assert!(!events.iter().any(|e| matches!(e, Event::Analyze(_))));
    }

    #[test]
    fn new_run_resets_cancellation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let mut orchestrator = Orchestrator::new(config_for(&dir)).unwrap();
        let handle = orchestrator.cancel_handle();

        handle.cancel();
        assert!(handle.is_cancelled());

        let report = orchestrator.run_blocking().unwrap();
        assert_eq!(report.payloads.len(), 1);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = CleanupConfig {
            perceptual_threshold: 100,
            ..CleanupConfig::default()
        };
        assert!(matches!(
            Orchestrator::new(config),
            Err(CleanupError::Config(_))
        ));
    }

    #[test]
    fn stage_error_becomes_one_failure_event() {
        let (sender, receiver) = EventChannel::new();
        let failure_sender = sender.clone();

        let handle = spawn_stage(
            "test-stage",
            move |message| failure_sender.scan(ScanEvent::Failed { message }),
            || -> Result<()> { Err(CleanupError::Pipeline("exploded".to_string())) },
        )
        .unwrap();

        assert!(handle.join().unwrap().is_none());
        drop(sender);
        let failures: Vec<_> = receiver
            .iter()
            .filter_map(|e| match e {
                Event::Scan(ScanEvent::Failed { message }) => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("exploded"));
    }

    #[test]
    fn panicking_stage_becomes_failure_event() {
        let (sender, receiver) = EventChannel::new();

        let handle = spawn_stage(
            "test-panic",
            move |message| sender.analyze(AnalyzeEvent::Failed { message }),
            || -> Result<()> { panic!("worker blew up") },
        )
        .unwrap();

        assert!(handle.join().unwrap().is_none());
        match receiver.recv() {
            Some(Event::Analyze(AnalyzeEvent::Failed { message })) => {
                assert!(message.contains("worker blew up"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn missing_root_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = CleanupConfig {
            roots: vec![dir.path().join("gone")],
            ..CleanupConfig::default()
        };
        let mut orchestrator = Orchestrator::new(config).unwrap();

        let report = orchestrator.run_blocking().unwrap();

        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.outcome.scan.unwrap().errors, 1);
        assert_eq!(report.outcome.analyze.unwrap().processed, 0);
    }

    #[test]
    fn cancel_during_scan_skips_analysis() {
        let dir = TempDir::new().unwrap();
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }
        // A rendezvous channel holds the scan worker on each send until the
        // consumer below has taken the event, so the cancel lands mid-walk.
        let (tx, rx) = crossbeam_channel::bounded(0);
        let mut orchestrator = Orchestrator::new(config_for(&dir))
            .unwrap()
            .with_events(EventSender::new(tx));
        let handle = orchestrator.cancel_handle();

        let consumer = thread::spawn(move || {
            let mut events = Vec::new();
            for event in rx {
                if matches!(event, Event::Scan(ScanEvent::Record(_))) {
                    handle.cancel();
                }
                events.push(event);
            }
            events
        });

        let outcome = orchestrator.run().unwrap();
        drop(orchestrator);
        let events = consumer.join().unwrap();

        let scan = outcome.scan.unwrap();
        assert!(scan.cancelled);
        assert!(scan.records < 50);
        assert!(outcome.analyze.is_none());
        let records = events
            .iter()
            .filter(|e| matches!(e, Event::Scan(ScanEvent::Record(_))))
            .count();
        assert_eq!(records, scan.records);
        assert!(matches!(
            events.last(),
            Some(Event::Scan(ScanEvent::Completed {
                cancelled: true,
                ..
            }))
        ));
        assert!(!events.iter().any(|e| matches!(e, Event::Analyze(_))));
    }

    #[test]
    fn cancel_during_analysis_keeps_sent_batches() {
        let dir = TempDir::new().unwrap();
        for i in 0..7u8 {
            RgbImage::from_pixel(64, 64, Rgb([i * 30, 100, 200 - i * 20]))
                .save(dir.path().join(format!("pic{}.png", i)))
                .unwrap();
        }
        let config = CleanupConfig {
            batch_size: 2,
            use_perceptual: false,
            ..config_for(&dir)
        };
        let (sender, receiver) = EventChannel::new();
        let mut orchestrator = Orchestrator::new(config).unwrap().with_events(sender);

        orchestrator.start_scan().unwrap();
        let scan = orchestrator.wait_scan().unwrap();
        assert_eq!(scan.records.len(), 7);
        receiver.drain();

        let classifier = CancellingClassifier {
            handle: orchestrator.cancel_handle(),
            calls: AtomicUsize::new(0),
            cancel_on: 3,
        };
        orchestrator
            .start_analyze_with(
                scan.records,
                ClassifierCapability::with_classifier(Box::new(classifier)),
            )
            .unwrap();
        let stage = orchestrator.wait_analyze().unwrap();

        assert!(stage.cancelled);
        assert_eq!(stage.processed, 3);

        let events = receiver.drain();
        let batches: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::Analyze(AnalyzeEvent::Batch(batch)) => Some(batch.len()),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![2, 1]);
        assert!(!events.iter().any(|e| matches!(
            e,
            Event::Analyze(AnalyzeEvent::Progress(StageProgress::Percent(100)))
        )));
        assert!(matches!(
            events.last(),
            Some(Event::Analyze(AnalyzeEvent::Completed {
                processed: 3,
                cancelled: true
            }))
        ));
    }
}
