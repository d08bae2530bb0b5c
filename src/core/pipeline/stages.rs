//! The two pipeline stages as plain synchronous functions.
//!
//! Each stage reports through an [`EventSender`] and polls a
//! [`CancellationToken`] once per file (scan) or record (analyze). The
//! orchestrator runs them on worker threads; tests can call them directly.

use super::CleanupConfig;
use crate::core::cancel::CancellationToken;
use crate::core::classifier::ClassifierCapability;
use crate::core::duplicates::{
    find_exact_duplicates, find_perceptual_duplicates, perceptual_candidates, DuplicateCounts,
    DuplicateGroup,
};
use crate::core::hasher::PerceptualHasher;
use crate::core::quality::QualityAnalyzer;
use crate::core::recommend::RecommendationEngine;
use crate::core::report::AnalysisPayload;
use crate::core::scanner::{FileRecord, Scanner};
use crate::error::Result;
use crate::events::{AnalyzeEvent, EventSender, ScanEvent, StageProgress};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the scan stage hands over
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Records in discovery order
    pub records: Vec<FileRecord>,
    /// Non-fatal errors reported along the way
    pub errors: usize,
    pub cancelled: bool,
}

/// What the analyze stage leaves behind
#[derive(Debug, Default)]
pub struct AnalyzeOutcome {
    /// The analysed records, with any hashes computed along the way
    pub records: Vec<FileRecord>,
    pub exact_groups: Vec<DuplicateGroup>,
    pub perceptual_groups: Vec<DuplicateGroup>,
    /// Records analysed before completion or cancellation
    pub processed: usize,
    pub cancelled: bool,
}

/// Walk every root, streaming each record as it is found.
///
/// Missing or unreadable roots are reported and skipped. A path reached
/// through two overlapping roots is only reported once. After cancellation
/// is observed nothing more is emitted.
pub fn run_scan_stage(
    config: &CleanupConfig,
    cancel: &CancellationToken,
    events: &EventSender,
) -> Result<ScanOutcome> {
    config.validate()?;
    let start = Instant::now();

    info!(roots = config.roots.len(), "scan started");
    events.scan(ScanEvent::Started {
        roots: config.roots.clone(),
    });
    events.scan(ScanEvent::Progress(StageProgress::Indeterminate));

    let scanner = Scanner::new(config.scan_config());
    let mut outcome = ScanOutcome::default();
    let mut seen = HashSet::new();

    'roots: for root in &config.roots {
        if cancel.is_cancelled() {
            break;
        }

        let walker = match scanner.walk(root) {
            Ok(walker) => walker.with_cancellation(cancel.clone()),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping root");
                outcome.errors += 1;
                events.scan(ScanEvent::Error {
                    path: e.path().to_path_buf(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        for item in walker {
            if cancel.is_cancelled() {
                break 'roots;
            }
            match item {
                Ok(record) => {
                    if !seen.insert(record.path.clone()) {
                        continue;
                    }
                    events.scan(ScanEvent::Record(record.clone()));
                    outcome.records.push(record);
                }
                Err(e) => {
                    debug!(error = %e, "unreadable directory");
                    outcome.errors += 1;
                    events.scan(ScanEvent::Error {
                        path: e.path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    outcome.cancelled = cancel.is_cancelled();
    if !outcome.cancelled {
        events.scan(ScanEvent::Progress(StageProgress::Percent(100)));
    }
    info!(
        records = outcome.records.len(),
        cancelled = outcome.cancelled,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "scan finished"
    );
    events.scan(ScanEvent::Completed {
        total_records: outcome.records.len(),
        cancelled: outcome.cancelled,
    });

    Ok(outcome)
}

/// Detect duplicates, then analyse and recommend for every record in order.
///
/// Payloads go out in batches of `config.batch_size`; the last batch may be
/// short. On cancellation the loop stops, the batch in hand is still sent,
/// and nothing already sent is withdrawn.
pub fn run_analyze_stage(
    mut records: Vec<FileRecord>,
    config: &CleanupConfig,
    capability: ClassifierCapability,
    cancel: &CancellationToken,
    events: &EventSender,
) -> Result<AnalyzeOutcome> {
    config.validate()?;
    let start = Instant::now();
    let total = records.len();

    info!(records = total, "analysis started");
    events.analyze(AnalyzeEvent::Started {
        total_records: total,
    });
    events.analyze(AnalyzeEvent::Progress(StageProgress::Indeterminate));

    let exact_groups = find_exact_duplicates(&mut records, &config.content_hasher());
    let mut counts = DuplicateCounts::from_groups(&exact_groups);

    let perceptual_groups = if config.use_perceptual && !cancel.is_cancelled() {
        let candidates = perceptual_candidates(&records, config.fast_mode);
        find_perceptual_duplicates(
            &mut records,
            &candidates,
            &PerceptualHasher::new(),
            config.effective_threshold(),
        )
    } else {
        Vec::new()
    };
    counts.merge_max(&perceptual_groups);

    debug!(
        exact = exact_groups.len(),
        perceptual = perceptual_groups.len(),
        with_duplicates = counts.len(),
        "duplicate detection finished"
    );
    events.analyze(AnalyzeEvent::Duplicates {
        exact_groups: exact_groups.len(),
        perceptual_groups: perceptual_groups.len(),
    });

    let records = records;
    let mut analyzer = QualityAnalyzer::new(capability);
    let engine = RecommendationEngine::new();
    let batch_size = config.batch_size;
    let mut batch = Vec::with_capacity(batch_size);
    let mut processed = 0;
    let mut last_progress = None;
    let mut cancelled = false;

    for record in &records {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let analysis = analyzer.analyze_record(record);
        let dup_count = counts.get(&record.path);
        let recommendation = engine.recommend(record, &analysis, dup_count);
        batch.push(AnalysisPayload {
            path: record.path.clone(),
            analysis,
            recommendation,
            dup_count,
            size: record.size,
        });
        processed += 1;

        if batch.len() >= batch_size {
            events.analyze(AnalyzeEvent::Batch(std::mem::replace(
                &mut batch,
                Vec::with_capacity(batch_size),
            )));
        }

        let progress = StageProgress::of(processed, total);
        if last_progress != Some(progress) {
            events.analyze(AnalyzeEvent::Progress(progress));
            last_progress = Some(progress);
        }
    }

    if !batch.is_empty() {
        events.analyze(AnalyzeEvent::Batch(batch));
    }
    let done = StageProgress::Percent(100);
    if !cancelled && last_progress != Some(done) {
        events.analyze(AnalyzeEvent::Progress(done));
    }

    info!(
        processed,
        cancelled,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "analysis finished"
    );
    events.analyze(AnalyzeEvent::Completed {
        processed,
        cancelled,
    });

    Ok(AnalyzeOutcome {
        records,
        exact_groups,
        perceptual_groups,
        processed,
        cancelled,
    })
}
