//! # CLI Module
//!
//! Command-line interface for the cleanup advisor.
//!
//! ## Usage
//! ```bash
//! # List what is in the usual clutter folders
//! cleanup-advisor scan
//!
//! # Full analysis of one directory
//! cleanup-advisor analyze ~/Downloads
//!
//! # Only the suggested deletions, as CSV
//! cleanup-advisor analyze ~/Downloads --filter recommended-delete --output csv
//!
//! # Thorough run with a stricter near-duplicate threshold
//! cleanup-advisor analyze ~/Pictures --thorough --threshold 3
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use cleanup_advisor::core::classifier::ClassifierConfig;
use cleanup_advisor::core::hasher::ContentHashAlgorithm;
use cleanup_advisor::core::pipeline::{CleanupConfig, Orchestrator, RunOutcome};
use cleanup_advisor::core::recommend::Action;
use cleanup_advisor::core::report::{
    default_user_roots, export_csv, export_to_file, format_bytes, AnalysisPayload,
    ExportFormat, ResultFilter, RunSummary,
};
use cleanup_advisor::core::scanner::{FileRecord, Scanner};
use cleanup_advisor::error::{CleanupError, Result};
use cleanup_advisor::events::{AnalyzeEvent, Event, EventChannel, ScanEvent, StageProgress};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

/// Cleanup Advisor - find what could go, without touching anything
#[derive(Parser, Debug)]
#[command(name = "cleanup-advisor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the files under the given directories
    Scan {
        #[command(flatten)]
        common: CommonArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: ScanOutput,
    },

    /// Find duplicates, judge quality and suggest cleanup actions
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Near-duplicate threshold (lower = stricter, 0-64)
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Skip near-duplicate image matching
        #[arg(long)]
        no_perceptual: bool,

        /// External classifier command; enables the classifier
        #[arg(long)]
        classifier_command: Option<PathBuf>,

        /// Extra argument for the classifier command (repeatable)
        #[arg(long = "classifier-arg", allow_hyphen_values = true)]
        classifier_args: Vec<String>,

        /// Which results to show
        #[arg(short, long, default_value = "all")]
        filter: Filter,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: AnalyzeOutput,

        /// Also write the shown results to a file (.json for JSON, otherwise CSV)
        #[arg(long)]
        export: Option<PathBuf>,

        /// Show every result, including files that need no action
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Flags shared by both subcommands
#[derive(Args, Debug)]
struct CommonArgs {
    /// Directories to scan (default: Downloads, Desktop, Documents, Pictures, Videos)
    paths: Vec<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fast mode: skip noisy directories, tighter near-duplicate matching
    #[arg(long, conflicts_with = "thorough")]
    quick: bool,

    /// Turn fast mode off
    #[arg(long)]
    thorough: bool,

    /// Content hash algorithm (xxh3, blake3, md5)
    #[arg(long)]
    hash: Option<ContentHashAlgorithm>,

    /// Hash every file while scanning
    #[arg(long)]
    hash_on_scan: bool,

    /// Directory to skip (repeatable)
    #[arg(long = "exclude-dir")]
    exclude_dirs: Vec<PathBuf>,

    /// Directory name to skip anywhere, case-insensitive (repeatable)
    #[arg(long = "exclude-name")]
    exclude_names: Vec<String>,
}

impl CommonArgs {
    /// Layer the flags over the config file (or the defaults)
    fn to_config(&self) -> Result<CleanupConfig> {
        let mut config = match &self.config {
            Some(path) => CleanupConfig::from_json_file(path)?,
            None => CleanupConfig::default(),
        };

        if !self.paths.is_empty() {
            config.roots = self.paths.clone();
        }
        if config.roots.is_empty() {
            config.roots = default_user_roots();
        }
        if self.quick {
            config.fast_mode = true;
        }
        if self.thorough {
            config.fast_mode = false;
        }
        if let Some(algorithm) = self.hash {
            config.hash_algorithm = algorithm;
        }
        if self.hash_on_scan {
            config.compute_hash_on_scan = true;
        }
        config.exclude_dirs.extend(self.exclude_dirs.iter().cloned());
        config
            .exclude_dir_names
            .extend(self.exclude_names.iter().cloned());

        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScanOutput {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnalyzeOutput {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// One CSV row per file
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Filter {
    All,
    Images,
    Documents,
    Screenshots,
    LowQuality,
    OldDownloads,
    RecommendedDelete,
}

impl From<Filter> for ResultFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::All => ResultFilter::All,
            Filter::Images => ResultFilter::Images,
            Filter::Documents => ResultFilter::Documents,
            Filter::Screenshots => ResultFilter::Screenshots,
            Filter::LowQuality => ResultFilter::LowQuality,
            Filter::OldDownloads => ResultFilter::OldDownloads,
            Filter::RecommendedDelete => ResultFilter::RecommendedDelete,
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    cleanup_advisor::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { common, output } => run_scan(common.to_config()?, output),
        Commands::Analyze {
            common,
            threshold,
            no_perceptual,
            classifier_command,
            classifier_args,
            filter,
            output,
            export,
            verbose,
        } => {
            let mut config = common.to_config()?;
            if let Some(threshold) = threshold {
                config.perceptual_threshold = threshold;
            }
            if no_perceptual {
                config.use_perceptual = false;
            }
            if let Some(command) = classifier_command {
                config.classifier = ClassifierConfig {
                    enabled: true,
                    command: Some(command),
                    args: classifier_args,
                };
            }
            config.validate()?;

            run_analyze(config, filter.into(), output, export, verbose)
        }
    }
}

fn run_scan(config: CleanupConfig, output: ScanOutput) -> Result<()> {
    let term = Term::stderr();
    config.validate()?;

    if matches!(output, ScanOutput::Pretty) {
        print_header(&term);
    }

    let scanner = Scanner::new(config.scan_config());
    let result = scanner.scan(&config.roots);

    for error in &result.errors {
        term.write_line(&format!("{} {}", style("⚠").yellow(), error))
            .ok();
    }

    match output {
        ScanOutput::Pretty => print_pretty_records(&term, &result.records),
        ScanOutput::Json => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), &result.records)
                .map_err(std::io::Error::from)?;
            println!();
        }
        ScanOutput::Minimal => {
            for record in &result.records {
                println!("{}", record.path.display());
            }
        }
    }

    Ok(())
}

fn run_analyze(
    config: CleanupConfig,
    filter: ResultFilter,
    output: AnalyzeOutput,
    export: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, AnalyzeOutput::Pretty);

    if pretty {
        print_header(&term);
        let roots: Vec<String> = config.roots.iter().map(|r| display_path(r)).collect();
        term.write_line(&format!("  {} {}", style("Roots:").dim(), roots.join(", ")))
            .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();
    let mut orchestrator = Orchestrator::new(config)?.with_events(sender);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let mut payloads: Vec<AnalysisPayload> = Vec::new();
        let mut messages: Vec<String> = Vec::new();
        let mut discovered = 0usize;

        for event in receiver.iter() {
            match event {
                Event::Scan(ScanEvent::Started { .. }) => {
                    progress_clone.set_message("Scanning...");
                }
                Event::Scan(ScanEvent::Record(_)) => {
                    discovered += 1;
                    if discovered % 100 == 0 {
                        progress_clone.set_message(format!("Scanning... {} files", discovered));
                    }
                    progress_clone.tick();
                }
                Event::Scan(ScanEvent::Error { path, message }) => {
                    messages.push(format!("{}: {}", display_path(&path), message));
                }
                Event::Analyze(AnalyzeEvent::Started { total_records }) => {
                    progress_clone.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("█▓░"),
                    );
                    progress_clone.set_length(100);
                    progress_clone.set_message(format!("Analyzing {} files", total_records));
                }
                Event::Analyze(AnalyzeEvent::Duplicates {
                    exact_groups,
                    perceptual_groups,
                }) => {
                    progress_clone.set_message(format!(
                        "{} exact, {} near-duplicate groups",
                        exact_groups, perceptual_groups
                    ));
                }
                Event::Analyze(AnalyzeEvent::Progress(StageProgress::Percent(p))) => {
                    progress_clone.set_position(u64::from(p));
                }
                Event::Analyze(AnalyzeEvent::Batch(batch)) => payloads.extend(batch),
                Event::Scan(ScanEvent::Failed { message })
                | Event::Analyze(AnalyzeEvent::Failed { message }) => messages.push(message),
                Event::Analyze(AnalyzeEvent::Completed { .. }) => {
                    progress_clone.finish_and_clear();
                }
                _ => {}
            }
        }

        (payloads, messages)
    });

    let outcome = orchestrator.run();

    // Drop the orchestrator's sender so the event thread finishes
    drop(orchestrator);
    progress.finish_and_clear();
    let (payloads, messages) = event_thread
        .join()
        .map_err(|_| CleanupError::Pipeline("event thread panicked".to_string()))?;
    let outcome = outcome?;

    for message in &messages {
        term.write_line(&format!("{} {}", style("⚠").yellow(), message))
            .ok();
    }

    let shown = filter.apply(&payloads);

    if let Some(path) = &export {
        let owned: Vec<AnalysisPayload> = shown.iter().map(|p| (*p).clone()).collect();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        };
        export_to_file(&owned, path, format)?;
        term.write_line(&format!(
            "{} Exported {} results to {}",
            style("✓").green(),
            owned.len(),
            path.display()
        ))
        .ok();
    }

    match output {
        AnalyzeOutput::Pretty => print_pretty_results(&term, &outcome, &payloads, &shown, verbose),
        AnalyzeOutput::Json => {
            let summary = RunSummary::from_payloads(&payloads);
            let document = serde_json::json!({
                "summary": summary,
                "cancelled": is_cancelled(&outcome),
                "results": shown,
            });
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &document).map_err(std::io::Error::from)?;
            writeln!(handle)?;
        }
        AnalyzeOutput::Csv => {
            let stdout = std::io::stdout();
            export_csv(shown.iter().copied(), stdout.lock())?;
        }
    }

    Ok(())
}

fn is_cancelled(outcome: &RunOutcome) -> bool {
    outcome.scan.map(|s| s.cancelled).unwrap_or(false)
        || outcome.analyze.as_ref().map(|a| a.cancelled).unwrap_or(false)
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Cleanup Advisor").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_pretty_records(term: &Term, records: &[FileRecord]) {
    let mut by_kind: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
    for record in records {
        let entry = by_kind.entry(record.kind.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.size;
        term.write_line(&format!(
            "  {:>10}  {:<9} {}",
            style(format_bytes(record.size)).dim(),
            record.kind,
            display_path(&record.path)
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "{} {} files found",
        style("✓").green().bold(),
        style(records.len()).cyan()
    ))
    .ok();
    for (kind, (count, bytes)) in by_kind {
        term.write_line(&format!(
            "  {:<9} {:>6}  {}",
            kind,
            style(count).cyan(),
            style(format_bytes(bytes)).dim()
        ))
        .ok();
    }
}

fn print_pretty_results(
    term: &Term,
    outcome: &RunOutcome,
    payloads: &[AnalysisPayload],
    shown: &[&AnalysisPayload],
    verbose: bool,
) {
    let summary = RunSummary::from_payloads(payloads);

    if is_cancelled(outcome) {
        term.write_line(&format!("{} Analysis cancelled", style("✗").red().bold()))
            .ok();
    } else {
        term.write_line(&format!("{} Analysis Complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files analysed",
        style(summary.total_records).cyan()
    ))
    .ok();
    if let Some(analyze) = &outcome.analyze {
        term.write_line(&format!(
            "  {} exact and {} near-duplicate groups",
            style(analyze.exact_groups.len()).cyan(),
            style(analyze.perceptual_groups.len()).cyan()
        ))
        .ok();
    }
    for (action, count) in &summary.by_action {
        term.write_line(&format!("  {} {}", style(count).cyan(), action))
            .ok();
    }
    term.write_line(&format!(
        "  {} reclaimable by following delete suggestions",
        style(format_bytes(summary.reclaimable_bytes)).yellow()
    ))
    .ok();
    term.write_line("").ok();

    let actionable: Vec<&&AnalysisPayload> = shown
        .iter()
        .filter(|p| verbose || p.recommendation.primary_action != Action::Ignore)
        .collect();

    if actionable.is_empty() {
        term.write_line(&format!("  {} Nothing to clean up!", style("🎉").green()))
            .ok();
    } else {
        term.write_line(&format!("{}", style("Suggestions:").bold().underlined()))
            .ok();
        term.write_line("").ok();

        for payload in actionable {
            let recommendation = &payload.recommendation;
            let action = match recommendation.primary_action {
                Action::Ignore => style(recommendation.primary_action.as_str()).dim(),
                a if a.is_delete() => style(a.as_str()).red(),
                a => style(a.as_str()).yellow(),
            };
            term.write_line(&format!(
                "  {} {} ({}, {}, score {})",
                action,
                display_path(&payload.path),
                payload.analysis.label,
                format_bytes(payload.size),
                recommendation.score
            ))
            .ok();
            term.write_line(&format!(
                "    {}",
                style(recommendation.reasons.join("; ")).dim()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    // Footer
    term.write_line(&format!(
        "{}",
        style("Remember: No files were changed. Review carefully before taking action.").dim()
    ))
    .ok();
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}
