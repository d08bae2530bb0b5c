//! Export of analysis results.

use super::AnalysisPayload;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

const CSV_HEADER: &str =
    "Path,Kind,Label,Confidence,Width,Height,Brightness,Sharpness,Duplicates,Size (bytes),Action,Score,Reasons";

/// Quote a CSV field when it needs it
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Export payloads to CSV, one row per record.
///
/// Quality columns are empty for records without metrics. Reasons are
/// joined with `"; "`.
pub fn export_csv<'a, W: Write>(
    payloads: impl IntoIterator<Item = &'a AnalysisPayload>,
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;

    for payload in payloads {
        let analysis = &payload.analysis;
        let quality = analysis.quality.as_ref();
        let path = payload.path.to_string_lossy();
        let reasons = payload.recommendation.reasons.join("; ");

        writeln!(
            writer,
            "{},{},{},{:.2},{},{},{},{},{},{},{},{},{}",
            csv_field(&path),
            analysis.kind,
            analysis.label,
            analysis.confidence,
            quality.map(|q| q.width.to_string()).unwrap_or_default(),
            quality.map(|q| q.height.to_string()).unwrap_or_default(),
            quality.map(|q| format!("{:.1}", q.brightness)).unwrap_or_default(),
            quality.map(|q| format!("{:.2}", q.sharpness)).unwrap_or_default(),
            payload.dup_count,
            payload.size,
            payload.recommendation.primary_action,
            payload.recommendation.score,
            csv_field(&reasons),
        )?;
    }

    Ok(())
}

/// Export payloads as a pretty-printed JSON array
pub fn export_json<'a, W: Write>(
    payloads: impl IntoIterator<Item = &'a AnalysisPayload>,
    writer: W,
) -> std::io::Result<()> {
    let payloads: Vec<&AnalysisPayload> = payloads.into_iter().collect();
    serde_json::to_writer_pretty(writer, &payloads)?;
    Ok(())
}

/// Export payloads to a file
pub fn export_to_file(
    payloads: &[AnalysisPayload],
    path: &Path,
    format: ExportFormat,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);

    match format {
        ExportFormat::Csv => export_csv(payloads, &mut writer)?,
        ExportFormat::Json => export_json(payloads, &mut writer)?,
    }
    writer.flush()
}
