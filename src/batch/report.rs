use std::path::Path;

use console::style;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::Finding;
use crate::error::{NarrcheckError, Result};

use super::BatchStats;

/// Findings for every unit of a book that had an issue, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub book_id: String,
    pub findings: Vec<Finding>,
}

/// On-disk shapes accepted by [`BatchReport::load`]: a full report, or a bare
/// array of findings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReportFile {
    Report(BatchReport),
    Findings(Vec<Finding>),
}

impl BatchReport {
    pub fn new(book_id: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            book_id: book_id.into(),
            findings,
        }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn silence_issue_count(&self) -> usize {
        self.findings.iter().filter(|f| f.has_silence_issue).count()
    }

    pub fn length_issue_count(&self) -> usize {
        self.findings.iter().filter(|f| f.has_length_issue).count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!("Wrote {} findings to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a report written by [`BatchReport::save`]. A bare findings array is
    /// accepted too; its book id is left empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NarrcheckError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let report = match serde_json::from_str::<ReportFile>(&contents)? {
            ReportFile::Report(report) => report,
            ReportFile::Findings(findings) => Self::new(String::new(), findings),
        };
        Ok(report)
    }
}

/// Units to re-analyze, named by `(chapter_id, section_id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecheckSet {
    units: Vec<(String, String)>,
}

impl RecheckSet {
    pub fn from_report(report: &BatchReport) -> Self {
        Self::from_pairs(
            report
                .findings
                .iter()
                .map(|f| (f.chapter_id.clone(), f.section_id.clone())),
        )
    }

    pub fn from_pairs<I, C, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, S)>,
        C: Into<String>,
        S: Into<String>,
    {
        Self {
            units: pairs
                .into_iter()
                .map(|(c, s)| (c.into(), s.into()))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_report(&BatchReport::load(path)?))
    }

    /// Like [`RecheckSet::load`], but refuses a report written for another
    /// book. Reports with no book id (bare findings arrays) are accepted.
    pub fn load_for_book(path: &Path, book_id: &str) -> Result<Self> {
        let report = BatchReport::load(path)?;
        if !report.book_id.is_empty() && report.book_id != book_id {
            return Err(NarrcheckError::Config(format!(
                "{} is a report for book {}, not {}",
                path.display(),
                report.book_id,
                book_id
            )));
        }
        Ok(Self::from_report(&report))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.units.iter().map(|(c, s)| (c.as_str(), s.as_str()))
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

/// Human-readable lines describing one finding.
pub fn describe_finding(finding: &Finding) -> Vec<String> {
    let mut lines = Vec::new();

    if finding.has_silence_issue {
        lines.push(format!(
            "Chapter {}, Section {} contains {} silent segments:",
            finding.chapter_id,
            finding.section_id,
            finding.silent_segments.len()
        ));
        for segment in &finding.silent_segments {
            lines.push(format!(
                "  Silent from {:.2}s to {:.2}s (duration: {:.2}s)",
                segment.start, segment.end, segment.duration
            ));
        }
    }

    if finding.has_length_issue {
        lines.push(format!(
            "Chapter {}, Section {} has length mismatch:",
            finding.chapter_id, finding.section_id
        ));
        lines.push(format!(
            "  Text length: {} chars, expected duration: {}",
            or_na(finding.text_length.map(|l| l.to_string())),
            or_na(finding.expected_duration.map(|d| format!("{:.2}s", d)))
        ));
        lines.push(format!(
            "  Actual duration: {:.2}s, difference: {}",
            finding.duration,
            or_na(finding.duration_diff_percent.map(|p| format!("{:.2}%", p)))
        ));
    }

    lines
}

/// Print the description of one finding to stdout.
pub fn print_finding(finding: &Finding) {
    for line in describe_finding(finding) {
        if line.starts_with(' ') {
            println!("{}", line);
        } else {
            println!("{}", style(line).yellow().bold());
        }
    }
}

/// Print a summary of a finished batch.
pub fn print_summary(report: &BatchReport, stats: &BatchStats) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Narration Check Complete                   ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Book:        {}", report.book_id);
    println!("  Units:       {}", stats.total_units);
    println!("  Clean:       {}", style(stats.clean_units).green());
    println!("  Flagged:     {}", style(stats.flagged_units).yellow());
    println!("    Silence:   {}", report.silence_issue_count());
    println!("    Length:    {}", report.length_issue_count());
    if stats.skipped_units > 0 {
        println!("  Skipped:     {}", style(stats.skipped_units).red());
    }
    println!();
    println!(
        "  Time:        {:.2}s (avg {:.2}s/unit)",
        stats.total_time.as_secs_f64(),
        stats.avg_unit_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
