use crate::analysis::{UnitAnalyzer, UnitOutcome};
use crate::error::{AnalysisError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::report::{print_finding, BatchReport, RecheckSet};

/// Result of processing a single unit.
#[derive(Debug)]
pub struct UnitResult {
    pub index: usize,
    pub path: PathBuf,
    pub outcome: std::result::Result<UnitOutcome, AnalysisError>,
    pub duration_ms: u64,
}

/// Statistics from one batch run.
#[derive(Debug, Clone)]
pub struct BatchStats {
    pub total_units: usize,
    pub flagged_units: usize,
    pub clean_units: usize,
    pub skipped_units: usize,
    pub total_time: Duration,
    pub avg_unit_time: Duration,
}

/// Fans unit analysis out over a bounded pool of blocking workers and
/// gathers the findings back in discovery order.
pub struct BatchOrchestrator {
    analyzer: Arc<UnitAnalyzer>,
    max_workers: usize,
    show_progress: bool,
    narrate: bool,
    cancelled: Arc<AtomicBool>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator running at most `max_workers` units at once.
    pub fn new(analyzer: UnitAnalyzer, max_workers: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            max_workers: max_workers.max(1),
            show_progress: true,
            narrate: true,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Enable or disable printing a description of every finding.
    pub fn with_narration(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    /// Share a flag that, once set, stops new units from starting.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Audio paths to analyze: the recheck set when given, else every audio
    /// file of the book in filename order.
    pub fn unit_paths(&self, book_id: &str, recheck: Option<&RecheckSet>) -> Result<Vec<PathBuf>> {
        let layout = self.analyzer.layout();
        match recheck {
            Some(set) => Ok(set
                .iter()
                .map(|(chapter_id, section_id)| layout.audio_path(book_id, chapter_id, section_id))
                .collect()),
            None => layout.list_audio_files(book_id),
        }
    }

    /// Analyze a whole book, or only the units named by `recheck`.
    pub async fn analyze_batch(
        &self,
        book_id: &str,
        recheck: Option<&RecheckSet>,
    ) -> Result<(BatchReport, BatchStats)> {
        let paths = self.unit_paths(book_id, recheck)?;

        if recheck.is_some() {
            info!(
                "Rechecking {} previously identified files for book {}",
                paths.len(),
                book_id
            );
        } else {
            info!("Found {} audio files to analyze for book {}", paths.len(), book_id);
        }

        let start_time = Instant::now();
        let total_units = paths.len();
        let results = self.process_units(book_id, paths).await;

        let mut findings = Vec::new();
        let mut clean_units = 0;
        let mut skipped_units = 0;
        let mut total_unit_time_ms: u64 = 0;

        for result in results {
            total_unit_time_ms += result.duration_ms;
            match result.outcome {
                Ok(UnitOutcome::Issue(finding)) => {
                    if self.narrate {
                        print_finding(&finding);
                    }
                    findings.push(finding);
                }
                Ok(UnitOutcome::NoIssue) => clean_units += 1,
                Err(_) => skipped_units += 1,
            }
        }

        let total_time = start_time.elapsed();
        let avg_unit_time = if total_units > 0 {
            Duration::from_millis(total_unit_time_ms / total_units as u64)
        } else {
            Duration::ZERO
        };

        let stats = BatchStats {
            total_units,
            flagged_units: findings.len(),
            clean_units,
            skipped_units,
            total_time,
            avg_unit_time,
        };

        info!(
            "Batch complete: {} flagged, {} clean, {} skipped of {} units in {:.2}s",
            stats.flagged_units,
            stats.clean_units,
            stats.skipped_units,
            total_units,
            total_time.as_secs_f64()
        );

        Ok((BatchReport::new(book_id, findings), stats))
    }

    /// Run every unit through the analyzer and return one result per path,
    /// sorted back into the order the paths were given.
    pub async fn process_units(&self, book_id: &str, paths: Vec<PathBuf>) -> Vec<UnitResult> {
        if paths.is_empty() {
            return Vec::new();
        }

        let total_units = paths.len();
        info!(
            "Processing {} units with {} workers using {}",
            total_units,
            self.max_workers,
            self.analyzer.decoder_name()
        );

        // Create progress bar
        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total_units as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        // Use semaphore to limit concurrency
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut futures = FuturesUnordered::new();

        for (index, path) in paths.into_iter().enumerate() {
            let sem = semaphore.clone();
            let analyzer = self.analyzer.clone();
            let cancelled = self.cancelled.clone();
            let pb = progress_bar.clone();
            let book_id = book_id.to_string();

            let future = async move {
                // Acquire permit (waits if at concurrency limit). Timing starts
                // once a worker slot is held, so queueing is not counted.
                let (outcome, duration_ms) = match sem.acquire_owned().await {
                    Err(e) => (
                        Err(AnalysisError::Worker {
                            path: path.clone(),
                            message: e.to_string(),
                        }),
                        0,
                    ),
                    Ok(_) if cancelled.load(Ordering::Relaxed) => {
                        (Err(AnalysisError::Cancelled { path: path.clone() }), 0)
                    }
                    Ok(permit) => {
                        let unit_start = Instant::now();
                        let task_path = path.clone();
                        let joined = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            analyzer.analyze_unit(&task_path, &book_id)
                        })
                        .await;

                        let outcome = joined.unwrap_or_else(|e| {
                            Err(AnalysisError::Worker {
                                path: path.clone(),
                                message: e.to_string(),
                            })
                        });
                        (outcome, unit_start.elapsed().as_millis() as u64)
                    }
                };

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                match &outcome {
                    Ok(UnitOutcome::Issue(_)) => debug!("Unit {} flagged in {}ms", index, duration_ms),
                    Ok(UnitOutcome::NoIssue) => debug!("Unit {} clean in {}ms", index, duration_ms),
                    Err(e) => warn!("Skipping {}: {}", path.display(), e),
                }

                UnitResult {
                    index,
                    path,
                    outcome,
                    duration_ms,
                }
            };

            futures.push(future);
        }

        // Collect results
        let mut results: Vec<UnitResult> = Vec::with_capacity(total_units);
        while let Some(result) = futures.next().await {
            results.push(result);
        }

        // Finish progress bar
        if let Some(pb) = progress_bar {
            pb.finish_with_message("Analysis complete");
        }

        // Sort results by unit index to maintain discovery order
        results.sort_by_key(|r| r.index);
        results
    }
}
