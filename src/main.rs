use anyhow::{Context, Result};
use clap::Parser;
use narrcheck::{
    print_summary, BatchOrchestrator, BookLayout, Config, FileDecoder, RecheckSet, UnitAnalyzer,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "narrcheck")]
#[command(version, about = "Find silent gaps and length mismatches in narrated audio")]
#[command(long_about = "Scan every narrated audio unit of a book for long silences and for \
durations that disagree with the length of the source text.")]
struct Cli {
    /// Book identifier (sub-directory of the books root)
    book_id: String,

    /// Directory holding one sub-directory per book
    #[arg(long)]
    books_root: Option<PathBuf>,

    /// Only re-analyze the units listed in this prior report
    #[arg(short, long)]
    recheck: Option<PathBuf>,

    /// Write the report as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of units analyzed in parallel (defaults to CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Level in dBFS at or below which audio counts as silent
    #[arg(long, allow_hyphen_values = true)]
    silence_threshold_db: Option<f64>,

    /// Shortest silent gap to report, in milliseconds
    #[arg(long)]
    min_silence_ms: Option<u64>,

    /// Expected seconds of narration per 1000 characters of text
    #[arg(long)]
    seconds_per_1000_chars: Option<f64>,

    /// Allowed relative duration deviation (0.2 = 20%)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref root) = cli.books_root {
        config.books_root = root.clone();
    }
    if let Some(workers) = cli.workers {
        config.max_workers = Some(workers);
    }
    if let Some(threshold) = cli.silence_threshold_db {
        config.analysis.silence_threshold_db = threshold;
    }
    if let Some(min_silence) = cli.min_silence_ms {
        config.analysis.min_silence_duration_ms = min_silence;
    }
    if let Some(rate) = cli.seconds_per_1000_chars {
        config.analysis.expected_seconds_per_1000_chars = rate;
    }
    if let Some(tolerance) = cli.tolerance {
        config.analysis.tolerance_fraction = tolerance;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("Configuration validation failed")?;

    let recheck = cli
        .recheck
        .as_deref()
        .map(|path| RecheckSet::load_for_book(path, &cli.book_id))
        .transpose()
        .context("Failed to load recheck report")?;

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupted, finishing units already in progress");
            cancelled.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    info!("Book:       {}", cli.book_id);
    info!("Books root: {}", config.books_root.display());
    info!(
        "Silence:    <= {} dBFS for >= {}ms",
        config.analysis.silence_threshold_db, config.analysis.min_silence_duration_ms
    );
    info!(
        "Length:     {}s per 1000 chars, ±{:.0}%",
        config.analysis.expected_seconds_per_1000_chars,
        config.analysis.tolerance_fraction * 100.0
    );

    let layout = Arc::new(BookLayout::from_config(&config));
    let analyzer = UnitAnalyzer::new(Arc::new(FileDecoder), layout, config.analysis);
    let orchestrator = BatchOrchestrator::new(analyzer, config.worker_count())
        .with_progress(!cli.no_progress)
        .with_cancel_flag(cancelled.clone());

    let (report, stats) = orchestrator
        .analyze_batch(&cli.book_id, recheck.as_ref())
        .await
        .with_context(|| format!("Failed to analyze book {}", cli.book_id))?;

    print_summary(&report, &stats);

    if let Some(ref output) = cli.output {
        report
            .save(output)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
    }

    if cancelled.load(Ordering::Relaxed) {
        anyhow::bail!(
            "Cancelled: {} units were skipped",
            stats.skipped_units
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "narrcheck",
            "1342",
            "--books-root",
            "/data/books",
            "--workers",
            "6",
            "--silence-threshold-db",
            "-45",
            "--min-silence-ms",
            "2500",
            "--tolerance",
            "0.3",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(cli.book_id, "1342");
        assert_eq!(config.books_root, PathBuf::from("/data/books"));
        assert_eq!(config.max_workers, Some(6));
        assert_eq!(config.analysis.silence_threshold_db, -45.0);
        assert_eq!(config.analysis.min_silence_duration_ms, 2500);
        assert_eq!(config.analysis.tolerance_fraction, 0.3);
        assert_eq!(config.analysis.expected_seconds_per_1000_chars, 5.0);
    }

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["narrcheck", "84"]);
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);

        assert!(cli.recheck.is_none());
        assert!(!cli.no_progress);
        assert_eq!(config.analysis, Config::default().analysis);
    }
}
