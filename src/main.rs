//! casekeep - study-progress aggregation and case-content backup.
//!
//! A CLI tool that folds speed-quiz attempts into per-law score documents
//! and backs up modified case modules into timestamped snapshots.
//!
//! Exit codes:
//!   0 - Success (including partial per-file copy failures)
//!   1 - Fatal error (invalid input, store I/O, change detection, config)
//!   2 - Backup attempted at least one file and every copy failed

mod backup;
mod cli;
mod config;
mod error;
mod models;
mod progress;
mod scanner;
mod store;

use anyhow::{Context, Result};
use backup::{ArchiveOptions, ChangeDetector, SnapshotArchiver};
use cli::{Args, Command};
use config::Config;
use models::AttemptOutcome;
use scanner::{CaseScanner, ScanConfig};
use std::path::{Path, PathBuf};
use store::ScoreStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        match handle_init_config() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("\n❌ Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    init_logging(&args);

    info!("casekeep v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Operation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .casekeep.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".casekeep.toml");

    if path.exists() {
        eprintln!("⚠️  .casekeep.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .casekeep.toml")?;

    println!("✅ Created .casekeep.toml with default settings.");
    println!("   Edit it to customize the data, content, and backup roots.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .casekeep.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Resolve a configured path against the repository root.
fn resolve(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

/// Dispatch the selected command. Returns the exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command.clone() {
        Command::Record {
            law,
            article,
            paragraph,
            score,
            correct,
            module,
        } => run_record(&args, &config, &law, &article, &paragraph, score, correct, module),
        Command::Show { law, detailed } => run_show(&args, &config, law.as_deref(), detailed),
        Command::Backup { dest, dry_run } => run_backup(&args, &config, dest, dry_run),
        Command::Scan { output } => run_scan(&args, &config, output),
        Command::InitConfig => unreachable!("handled before logging init"),
    }
}

/// Record one attempt: load, fold, save.
///
/// The store's read-modify-write cycle is the only access pattern; on a save
/// failure the in-memory update is simply discarded and the document on disk
/// stays untouched, so the caller can retry the whole cycle.
#[allow(clippy::too_many_arguments)]
fn run_record(
    args: &Args,
    config: &Config,
    law: &str,
    article: &str,
    paragraph: &str,
    score: f64,
    correct: bool,
    module: Option<String>,
) -> Result<i32> {
    let store = ScoreStore::new(resolve(&args.repo_root, &config.store.data_dir));
    let mut table = store.load(law)?;

    let outcome = AttemptOutcome {
        correct,
        score,
        module_id: module,
    };
    let record = progress::record_attempt(&mut table, article, paragraph, &outcome)?;

    println!(
        "📊 {}{}条{}項: {}/{} correct, total {}, average {} ({})",
        law,
        article,
        paragraph,
        record.correct,
        record.answered,
        record.total_score,
        record.average_score,
        record.speed_rank
    );

    store.save(law, &table)?;
    println!("✅ Saved score document: {}", store.document_path(law).display());
    Ok(0)
}

/// Print progress summaries for one law or all laws.
fn run_show(args: &Args, config: &Config, law: Option<&str>, detailed: bool) -> Result<i32> {
    let store = ScoreStore::new(resolve(&args.repo_root, &config.store.data_dir));

    let laws = match law {
        Some(law) => vec![law.to_string()],
        None => store.list_laws()?,
    };

    if laws.is_empty() {
        println!("No score documents found.");
        return Ok(0);
    }

    for law in &laws {
        let table = store.load(law)?;
        println!("{}", progress::summarize(&table));

        if detailed {
            for (article, paragraphs) in &table.articles {
                for (paragraph, record) in paragraphs {
                    println!(
                        "   {}条{}項: {}/{} correct, average {} ({})",
                        article,
                        paragraph,
                        record.correct,
                        record.answered,
                        record.average_score,
                        record.speed_rank
                    );
                }
            }
        }
    }

    Ok(0)
}

/// Detect changed case modules and archive them.
fn run_backup(args: &Args, config: &Config, dest: Option<PathBuf>, dry_run: bool) -> Result<i32> {
    let detector = ChangeDetector::new(&args.repo_root, config.backup.content_root.clone());
    let changes = detector.detect()?;

    if changes.is_empty() {
        println!(
            "No modified case files detected under {}.",
            config.backup.content_root
        );
        return Ok(0);
    }

    println!(
        "📦 Backing up {} files{}",
        changes.len(),
        if dry_run { " (dry-run)" } else { "" }
    );

    let archiver = SnapshotArchiver::new(
        &args.repo_root,
        config.backup.content_root.clone(),
        config.backup.backup_root.clone(),
    );
    let options = ArchiveOptions {
        dry_run,
        destination: dest,
        show_progress: !args.quiet,
    };
    let snapshot = archiver.archive(&changes, &options)?;

    for entry in &snapshot.entries {
        let verb = if snapshot.dry_run { "Would copy" } else { "Copied" };
        println!("   {} {} -> {}", verb, entry.source, entry.destination.display());
    }
    for failure in &snapshot.failures {
        eprintln!("   ⚠️  {}: {}", failure.source, failure.reason);
    }

    println!("\n📊 Backup Summary:");
    println!("   Destination: {}", snapshot.destination.display());
    println!(
        "   {}: {} | Failed: {}",
        if snapshot.dry_run { "Planned" } else { "Copied" },
        snapshot.entries.len(),
        snapshot.failures.len()
    );

    if snapshot.all_failed() {
        eprintln!("\n⛔ Every copy failed. Failing (exit code 2).");
        return Ok(2);
    }

    println!("\n✅ Backup complete.");
    Ok(0)
}

/// Build and print (or write) the case-module index.
fn run_scan(args: &Args, config: &Config, output: Option<PathBuf>) -> Result<i32> {
    let content_dir = resolve(&args.repo_root, Path::new(&config.backup.content_root));
    let scan_config = ScanConfig {
        extensions: config.scanner.extensions.clone(),
        ignore_names: config.scanner.ignore_names.clone(),
    };
    let scanner = CaseScanner::new(content_dir, scan_config);
    let entries = scanner.scan()?;

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize index")?;
        std::fs::write(&output, json)
            .with_context(|| format!("Failed to write index to {}", output.display()))?;
        println!("✅ Wrote {} case entries to {}", entries.len(), output.display());
    } else {
        for entry in &entries {
            println!("   📄 {} ({}) -> {}", entry.id, entry.category, entry.path);
        }
        println!("\n   Total: {} case modules", entries.len());
    }

    Ok(0)
}
