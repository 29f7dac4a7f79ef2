use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use humansize::{DECIMAL, format_size};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

use restorer::batch::{BatchObserver, Progress};
use restorer::options::DEFAULT_SUFFIX;
use restorer::{
    AlphabetTable, BatchDriver, BatchReport, CancelFlag, NamePolicy, RestoreOptions, RootReport,
    volumes,
};

#[derive(Parser)]
#[command(name = "restorer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Restore disguised .encrypted files to their original content")]
struct Cli {
    /// Root to scan (repeatable). Defaults to every mounted volume except protected ones
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Extra root to leave alone when listing volumes (repeatable)
    #[arg(long = "protect")]
    protected: Vec<PathBuf>,

    /// Suffix that marks a candidate file
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    suffix: String,

    /// Worker threads per root
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Use ORIGINAL_NAME as-is, even when it points outside the folder
    #[arg(long)]
    legacy_names: bool,

    /// Skip the read-back check before deleting sources
    #[arg(long)]
    no_verify: bool,

    /// Write a JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Start without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Log every restored file
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    print_banner();

    let roots = if cli.roots.is_empty() {
        let mut protected = volumes::default_protected();
        protected.extend(cli.protected.iter().cloned());
        volumes::list_roots(&protected)
    } else {
        cli.roots.clone()
    };

    if roots.is_empty() {
        println!("\n[!] {}", style("No roots found to scan.").yellow());
        return Ok(());
    }

    println!("\n{}", style("Roots to scan:").green().bold());
    for root in &roots {
        println!("  {}", root.display());
    }
    println!();
    println!(
        "Every *{} file found will be restored and then deleted.",
        cli.suffix
    );

    if !cli.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Start restoring?")
            .default(false)
            .interact()
            .context("Failed to confirm")?;

        if !confirmed {
            println!("\nOperation cancelled.");
            return Ok(());
        }
    }

    let options = RestoreOptions::default()
        .with_suffix(&cli.suffix)
        .with_workers(cli.jobs)
        .with_verify(!cli.no_verify)
        .with_name_policy(if cli.legacy_names {
            NamePolicy::Legacy
        } else {
            NamePolicy::Strict
        });

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel())
        .context("Failed to install Ctrl-C handler")?;

    let driver = BatchDriver::new(AlphabetTable::deployed(), options).with_cancel_flag(cancel);
    let observer = CliObserver::default();
    let report = driver.run_all(&roots, &observer);

    print_summary(&report);

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Default)]
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl BatchObserver for CliObserver {
    fn root_started(&self, root: &Path, discovered: usize) {
        println!("\n{} {}", style("Processing").cyan(), root.display());
        if discovered == 0 {
            return;
        }

        let bar = ProgressBar::new(discovered as u64);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("[{bar:40.green/white}] {pos}/{len} {msg}")
        {
            bar.set_style(bar_style.progress_chars("=>-"));
        }
        *self.bar.lock() = Some(bar);
    }

    fn file_finished(
        &self,
        _path: &Path,
        _outcome: Result<&restorer::Restored, &restorer::RestoreError>,
    ) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.inc(1);
        }
    }

    fn progress(&self, progress: &Progress) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.set_message(format!("{:.1} files/sec", progress.files_per_second));
        }
    }

    fn root_finished(&self, report: &RootReport) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_with_message(format!(
                "{}/{} restored in {:.2}s",
                style(report.restored).green().bold(),
                report.discovered,
                report.elapsed.as_secs_f64()
            ));
        }
        if let Some(error) = &report.scan_error {
            println!("[!] Scan stopped early: {}", style(error).yellow());
        }
    }
}

fn print_summary(report: &BatchReport) {
    let totals = &report.totals;

    println!();
    if report.cancelled {
        println!("{}", style("Restoration interrupted").yellow().bold());
    } else {
        println!("{}", style("Restoration complete").green().bold());
    }
    println!();
    println!("Roots processed:        {}", totals.roots_with_candidates);
    println!("Folders scanned:        {}", totals.folders);
    println!("Candidate files found:  {}", totals.discovered);
    println!("Restored:               {}", style(totals.restored).green());
    if totals.failed > 0 {
        println!("Failed:                 {}", style(totals.failed).yellow());
    }
    println!("Sources removed:        {}", totals.sources_removed);
    println!(
        "Bytes restored:         {}",
        format_size(totals.bytes_restored, DECIMAL)
    );
    println!();
}

fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", style("Restorer - disguised file recovery").cyan().bold());
}
