use clap::Parser;
use colored::Colorize;
use nbnorm_core::{find_notebooks, process_file, Error, NormalizeOptions, Outcome, ProcessOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// nbnorm — normalize Jupyter notebooks to reduce noisy diffs
///
/// Clears execution counts and outputs, removes widget model ids, and
/// clears notebook metadata.
#[derive(Parser, Debug)]
#[command(name = "nbnorm", version, about, long_about = None)]
struct Cli {
    /// Files, directories, or glob patterns to process
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Show which files would be changed without writing
    #[arg(long)]
    dry_run: bool,

    /// Create .bak backups before overwriting
    #[arg(long)]
    backup: bool,

    /// Keep notebook metadata, removing only widget and execution state
    #[arg(long)]
    keep_metadata: bool,
}

impl Cli {
    fn options(&self) -> ProcessOptions {
        ProcessOptions {
            dry_run: self.dry_run,
            backup: self.backup,
            normalize: NormalizeOptions {
                clear_metadata: !self.keep_metadata,
            },
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let options = cli.options();
    debug!(?options, "starting");

    let notebooks: Vec<PathBuf> = find_notebooks(cli.paths.as_slice()).collect();
    let mut any_changed = false;
    for path in &notebooks {
        any_changed |= report(path, process_file(path, &options));
    }

    let checked = notebooks.len();
    if !any_changed {
        if options.dry_run {
            println!("No notebooks would be changed ({} checked).", checked);
        } else {
            println!("No notebooks changed ({} checked).", checked);
        }
    } else if !options.dry_run {
        println!("{} ({} checked).", "Done".green().bold(), checked);
    }
}

/// Print one file's outcome; returns whether the file changed
fn report(path: &Path, result: nbnorm_core::Result<Outcome>) -> bool {
    match result {
        Ok(Outcome::Unchanged) => false,
        Ok(Outcome::WouldChange) => {
            println!("{} would update: {}", "[dry-run]".yellow(), path.display());
            true
        }
        Ok(Outcome::Updated { backup }) => {
            let backup = backup
                .map(|bak| bak.display().to_string())
                .unwrap_or_else(|| "none".to_string());
            println!(
                "{} {} (backup -> {})",
                "Updated:".green(),
                path.display(),
                backup
            );
            true
        }
        Err(err @ Error::Parse(_)) => {
            eprintln!("{} {}: {}", "Skipping".yellow(), path.display(), err);
            false
        }
        Err(err) => {
            eprintln!("{} {}: {}", "Error processing".red(), path.display(), err);
            false
        }
    }
}
