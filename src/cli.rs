use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sheet_splitter::splitter::{DEFAULT_MAX_ROWS, SplitConfig, SplitReport, Splitter};

/// Command-line arguments of the `sheet-splitter` binary.
#[derive(Debug, Parser)]
#[command(
    version,
    about = "Split the first sheet of an xlsx workbook into files of at most N rows, repeating the header row."
)]
pub struct Args {
    /// Workbook to split. Without it there is nothing to do and the program exits.
    #[arg(short, long, value_name = "PATH", env = "SPLIT_FILE")]
    pub file: Option<PathBuf>,

    /// Maximum rows per output file, repeated header included.
    #[arg(
        short = 's',
        long,
        value_name = "N",
        env = "SPLIT_BATCH_SIZE",
        default_value_t = DEFAULT_MAX_ROWS
    )]
    pub batch_size: usize,
}

impl Args {
    /// Parses the process arguments, accepting the legacy `/f:` and `/s:` forms.
    pub fn from_env() -> Self {
        Self::parse_from(normalize_legacy_args(std::env::args_os()))
    }

    pub fn config(&self) -> SplitConfig {
        SplitConfig::new(self.batch_size)
    }
}

/// Rewrites `/f:<path>` to `--file=<path>` and `/s:<n>` to `--batch-size=<digits of n>`.
/// Anything else passes through untouched.
pub fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(s) = arg.to_str() else {
                return arg;
            };
            if let Some(path) = s.strip_prefix("/f:") {
                OsString::from(format!("--file={path}"))
            } else if let Some(size) = s.strip_prefix("/s:") {
                let digits: String = size.chars().filter(char::is_ascii_digit).collect();
                OsString::from(format!("--batch-size={digits}"))
            } else {
                arg
            }
        })
        .collect()
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Runs one split. Returns `Ok(None)` when no file was given.
pub fn run(args: &Args) -> Result<Option<SplitReport>> {
    let Some(file) = &args.file else {
        return Ok(None);
    };
    tracing::info!(file = %file.display(), batch_size = args.batch_size, "splitting");

    let report = Splitter::with_config(file, args.config())
        .split()
        .with_context(|| format!("failed to split {}", file.display()))?;
    Ok(Some(report))
}
