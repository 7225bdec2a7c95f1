use crate::error::{AuthorstatError, Result};
use crate::model::TimeWindow;
use crate::util::parse_date;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "authorstat")]
#[command(about = "Per-author and per-project engineering metrics from git log exports")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to the git log export")]
    pub log: PathBuf,

    #[arg(
        long,
        help = "Only count commits at or after this time (RFC3339 or YYYY-MM-DD); authors command only"
    )]
    pub since: Option<String>,

    #[arg(
        long,
        help = "Only count commits before this time (RFC3339 or YYYY-MM-DD); authors command only"
    )]
    pub until: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-author metrics plus a project rollup for one window
    Authors {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// 90-day windowed metrics across the project's full history
    Quartal {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Full JSON report: the all-time window plus the quartal series
    Report {
        #[arg(long, help = "Output as NDJSON, one window per line")]
        ndjson: bool,
    },
}

impl CommonArgs {
    /// Build the base aggregation window from `--since`/`--until`; no bounds
    /// means the all-time window.
    pub fn resolve_window(&self) -> Result<TimeWindow> {
        let since = self.since.as_deref().map(parse_date).transpose()?;
        let until = self.until.as_deref().map(parse_date).transpose()?;

        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                return Err(AuthorstatError::InvalidDate(format!(
                    "Invalid range: since ({s}) is after until ({u})"
                )));
            }
        }

        let mut window = TimeWindow::all_time();
        if let Some(s) = since {
            window = window.with_from(s);
        }
        if let Some(u) = until {
            window = window.with_to(u);
        }
        Ok(window)
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Authors { json, ndjson } => crate::export::authors(self.common, json, ndjson),
            Commands::Quartal { json, ndjson } => crate::export::quartal(self.common, json, ndjson),
            Commands::Report { ndjson } => crate::export::report(self.common, ndjson),
        }
    }
}
