use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::views::{OccurrenceFilter, ViewKind};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "almanac",
    version,
    about = "Almanac: calendar periods over scheduled occurrences",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Display timezone for this run; unknown zones fall back to the
    /// configured one.
    #[arg(long = "tz")]
    pub tz: Option<String>,

    /// JSON array of scheduled occurrences.
    #[arg(long = "occurrences")]
    pub occurrences: Option<PathBuf>,

    /// Pin the current instant (RFC3339), mostly for reproducible output.
    #[arg(long = "now")]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    Year(ViewArgs),
    TriMonth(ViewArgs),
    Month(ViewArgs),
    Week(WeekArgs),
    Day(ViewArgs),
    Today(FilterArgs),
    /// Paginated list of the occurrences inside a view's period.
    Agenda(AgendaArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long = "filter", value_enum)]
    pub filter: Option<OccurrenceFilter>,
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Date expression: `2024-03-15`, `2024-03`, `tomorrow`, `+2w`, `june`...
    pub date: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WeekArgs {
    pub date: Option<String>,

    /// Week of the year, counted from the configured first weekday.
    #[arg(long = "number", conflicts_with = "date")]
    pub number: Option<u32>,

    #[arg(long = "year", requires = "number")]
    pub year: Option<i32>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AgendaArgs {
    #[arg(value_enum)]
    pub view: ViewKind,

    pub date: Option<String>,

    #[arg(long = "page", default_value_t = 1)]
    pub page: usize,

    #[command(flatten)]
    pub filter: FilterArgs,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
