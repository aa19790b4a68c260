pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod datetime;
pub mod occurrence;
pub mod period;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use chrono::{
  DateTime,
  Utc
};
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

pub use context::CalendarContext;
pub use datetime::Moment;
pub use occurrence::{
  Occurrence,
  Scheduled
};
pub use period::{
  Day,
  Hour,
  Month,
  Period,
  PeriodKind,
  Slot,
  TripleMonth,
  Week,
  Year
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting almanac CLI"
  );

  let mut cfg =
    config::CalendarConfig::load(
      cli.config.as_deref()
    )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let mut ctx = cfg.context().context(
    "failed to resolve calendar \
     configuration"
  )?;
  if let Some(raw) = cli.tz.as_deref() {
    match datetime::parse_timezone(
      raw, "--tz"
    ) {
      | Some(tz) => {
        ctx = ctx.with_timezone(tz);
      }
      | None => {
        warn!(
          requested = %raw,
          fallback = %ctx.timezone(),
          "unknown timezone; keeping configured zone"
        );
      }
    }
  }

  let occurrences = match cli
    .occurrences
    .as_deref()
  {
    | Some(path) => {
      occurrence::load_occurrences(path)?
    }
    | None => Vec::new()
  };

  let now = match cli.now.as_deref() {
    | Some(raw) => {
      DateTime::parse_from_rfc3339(raw)
        .with_context(|| {
          format!(
            "invalid --now instant: \
             {raw}"
          )
        })?
        .with_timezone(&Utc)
    }
    | None => Utc::now()
  };
  debug!(%now, occurrences = occurrences.len(), "session ready");

  let session = commands::Session {
    config: cfg,
    ctx,
    occurrences,
    now
  };
  let value = commands::dispatch(
    &session,
    &cli.command
  )?;

  let text =
    serde_json::to_string_pretty(&value)
      .context(
        "failed to format output"
      )?;
  println!("{text}");

  info!("done");
  Ok(())
}
