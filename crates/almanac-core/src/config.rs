use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Duration,
  NaiveTime,
  Weekday
};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::context::{
  CalendarContext,
  SlotWindow,
  weekday_from_ordinal
};
use crate::datetime::{
  parse_timezone,
  parse_weekday_name
};
use crate::views::ViewPolicy;

const CONFIG_FILE: &str =
  "almanac.toml";
const CONFIG_ENV_VAR: &str =
  "ALMANAC_CONFIG";
const TIMEZONE_ENV_VAR: &str =
  "ALMANAC_TIMEZONE";

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_FIRST_DAY: &str =
  "monday";
const DEFAULT_SLOT_START: &str =
  "09:00";
const DEFAULT_SLOT_DURATION_MINUTES:
  i64 = 480;
const DEFAULT_SLOT_INTERVAL_MINUTES:
  i64 = 60;
const DEFAULT_AGENDA_PAGE_SIZE: usize =
  50;
const MAX_SLOT_MINUTES: i64 = 24 * 60;

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default)]
pub struct CalendarConfig {
  pub timezone:     String,
  pub week:         WeekSection,
  pub timeslots:    TimeslotSection,
  pub views:        ViewSection,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default)]
pub struct WeekSection {
  /// Weekday name or a locale ordinal
  /// where 0 is Sunday.
  pub first_day: String
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default)]
pub struct TimeslotSection {
  pub start:            String,
  pub duration_minutes: i64,
  pub interval_minutes: i64
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(default)]
pub struct ViewSection {
  pub allow_future:     bool,
  pub allow_empty:      bool,
  pub agenda_page_size: usize
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      timezone:     DEFAULT_TIMEZONE
        .to_string(),
      week:         WeekSection::default(),
      timeslots:
        TimeslotSection::default(),
      views:        ViewSection::default(),
      loaded_files: Vec::new()
    }
  }
}

impl Default for WeekSection {
  fn default() -> Self {
    Self {
      first_day: DEFAULT_FIRST_DAY
        .to_string()
    }
  }
}

impl Default for TimeslotSection {
  fn default() -> Self {
    Self {
      start:            DEFAULT_SLOT_START
        .to_string(),
      duration_minutes:
        DEFAULT_SLOT_DURATION_MINUTES,
      interval_minutes:
        DEFAULT_SLOT_INTERVAL_MINUTES
    }
  }
}

impl Default for ViewSection {
  fn default() -> Self {
    Self {
      allow_future:     true,
      allow_empty:      true,
      agenda_page_size:
        DEFAULT_AGENDA_PAGE_SIZE
    }
  }
}

impl CalendarConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    );
    let timezone_env =
      std::env::var(TIMEZONE_ENV_VAR)
        .ok();
    Self::from_sources(
      path.as_deref(),
      timezone_env
    )
  }

  /// Layers defaults, an optional file
  /// and an optional timezone override.
  pub fn from_sources(
    path: Option<&Path>,
    timezone_override: Option<String>
  ) -> anyhow::Result<Self> {
    let mut cfg = match path {
      | Some(path) => {
        info!(config = %path.display(), "loading calendar config");
        Self::load_file(path)?
      }
      | None => {
        warn!(
          "no calendar config found; \
           using defaults"
        );
        Self::default()
      }
    };

    if let Some(raw) = timezone_override
      && !raw.trim().is_empty()
    {
      debug!(timezone = %raw, source = TIMEZONE_ENV_VAR, "timezone overridden");
      cfg.timezone =
        raw.trim().to_string();
    }

    cfg.sanitize();
    Ok(cfg)
  }

  #[tracing::instrument]
  fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg: Self =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k.trim();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");
      match key {
        | "timezone" => {
          self.timezone =
            value.to_string();
        }
        | "week.first_day" => {
          self.week.first_day =
            value.to_string();
        }
        | "timeslots.start" => {
          self.timeslots.start =
            value.to_string();
        }
        | "timeslots.duration_minutes" => {
          self
            .timeslots
            .duration_minutes =
            parse_number(key, value)?;
        }
        | "timeslots.interval_minutes" => {
          self
            .timeslots
            .interval_minutes =
            parse_number(key, value)?;
        }
        | "views.allow_future" => {
          self.views.allow_future =
            parse_bool(value);
        }
        | "views.allow_empty" => {
          self.views.allow_empty =
            parse_bool(value);
        }
        | "views.agenda_page_size" => {
          self.views.agenda_page_size =
            parse_number(key, value)?;
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  /// Replaces unusable values with
  /// defaults.
  pub fn sanitize(&mut self) {
    if self.timezone.trim().is_empty() {
      self.timezone =
        DEFAULT_TIMEZONE.to_string();
    }

    if self
      .week
      .first_day
      .trim()
      .is_empty()
    {
      self.week.first_day =
        DEFAULT_FIRST_DAY.to_string();
    }

    if parse_slot_start(
      &self.timeslots.start
    )
    .is_none()
    {
      warn!(start = %self.timeslots.start, "invalid slot start; using default");
      self.timeslots.start =
        DEFAULT_SLOT_START.to_string();
    }

    if self.timeslots.interval_minutes
      <= 0
      || self.timeslots.interval_minutes
        > MAX_SLOT_MINUTES
    {
      warn!(
        interval = self
          .timeslots
          .interval_minutes,
        "slot interval must be \
         between 1 and 1440 minutes; \
         using default"
      );
      self.timeslots.interval_minutes =
        DEFAULT_SLOT_INTERVAL_MINUTES;
    }

    if self.timeslots.duration_minutes
      < 0
    {
      warn!(
        duration = self
          .timeslots
          .duration_minutes,
        "slot window cannot be \
         negative; using default"
      );
      self.timeslots.duration_minutes =
        DEFAULT_SLOT_DURATION_MINUTES;
    }

    if self.timeslots.duration_minutes
      > MAX_SLOT_MINUTES
    {
      warn!(
        duration = self
          .timeslots
          .duration_minutes,
        "slot window longer than a \
         day; clamping"
      );
      self.timeslots.duration_minutes =
        MAX_SLOT_MINUTES;
    }

    if self.views.agenda_page_size == 0
    {
      warn!(
        "agenda page size must be \
         positive; using default"
      );
      self.views.agenda_page_size =
        DEFAULT_AGENDA_PAGE_SIZE;
    }
  }

  pub fn first_weekday(
    &self
  ) -> anyhow::Result<Weekday> {
    let raw = self
      .week
      .first_day
      .trim()
      .to_ascii_lowercase();
    if let Ok(ordinal) =
      raw.parse::<u8>()
    {
      return weekday_from_ordinal(
        ordinal
      )
      .ok_or_else(|| {
        anyhow!(
          "first weekday ordinal must \
           be 0..=6, got {ordinal}"
        )
      });
    }

    parse_weekday_name(&raw)
      .ok_or_else(|| {
        anyhow!(
          "unknown first weekday: {}",
          self.week.first_day
        )
      })
  }

  pub fn timezone(
    &self
  ) -> anyhow::Result<Tz> {
    parse_timezone(
      &self.timezone,
      "config"
    )
    .ok_or_else(|| {
      anyhow!(
        "unknown timezone: {}",
        self.timezone
      )
    })
  }

  pub fn slot_window(
    &self
  ) -> anyhow::Result<SlotWindow> {
    let start = parse_slot_start(
      &self.timeslots.start
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid slot start: {}",
        self.timeslots.start
      )
    })?;
    let minutes = |value: i64| {
      Duration::try_minutes(value)
        .ok_or_else(|| {
          anyhow!(
            "slot minutes out of range: \
             {value}"
          )
        })
    };
    SlotWindow::new(
      start,
      minutes(
        self.timeslots.duration_minutes
      )?,
      minutes(
        self.timeslots.interval_minutes
      )?
    )
  }

  pub fn policy(&self) -> ViewPolicy {
    ViewPolicy {
      allow_future: self
        .views
        .allow_future,
      allow_empty:  self
        .views
        .allow_empty
    }
  }

  pub fn agenda_page_size(
    &self
  ) -> usize {
    self.views.agenda_page_size
  }

  #[tracing::instrument(skip(self))]
  pub fn context(
    &self
  ) -> anyhow::Result<CalendarContext> {
    let ctx = CalendarContext::new(
      self.first_weekday()?,
      self.timezone()?
    )
    .with_slots(self.slot_window()?);
    debug!(
      first_weekday = %ctx.first_weekday(),
      timezone = %ctx.timezone(),
      slots = ctx.slots().slot_count(),
      "calendar context resolved"
    );
    Ok(ctx)
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(config_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if config_env == "/dev/null" {
      return None;
    }
    return Some(PathBuf::from(
      config_env
    ));
  }

  let candidate = dirs::config_dir()?
    .join("almanac")
    .join(CONFIG_FILE);
  candidate
    .exists()
    .then_some(candidate)
}

fn parse_slot_start(
  raw: &str
) -> Option<NaiveTime> {
  let raw = raw.trim();
  NaiveTime::parse_from_str(
    raw, "%H:%M"
  )
  .or_else(|_| {
    NaiveTime::parse_from_str(
      raw, "%H:%M:%S"
    )
  })
  .ok()
}

fn parse_number<T>(
  key: &str,
  value: &str
) -> anyhow::Result<T>
where
  T: std::str::FromStr,
  T::Err: std::error::Error
    + Send
    + Sync
    + 'static
{
  value.parse::<T>().with_context(
    || {
      format!(
        "invalid number for {key}: \
         {value}"
      )
    }
  )
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
