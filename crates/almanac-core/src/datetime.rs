use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Offset,
  TimeZone,
  Timelike,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

/// Anything a period may be asked about.
///
/// Aware values are moved into the calendar timezone before comparison,
/// naive values are read as local wall time, and a bare date means its
/// midnight. `Time` carries no date at all, so it never converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
  Date(NaiveDate),
  Naive(NaiveDateTime),
  Instant(DateTime<Utc>),
  Time(NaiveTime)
}

impl Moment {
  #[must_use]
  pub fn civil(
    &self,
    tz: &Tz
  ) -> Option<NaiveDateTime> {
    match self {
      | Self::Date(date) => {
        Some(date.and_time(NaiveTime::MIN))
      }
      | Self::Naive(naive) => Some(*naive),
      | Self::Instant(instant) => Some(
        instant
          .with_timezone(tz)
          .naive_local()
      ),
      | Self::Time(_) => None
    }
  }
}

impl From<NaiveDate> for Moment {
  fn from(date: NaiveDate) -> Self {
    Self::Date(date)
  }
}

impl From<NaiveDateTime> for Moment {
  fn from(naive: NaiveDateTime) -> Self {
    Self::Naive(naive)
  }
}

impl From<NaiveTime> for Moment {
  fn from(time: NaiveTime) -> Self {
    Self::Time(time)
  }
}

impl<Z: TimeZone> From<DateTime<Z>>
  for Moment
{
  fn from(dt: DateTime<Z>) -> Self {
    Self::Instant(dt.with_timezone(&Utc))
  }
}

/// Values that always carry a calendar date, so building a period from
/// them cannot fail.
pub trait CivilTime {
  fn civil_in(
    &self,
    tz: &Tz
  ) -> NaiveDateTime;
}

impl<T: CivilTime + ?Sized> CivilTime
  for &T
{
  fn civil_in(
    &self,
    tz: &Tz
  ) -> NaiveDateTime {
    (**self).civil_in(tz)
  }
}

impl CivilTime for NaiveDate {
  fn civil_in(
    &self,
    _tz: &Tz
  ) -> NaiveDateTime {
    self.and_time(NaiveTime::MIN)
  }
}

impl CivilTime for NaiveDateTime {
  fn civil_in(
    &self,
    _tz: &Tz
  ) -> NaiveDateTime {
    *self
  }
}

impl<Z: TimeZone> CivilTime
  for DateTime<Z>
{
  fn civil_in(
    &self,
    tz: &Tz
  ) -> NaiveDateTime {
    self.with_timezone(tz).naive_local()
  }
}

/// Drops sub-second precision.
#[must_use]
pub fn truncate_seconds(
  naive: NaiveDateTime
) -> NaiveDateTime {
  naive
    .with_nanosecond(0)
    .unwrap_or(naive)
}

/// Pins a wall-clock value to an instant in `tz`.
///
/// Ambiguous values take the earliest instant. Values inside a DST gap are
/// read with the offset in force before the gap, which moves them forward
/// by the gap length.
#[must_use]
pub fn resolve_local(
  tz: &Tz,
  naive: NaiveDateTime
) -> DateTime<Tz> {
  match tz.from_local_datetime(&naive)
  {
    | LocalResult::Single(local) => {
      local
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      if first <= second {
        first
      } else {
        second
      }
    }
    | LocalResult::None => {
      let before = naive
        .checked_sub_signed(
          Duration::days(1)
        )
        .and_then(|probe| {
          tz.offset_from_local_datetime(
            &probe
          )
          .earliest()
        })
        .map(|offset| {
          offset.fix().local_minus_utc()
        })
        .unwrap_or(0);
      tracing::trace!(
        %naive,
        timezone = %tz,
        offset_seconds = before,
        "wall time falls in a gap; shifting forward"
      );
      let utc = naive
        - Duration::seconds(i64::from(
          before
        ));
      tz.from_utc_datetime(&utc)
    }
  }
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<Moment> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_today =
    now.with_timezone(tz).date_naive();

  match lower.as_str() {
    | "now" => {
      return Ok(Moment::Instant(now));
    }
    | "today" => {
      return Ok(Moment::Date(
        local_today
      ));
    }
    | "tomorrow" => {
      return local_today
        .succ_opt()
        .map(Moment::Date)
        .ok_or_else(|| {
          anyhow!(
            "failed to advance to \
             tomorrow"
          )
        });
    }
    | "yesterday" => {
      return local_today
        .pred_opt()
        .map(Moment::Date)
        .ok_or_else(|| {
          anyhow!(
            "failed to step back to \
             yesterday"
          )
        });
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    let date = NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    })?;
    return Ok(Moment::Date(date));
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(Moment::Date(
      next_weekday_date(
        local_today,
        target_weekday
      )
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let mut year = local_today.year();
    if target_month
      <= local_today.month()
    {
      year = year.saturating_add(1);
    }
    let date = NaiveDate::from_ymd_opt(
      year,
      target_month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month/year \
         candidate"
      )
    })?;
    return Ok(Moment::Date(date));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[wdhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "w" => Duration::try_weeks(num),
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => {
        Duration::try_minutes(num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset out of \
         range: {token}"
      )
    })?;

    let shifted = if sign == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    };
    return shifted
      .map(Moment::Instant)
      .ok_or_else(|| {
        anyhow!(
          "relative offset out of \
           range: {token}"
        )
      });
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(Moment::Instant(
      DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
    ));
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(Moment::from(dt));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(Moment::Date(date));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
  {
    return Ok(Moment::Date(date));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(Moment::Naive(ndt));
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     4-digit year, YYYY-MM, weekday \
     names (e.g. monday), month names \
     (e.g. march), +Nw/+Nd/+Nh/+Nm, \
     RFC3339, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM[:SS], \
     YYYYMMDDTHHMMSSZ"
  })
}

/// Monday of week `week` in `year`.
///
/// Weeks are numbered the way `strftime` does: `%W` (Monday-first) when the
/// calendar starts weeks on Monday, `%U` (Sunday-first) otherwise.
pub fn week_anchor(
  year: i32,
  week: u32,
  first_weekday: Weekday
) -> anyhow::Result<NaiveDate> {
  let fmt = if first_weekday
    == Weekday::Mon
  {
    "%Y-%W-%w"
  } else {
    "%Y-%U-%w"
  };
  NaiveDate::parse_from_str(
    &format!("{year}-{week}-1"),
    fmt
  )
  .with_context(|| {
    format!(
      "no week {week} in year {year}"
    )
  })
}

pub(crate) fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}
