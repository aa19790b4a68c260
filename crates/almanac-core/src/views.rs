use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Months,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  Timelike,
  Utc
};
use serde::Serialize;

use crate::context::CalendarContext;
use crate::occurrence::Occurrence;
use crate::period::{
  Day,
  Month,
  Period,
  PeriodKind,
  TripleMonth,
  Week,
  Year
};

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Serialize,
  clap::ValueEnum
)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
  Year,
  TriMonth,
  Month,
  Week,
  Day
}

impl ViewKind {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Year => "year",
      | Self::TriMonth => "tri_month",
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day"
    }
  }

  pub fn period_kind(self) -> PeriodKind {
    match self {
      | Self::Year => PeriodKind::Year,
      | Self::TriMonth => {
        PeriodKind::TripleMonth
      }
      | Self::Month => PeriodKind::Month,
      | Self::Week => PeriodKind::Week,
      | Self::Day => PeriodKind::Day
    }
  }
}

/// The date a view builds its period from.
///
/// Year views always start in January; tri-month views start one month
/// early so the requested month sits in the middle.
pub fn view_anchor(
  kind: ViewKind,
  date: NaiveDate
) -> NaiveDate {
  match kind {
    | ViewKind::Year => {
      NaiveDate::from_ymd_opt(
        date.year(),
        1,
        1
      )
      .unwrap_or(date)
    }
    | ViewKind::TriMonth => date
      .checked_sub_months(Months::new(1))
      .unwrap_or(date),
    | _ => date
  }
}

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  clap::ValueEnum
)]
pub enum OccurrenceFilter {
  Past,
  Future,
  Today
}

impl OccurrenceFilter {
  pub fn keep<O: Occurrence>(
    self,
    occurrence: &O,
    now: DateTime<Utc>,
    ctx: &CalendarContext
  ) -> bool {
    let tz = ctx.timezone();
    let Some(start) =
      occurrence.start().civil(tz)
    else {
      return false;
    };
    let now = now
      .with_timezone(tz)
      .naive_local();
    match self {
      | Self::Past => start < now,
      | Self::Future => start >= now,
      | Self::Today => {
        start.date() == now.date()
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPolicy {
  pub allow_future: bool,
  pub allow_empty:  bool
}

impl Default for ViewPolicy {
  fn default() -> Self {
    Self {
      allow_future: true,
      allow_empty:  true
    }
  }
}

/// Narrows the pool before any period sees it.
#[tracing::instrument(skip_all, fields(pool = pool.len(), filter = ?filter))]
pub fn prefilter<'o, O: Occurrence>(
  pool: &'o [O],
  filter: Option<OccurrenceFilter>,
  policy: ViewPolicy,
  now: DateTime<Utc>,
  ctx: &CalendarContext
) -> Vec<&'o O> {
  let tz = ctx.timezone();
  let now_civil =
    now.with_timezone(tz).naive_local();
  let selected = pool
    .iter()
    .filter(|occurrence| {
      filter.is_none_or(|filter| {
        filter.keep(
          *occurrence,
          now,
          ctx
        )
      })
    })
    .filter(|occurrence| {
      policy.allow_future
        || occurrence
          .start()
          .civil(tz)
          .is_some_and(|start| {
            start <= now_civil
          })
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    kept = selected.len(),
    "occurrence pool filtered"
  );
  selected
}

#[derive(
  Debug, Clone, Default, PartialEq, Serialize,
)]
pub struct CalendarBounds {
  pub earliest_occurrence:
    Option<NaiveDateTime>,
  pub latest_occurrence:
    Option<NaiveDateTime>
}

impl CalendarBounds {
  pub fn of<O: Occurrence>(
    pool: &[O],
    ctx: &CalendarContext
  ) -> Self {
    let tz = ctx.timezone();
    let earliest = pool
      .iter()
      .filter_map(|occurrence| {
        occurrence.start().civil(tz)
      })
      .min();
    let latest = pool
      .iter()
      .filter_map(|occurrence| {
        occurrence
          .finish()
          .and_then(|finish| {
            finish.civil(tz)
          })
      })
      .max();
    Self {
      earliest_occurrence: earliest,
      latest_occurrence:   latest
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub number:   usize,
  pub per_page: usize,
  pub pages:    usize,
  pub total:    usize,
  pub items:    Vec<T>
}

/// One-based pagination. The first page always exists, even when empty.
pub fn paginate<T>(
  items: Vec<T>,
  page: usize,
  per_page: usize
) -> anyhow::Result<Page<T>> {
  if per_page == 0 {
    return Err(anyhow!(
      "page size must be positive"
    ));
  }
  let total = items.len();
  let pages =
    total.div_ceil(per_page).max(1);
  if page == 0 || page > pages {
    return Err(anyhow!(
      "page {page} out of range \
       (1..={pages})"
    ));
  }

  let items = items
    .into_iter()
    .skip((page - 1) * per_page)
    .take(per_page)
    .collect();
  Ok(Page {
    number: page,
    per_page,
    pages,
    total,
    items
  })
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary<'a, O> {
  pub kind:        PeriodKind,
  pub adverb:      &'static str,
  pub label:       String,
  pub number:      i64,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub name:        Option<&'static str>,
  pub start:       NaiveDateTime,
  pub finish:      NaiveDateTime,
  pub start_zoned: String,
  pub occurrences: Vec<&'a O>,
  #[serde(
    skip_serializing_if = "Vec::is_empty"
  )]
  pub children:
    Vec<PeriodSummary<'a, O>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub grid:
    Option<Vec<Vec<Option<u32>>>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub slot_rows:
    Option<Vec<Vec<SlotCell>>>
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotCell {
  pub start:       NaiveDateTime,
  pub occurrences: usize
}

fn summary<'a, O, P>(
  period: &P,
  number: i64,
  name: Option<&'static str>
) -> PeriodSummary<'a, O>
where
  O: Occurrence + 'a,
  P: Period<'a, O> + std::fmt::Display
{
  PeriodSummary {
    kind: P::KIND,
    adverb: P::KIND.adverb(),
    label: period.to_string(),
    number,
    name,
    start: period.start(),
    finish: period.finish(),
    start_zoned: period
      .start_zoned()
      .to_rfc3339_opts(
        SecondsFormat::Secs,
        true
      ),
    occurrences: period
      .occurrences()
      .to_vec(),
    children: Vec::new(),
    grid: None,
    slot_rows: None
  }
}

fn month_summary<'a, O>(
  month: &Month<'a, O>
) -> PeriodSummary<'a, O>
where
  O: Occurrence + 'a
{
  let mut out = summary(
    month,
    i64::from(month.number()),
    Some(month.name())
  );
  out.grid = Some(
    month
      .calendar_display()
      .into_iter()
      .map(|row| {
        row
          .into_iter()
          .map(|cell| {
            cell.map(|day| day.number())
          })
          .collect()
      })
      .collect()
  );
  out
}

fn day_summary<'a, O>(
  day: &Day<'a, O>
) -> PeriodSummary<'a, O>
where
  O: Occurrence + 'a
{
  summary(
    day,
    i64::from(day.number()),
    Some(day.name())
  )
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewOutput<'a, O> {
  pub view:           ViewKind,
  pub timezone:       String,
  pub weekday_abbrs:  [&'static str; 7],
  pub bounds:         CalendarBounds,
  pub previous_start: NaiveDateTime,
  pub next_start:     NaiveDateTime,
  pub period:         PeriodSummary<'a, O>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub agenda:         Option<Page<&'a O>>
}

#[derive(Debug, Clone, Copy)]
pub struct ViewRequest {
  pub kind:      ViewKind,
  pub date:      NaiveDate,
  pub policy:    ViewPolicy,
  pub agenda:    Option<usize>,
  pub page_size: usize
}

/// Builds the period for a view and summarises it one level deep.
#[tracing::instrument(skip(pool, bounds, ctx), fields(view = request.kind.as_key(), date = %request.date))]
pub fn build_view<'a, O>(
  request: ViewRequest,
  pool: &[&'a O],
  bounds: CalendarBounds,
  ctx: &'a CalendarContext
) -> anyhow::Result<ViewOutput<'a, O>>
where
  O: Occurrence + 'a
{
  let anchor =
    view_anchor(request.kind, request.date);
  let members = pool.iter().copied();

  let (period, previous_start, next_start) =
    match request.kind {
      | ViewKind::Year => {
        let year =
          Year::new(anchor, ctx, members);
        let mut out = summary(
          &year,
          i64::from(year.number()),
          None
        );
        out.children = year
          .months()
          .iter()
          .map(|month| {
            summary(
              month,
              i64::from(month.number()),
              Some(month.name())
            )
          })
          .collect();
        (
          out,
          year.previous().start(),
          year.next().start()
        )
      }
      | ViewKind::TriMonth => {
        let triple = TripleMonth::new(
          anchor, ctx, members
        );
        let mut out = summary(
          &triple,
          i64::from(triple.number()),
          None
        );
        out.children = triple
          .months()
          .iter()
          .map(month_summary)
          .collect();
        (
          out,
          triple.previous().start(),
          triple.next().start()
        )
      }
      | ViewKind::Month => {
        let month =
          Month::new(anchor, ctx, members);
        let mut out =
          month_summary(&month);
        out.children = month
          .weeks()
          .iter()
          .map(|week| {
            summary(
              week,
              i64::from(week.number()),
              None
            )
          })
          .collect();
        (
          out,
          month.previous().start(),
          month.next().start()
        )
      }
      | ViewKind::Week => {
        let week =
          Week::new(anchor, ctx, members);
        let mut out = summary(
          &week,
          i64::from(week.number()),
          None
        );
        out.children = week
          .days()
          .iter()
          .map(day_summary)
          .collect();
        out.slot_rows = Some(
          week
            .calendar_display()
            .iter()
            .map(|row| {
              row
                .iter()
                .map(|slot| SlotCell {
                  start: slot.start(),
                  occurrences: slot
                    .occurrences()
                    .len()
                })
                .collect()
            })
            .collect()
        );
        (
          out,
          week.previous().start(),
          week.next().start()
        )
      }
      | ViewKind::Day => {
        let day =
          Day::new(anchor, ctx, members);
        let mut out = day_summary(&day);
        out.children = day
          .intervals()
          .iter()
          .map(|slot| {
            summary(
              slot,
              i64::from(
                slot.start().time().hour()
              ),
              None
            )
          })
          .collect();
        (
          out,
          day.previous().start(),
          day.next().start()
        )
      }
    };

  if !request.policy.allow_empty
    && period.occurrences.is_empty()
  {
    return Err(anyhow!(
      "no occurrences available for \
       {} {}",
      request.kind.period_kind().name(),
      period.label
    ));
  }

  let agenda = match request.agenda {
    | Some(page) => {
      let mut items =
        period.occurrences.clone();
      let tz = ctx.timezone();
      items.sort_by_key(|occurrence| {
        occurrence.start().civil(tz)
      });
      Some(paginate(
        items,
        page,
        request.page_size
      )?)
    }
    | None => None
  };

  tracing::debug!(
    occurrences = period.occurrences.len(),
    children = period.children.len(),
    "view built"
  );

  Ok(ViewOutput {
    view: request.kind,
    timezone: ctx.timezone().to_string(),
    weekday_abbrs: ctx.weekday_abbrs(),
    bounds,
    previous_start,
    next_start,
    period,
    agenda
  })
}
