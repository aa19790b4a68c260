//! Calendar periods: canonical, immutable time ranges that carry the
//! occurrences falling inside them.
//!
//! Every period is a [`Span`] (kind, unsnapped origin, snapped start, step,
//! borrowed [`CalendarContext`] and the member occurrences) wrapped in a
//! kind-specific type. The [`Period`] trait supplies the shared surface;
//! each kind adds its own decomposition (`Month::weeks`, `Week::days`, ...)
//! and promotion (`Day::month`, `Hour::year`, ...).
//!
//! All boundary arithmetic happens on wall-clock values in the context's
//! timezone. `start_zoned`/`finish_zoned` pin those values to instants.

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
    Weekday,
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::context::CalendarContext;
use crate::datetime::{CivilTime, Moment, resolve_local, truncate_seconds};
use crate::occurrence::Occurrence;

macro_rules! period_type {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        pub struct $name<'a, O> {
            span: $crate::period::Span<'a, O>,
        }

        impl<'a, O: $crate::occurrence::Occurrence + 'a> $crate::period::Period<'a, O>
            for $name<'a, O>
        {
            const KIND: $crate::period::PeriodKind = $kind;

            fn from_span(span: $crate::period::Span<'a, O>) -> Self {
                Self { span }
            }

            fn span(&self) -> &$crate::period::Span<'a, O> {
                &self.span
            }
        }

        impl<O> Clone for $name<'_, O> {
            fn clone(&self) -> Self {
                Self {
                    span: self.span.clone(),
                }
            }
        }

        impl<O> std::fmt::Debug for $name<'_, O> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(&self.span, f)
            }
        }

        impl<O> std::fmt::Display for $name<'_, O> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.span, f)
            }
        }

        impl<O> PartialEq for $name<'_, O> {
            fn eq(&self, other: &Self) -> bool {
                self.span == other.span
            }
        }

        impl<O> $crate::datetime::CivilTime for $name<'_, O> {
            fn civil_in(&self, tz: &chrono_tz::Tz) -> chrono::NaiveDateTime {
                self.span.civil_in(tz)
            }
        }

        impl<O> From<&$name<'_, O>> for $crate::datetime::Moment {
            fn from(period: &$name<'_, O>) -> Self {
                $crate::datetime::Moment::from(&period.span)
            }
        }
    };
}

pub mod day;
pub mod hour;
pub mod month;
pub mod slot;
pub mod week;
pub mod year;

pub use day::Day;
pub use hour::Hour;
pub use month::{Month, TripleMonth};
pub use slot::Slot;
pub use week::Week;
pub use year::Year;

/// Smallest representable step; `finish` sits one tick before the next
/// period's start.
pub fn tick() -> Duration {
    Duration::microseconds(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Hour,
    Day,
    Week,
    Month,
    TripleMonth,
    Year,
    /// A fixed-width slice of a day's display window.
    Slot,
}

impl PeriodKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::TripleMonth => "triple month",
            Self::Year => "year",
            Self::Slot => "slot",
        }
    }

    pub fn adverb(self) -> &'static str {
        match self {
            Self::Hour => "hourly",
            Self::Day => "daily",
            Self::Week => "weekly",
            Self::Month => "monthly",
            Self::TripleMonth => "tri-monthly",
            Self::Year => "yearly",
            Self::Slot => "per slot",
        }
    }

    pub fn step(self, ctx: &CalendarContext) -> Step {
        match self {
            Self::Hour => Step::Fixed(Duration::hours(1)),
            Self::Day => Step::Fixed(Duration::days(1)),
            Self::Week => Step::Fixed(Duration::weeks(1)),
            Self::Month => Step::Months(1),
            Self::TripleMonth => Step::Months(3),
            Self::Year => Step::Months(12),
            Self::Slot => Step::Fixed(ctx.slots().width()),
        }
    }

    /// Snaps a wall-clock value to the start of the period containing it.
    /// Idempotent for every kind.
    pub fn snap(self, civil: NaiveDateTime, ctx: &CalendarContext) -> NaiveDateTime {
        let date = civil.date();
        match self {
            Self::Slot => truncate_seconds(civil),
            Self::Hour => date.and_hms_opt(civil.hour(), 0, 0).unwrap_or(civil),
            Self::Day => date.and_time(NaiveTime::MIN),
            Self::Week => first_day_of_week(date, ctx.first_weekday()).and_time(NaiveTime::MIN),
            Self::Month | Self::TripleMonth => {
                date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN)
            }
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
        }
    }

    pub fn convert(self, item: Moment, ctx: &CalendarContext) -> Option<NaiveDateTime> {
        item.civil(ctx.timezone())
            .map(|civil| self.snap(truncate_seconds(civil), ctx))
    }

    /// Coercion used for membership tests.
    ///
    /// Weeks deliberately use the plain second-precision coercion instead of
    /// their own first-day snap, so a date is never pushed into the previous
    /// week by a timezone shift during snapping.
    fn membership(self, item: Moment, ctx: &CalendarContext) -> Option<NaiveDateTime> {
        match self {
            Self::Week => item.civil(ctx.timezone()).map(truncate_seconds),
            other => other.convert(item, ctx),
        }
    }

    fn format(self) -> &'static str {
        match self {
            Self::Hour => "%H:%M",
            Self::Slot => "%Y-%m-%d %H:%M",
            _ => "%Y-%m-%d",
        }
    }
}

/// How far one period reaches: a fixed duration or a calendar-relative
/// number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fixed(Duration),
    Months(u32),
}

impl Step {
    /// `from` moved by `times` steps. Month steps clamp the day to the end
    /// of shorter months.
    pub fn offset(self, from: NaiveDateTime, times: i32) -> Option<NaiveDateTime> {
        match self {
            Self::Fixed(width) => from.checked_add_signed(width.checked_mul(times)?),
            Self::Months(months) => {
                let total = i64::from(months) * i64::from(times);
                let magnitude = Months::new(u32::try_from(total.unsigned_abs()).ok()?);
                if total >= 0 {
                    from.checked_add_months(magnitude)
                } else {
                    from.checked_sub_months(magnitude)
                }
            }
        }
    }
}

/// Every `step` from `start` up to and including `until`.
pub(crate) fn series(
    start: NaiveDateTime,
    until: NaiveDateTime,
    step: Step,
) -> impl Iterator<Item = NaiveDateTime> {
    (0..)
        .map_while(move |times| step.offset(start, times))
        .take_while(move |at| *at <= until)
}

/// The most recent `first_weekday` on or before `date`.
pub fn first_day_of_week(date: NaiveDate, first_weekday: Weekday) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_monday() - first_weekday.num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

/// The base period value shared by every kind.
pub struct Span<'a, O> {
    kind: PeriodKind,
    origin: NaiveDateTime,
    start: NaiveDateTime,
    step: Step,
    ctx: &'a CalendarContext,
    occurrences: Vec<&'a O>,
}

impl<'a, O: Occurrence> Span<'a, O> {
    pub fn new<D, I>(kind: PeriodKind, at: D, ctx: &'a CalendarContext, occurrences: I) -> Self
    where
        D: CivilTime,
        I: IntoIterator<Item = &'a O>,
    {
        let origin = truncate_seconds(at.civil_in(ctx.timezone()));
        Self::from_origin(kind, origin, ctx, occurrences)
    }

    fn from_origin<I>(
        kind: PeriodKind,
        origin: NaiveDateTime,
        ctx: &'a CalendarContext,
        occurrences: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'a O>,
    {
        let mut span = Self {
            kind,
            origin,
            start: kind.snap(origin, ctx),
            step: kind.step(ctx),
            ctx,
            occurrences: Vec::new(),
        };
        let members = occurrences
            .into_iter()
            .filter(|occurrence| span.contains(occurrence.start()))
            .collect();
        span.occurrences = members;
        span
    }

    /// A neighbour `times` steps away, re-anchored from the unsnapped
    /// origin so month-length clamping never accumulates.
    pub fn shifted<I>(&self, times: i32, occurrences: I) -> Self
    where
        I: IntoIterator<Item = &'a O>,
    {
        let origin = self.step.offset(self.origin, times).unwrap_or_else(|| {
            tracing::warn!(
                kind = self.kind.name(),
                origin = %self.origin,
                times,
                "period offset out of range; staying put"
            );
            self.origin
        });
        Self::from_origin(self.kind, origin, self.ctx, occurrences)
    }

    /// A period of another kind anchored at `at`, sharing this period's
    /// occurrences.
    pub(crate) fn derive<P>(&self, at: NaiveDateTime) -> P
    where
        P: Period<'a, O>,
    {
        P::from_span(Self::from_origin(
            P::KIND,
            at,
            self.ctx,
            self.occurrences.iter().copied(),
        ))
    }

    pub(crate) fn walk<P>(&self, step: Step) -> impl Iterator<Item = P> + '_
    where
        P: Period<'a, O>,
    {
        series(self.start, self.finish(), step).map(move |at| self.derive(at))
    }
}

impl<'a, O> Span<'a, O> {
    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn origin(&self) -> NaiveDateTime {
        self.origin
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn finish(&self) -> NaiveDateTime {
        self.step
            .offset(self.start, 1)
            .and_then(|next| next.checked_sub_signed(tick()))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn start_zoned(&self) -> DateTime<Tz> {
        resolve_local(self.ctx.timezone(), self.start)
    }

    pub fn finish_zoned(&self) -> DateTime<Tz> {
        resolve_local(self.ctx.timezone(), self.finish())
    }

    pub fn context(&self) -> &'a CalendarContext {
        self.ctx
    }

    pub fn occurrences(&self) -> &[&'a O] {
        &self.occurrences
    }

    pub fn contains(&self, item: impl Into<Moment>) -> bool {
        match self.kind.membership(item.into(), self.ctx) {
            Some(at) => self.start <= at && at <= self.finish(),
            None => false,
        }
    }

    pub fn try_compare(&self, other: impl Into<Moment>) -> Option<Ordering> {
        self.kind
            .convert(other.into(), self.ctx)
            .map(|other| self.start.cmp(&other))
    }

    /// Like [`Span::try_compare`], but a value that cannot be read as a
    /// date sorts after this period.
    pub fn compare(&self, other: impl Into<Moment>) -> Ordering {
        self.try_compare(other).unwrap_or(Ordering::Less)
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    pub fn day(&self) -> u32 {
        self.start.day()
    }

    pub fn hour(&self) -> u32 {
        self.start.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.start.weekday()
    }
}

impl<O> Clone for Span<'_, O> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            origin: self.origin,
            start: self.start,
            step: self.step,
            ctx: self.ctx,
            occurrences: self.occurrences.clone(),
        }
    }
}

impl<O> PartialEq for Span<'_, O> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.start == other.start && self.step == other.step
    }
}

impl<O> fmt::Debug for Span<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("kind", &self.kind)
            .field("start", &self.start)
            .field("finish", &self.finish())
            .field("origin", &self.origin)
            .field("occurrences", &self.occurrences.len())
            .finish()
    }
}

impl<O> fmt::Display for Span<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format(self.kind.format()))
    }
}

impl<O> CivilTime for Span<'_, O> {
    fn civil_in(&self, _tz: &Tz) -> NaiveDateTime {
        self.start
    }
}

impl<O> From<&Span<'_, O>> for Moment {
    fn from(span: &Span<'_, O>) -> Self {
        Moment::Naive(span.start)
    }
}

/// Shared surface of every period kind.
pub trait Period<'a, O: Occurrence + 'a>: Sized {
    const KIND: PeriodKind;

    fn from_span(span: Span<'a, O>) -> Self;

    fn span(&self) -> &Span<'a, O>;

    /// The period containing `at`, keeping the occurrences that start
    /// inside it.
    fn new<D: CivilTime>(
        at: D,
        ctx: &'a CalendarContext,
        occurrences: impl IntoIterator<Item = &'a O>,
    ) -> Self {
        Self::from_span(Span::new(Self::KIND, at, ctx, occurrences))
    }

    fn start(&self) -> NaiveDateTime {
        self.span().start()
    }

    fn finish(&self) -> NaiveDateTime {
        self.span().finish()
    }

    fn start_zoned(&self) -> DateTime<Tz> {
        self.span().start_zoned()
    }

    fn finish_zoned(&self) -> DateTime<Tz> {
        self.span().finish_zoned()
    }

    fn origin(&self) -> NaiveDateTime {
        self.span().origin()
    }

    fn occurrences(&self) -> &[&'a O] {
        self.span().occurrences()
    }

    fn contains(&self, item: impl Into<Moment>) -> bool {
        self.span().contains(item)
    }

    fn try_compare(&self, other: impl Into<Moment>) -> Option<Ordering> {
        self.span().try_compare(other)
    }

    fn compare(&self, other: impl Into<Moment>) -> Ordering {
        self.span().compare(other)
    }

    /// The preceding period. The occurrence pool is not retained, so the
    /// neighbour is empty; see [`Period::previous_with`].
    fn previous(&self) -> Self {
        Self::from_span(self.span().shifted(-1, std::iter::empty()))
    }

    fn next(&self) -> Self {
        Self::from_span(self.span().shifted(1, std::iter::empty()))
    }

    fn previous_with(&self, occurrences: impl IntoIterator<Item = &'a O>) -> Self {
        Self::from_span(self.span().shifted(-1, occurrences))
    }

    fn next_with(&self, occurrences: impl IntoIterator<Item = &'a O>) -> Self {
        Self::from_span(self.span().shifted(1, occurrences))
    }
}
