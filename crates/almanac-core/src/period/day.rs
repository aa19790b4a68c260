use chrono::Duration;

use super::{Hour, Month, Period, PeriodKind, Slot, Step, Week, Year, series};
use crate::context::{weekday_abbr, weekday_name};
use crate::occurrence::Occurrence;

period_type!(
    /// One calendar day, midnight to midnight in wall time.
    Day => PeriodKind::Day
);

impl<'a, O: Occurrence + 'a> Day<'a, O> {
    /// Day of the month.
    pub fn number(&self) -> u32 {
        self.span.day()
    }

    pub fn name(&self) -> &'static str {
        weekday_name(self.span.weekday())
    }

    pub fn abbr(&self) -> &'static str {
        weekday_abbr(self.span.weekday())
    }

    /// The 24 wall-clock hours of the day.
    pub fn hours(&self) -> Vec<Hour<'a, O>> {
        self.span.walk(Step::Fixed(Duration::hours(1))).collect()
    }

    /// Display slots covering the configured window, closing boundary
    /// included.
    pub fn intervals(&self) -> Vec<Slot<'a, O>> {
        let window = self.span.context().slots();
        let first = self.start().date().and_time(window.start());
        let last = first
            .checked_add_signed(window.duration())
            .unwrap_or(first);
        let slots: Vec<Slot<'a, O>> = series(first, last, Step::Fixed(window.width()))
            .map(|at| self.span.derive(at))
            .collect();
        tracing::trace!(day = %self, slots = slots.len(), "sliced day into slots");
        slots
    }

    pub fn week(&self) -> Week<'a, O> {
        self.span.derive(self.start())
    }

    pub fn month(&self) -> Month<'a, O> {
        self.span.derive(self.start())
    }

    pub fn year(&self) -> Year<'a, O> {
        self.span.derive(self.start())
    }
}

impl<'p, 'a, O: Occurrence + 'a> IntoIterator for &'p Day<'a, O> {
    type Item = Hour<'a, O>;
    type IntoIter = std::vec::IntoIter<Hour<'a, O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hours().into_iter()
    }
}
