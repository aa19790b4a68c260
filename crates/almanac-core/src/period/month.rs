use chrono::{Datelike, Duration};

use super::{Day, Period, PeriodKind, Step, Week, Year, tick};
use crate::context::{month_abbr, month_name};
use crate::occurrence::Occurrence;

period_type!(
    /// One calendar month.
    Month => PeriodKind::Month
);

period_type!(
    /// Three consecutive months starting at the anchor's month, used to
    /// group month views.
    TripleMonth => PeriodKind::TripleMonth
);

impl<'a, O: Occurrence + 'a> Month<'a, O> {
    pub fn number(&self) -> u32 {
        self.span.month()
    }

    pub fn name(&self) -> &'static str {
        month_name(self.span.month())
    }

    pub fn abbr(&self) -> &'static str {
        month_abbr(self.span.month())
    }

    /// Every week overlapping the month.
    ///
    /// Weeks are stepped from the month's first day. When the last stepped
    /// week ends before the month does, the following week is appended too.
    pub fn weeks(&self) -> Vec<Week<'a, O>> {
        let mut weeks: Vec<Week<'a, O>> = self.span.walk(Step::Fixed(Duration::weeks(1))).collect();
        let following = weeks
            .last()
            .and_then(|last| last.finish().checked_add_signed(tick()));
        if let Some(following) = following
            && self.contains(following)
        {
            weeks.push(self.span.derive(following));
        }
        tracing::trace!(month = %self, weeks = weeks.len(), "split month into weeks");
        weeks
    }

    pub fn days(&self) -> Vec<Day<'a, O>> {
        self.span.walk(Step::Fixed(Duration::days(1))).collect()
    }

    /// Month grid in first-weekday column order; cells outside the month
    /// are `None`.
    ///
    /// The whole grid is built up front, each `Day` filtering the month's
    /// pool. Use `weeks` or `days` when only part of the month is needed.
    pub fn calendar_display(&self) -> Vec<Vec<Option<Day<'a, O>>>> {
        let ctx = self.span.context();
        let lead = ctx.column_of(self.start().weekday()) as usize;
        let cells = std::iter::repeat_with(|| None)
            .take(lead)
            .chain(self.days().into_iter().map(Some));

        let mut rows = Vec::with_capacity(6);
        let mut row = Vec::with_capacity(7);
        for cell in cells {
            row.push(cell);
            if row.len() == 7 {
                rows.push(std::mem::replace(&mut row, Vec::with_capacity(7)));
            }
        }
        if !row.is_empty() {
            row.resize_with(7, || None);
            rows.push(row);
        }
        rows
    }

    pub fn year(&self) -> Year<'a, O> {
        self.span.derive(self.start())
    }
}

impl<'p, 'a, O: Occurrence + 'a> IntoIterator for &'p Month<'a, O> {
    type Item = Week<'a, O>;
    type IntoIter = std::vec::IntoIter<Week<'a, O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.weeks().into_iter()
    }
}

impl<'a, O: Occurrence + 'a> TripleMonth<'a, O> {
    /// Month number of the first month.
    pub fn number(&self) -> u32 {
        self.span.month()
    }

    pub fn months(&self) -> Vec<Month<'a, O>> {
        self.span.walk(Step::Months(1)).collect()
    }

    pub fn days(&self) -> Vec<Day<'a, O>> {
        self.span.walk(Step::Fixed(Duration::days(1))).collect()
    }

    pub fn first_month(&self) -> Month<'a, O> {
        self.nth_month(0)
    }

    pub fn second_month(&self) -> Month<'a, O> {
        self.nth_month(1)
    }

    pub fn third_month(&self) -> Month<'a, O> {
        self.nth_month(2)
    }

    fn nth_month(&self, n: i32) -> Month<'a, O> {
        let at = Step::Months(1)
            .offset(self.start(), n)
            .unwrap_or_else(|| self.start());
        self.span.derive(at)
    }
}

impl<'p, 'a, O: Occurrence + 'a> IntoIterator for &'p TripleMonth<'a, O> {
    type Item = Month<'a, O>;
    type IntoIter = std::vec::IntoIter<Month<'a, O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.months().into_iter()
    }
}
