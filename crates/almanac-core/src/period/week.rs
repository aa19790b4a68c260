use chrono::{Datelike, Duration, NaiveDate};

use super::{Day, Month, Period, PeriodKind, Slot, Step, Year};
use crate::occurrence::Occurrence;

period_type!(
    /// Seven days starting on the context's first weekday.
    ///
    /// Membership ignores the first-weekday snap and compares the plain
    /// wall-clock value against the week's bounds.
    Week => PeriodKind::Week
);

impl<'a, O: Occurrence + 'a> Week<'a, O> {
    /// One-based week of the year, counted in whole weeks from January 1st
    /// of the year the week starts in.
    pub fn number(&self) -> u32 {
        let start = self.start().date();
        let new_year = NaiveDate::from_ymd_opt(start.year(), 1, 1).unwrap_or(start);
        let weeks = (start - new_year).num_days() / 7;
        u32::try_from(weeks).unwrap_or(0) + 1
    }

    pub fn days(&self) -> Vec<Day<'a, O>> {
        self.span.walk(Step::Fixed(Duration::days(1))).collect()
    }

    pub fn first_day(&self) -> Day<'a, O> {
        self.span.derive(self.start())
    }

    pub fn last_day(&self) -> Day<'a, O> {
        self.span.derive(self.finish())
    }

    pub fn month(&self) -> Month<'a, O> {
        self.span.derive(self.start())
    }

    pub fn year(&self) -> Year<'a, O> {
        self.span.derive(self.start())
    }

    /// Slot grid for a week view: one row per slot of the day, one column
    /// per day of the week.
    ///
    /// Every slot is built eagerly, so the cost is slots times seven
    /// filters over the week's pool.
    pub fn calendar_display(&self) -> Vec<Vec<Slot<'a, O>>> {
        let mut columns: Vec<std::vec::IntoIter<Slot<'a, O>>> = self
            .days()
            .iter()
            .map(|day| day.intervals().into_iter())
            .collect();
        let mut rows = Vec::new();
        loop {
            let row: Option<Vec<Slot<'a, O>>> = columns.iter_mut().map(Iterator::next).collect();
            match row {
                Some(row) if !row.is_empty() => rows.push(row),
                _ => break,
            }
        }
        rows
    }
}

impl<'p, 'a, O: Occurrence + 'a> IntoIterator for &'p Week<'a, O> {
    type Item = Day<'a, O>;
    type IntoIter = std::vec::IntoIter<Day<'a, O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.days().into_iter()
    }
}
