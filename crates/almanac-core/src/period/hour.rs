use chrono::{Duration, NaiveDateTime};

use super::{Day, Month, Period, PeriodKind, Step, Week, Year, series};
use crate::occurrence::Occurrence;

period_type!(
    /// One clock hour of wall time.
    Hour => PeriodKind::Hour
);

impl<'a, O: Occurrence + 'a> Hour<'a, O> {
    /// Hour of the day, 0-23.
    pub fn number(&self) -> u32 {
        self.span.hour()
    }

    /// The sixty minute marks of this hour.
    pub fn minutes(&self) -> impl Iterator<Item = NaiveDateTime> {
        series(
            self.start(),
            self.finish(),
            Step::Fixed(Duration::minutes(1)),
        )
    }

    pub fn day(&self) -> Day<'a, O> {
        self.span.derive(self.start())
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
