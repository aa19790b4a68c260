use chrono::Duration;

use super::{Day, Month, Period, PeriodKind, Step};
use crate::occurrence::Occurrence;

period_type!(
    /// One calendar year, January 1st to December 31st.
    Year => PeriodKind::Year
);

impl<'a, O: Occurrence + 'a> Year<'a, O> {
    pub fn number(&self) -> i32 {
        self.span.year()
    }

    pub fn months(&self) -> Vec<Month<'a, O>> {
        self.span.walk(Step::Months(1)).collect()
    }

    /// Every day of the year, produced on demand.
    pub fn days(&self) -> impl Iterator<Item = Day<'a, O>> + '_ {
        self.span.walk(Step::Fixed(Duration::days(1)))
    }
}

impl<'p, 'a, O: Occurrence + 'a> IntoIterator for &'p Year<'a, O> {
    type Item = Month<'a, O>;
    type IntoIter = std::vec::IntoIter<Month<'a, O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.months().into_iter()
    }
}
