use super::{Day, Month, Period, PeriodKind, Week, Year};
use crate::occurrence::Occurrence;

period_type!(
    /// A fixed-width row of a day's display window.
    ///
    /// Slots keep second precision, so a window starting at 09:30 yields
    /// slots starting at 09:30, 10:30, ...
    Slot => PeriodKind::Slot
);

impl<'a, O: Occurrence + 'a> Slot<'a, O> {
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
