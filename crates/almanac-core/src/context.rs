//! Locale-dependent calendar parameters shared by every period.
//!
//! A [`CalendarContext`] is resolved once (usually from [`crate::config`])
//! and borrowed by each period for its whole lifetime, so all periods built
//! from it agree on the first day of the week, the display timezone and the
//! daily slot window.

use anyhow::anyhow;
use chrono::{Duration, NaiveTime, Weekday};
use chrono_tz::Tz;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const MONTH_ABBRS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const WEEKDAY_ABBRS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// The daily display window cut into fixed-width slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    start: NaiveTime,
    duration: Duration,
    width: Duration,
}

impl SlotWindow {
    pub fn new(start: NaiveTime, duration: Duration, width: Duration) -> anyhow::Result<Self> {
        if width <= Duration::zero() {
            return Err(anyhow!("slot width must be positive, got {width}"));
        }
        if duration < Duration::zero() {
            return Err(anyhow!("slot window duration cannot be negative, got {duration}"));
        }
        Ok(Self {
            start,
            duration,
            width,
        })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Number of slots a day yields, counting the closing boundary slot.
    pub fn slot_count(&self) -> usize {
        let steps = self.duration.num_microseconds().unwrap_or(i64::MAX)
            / self.width.num_microseconds().unwrap_or(i64::MAX).max(1);
        usize::try_from(steps).unwrap_or(usize::MAX).saturating_add(1)
    }
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            duration: Duration::hours(8),
            width: Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarContext {
    first_weekday: Weekday,
    timezone: Tz,
    slots: SlotWindow,
}

impl CalendarContext {
    pub fn new(first_weekday: Weekday, timezone: Tz) -> Self {
        Self {
            first_weekday,
            timezone,
            slots: SlotWindow::default(),
        }
    }

    pub fn with_slots(mut self, slots: SlotWindow) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn slots(&self) -> &SlotWindow {
        &self.slots
    }

    /// The seven weekdays in display order.
    pub fn weekdays(&self) -> [Weekday; 7] {
        let mut day = self.first_weekday;
        std::array::from_fn(|_| {
            let current = day;
            day = day.succ();
            current
        })
    }

    pub fn weekday_names(&self) -> [&'static str; 7] {
        self.weekdays().map(weekday_name)
    }

    pub fn weekday_abbrs(&self) -> [&'static str; 7] {
        self.weekdays().map(weekday_abbr)
    }

    /// Column of `weekday` in a grid starting on the first weekday.
    pub fn column_of(&self, weekday: Weekday) -> u32 {
        (7 + weekday.num_days_from_monday() - self.first_weekday.num_days_from_monday()) % 7
    }
}

impl Default for CalendarContext {
    fn default() -> Self {
        Self::new(Weekday::Mon, chrono_tz::UTC)
    }
}

/// Maps a locale first-day-of-week ordinal (0 = Sunday .. 6 = Saturday)
/// onto chrono's weekday.
pub fn weekday_from_ordinal(ordinal: u8) -> Option<Weekday> {
    if ordinal > 6 {
        return None;
    }
    Weekday::try_from((ordinal + 6) % 7).ok()
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_monday() as usize]
}

pub fn weekday_abbr(weekday: Weekday) -> &'static str {
    WEEKDAY_ABBRS[weekday.num_days_from_monday() as usize]
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

pub fn month_abbr(month: u32) -> &'static str {
    MONTH_ABBRS[(month.clamp(1, 12) - 1) as usize]
}
