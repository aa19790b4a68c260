use std::cmp::Ordering;

use almanac_core::context::SlotWindow;
use almanac_core::{
    CalendarContext, Day, Hour, Moment, Month, Occurrence, Period, Scheduled, TripleMonth, Week,
    Year,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).expect("valid time")
}

fn monday_first() -> CalendarContext {
    CalendarContext::new(Weekday::Mon, chrono_tz::UTC)
}

fn sunday_first() -> CalendarContext {
    CalendarContext::new(Weekday::Sun, chrono_tz::UTC)
}

fn none<'a>() -> std::iter::Empty<&'a Scheduled> {
    std::iter::empty()
}

fn assert_neighbours_round_trip<'a, P: Period<'a, Scheduled>>(period: &P) {
    assert_eq!(
        period.next().previous().start(),
        period.start(),
        "{} anchored at {}",
        P::KIND.name(),
        period.origin()
    );
    assert_eq!(
        period.previous().next().start(),
        period.start(),
        "{} anchored at {}",
        P::KIND.name(),
        period.origin()
    );
}

/// An occurrence known only by its wall-clock start.
struct Local(Moment);

impl Occurrence for Local {
    fn start(&self) -> Moment {
        self.0
    }
}

#[test]
fn month_snaps_and_decomposes() {
    let ctx = monday_first();
    let month = Month::new(date(2024, 2, 15), &ctx, none());

    assert_eq!(month.start(), at(2024, 2, 1, 0, 0));
    assert_eq!(month.finish(), at(2024, 3, 1, 0, 0) - Duration::microseconds(1));
    assert_eq!(month.origin(), at(2024, 2, 15, 0, 0));
    assert_eq!(month.name(), "February");
    assert_eq!(month.abbr(), "feb");
    assert_eq!(month.days().len(), 29);

    let weeks = month.weeks();
    assert_eq!(weeks.len(), 5);
    assert_eq!(weeks[0].start(), at(2024, 1, 29, 0, 0));
    assert_eq!(weeks[4].start(), at(2024, 2, 26, 0, 0));
    assert_eq!(month.to_string(), "2024-02-01");
}

#[test]
fn trailing_week_is_appended() {
    let monday = monday_first();
    let september = Month::new(date(2024, 9, 10), &monday, none());
    let weeks = september.weeks();
    assert_eq!(weeks.len(), 6);
    assert_eq!(weeks[0].start(), at(2024, 8, 26, 0, 0));
    assert_eq!(weeks[5].start(), at(2024, 9, 30, 0, 0));

    let sunday = sunday_first();
    let september = Month::new(date(2024, 9, 10), &sunday, none());
    let weeks = september.weeks();
    assert_eq!(weeks.len(), 5);
    assert_eq!(weeks[0].start(), at(2024, 9, 1, 0, 0));
    assert_eq!(weeks[4].start(), at(2024, 9, 29, 0, 0));
}

#[test]
fn weeks_cover_every_day_of_the_month() {
    for ctx in [monday_first(), sunday_first()] {
        for month_number in 1..=12 {
            let month = Month::new(date(2023, month_number, 1), &ctx, none());
            let weeks = month.weeks();
            for day in month.days() {
                let covering = weeks.iter().filter(|week| week.contains(day.start())).count();
                assert_eq!(covering, 1, "{day} in {month}");
            }
        }
    }
}

#[test]
fn year_and_triple_month_decompose() {
    let ctx = monday_first();
    let year = Year::new(date(2023, 6, 1), &ctx, none());
    assert_eq!(year.number(), 2023);
    let months = year.months();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0].start(), at(2023, 1, 1, 0, 0));
    assert_eq!(months[11].start(), at(2023, 12, 1, 0, 0));
    assert_eq!(year.days().count(), 365);
    assert_eq!((&year).into_iter().count(), 12);

    let triple = TripleMonth::new(date(2024, 11, 15), &ctx, none());
    let names: Vec<_> = triple.months().iter().map(Month::name).collect();
    assert_eq!(names, ["November", "December", "January"]);
    assert_eq!(triple.days().len(), 92);
    assert_eq!(triple.third_month().start(), at(2025, 1, 1, 0, 0));
    assert_eq!(triple.finish(), at(2025, 2, 1, 0, 0) - Duration::microseconds(1));
}

#[test]
fn neighbours_reanchor_from_origin() {
    let ctx = monday_first();
    let january = Month::new(date(2024, 1, 31), &ctx, none());
    let february = january.next();
    assert_eq!(february.start(), at(2024, 2, 1, 0, 0));
    assert_eq!(february.next().start(), at(2024, 3, 1, 0, 0));
    assert_eq!(february.previous(), january);

    let hour = Hour::new(at(2024, 5, 6, 10, 45), &ctx, none());
    assert_eq!(hour.start(), at(2024, 5, 6, 10, 0));
    assert_eq!(hour.next().start(), at(2024, 5, 6, 11, 0));
    assert_eq!(hour.next().origin(), at(2024, 5, 6, 11, 45));
    assert_eq!(hour.to_string(), "10:00");
    assert_eq!(hour.minutes().count(), 60);

    let leap = Year::new(date(2024, 2, 29), &ctx, none());
    assert_eq!(leap.next().start(), at(2025, 1, 1, 0, 0));
    assert_eq!(leap.previous().start(), at(2023, 1, 1, 0, 0));

    let week = Week::new(date(2024, 12, 30), &ctx, none());
    assert_eq!(week.next().start(), at(2025, 1, 6, 0, 0));
}

#[test]
fn membership_is_start_based() {
    let ctx = monday_first();
    let instant = |d, h, min, s| {
        Utc.with_ymd_and_hms(2024, 5, d, h, min, s)
            .single()
            .expect("valid instant")
    };
    let pool = vec![
        Scheduled::new("inside", instant(6, 9, 0, 0), instant(6, 10, 0, 0)),
        Scheduled::new("last second", instant(6, 23, 59, 59), instant(7, 1, 0, 0)),
        Scheduled::new("next day", instant(7, 0, 0, 0), instant(7, 1, 0, 0)),
        Scheduled::new("spills in", instant(5, 23, 0, 0), instant(6, 2, 0, 0)),
    ];

    let day = Day::new(date(2024, 5, 6), &ctx, &pool);
    let titles: Vec<_> = day.occurrences().iter().map(|o| o.title.as_str()).collect();
    assert_eq!(titles, ["inside", "last second"]);

    let hours = day.hours();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[9].occurrences().len(), 1);
    assert_eq!(hours[23].occurrences().len(), 1);
    assert!(hours[0].occurrences().is_empty());

    let week = day.week();
    assert_eq!(week.start(), at(2024, 5, 6, 0, 0));
    assert_eq!(week.occurrences().len(), 2);
    assert_eq!(week.number(), 19);

    let next = day.next_with(&pool);
    assert_eq!(next.occurrences().len(), 1);
    assert!(day.next().occurrences().is_empty());
}

#[test]
fn dateless_values_never_match() {
    let ctx = monday_first();
    let pool = vec![
        Local(Moment::Naive(at(2024, 5, 6, 8, 0))),
        Local(Moment::Time(NaiveTime::MIN)),
    ];
    let day = Day::new(date(2024, 5, 6), &ctx, &pool);
    assert_eq!(day.occurrences().len(), 1);

    assert!(!day.contains(NaiveTime::MIN));
    assert_eq!(day.try_compare(NaiveTime::MIN), None);
    assert_eq!(day.compare(NaiveTime::MIN), Ordering::Less);
    assert_eq!(day.compare(date(2024, 5, 6)), Ordering::Equal);
    assert_eq!(day.compare(at(2024, 5, 7, 3, 0)), Ordering::Less);
    assert_eq!(day.compare(date(2024, 5, 5)), Ordering::Greater);
}

#[test]
fn week_membership_matches_plain_bounds() {
    for ctx in [monday_first(), sunday_first()] {
        let week = Week::new(date(2024, 3, 13), &ctx, none());
        let mut probe = at(2024, 3, 1, 0, 0);
        while probe < at(2024, 3, 31, 0, 0) {
            let expected = week.start() <= probe && probe <= week.finish();
            assert_eq!(week.contains(probe), expected, "{probe}");
            probe += Duration::minutes(97);
        }
        assert_eq!(week.days().len(), 7);
        assert_eq!(week.first_day().name(), ctx.weekday_names()[0]);
        assert_eq!(week.last_day().name(), ctx.weekday_names()[6]);
    }
}

#[test]
fn intervals_follow_the_slot_window() {
    let ctx = monday_first();
    let day = Day::new(date(2024, 5, 6), &ctx, none());
    let slots = day.intervals();
    assert_eq!(slots.len(), 9);
    assert_eq!(slots[0].start(), at(2024, 5, 6, 9, 0));
    assert_eq!(slots[8].start(), at(2024, 5, 6, 17, 0));
    assert_eq!(slots[0].to_string(), "2024-05-06 09:00");

    let uneven = SlotWindow::new(
        NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
        Duration::minutes(100),
        Duration::minutes(30),
    )
    .expect("valid window");
    let ctx = monday_first().with_slots(uneven);
    let day = Day::new(date(2024, 5, 6), &ctx, none());
    let starts: Vec<_> = day.intervals().iter().map(|slot| slot.start().time()).collect();
    assert_eq!(starts.len(), 4);
    assert_eq!(starts[3], NaiveTime::from_hms_opt(10, 30, 0).expect("valid time"));
}

#[test]
fn calendar_grids_align_to_first_weekday() {
    let ctx = monday_first();
    let february = Month::new(date(2024, 2, 1), &ctx, none());
    let grid = february.calendar_display();
    assert_eq!(grid.len(), 5);
    assert!(grid.iter().all(|row| row.len() == 7));
    assert!(grid[0][..3].iter().all(Option::is_none));
    assert_eq!(grid[0][3].as_ref().map(Day::number), Some(1));
    assert_eq!(grid[4][3].as_ref().map(Day::number), Some(29));
    assert!(grid[4][4].is_none());

    let sunday = sunday_first();
    let february = Month::new(date(2024, 2, 1), &sunday, none());
    let grid = february.calendar_display();
    assert_eq!(grid[0][4].as_ref().map(Day::number), Some(1));

    let week = Week::new(date(2024, 2, 7), &ctx, none());
    let rows = week.calendar_display();
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().all(|row| row.len() == 7));
    assert_eq!(rows[0][0].start(), at(2024, 2, 5, 9, 0));
    assert_eq!(rows[8][6].start(), at(2024, 2, 11, 17, 0));
}

#[test]
fn calendar_grid_cells_keep_their_day_occurrences() {
    let ctx = monday_first();
    let pool = vec![
        Scheduled::new(
            "leap day",
            Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).single().expect("valid instant"),
            Utc.with_ymd_and_hms(2024, 2, 29, 11, 0, 0).single().expect("valid instant"),
        ),
        Scheduled::new(
            "first",
            Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).single().expect("valid instant"),
            Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).single().expect("valid instant"),
        ),
    ];
    let february = Month::new(date(2024, 2, 1), &ctx, &pool);
    let grid = february.calendar_display();
    let counts: Vec<_> = grid
        .iter()
        .flatten()
        .flatten()
        .map(|day| (day.number(), day.occurrences().len()))
        .filter(|(_, count)| *count > 0)
        .collect();
    assert_eq!(counts, [(1, 1), (29, 1)]);

    let week = Week::new(date(2024, 2, 29), &ctx, &pool);
    let rows = week.calendar_display();
    let busy: usize = rows
        .iter()
        .flatten()
        .map(|slot| slot.occurrences().len())
        .sum();
    assert_eq!(busy, 1);
    assert_eq!(rows[1][3].occurrences().len(), 1);
}

#[test]
fn neighbours_round_trip_for_every_kind() {
    let ctx = CalendarContext::new(Weekday::Sun, chrono_tz::America::New_York);
    let first = date(2024, 1, 15);
    let times = [(0, 0), (1, 30), (2, 30), (12, 0), (23, 59)];

    for offset in 0..500 {
        let day = first + Duration::days(offset);
        for (h, m) in times {
            let civil = day.and_hms_opt(h, m, 0).expect("valid time");
            assert_neighbours_round_trip(&Hour::new(civil, &ctx, none()));
        }
        assert_neighbours_round_trip(&Day::new(day, &ctx, none()));
        assert_neighbours_round_trip(&Week::new(day, &ctx, none()));
        assert_neighbours_round_trip(&Month::new(day, &ctx, none()));
        assert_neighbours_round_trip(&TripleMonth::new(day, &ctx, none()));
        assert_neighbours_round_trip(&Year::new(day, &ctx, none()));
    }
}

#[test]
fn same_day_instants_share_a_day() {
    let ctx = CalendarContext::new(Weekday::Sun, chrono_tz::America::New_York);
    let first = date(2024, 1, 15);
    let times = [(0, 0), (1, 30), (2, 30), (12, 0), (23, 59)];

    for offset in 0..500 {
        let day = first + Duration::days(offset);
        let midnight = Day::new(day, &ctx, none());
        assert_eq!(midnight.start(), day.and_time(NaiveTime::MIN));
        for (h, m) in times {
            let civil = day.and_hms_opt(h, m, 0).expect("valid time");
            let later = Day::new(civil, &ctx, none());
            assert_eq!(later.start(), midnight.start(), "{civil}");
            assert!(midnight.contains(civil));
        }
    }
}
