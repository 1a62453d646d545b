pub mod service;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::domain::schedule::{BusyInterval, Slot};

pub use service::SlotService;

pub const WINDOW_DAYS: i64 = 14;
pub const FIRST_SLOT_HOUR: u32 = 9;
pub const LAST_SLOT_END_HOUR: u32 = 17;
pub const SLOT_MINUTES: u32 = 60;

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Window `[today, today + 14 days)`, as dates.
pub fn window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(WINDOW_DAYS))
}

/// The Friday after `today`; a Friday maps to the one a week later.
pub fn next_friday(today: NaiveDate) -> NaiveDate {
    let weekday = i64::from(today.weekday().num_days_from_monday());
    let mut days_ahead = 4 - weekday;
    if days_ahead <= 0 {
        days_ahead += 7;
    }
    today + Duration::days(days_ahead)
}

/// Hourly Friday slots across the window, flagged unavailable when they overlap a busy interval.
pub fn generate_slots(today: NaiveDate, busy: &[BusyInterval], booking_link: &str) -> Vec<Slot> {
    let (start, end) = window(today);

    start
        .iter_days()
        .take_while(|day| *day < end)
        .filter(|day| day.weekday() == Weekday::Fri)
        .flat_map(|day| {
            (FIRST_SLOT_HOUR..LAST_SLOT_END_HOUR).map(move |hour| {
                let slot_start = at_hour(day, hour);
                (day, slot_start, slot_start + Duration::minutes(i64::from(SLOT_MINUTES)))
            })
        })
        .map(|(date, slot_start, slot_end)| {
            let mut slot = Slot {
                date,
                start: slot_start,
                end: slot_end,
                duration_minutes: SLOT_MINUTES,
                available: true,
                booking_link: booking_link.to_string(),
            };
            slot.available = !busy.iter().any(|interval| slot.overlaps(interval));
            slot
        })
        .collect()
}
