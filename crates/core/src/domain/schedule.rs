use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Busy period in local wall-clock time, half-open `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub available: bool,
    pub booking_link: String,
}

impl Slot {
    pub fn overlaps(&self, busy: &BusyInterval) -> bool {
        self.start < busy.end && self.end > busy.start
    }

    pub fn label(&self) -> String {
        format!(
            "{} {}-{}",
            self.date.format("%A %B %-d, %Y"),
            self.start.format("%-I:%M %p"),
            self.end.format("%-I:%M %p")
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BusySource {
    Live,
    Degraded { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub slots: Vec<Slot>,
    pub next_friday: NaiveDate,
    pub next_friday_slots: Vec<Slot>,
    pub busy_intervals: usize,
    pub busy_source: BusySource,
    pub booking_link: String,
    pub availability: String,
}

impl ScheduleReport {
    /// Available next-Friday slots, or the earliest available slots in the window.
    pub fn suggested_slots(&self, limit: usize) -> Vec<&Slot> {
        let preferred: Vec<&Slot> =
            self.next_friday_slots.iter().filter(|slot| slot.available).take(limit).collect();
        if !preferred.is_empty() {
            return preferred;
        }
        self.slots.iter().filter(|slot| slot.available).take(limit).collect()
    }
}
