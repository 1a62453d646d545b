use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};

use crate::domain::schedule::{BusySource, ScheduleReport, Slot};
use crate::errors::CalendarError;
use crate::ports::CalendarClient;
use crate::scheduling::{generate_slots, next_friday, window};

pub struct SlotService<C> {
    client: C,
    calendar_id: String,
    booking_link: String,
}

/// Local midnight of `date` as a UTC instant.
pub fn local_midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&midnight),
    }
}

impl<C: CalendarClient> SlotService<C> {
    pub fn new(client: C, calendar_id: impl Into<String>, booking_link: impl Into<String>) -> Self {
        Self { client, calendar_id: calendar_id.into(), booking_link: booking_link.into() }
    }

    pub fn booking_link(&self) -> &str {
        &self.booking_link
    }

    /// Builds the report for the window starting at `today`.
    ///
    /// Credential problems are returned as errors. Any other busy-lookup
    /// failure is treated as an empty calendar and marked degraded.
    pub async fn report(&self, today: NaiveDate) -> Result<ScheduleReport, CalendarError> {
        let (window_start, window_end) = window(today);
        let busy = self
            .client
            .query_busy(
                &self.calendar_id,
                local_midnight_utc(window_start),
                local_midnight_utc(window_end),
            )
            .await;

        let (busy, busy_source) = match busy {
            Ok(busy) => (busy, BusySource::Live),
            Err(error @ CalendarError::MissingCredentials { .. })
            | Err(error @ CalendarError::InvalidCredentials(_)) => return Err(error),
            Err(error) => {
                warn!(
                    event_name = "scheduling.busy.degraded",
                    error = %error,
                    "free/busy lookup failed; treating calendar as empty"
                );
                (Vec::new(), BusySource::Degraded { reason: error.to_string() })
            }
        };

        let slots = generate_slots(today, &busy, &self.booking_link);
        let friday = next_friday(today);
        let next_friday_slots: Vec<Slot> =
            slots.iter().filter(|slot| slot.date == friday).cloned().collect();
        let availability = describe_availability(&slots, friday, &next_friday_slots);

        info!(
            event_name = "scheduling.report.built",
            slots = slots.len(),
            busy_intervals = busy.len(),
            live = matches!(busy_source, BusySource::Live),
            "schedule report built"
        );

        Ok(ScheduleReport {
            window_start,
            window_end,
            slots,
            next_friday: friday,
            next_friday_slots,
            busy_intervals: busy.len(),
            busy_source,
            booking_link: self.booking_link.clone(),
            availability,
        })
    }
}

fn describe_availability(slots: &[Slot], friday: NaiveDate, friday_slots: &[Slot]) -> String {
    let open = slots.iter().filter(|slot| slot.available).count();
    let friday_open = friday_slots.iter().filter(|slot| slot.available).count();
    format!(
        "{open} of {} Friday slots open in the next two weeks; {friday_open} open on {}",
        slots.len(),
        friday.format("%A %B %-d")
    )
}
