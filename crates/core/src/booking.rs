use crate::config::CalendarConfig;

/// The preconfigured booking page. Never fails.
pub fn booking_link(config: &CalendarConfig) -> &str {
    config.booking_link.trim()
}
