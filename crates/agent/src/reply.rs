//! Reply email rendering for a processed lead.

use serde::Serialize;
use tera::{Context, Tera};

use leasedesk_core::domain::lead::{LeadIntake, PropertyMatch, ReplyDraft};
use leasedesk_core::domain::schedule::ScheduleReport;
use leasedesk_core::inventory::cache::normalize_property_key;

const TEMPLATE_NAME: &str = "lead_reply.txt.tera";
const MAX_PROPERTIES: usize = 2;
const MAX_SLOTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("reply template error: {0}")]
    Template(String),
}

impl From<tera::Error> for ReplyError {
    fn from(value: tera::Error) -> Self {
        Self::Template(value.to_string())
    }
}

#[derive(Serialize)]
struct FieldView<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct PropertyView<'a> {
    name: &'a str,
    fields: Vec<FieldView<'a>>,
}

pub struct ReplyComposer {
    tera: Tera,
    signature: String,
    name_column: String,
}

impl ReplyComposer {
    pub fn new(
        signature: impl Into<String>,
        name_column: impl Into<String>,
    ) -> Result<Self, ReplyError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            TEMPLATE_NAME,
            include_str!("../../../templates/replies/lead_reply.txt.tera"),
        )?;
        Ok(Self { tera, signature: signature.into(), name_column: name_column.into() })
    }

    /// Renders the reply; without a schedule the slot section is left out.
    pub fn compose(
        &self,
        intake: &LeadIntake,
        matches: &[PropertyMatch],
        schedule: Option<&ScheduleReport>,
        booking_link: &str,
    ) -> Result<ReplyDraft, ReplyError> {
        let properties: Vec<PropertyView<'_>> = matches
            .iter()
            .take(MAX_PROPERTIES)
            .map(|candidate| self.property_view(candidate))
            .collect();
        let slots: Vec<String> = schedule
            .map(|report| {
                report.suggested_slots(MAX_SLOTS).into_iter().map(|slot| slot.label()).collect()
            })
            .unwrap_or_default();
        let booking_link =
            schedule.map(|report| report.booking_link.as_str()).unwrap_or(booking_link);

        let subject = intake.subject.trim();
        let mut context = Context::new();
        context.insert("lead_name", &intake.lead_name);
        context.insert("subject", if subject.is_empty() { "your inquiry" } else { subject });
        context.insert("has_properties", &!properties.is_empty());
        context.insert("properties", &properties);
        context.insert("has_slots", &!slots.is_empty());
        context.insert("slots", &slots);
        context.insert("wants_tour", &intake.main_request.wants_tour());
        context.insert("booking_link", booking_link);
        context.insert("signature", &self.signature);

        let body = self.tera.render(TEMPLATE_NAME, &context)?;
        Ok(ReplyDraft {
            recipient: intake.sender_address.clone(),
            subject: reply_subject(subject),
            body,
        })
    }

    fn property_view<'a>(&self, candidate: &'a PropertyMatch) -> PropertyView<'a> {
        let wanted = normalize_property_key(&self.name_column);
        let name_field =
            candidate.fields.keys().find(|name| normalize_property_key(name) == wanted);
        let name = name_field
            .and_then(|field| candidate.fields.get(field))
            .map(String::as_str)
            .unwrap_or(candidate.row_id.as_str());
        let fields = candidate
            .fields
            .iter()
            .filter(|(field, _)| Some(*field) != name_field)
            .map(|(field, value)| FieldView { name: field, value })
            .collect();
        PropertyView { name, fields }
    }
}

fn reply_subject(subject: &str) -> String {
    if subject.is_empty() {
        return "Re: your inquiry".to_string();
    }
    if subject.to_ascii_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use leasedesk_core::domain::lead::{MainRequest, PropertyRequirements};
    use leasedesk_core::domain::schedule::BusySource;
    use leasedesk_core::scheduling::{generate_slots, next_friday, window};

    use super::*;

    fn ensure(condition: bool, message: &str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn intake(main_request: MainRequest) -> LeadIntake {
        LeadIntake {
            lead_name: "Dana Whitfield".to_string(),
            sender_address: "dana@example.com".to_string(),
            subject: "Office space on Main Street".to_string(),
            main_request,
            requirements: PropertyRequirements::default(),
        }
    }

    fn office_match() -> PropertyMatch {
        let fields: BTreeMap<String, String> = [
            ("Property Name", "Downtown Office"),
            ("Address", "120 Main Street"),
            ("RSF", "4,800"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
        PropertyMatch {
            table: "Available Inventory".to_string(),
            row_id: "i-1".to_string(),
            fields,
            score: 5,
        }
    }

    fn schedule() -> ScheduleReport {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        let link = "https://calendar.app.google/leasedesk";
        let slots = generate_slots(today, &[], link);
        let friday = next_friday(today);
        let next_friday_slots = slots.iter().filter(|slot| slot.date == friday).cloned().collect();
        let (window_start, window_end) = window(today);
        ScheduleReport {
            window_start,
            window_end,
            slots,
            next_friday: friday,
            next_friday_slots,
            busy_intervals: 0,
            busy_source: BusySource::Live,
            booking_link: link.to_string(),
            availability: String::new(),
        }
    }

    #[test]
    fn reply_lists_property_fields_slots_and_link() -> Result<(), String> {
        let composer = ReplyComposer::new("The Leasing Team", "Property Name")
            .map_err(|error| error.to_string())?;
        let report = schedule();
        let draft = composer
            .compose(&intake(MainRequest::Both), &[office_match()], Some(&report), "unused")
            .map_err(|error| error.to_string())?;

        ensure(draft.recipient == "dana@example.com", "recipient should be the sender")?;
        ensure(draft.subject == "Re: Office space on Main Street", "subject should be prefixed")?;
        ensure(draft.body.starts_with("Hi Dana Whitfield,"), "greeting by lead name")?;
        ensure(draft.body.contains("Downtown Office"), "property name rendered")?;
        ensure(draft.body.contains("- Address: 120 Main Street"), "property fields rendered")?;
        ensure(!draft.body.contains("- Property Name:"), "name column is the heading only")?;
        ensure(draft.body.contains("Friday October 23, 2026 9:00 AM-10:00 AM"), "first slot")?;
        ensure(draft.body.contains("Friday October 23, 2026 11:00 AM-12:00 PM"), "third slot")?;
        ensure(!draft.body.contains("12:00 PM-1:00 PM"), "at most three slots")?;
        ensure(draft.body.contains("https://calendar.app.google/leasedesk"), "booking link")?;
        ensure(draft.body.trim_end().ends_with("The Leasing Team"), "signature closes the reply")
    }

    #[test]
    fn reply_without_matches_says_nothing_is_available() -> Result<(), String> {
        let composer =
            ReplyComposer::new("Leasing", "Property Name").map_err(|error| error.to_string())?;
        let draft = composer
            .compose(&intake(MainRequest::PropertyDetails), &[], None, "https://book.example/desk")
            .map_err(|error| error.to_string())?;

        ensure(draft.body.contains("could not find matching availability"), "no-match line")?;
        ensure(!draft.body.contains("tour times"), "no slot section without a schedule")?;
        ensure(draft.body.contains("https://book.example/desk"), "fallback booking link")
    }

    #[test]
    fn reply_keeps_existing_re_prefix_and_caps_properties() -> Result<(), String> {
        let composer =
            ReplyComposer::new("Leasing", "Property Name").map_err(|error| error.to_string())?;
        let mut lead = intake(MainRequest::PropertyDetails);
        lead.subject = "RE: warehouse".to_string();
        let mut third = office_match();
        third.fields.insert("Property Name".to_string(), "Harbor Flex".to_string());
        let matches = vec![office_match(), office_match(), third];

        let draft = composer
            .compose(&lead, &matches, None, "https://book.example/desk")
            .map_err(|error| error.to_string())?;

        ensure(draft.subject == "RE: warehouse", "existing prefix kept")?;
        ensure(!draft.body.contains("Harbor Flex"), "only two properties rendered")
    }
}
