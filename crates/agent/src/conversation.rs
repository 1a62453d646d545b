use std::collections::{BTreeMap, BTreeSet};

use leasedesk_core::config::AVAILABLE_TABLE;
use leasedesk_core::domain::inventory::InventorySnapshot;
use leasedesk_core::domain::lead::{LeadIntake, MainRequest, PropertyMatch, PropertyRequirements};
use leasedesk_core::domain::message::Message;

const PROPERTY_TYPES: [&str; 6] = ["office", "retail", "industrial", "warehouse", "medical", "flex"];
const LOCATION_PREPOSITIONS: [&str; 4] = ["on", "in", "near", "at"];
const MAX_MATCHES: usize = 2;

#[derive(Clone, Debug, Default)]
pub struct LeadIntakeExtractor;

impl LeadIntakeExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, message: &Message) -> LeadIntake {
        let (display_name, sender_address) = split_sender(message.sender());
        let lead_name = display_name.unwrap_or_else(|| name_from_address(&sender_address));

        let combined = format!("{}\n{}", message.subject(), message.body());
        let normalized_text = normalize_text(&combined);
        let tokens = tokenize(&normalized_text);

        let main_request = extract_main_request(&normalized_text);
        let size_sqft = extract_size_sqft(&tokens);
        let property_type = extract_property_type(&tokens);
        let location_hints = extract_location_hints(&[message.subject(), message.body()]);
        let summary =
            summarize_requirements(size_sqft, property_type.as_deref(), &location_hints, message);

        LeadIntake {
            lead_name,
            sender_address,
            subject: message.subject().to_string(),
            main_request,
            requirements: PropertyRequirements {
                location_hints,
                property_type,
                size_sqft,
                summary,
            },
        }
    }
}

/// `Name <addr>` yields the display name; a bare address yields none.
fn split_sender(sender: &str) -> (Option<String>, String) {
    let sender = sender.trim();
    match (sender.find('<'), sender.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = sender[..open].trim().trim_matches('"').trim();
            let address = sender[open + 1..close].trim().to_string();
            ((!name.is_empty()).then(|| name.to_string()), address)
        }
        _ => (None, sender.to_string()),
    }
}

fn name_from_address(address: &str) -> String {
    let local = address.split('@').next().unwrap_or_default();
    let name = local
        .split(['.', '_'])
        .filter(|part| !part.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        "there".to_string()
    } else {
        name
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || character == ',' {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized
        .split_whitespace()
        .map(|token| token.trim_matches(',').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn extract_main_request(normalized_text: &str) -> MainRequest {
    let tour_terms = ["tour", "visit", "schedule", "showing", "walk-through", "walkthrough"];
    let detail_terms =
        ["availability", "available", "details", "pricing", "price", "space", "square feet"];

    let wants_tour = tour_terms.iter().any(|term| normalized_text.contains(term));
    let wants_details = detail_terms.iter().any(|term| normalized_text.contains(term));

    match (wants_tour, wants_details) {
        (true, true) => MainRequest::Both,
        (true, false) => MainRequest::Tour,
        _ => MainRequest::PropertyDetails,
    }
}

fn parse_number(token: &str) -> Option<u32> {
    let digits = token.replace(',', "");
    if digits.is_empty() || !digits.chars().all(|character| character.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()
}

fn is_area_unit(tokens: &[String], index: usize) -> bool {
    let word = |offset: usize| tokens.get(index + offset).map(String::as_str);
    match word(0) {
        Some("sf" | "sqft" | "rsf") => true,
        Some("square") => matches!(word(1), Some("feet" | "foot" | "ft")),
        Some("sq") => matches!(word(1), Some("ft" | "feet")),
        _ => false,
    }
}

fn extract_size_sqft(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        for suffix in ["sqft", "rsf", "sf"] {
            if let Some(number) = token.strip_suffix(suffix).and_then(parse_number) {
                return Some(number);
            }
        }
        if let Some(number) = parse_number(token) {
            if is_area_unit(tokens, index + 1) {
                return Some(number);
            }
        }
    }
    None
}

fn extract_property_type(tokens: &[String]) -> Option<String> {
    PROPERTY_TYPES
        .iter()
        .find(|kind| tokens.iter().any(|token| token == *kind))
        .map(|kind| kind.to_string())
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn ends_clause(raw: &str) -> bool {
    raw.ends_with(['.', ',', ';', ':', '!', '?'])
}

/// Capitalized phrases after on/in/near/at, checked per text so lines never merge.
fn extract_location_hints(texts: &[&str]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut hints = Vec::new();

    for text in texts {
        let raw_words: Vec<&str> = text.split_whitespace().collect();
        for (index, raw) in raw_words.iter().enumerate() {
            let word = raw.trim_matches(|character: char| !character.is_alphanumeric());
            if ends_clause(raw) || !LOCATION_PREPOSITIONS.contains(&word.to_lowercase().as_str())
            {
                continue;
            }

            let mut phrase = Vec::new();
            for next in &raw_words[index + 1..] {
                let cleaned = next.trim_matches(|character: char| !character.is_alphanumeric());
                if !starts_uppercase(cleaned) {
                    break;
                }
                phrase.push(cleaned);
                if ends_clause(next) {
                    break;
                }
            }
            if phrase.is_empty() {
                continue;
            }

            let hint = phrase.join(" ");
            if seen.insert(hint.to_lowercase()) {
                hints.push(hint);
            }
        }
    }
    hints
}

fn summarize_requirements(
    size_sqft: Option<u32>,
    property_type: Option<&str>,
    location_hints: &[String],
    message: &Message,
) -> String {
    let mut parts = Vec::new();
    if let Some(size) = size_sqft {
        parts.push(format!("{size} sf"));
    }
    if let Some(kind) = property_type {
        parts.push(kind.to_string());
    }
    if !location_hints.is_empty() {
        parts.push(format!("near {}", location_hints.join(", ")));
    }

    if parts.is_empty() {
        message.subject().trim().to_string()
    } else {
        parts.join(" ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropertyMatcher;

impl PropertyMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Best Available rows for the request; unscored rows only when nothing scores.
    pub fn best_matches(
        &self,
        snapshot: &InventorySnapshot,
        requirements: &PropertyRequirements,
    ) -> Vec<PropertyMatch> {
        let Some(table) = snapshot.table(AVAILABLE_TABLE) else {
            return Vec::new();
        };

        let mut scored: Vec<PropertyMatch> = table
            .rows
            .iter()
            .map(|row| {
                let fields = table.named_fields(row);
                let score = score_fields(&fields, requirements);
                PropertyMatch {
                    table: table.name.clone(),
                    row_id: row.row_id.clone(),
                    fields: fields.into_iter().filter(|(_, value)| !value.is_empty()).collect(),
                    score,
                }
            })
            .collect();

        scored.sort_by(|left, right| right.score.cmp(&left.score));
        let best = scored.first().map(|candidate| candidate.score).unwrap_or(0);
        scored
            .into_iter()
            .filter(|candidate| best == 0 || candidate.score > 0)
            .take(MAX_MATCHES)
            .collect()
    }
}

fn score_fields(
    fields: &BTreeMap<String, String>,
    requirements: &PropertyRequirements,
) -> u32 {
    let values: Vec<String> = fields.values().map(|value| value.to_lowercase()).collect();
    let mentions = |needle: &str| {
        let needle = needle.to_lowercase();
        values.iter().any(|value| value.contains(&needle))
    };

    let mut score = 0;
    for hint in &requirements.location_hints {
        if mentions(hint.as_str()) {
            score += 3;
        }
    }
    if let Some(kind) = requirements.property_type.as_deref() {
        if mentions(kind) {
            score += 2;
        }
    }
    if let (Some(requested), Some(size)) = (requirements.size_sqft, row_size(fields)) {
        if size_within_tolerance(size, requested) {
            score += 2;
        }
    }
    score
}

fn row_size(fields: &BTreeMap<String, String>) -> Option<u32> {
    let (_, value) = fields.iter().find(|(column, _)| {
        let column = column.to_lowercase();
        column.contains("rsf") || column.contains("size") || column.contains("sq")
    })?;
    first_number(value)
}

fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|character| !character.is_ascii_digit())
        .take_while(|character| character.is_ascii_digit() || *character == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn size_within_tolerance(size: u32, requested: u32) -> bool {
    let difference = f64::from(size.abs_diff(requested));
    difference <= f64::from(requested) * 0.25
}
