use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainRequest {
    PropertyDetails,
    Tour,
    Both,
}

impl MainRequest {
    pub fn wants_tour(self) -> bool {
        matches!(self, Self::Tour | Self::Both)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRequirements {
    pub location_hints: Vec<String>,
    pub property_type: Option<String>,
    pub size_sqft: Option<u32>,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadIntake {
    pub lead_name: String,
    pub sender_address: String,
    pub subject: String,
    pub main_request: MainRequest,
    pub requirements: PropertyRequirements,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub table: String,
    pub row_id: String,
    pub fields: BTreeMap<String, String>,
    pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
