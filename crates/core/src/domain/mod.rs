pub mod inventory;
pub mod lead;
pub mod message;
pub mod schedule;
