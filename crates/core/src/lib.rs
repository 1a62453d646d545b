pub mod booking;
pub mod config;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod messages;
pub mod ports;
pub mod scheduling;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::inventory::{InventoryRow, InventorySnapshot, InventoryTable};
pub use domain::lead::{LeadIntake, MainRequest, PropertyMatch, ReplyDraft};
pub use domain::message::Message;
pub use domain::schedule::{BusyInterval, BusySource, ScheduleReport, Slot};
pub use errors::{ApplicationError, CalendarError, DomainError, TransportError};
pub use inventory::{InventoryReader, PropertyLookup};
pub use messages::MessageReader;
pub use scheduling::SlotService;
