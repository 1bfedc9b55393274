use serde::{Deserialize, Serialize};

use super::status::CombinedStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    StatusChanged,
    Cancelled,
    CheckedIn,
    ClientNotified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::StatusChanged => "status_changed",
            EventKind::Cancelled => "cancelled",
            EventKind::CheckedIn => "checked_in",
            EventKind::ClientNotified => "client_notified",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "created" => EventKind::Created,
            "cancelled" => EventKind::Cancelled,
            "checked_in" => EventKind::CheckedIn,
            "client_notified" => EventKind::ClientNotified,
            _ => EventKind::StatusChanged,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: i64,
    pub booking_id: String,
    pub kind: EventKind,
    pub combined_status: CombinedStatus,
    pub detail: String,
    pub created_at: String,
}
