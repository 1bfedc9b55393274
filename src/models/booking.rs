use chrono::NaiveDateTime;
use serde::Serialize;

use super::status::{CombinedStatus, PendingPartyHint, Side, SideStatus};
use crate::services::reconcile::{combine, pending_party_hint};

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    pub therapist_id: String,
    pub store_id: Option<String>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub price: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub therapist_status: SideStatus,
    pub store_status: Option<SideStatus>,
    pub checked_in_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Store-side status as seen by the reconciler.
    ///
    /// A booking without a mediating store counts as store-confirmed. A store
    /// booking whose column is missing is left absent and reads as pending.
    pub fn effective_store_status(&self) -> Option<SideStatus> {
        match &self.store_id {
            None => Some(SideStatus::Confirmed),
            Some(_) => self.store_status,
        }
    }

    pub fn combined_status(&self) -> CombinedStatus {
        combine(Some(self.therapist_status), self.effective_store_status())
    }

    pub fn hint(&self) -> Option<PendingPartyHint> {
        pending_party_hint(Some(self.therapist_status), self.effective_store_status())
    }

    /// Current value of one side, with a missing store column read as pending.
    pub fn side_status(&self, side: Side) -> SideStatus {
        match side {
            Side::Therapist => self.therapist_status,
            Side::Store => self.store_status.unwrap_or(SideStatus::Pending),
        }
    }

    pub fn has_store(&self) -> bool {
        self.store_id.is_some()
    }

    pub fn is_participant(&self, actor_id: &str) -> bool {
        self.client_id == actor_id
            || self.therapist_id == actor_id
            || self.store_id.as_deref() == Some(actor_id)
    }
}
