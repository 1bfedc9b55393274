//! Booking status reconciliation.
//!
//! A booking carries two independently set statuses, one owned by the
//! therapist and one by the store. Everything shown to users and every gated
//! action (check-in, cancellation, client notification) works from the single
//! status derived here. The derivation is pure and is recomputed on every read.

use serde::{Deserialize, Serialize};

use crate::models::{CombinedStatus, PendingPartyHint, SideStatus};

/// Combine therapist-side and store-side statuses. Absent sides count as pending.
///
/// Rules are checked in order and the first match wins:
/// 1. either side cancelled → cancelled
/// 2. both confirmed → confirmed
/// 3. one side completed and both sides at least confirmed → completed
/// 4. otherwise → pending
pub fn combine(therapist: Option<SideStatus>, store: Option<SideStatus>) -> CombinedStatus {
    let therapist = therapist.unwrap_or(SideStatus::Pending);
    let store = store.unwrap_or(SideStatus::Pending);

    if therapist == SideStatus::Cancelled || store == SideStatus::Cancelled {
        return CombinedStatus::Cancelled;
    }

    if therapist == SideStatus::Confirmed && store == SideStatus::Confirmed {
        return CombinedStatus::Confirmed;
    }

    let any_completed = therapist == SideStatus::Completed || store == SideStatus::Completed;
    if any_completed && therapist.has_confirmed() && store.has_confirmed() {
        return CombinedStatus::Completed;
    }

    CombinedStatus::Pending
}

/// Which party still has to approve. Display only; `combine` never looks at it.
pub fn pending_party_hint(
    therapist: Option<SideStatus>,
    store: Option<SideStatus>,
) -> Option<PendingPartyHint> {
    let therapist = therapist.unwrap_or(SideStatus::Pending);
    let store = store.unwrap_or(SideStatus::Pending);

    match (therapist, store) {
        (SideStatus::Pending, SideStatus::Confirmed) => Some(PendingPartyHint::NeedsTherapist),
        (SideStatus::Confirmed, SideStatus::Pending) => Some(PendingPartyHint::NeedsStore),
        (SideStatus::Pending, SideStatus::Pending) => Some(PendingPartyHint::NeedsBoth),
        _ => None,
    }
}

/// Status pair as read from storage by a caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub id: String,
    #[serde(default)]
    pub therapist_status: Option<SideStatus>,
    #[serde(default)]
    pub store_status: Option<SideStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    pub combined_status: CombinedStatus,
    pub hint: Option<PendingPartyHint>,
}

pub fn reconcile(record: &StatusRecord) -> Reconciled {
    Reconciled {
        combined_status: combine(record.therapist_status, record.store_status),
        hint: pending_party_hint(record.therapist_status, record.store_status),
    }
}
