use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Status of one side of a booking, set independently by the therapist or the store.
///
/// Any unrecognised value read from storage or from a request body is
/// normalised to `Pending`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SideStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl SideStatus {
    pub const ALL: [SideStatus; 4] = [
        SideStatus::Pending,
        SideStatus::Confirmed,
        SideStatus::Completed,
        SideStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SideStatus::Pending => "pending",
            SideStatus::Confirmed => "confirmed",
            SideStatus::Completed => "completed",
            SideStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "confirmed" => SideStatus::Confirmed,
            "completed" => SideStatus::Completed,
            "cancelled" => SideStatus::Cancelled,
            _ => SideStatus::Pending,
        }
    }

    /// Parse for writes, where an unknown value is an error rather than pending.
    pub fn parse_strict(s: &str) -> Option<Self> {
        match s.trim() {
            "pending" => Some(SideStatus::Pending),
            "confirmed" => Some(SideStatus::Confirmed),
            "completed" => Some(SideStatus::Completed),
            "cancelled" => Some(SideStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a side may move from `self` to `next`.
    ///
    /// `completed` and `cancelled` are terminal.
    pub fn can_transition_to(self, next: SideStatus) -> bool {
        matches!(
            (self, next),
            (SideStatus::Pending, SideStatus::Confirmed)
                | (SideStatus::Pending, SideStatus::Cancelled)
                | (SideStatus::Confirmed, SideStatus::Completed)
                | (SideStatus::Confirmed, SideStatus::Cancelled)
        )
    }

    /// Confirmed or further along, but not cancelled.
    pub fn has_confirmed(self) -> bool {
        matches!(self, SideStatus::Confirmed | SideStatus::Completed)
    }
}

impl<'de> Deserialize<'de> for SideStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(SideStatus::parse).unwrap_or(SideStatus::Pending))
    }
}

impl fmt::Display for SideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which actor owns a status column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Therapist,
    Store,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Therapist => "therapist",
            Side::Store => "store",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Side::Therapist => "therapist_status",
            Side::Store => "store_status",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single status shown to users, derived from both sides. Never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CombinedStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl CombinedStatus {
    pub const ALL: [CombinedStatus; 4] = [
        CombinedStatus::Pending,
        CombinedStatus::Confirmed,
        CombinedStatus::Completed,
        CombinedStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CombinedStatus::Pending => "pending",
            CombinedStatus::Confirmed => "confirmed",
            CombinedStatus::Completed => "completed",
            CombinedStatus::Cancelled => "cancelled",
        }
    }

    /// Strict parse used for query filters; unknown values are rejected
    /// rather than widened to `Pending`.
    pub fn parse_filter(s: &str) -> Option<Self> {
        match s.trim() {
            "pending" => Some(CombinedStatus::Pending),
            "confirmed" => Some(CombinedStatus::Confirmed),
            "completed" => Some(CombinedStatus::Completed),
            "cancelled" => Some(CombinedStatus::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CombinedStatus::Pending => "承認待ち",
            CombinedStatus::Confirmed => "確定",
            CombinedStatus::Completed => "完了",
            CombinedStatus::Cancelled => "キャンセル",
        }
    }

    pub fn can_check_in(&self) -> bool {
        matches!(self, CombinedStatus::Confirmed)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, CombinedStatus::Pending | CombinedStatus::Confirmed)
    }

    /// Message recorded for the client when a booking reaches this status.
    pub fn client_message(&self) -> &'static str {
        match self {
            CombinedStatus::Pending => "予約は承認待ちです",
            CombinedStatus::Confirmed => "予約が確定しました",
            CombinedStatus::Completed => "施術が完了しました",
            CombinedStatus::Cancelled => "予約がキャンセルされました",
        }
    }
}

impl fmt::Display for CombinedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which party still has to act while a booking is pending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PendingPartyHint {
    NeedsTherapist,
    NeedsStore,
    NeedsBoth,
}

impl PendingPartyHint {
    pub fn label(&self) -> &'static str {
        match self {
            PendingPartyHint::NeedsTherapist => "セラピスト承認待ち",
            PendingPartyHint::NeedsStore => "店舗承認待ち",
            PendingPartyHint::NeedsBoth => "双方承認待ち",
        }
    }
}
