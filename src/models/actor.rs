use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Client,
    Therapist,
    Store,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Client => "client",
            ActorRole::Therapist => "therapist",
            ActorRole::Store => "store",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(ActorRole::Client),
            "therapist" => Some(ActorRole::Therapist),
            "store" => Some(ActorRole::Store),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: NaiveDateTime,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub enum Principal {
    Admin,
    Actor(Actor),
}

impl Principal {
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Principal::Admin => None,
            Principal::Actor(actor) => Some(actor),
        }
    }
}
