//! Fundamental data types shared between the console and its collaborators.

use serde::{Deserialize, Serialize};

/// The local operating-system account driving the session.
///
/// Constructed once at session start and passed by reference to the
/// assistant core; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub uid: u32,
    pub account: String,
    pub display_name: String,
}

/// A running automation known to the app manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A paired device known to the device manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub description: String,
}

/// A granted permission known to the permission manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: String,
    pub code: String,
    pub description: String,
}

/// One result of a messaging account search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingMatch {
    pub name: String,
    pub account: String,
}

/// The callback attached to a rich card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCallback {
    /// A user-invocable structured action, opaque to the console.
    Invocable(serde_json::Value),
    /// A web callback URL.
    Web(String),
}

/// A titled structured output unit with an associated callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichCard {
    pub title: String,
    pub callback: CardCallback,
}

/// Marker for the structured reply type the assistant core is awaiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskSpecial {
    YesNo,
    Choice,
    Location,
    Picture,
    Generic(String),
}

impl std::fmt::Display for AskSpecial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AskSpecial::YesNo => write!(f, "yesno"),
            AskSpecial::Choice => write!(f, "choice"),
            AskSpecial::Location => write!(f, "location"),
            AskSpecial::Picture => write!(f, "picture"),
            AskSpecial::Generic(kind) => write!(f, "{kind}"),
        }
    }
}

/// Build the structured answer forwarded to the assistant core for
/// `\c <index>`.
pub fn choice_answer(index: u64) -> serde_json::Value {
    serde_json::json!({ "answer": { "type": "Choice", "value": index } })
}
