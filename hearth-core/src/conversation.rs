//! Conversational output delegate.
//!
//! The assistant core renders everything it says through this trait, one
//! method per output primitive. The command dispatcher never calls these;
//! they are invoked exclusively by the assistant core and must be safe to
//! call in any order and any multiplicity per command.
//!
//! Methods have no failure mode visible to the caller: terminal write
//! errors are swallowed or logged, never propagated into the conversation
//! flow.

use crate::types::{AskSpecial, RichCard};

#[async_trait::async_trait]
pub trait ConversationOutput: Send + Sync {
    /// Plain utterance.
    async fn send_text(&self, message: &str);

    /// Reference to an image.
    async fn send_picture(&self, url: &str);

    /// Titled card with either a user-invocable callback or a web callback
    /// URL; renders the title and whichever callback is present.
    async fn send_rich_card(&self, card: &RichCard);

    /// One option of an enumerated choice set. `index` is a stable 0-based
    /// ordinal the operator can later refer back to with `\c <index>`.
    async fn send_choice(&self, index: usize, kind: &str, title: &str, body: &str);

    async fn send_link(&self, title: &str, url: &str);

    /// `payload` is an opaque structured action, rendered as text; the
    /// renderer does not execute it.
    async fn send_button(&self, title: &str, payload: &serde_json::Value);

    /// The assistant core is awaiting a specific structured reply type.
    /// Purely informational at the terminal.
    async fn send_ask_special(&self, kind: &AskSpecial);
}
