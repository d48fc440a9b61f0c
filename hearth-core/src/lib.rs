//! # Hearth Core
//!
//! Core library for the Hearth console.
//! Provides the collaborator contracts (assistant core, managers, device
//! factory, diagnostic store), the data model, local identity resolution,
//! the OAuth pairing state machine, and configuration.

pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod identity;
pub mod mock;
pub mod oauth;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{ConsoleConfig, EngineKind};
pub use conversation::ConversationOutput;
pub use engine::{
    AppManager, Assistant, DeviceFactory, DeviceManager, DiagnosticStore, Engine,
    MessagingManager, OAuthCallback, OAuthOutcome, PermissionManager,
};
pub use error::{HearthError, Result};
pub use identity::resolve_local_identity;
pub use mock::{LoopbackAssistant, MockDeviceFactory, MockEngine};
pub use oauth::{OAuthPairing, PairingPhase};
pub use types::{
    AppEntry, AskSpecial, CardCallback, DeviceEntry, LocalIdentity, MessagingMatch,
    PermissionGrant, RichCard, choice_answer,
};
