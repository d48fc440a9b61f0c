//! Collaborator contracts consumed by the console.
//!
//! The assistant core, the app/device/messaging/permission managers, the
//! diagnostic data store, and the engine lifecycle are external
//! collaborators. The console depends only on these traits and never
//! reimplements what sits behind them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::conversation::ConversationOutput;
use crate::error::Result;
use crate::types::{AppEntry, DeviceEntry, LocalIdentity, MessagingMatch, PermissionGrant};

/// The assistant core's command-interpretation surface.
#[async_trait::async_trait]
pub trait Assistant: Send + Sync {
    /// Start the conversation session. The identity is supplied once and
    /// never mutated; all conversational output flows through `output`.
    fn start(&self, identity: &LocalIdentity, output: Arc<dyn ConversationOutput>) -> Result<()>;

    /// Push out-of-band data into the conversation.
    async fn notify(&self, data: serde_json::Value) -> Result<()>;

    /// Surface a collaborator-raised error through the conversation instead
    /// of crashing the session.
    async fn notify_error(&self, message: &str) -> Result<()>;

    /// Interpret a free-form natural-language line.
    async fn handle_command(&self, text: &str) -> Result<()>;

    /// Interpret a pre-parsed structured command (JSON text).
    async fn handle_parsed_command(&self, json_text: &str) -> Result<()>;

    /// Interpret a domain-specific-language snippet.
    async fn handle_thingtalk(&self, code: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait AppManager: Send + Sync {
    async fn get_all_apps(&self) -> Result<Vec<AppEntry>>;
    async fn get_app(&self, id: &str) -> Result<Option<AppEntry>>;
    async fn remove_app(&self, id: &str) -> Result<()>;
}

/// Synthetic inbound-request record for OAuth phase 2, built from the
/// callback URL the operator pastes back into the console.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthCallback {
    /// Always `"GET"`.
    pub method: &'static str,
    /// Query parameters parsed from the callback URL.
    pub query: HashMap<String, String>,
    /// Opaque session blob recorded by phase 1, replayed verbatim.
    pub session: HashMap<String, serde_json::Value>,
}

/// Result of the device factory's single OAuth entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum OAuthOutcome {
    /// Phase 1: the operator must visit `url` out-of-band; `session` is
    /// opaque state to replay in phase 2.
    Redirect {
        url: String,
        session: HashMap<String, serde_json::Value>,
    },
    /// Phase 2: the paired device was registered by the collaborator.
    Completed(DeviceEntry),
}

#[async_trait::async_trait]
pub trait DeviceFactory: Send + Sync {
    /// Phase 1 when `callback` is `None`, phase 2 otherwise.
    async fn run_oauth2(&self, kind: &str, callback: Option<OAuthCallback>)
    -> Result<OAuthOutcome>;
}

#[async_trait::async_trait]
pub trait DeviceManager: Send + Sync {
    async fn get_all_devices(&self) -> Result<Vec<DeviceEntry>>;
    fn factory(&self) -> &dyn DeviceFactory;
}

#[async_trait::async_trait]
pub trait MessagingManager: Send + Sync {
    /// The operator's own messaging identities.
    async fn get_identities(&self) -> Result<Vec<String>>;
    async fn get_account_for_identity(&self, id: &str) -> Result<String>;
    async fn search_account_by_name(&self, name: &str) -> Result<Vec<MessagingMatch>>;
}

#[async_trait::async_trait]
pub trait PermissionManager: Send + Sync {
    async fn get_all_permissions(&self) -> Result<Vec<PermissionGrant>>;
    async fn remove_permission(&self, id: &str) -> Result<()>;
}

/// Read-only analytic queries issued by the diagnostic battery. Each is an
/// independent deferred; the console prints results in completion order.
#[async_trait::async_trait]
pub trait DiagnosticStore: Send + Sync {
    async fn app_count(&self) -> Result<u64>;
    async fn device_count(&self) -> Result<u64>;
    async fn permission_count(&self) -> Result<u64>;
    async fn recent_failures(&self) -> Result<Vec<String>>;
}

/// The engine aggregate the console drives.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    fn assistant(&self) -> &dyn Assistant;
    fn apps(&self) -> &dyn AppManager;
    fn devices(&self) -> &dyn DeviceManager;
    fn messaging(&self) -> &dyn MessagingManager;
    fn permissions(&self) -> &dyn PermissionManager;
    fn diagnostics(&self) -> &dyn DiagnosticStore;

    /// Engine-level shutdown sequence; called exactly once, on quit.
    async fn close(&self) -> Result<()>;
}
