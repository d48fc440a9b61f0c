//! Scriptable in-memory collaborators.
//!
//! Shipped in the library, not behind `cfg(test)`, so both the test suites
//! and the `hearth` binary can run without a real engine linked in: the
//! binary falls back to [`MockEngine`] (with the loopback assistant) when
//! its configuration selects no other engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::conversation::ConversationOutput;
use crate::engine::{
    AppManager, Assistant, DeviceFactory, DeviceManager, DiagnosticStore, Engine,
    MessagingManager, OAuthCallback, OAuthOutcome, PermissionManager,
};
use crate::error::{HearthError, Result};
use crate::types::{
    AppEntry, AskSpecial, DeviceEntry, LocalIdentity, MessagingMatch, PermissionGrant,
};

/// Everything the loopback assistant has been asked to interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum HandledInput {
    Command(String),
    Parsed(String),
    ThingTalk(String),
    Notify(serde_json::Value),
    Error(String),
}

/// An assistant that echoes every input back through the conversation
/// delegate and records it for inspection.
#[derive(Default)]
pub struct LoopbackAssistant {
    output: Mutex<Option<Arc<dyn ConversationOutput>>>,
    started_as: Mutex<Option<LocalIdentity>>,
    handled: Mutex<Vec<HandledInput>>,
}

impl LoopbackAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity supplied at `start`, if the session has started.
    pub fn started_identity(&self) -> Option<LocalIdentity> {
        self.started_as.lock().unwrap().clone()
    }

    /// Snapshot of every input routed into the assistant so far.
    pub fn handled(&self) -> Vec<HandledInput> {
        self.handled.lock().unwrap().clone()
    }

    fn delegate(&self) -> Option<Arc<dyn ConversationOutput>> {
        self.output.lock().unwrap().clone()
    }

    fn record(&self, input: HandledInput) {
        self.handled.lock().unwrap().push(input);
    }

    async fn echo(&self, line: &str) {
        if let Some(out) = self.delegate() {
            out.send_text(line).await;
            out.send_ask_special(&AskSpecial::Generic("none".into())).await;
        }
    }
}

#[async_trait::async_trait]
impl Assistant for LoopbackAssistant {
    fn start(&self, identity: &LocalIdentity, output: Arc<dyn ConversationOutput>) -> Result<()> {
        *self.started_as.lock().unwrap() = Some(identity.clone());
        *self.output.lock().unwrap() = Some(output);
        Ok(())
    }

    async fn notify(&self, data: serde_json::Value) -> Result<()> {
        self.record(HandledInput::Notify(data.clone()));
        self.echo(&format!("notification: {data}")).await;
        Ok(())
    }

    async fn notify_error(&self, message: &str) -> Result<()> {
        self.record(HandledInput::Error(message.to_string()));
        self.echo(&format!("error: {message}")).await;
        Ok(())
    }

    async fn handle_command(&self, text: &str) -> Result<()> {
        self.record(HandledInput::Command(text.to_string()));
        self.echo(&format!("heard: {text}")).await;
        Ok(())
    }

    async fn handle_parsed_command(&self, json_text: &str) -> Result<()> {
        self.record(HandledInput::Parsed(json_text.to_string()));
        self.echo(&format!("parsed: {json_text}")).await;
        Ok(())
    }

    async fn handle_thingtalk(&self, code: &str) -> Result<()> {
        self.record(HandledInput::ThingTalk(code.to_string()));
        self.echo(&format!("executing: {code}")).await;
        Ok(())
    }
}

/// A device factory that hands out a deterministic session blob in phase 1
/// and requires a byte-exact replay of it in phase 2.
#[derive(Default)]
pub struct MockDeviceFactory {
    paired: Mutex<Vec<DeviceEntry>>,
}

impl MockDeviceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices registered by successful phase-2 completions.
    pub fn paired(&self) -> Vec<DeviceEntry> {
        self.paired.lock().unwrap().clone()
    }

    fn expected_session(kind: &str) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("oauth2-state".to_string(), serde_json::json!("state-1138")),
            ("oauth2-kind".to_string(), serde_json::json!(kind)),
        ])
    }
}

#[async_trait::async_trait]
impl DeviceFactory for MockDeviceFactory {
    async fn run_oauth2(
        &self,
        kind: &str,
        callback: Option<OAuthCallback>,
    ) -> Result<OAuthOutcome> {
        match callback {
            None => {
                if kind.is_empty() {
                    return Err(HearthError::engine("device kind is required"));
                }
                Ok(OAuthOutcome::Redirect {
                    url: format!("https://accounts.example.com/{kind}/authorize?state=state-1138"),
                    session: Self::expected_session(kind),
                })
            }
            Some(callback) => {
                if kind.is_empty() {
                    return Err(HearthError::engine("no pairing in progress"));
                }
                if callback.session != Self::expected_session(kind) {
                    return Err(HearthError::engine("session state mismatch"));
                }
                let code = callback
                    .query
                    .get("code")
                    .ok_or_else(|| HearthError::engine("missing authorization code"))?;
                let device = DeviceEntry {
                    id: format!("{kind}-{code}"),
                    kind: kind.to_string(),
                    name: format!("{kind} account"),
                    description: "paired via oauth2".to_string(),
                };
                self.paired.lock().unwrap().push(device.clone());
                Ok(OAuthOutcome::Completed(device))
            }
        }
    }
}

/// An in-memory engine with seedable collaborator data and a loopback
/// assistant. Implements every manager trait itself.
#[derive(Default)]
pub struct MockEngine {
    assistant: LoopbackAssistant,
    factory: MockDeviceFactory,
    apps: Mutex<Vec<AppEntry>>,
    devices: Mutex<Vec<DeviceEntry>>,
    permissions: Mutex<Vec<PermissionGrant>>,
    identities: Mutex<Vec<String>>,
    accounts: Mutex<HashMap<String, String>>,
    matches: Mutex<Vec<MessagingMatch>>,
    failures: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the loopback assistant's recorded inputs.
    pub fn loopback(&self) -> &LoopbackAssistant {
        &self.assistant
    }

    /// Direct access to the factory's pairing records.
    pub fn factory(&self) -> &MockDeviceFactory {
        &self.factory
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn seed_app(&self, id: &str, name: &str, description: &str) {
        self.apps.lock().unwrap().push(AppEntry {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        });
    }

    pub fn seed_device(&self, id: &str, kind: &str, name: &str, description: &str) {
        self.devices.lock().unwrap().push(DeviceEntry {
            id: id.into(),
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
        });
    }

    pub fn seed_permission(&self, id: &str, code: &str, description: &str) {
        self.permissions.lock().unwrap().push(PermissionGrant {
            id: id.into(),
            code: code.into(),
            description: description.into(),
        });
    }

    pub fn seed_identity(&self, identity: &str) {
        self.identities.lock().unwrap().push(identity.into());
    }

    pub fn seed_account(&self, identity: &str, account: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(identity.into(), account.into());
    }

    pub fn seed_match(&self, name: &str, account: &str) {
        self.matches.lock().unwrap().push(MessagingMatch {
            name: name.into(),
            account: account.into(),
        });
    }

    pub fn seed_failure(&self, message: &str) {
        self.failures.lock().unwrap().push(message.into());
    }
}

#[async_trait::async_trait]
impl AppManager for MockEngine {
    async fn get_all_apps(&self) -> Result<Vec<AppEntry>> {
        Ok(self.apps.lock().unwrap().clone())
    }

    async fn get_app(&self, id: &str) -> Result<Option<AppEntry>> {
        Ok(self.apps.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn remove_app(&self, id: &str) -> Result<()> {
        let mut apps = self.apps.lock().unwrap();
        let before = apps.len();
        apps.retain(|a| a.id != id);
        if apps.len() == before {
            return Err(HearthError::NotFound {
                what: "app",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DeviceManager for MockEngine {
    async fn get_all_devices(&self) -> Result<Vec<DeviceEntry>> {
        Ok(self.devices.lock().unwrap().clone())
    }

    fn factory(&self) -> &dyn DeviceFactory {
        &self.factory
    }
}

#[async_trait::async_trait]
impl MessagingManager for MockEngine {
    async fn get_identities(&self) -> Result<Vec<String>> {
        Ok(self.identities.lock().unwrap().clone())
    }

    async fn get_account_for_identity(&self, id: &str) -> Result<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| HearthError::NotFound {
                what: "messaging identity",
                id: id.to_string(),
            })
    }

    async fn search_account_by_name(&self, name: &str) -> Result<Vec<MessagingMatch>> {
        let needle = name.to_lowercase();
        Ok(self
            .matches
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PermissionManager for MockEngine {
    async fn get_all_permissions(&self) -> Result<Vec<PermissionGrant>> {
        Ok(self.permissions.lock().unwrap().clone())
    }

    async fn remove_permission(&self, id: &str) -> Result<()> {
        let mut permissions = self.permissions.lock().unwrap();
        let before = permissions.len();
        permissions.retain(|p| p.id != id);
        if permissions.len() == before {
            return Err(HearthError::NotFound {
                what: "permission",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DiagnosticStore for MockEngine {
    async fn app_count(&self) -> Result<u64> {
        Ok(self.apps.lock().unwrap().len() as u64)
    }

    async fn device_count(&self) -> Result<u64> {
        Ok(self.devices.lock().unwrap().len() as u64)
    }

    async fn permission_count(&self) -> Result<u64> {
        Ok(self.permissions.lock().unwrap().len() as u64)
    }

    async fn recent_failures(&self) -> Result<Vec<String>> {
        Ok(self.failures.lock().unwrap().clone())
    }
}

#[async_trait::async_trait]
impl Engine for MockEngine {
    fn assistant(&self) -> &dyn Assistant {
        &self.assistant
    }

    fn apps(&self) -> &dyn AppManager {
        self
    }

    fn devices(&self) -> &dyn DeviceManager {
        self
    }

    fn messaging(&self) -> &dyn MessagingManager {
        self
    }

    fn permissions(&self) -> &dyn PermissionManager {
        self
    }

    fn diagnostics(&self) -> &dyn DiagnosticStore {
        self
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
