//! Line classification and meta-command dispatch.
//!
//! Each terminal line is either empty, an escape-prefixed meta-command, or
//! free-form text for the assistant core. Meta-commands are parsed into a
//! typed grammar before dispatch; malformed input is a typed
//! `InvalidArguments` error carrying the usage string, never a slice panic.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use hearth_core::engine::{
    AppManager, Assistant, DeviceManager, DiagnosticStore, Engine, MessagingManager,
    PermissionManager,
};
use hearth_core::error::{HearthError, Result};
use hearth_core::oauth::OAuthPairing;
use hearth_core::types::choice_answer;

use crate::verbs::VerbRegistry;

/// Marker character introducing a meta-command.
pub const ESCAPE: char = '\\';

/// A classified terminal line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineInput {
    /// Blank or whitespace-only; re-prompt without dispatching.
    Empty,
    /// Escape-prefixed meta-command.
    Meta(MetaCommand),
    /// Everything else: natural language for the assistant core.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaCommand {
    Quit,
    Help,
    /// Pre-parsed JSON forwarded verbatim to the assistant.
    Raw(String),
    /// ThingTalk program text executed directly.
    ThingTalk(String),
    /// Answer to a pending enumerated choice.
    Choice(u64),
    App(AppCommand),
    Device(DeviceCommand),
    Messaging(MessagingCommand),
    Permission(PermissionCommand),
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    List,
    Stop(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    List,
    StartOAuth(String),
    CompleteOAuth(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagingCommand {
    OwnIdentities,
    Identity(String),
    Search(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PermissionCommand {
    List,
    Revoke(String),
}

/// What the session loop should do after a dispatched meta-command settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    Quit,
}

fn invalid(usage: &str) -> HearthError {
    HearthError::InvalidArguments {
        usage: usage.to_string(),
    }
}

/// Split a sub-verb from its single remaining argument.
fn split_subverb(args: &str) -> (&str, &str) {
    match args.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (args, ""),
    }
}

fn require(arg: &str, usage: &str) -> Result<String> {
    if arg.is_empty() {
        Err(invalid(usage))
    } else {
        Ok(arg.to_string())
    }
}

/// Classify one terminal line.
pub fn parse_line(line: &str) -> Result<LineInput> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineInput::Empty);
    }
    let Some(rest) = trimmed.strip_prefix(ESCAPE) else {
        return Ok(LineInput::Text(trimmed.to_string()));
    };

    let mut chars = rest.chars();
    let Some(verb) = chars.next() else {
        // A lone backslash selects no verb.
        return Err(HearthError::UnknownCommand {
            command: String::new(),
        });
    };
    let args = chars.as_str().trim();

    let command = match verb {
        'q' => MetaCommand::Quit,
        '?' => MetaCommand::Help,
        'r' => MetaCommand::Raw(require(args, "\\r <json>")?),
        't' => MetaCommand::ThingTalk(require(args, "\\t <code>")?),
        'c' => {
            let index = args.parse().map_err(|_| invalid("\\c <number>"))?;
            MetaCommand::Choice(index)
        }
        'a' => {
            const USAGE: &str = "\\a list | stop <id>";
            match split_subverb(args) {
                ("list", "") => MetaCommand::App(AppCommand::List),
                ("stop", id) => MetaCommand::App(AppCommand::Stop(require(id, USAGE)?)),
                _ => return Err(invalid(USAGE)),
            }
        }
        'd' => {
            const USAGE: &str = "\\d list | start-oauth2 <kind> | complete-oauth2 <url>";
            match split_subverb(args) {
                ("list", "") => MetaCommand::Device(DeviceCommand::List),
                ("start-oauth" | "start-oauth2", kind) => {
                    MetaCommand::Device(DeviceCommand::StartOAuth(require(kind, USAGE)?))
                }
                ("complete-oauth" | "complete-oauth2", url) => {
                    MetaCommand::Device(DeviceCommand::CompleteOAuth(require(url, USAGE)?))
                }
                _ => return Err(invalid(USAGE)),
            }
        }
        'm' => {
            const USAGE: &str = "\\m self | identity <id> | search <name>";
            match split_subverb(args) {
                ("self", "") => MetaCommand::Messaging(MessagingCommand::OwnIdentities),
                ("identity", id) => {
                    MetaCommand::Messaging(MessagingCommand::Identity(require(id, USAGE)?))
                }
                ("search", name) => {
                    MetaCommand::Messaging(MessagingCommand::Search(require(name, USAGE)?))
                }
                _ => return Err(invalid(USAGE)),
            }
        }
        'p' => {
            const USAGE: &str = "\\p list | revoke <id>";
            match split_subverb(args) {
                ("list", "") => MetaCommand::Permission(PermissionCommand::List),
                ("revoke", id) => {
                    MetaCommand::Permission(PermissionCommand::Revoke(require(id, USAGE)?))
                }
                _ => return Err(invalid(USAGE)),
            }
        }
        'i' => MetaCommand::Diagnostic,
        other => {
            return Err(HearthError::UnknownCommand {
                command: other.to_string(),
            });
        }
    };
    Ok(LineInput::Meta(command))
}

/// Execute a parsed meta-command against the engine.
///
/// Runs to completion before returning; the session loop awaits this so
/// output from one command never interleaves with the next.
pub async fn dispatch_meta(
    command: MetaCommand,
    engine: &dyn Engine,
    pairing: &mut OAuthPairing,
    registry: &VerbRegistry,
) -> Result<DispatchOutcome> {
    match command {
        MetaCommand::Quit => return Ok(DispatchOutcome::Quit),
        MetaCommand::Help => {
            println!("{}", registry.help_text());
        }
        MetaCommand::Raw(json) => {
            engine.assistant().handle_parsed_command(&json).await?;
        }
        MetaCommand::ThingTalk(code) => {
            engine.assistant().handle_thingtalk(&code).await?;
        }
        MetaCommand::Choice(index) => {
            let answer = choice_answer(index).to_string();
            engine.assistant().handle_parsed_command(&answer).await?;
        }
        MetaCommand::App(AppCommand::List) => {
            let apps = engine.apps().get_all_apps().await?;
            if apps.is_empty() {
                println!("No running automations.");
            }
            for app in apps {
                println!("- {}: {} ({})", app.id, app.name, app.description);
            }
        }
        MetaCommand::App(AppCommand::Stop(id)) => {
            let Some(app) = engine.apps().get_app(&id).await? else {
                return Err(HearthError::NotFound { what: "app", id });
            };
            engine.apps().remove_app(&id).await?;
            println!("Stopped {} ({})", app.name, app.id);
        }
        MetaCommand::Device(DeviceCommand::List) => {
            let devices = engine.devices().get_all_devices().await?;
            if devices.is_empty() {
                println!("No paired devices.");
            }
            for device in devices {
                println!(
                    "- {}: {} [{}] ({})",
                    device.id, device.name, device.kind, device.description
                );
            }
        }
        MetaCommand::Device(DeviceCommand::StartOAuth(kind)) => {
            let url = pairing.begin(engine.devices().factory(), &kind).await?;
            println!("Visit this URL to authorize {kind}:");
            println!("  {url}");
            println!("Then paste the callback URL with: \\d complete-oauth2 <url>");
        }
        MetaCommand::Device(DeviceCommand::CompleteOAuth(url)) => {
            let device = pairing.complete(engine.devices().factory(), &url).await?;
            println!("Paired {} ({})", device.name, device.id);
        }
        MetaCommand::Messaging(MessagingCommand::OwnIdentities) => {
            let identities = engine.messaging().get_identities().await?;
            if identities.is_empty() {
                println!("No messaging identities.");
            }
            for identity in identities {
                println!("- {identity}");
            }
        }
        MetaCommand::Messaging(MessagingCommand::Identity(id)) => {
            let account = engine.messaging().get_account_for_identity(&id).await?;
            println!("{id} -> {account}");
        }
        MetaCommand::Messaging(MessagingCommand::Search(name)) => {
            let matches = engine.messaging().search_account_by_name(&name).await?;
            if matches.is_empty() {
                println!("No accounts matching '{name}'.");
            }
            for found in matches {
                println!("- {}: {}", found.name, found.account);
            }
        }
        MetaCommand::Permission(PermissionCommand::List) => {
            let permissions = engine.permissions().get_all_permissions().await?;
            if permissions.is_empty() {
                println!("No granted permissions.");
            }
            for permission in permissions {
                println!(
                    "- {}: {} ({})",
                    permission.id, permission.code, permission.description
                );
            }
        }
        MetaCommand::Permission(PermissionCommand::Revoke(id)) => {
            engine.permissions().remove_permission(&id).await?;
            println!("Revoked {id}");
        }
        MetaCommand::Diagnostic => {
            run_diagnostics(engine.diagnostics(), |line| println!("{line}")).await;
        }
    }
    Ok(DispatchOutcome::Continue)
}

/// Run the fixed battery of read-only diagnostic queries.
///
/// Each query is an independent future; result lines are emitted in
/// completion order, not issuance order.
pub async fn run_diagnostics(store: &dyn DiagnosticStore, mut sink: impl FnMut(String)) {
    let mut queries: FuturesUnordered<BoxFuture<'_, String>> = FuturesUnordered::new();

    queries.push(Box::pin(async move {
        match store.app_count().await {
            Ok(count) => format!("running automations: {count}"),
            Err(e) => format!("running automations: query failed ({e})"),
        }
    }));
    queries.push(Box::pin(async move {
        match store.device_count().await {
            Ok(count) => format!("paired devices: {count}"),
            Err(e) => format!("paired devices: query failed ({e})"),
        }
    }));
    queries.push(Box::pin(async move {
        match store.permission_count().await {
            Ok(count) => format!("granted permissions: {count}"),
            Err(e) => format!("granted permissions: query failed ({e})"),
        }
    }));
    queries.push(Box::pin(async move {
        match store.recent_failures().await {
            Ok(failures) if failures.is_empty() => "recent failures: none".to_string(),
            Ok(failures) => format!("recent failures: {}", failures.join("; ")),
            Err(e) => format!("recent failures: query failed ({e})"),
        }
    }));

    while let Some(line) = queries.next().await {
        sink(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::mock::{HandledInput, MockEngine};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_and_whitespace() {
        assert_eq!(parse_line("").unwrap(), LineInput::Empty);
        assert_eq!(parse_line("   \t ").unwrap(), LineInput::Empty);
    }

    #[test]
    fn test_parse_free_text() {
        assert_eq!(
            parse_line("turn on the lights").unwrap(),
            LineInput::Text("turn on the lights".into())
        );
    }

    #[test]
    fn test_parse_session_verbs() {
        assert_eq!(
            parse_line("\\q").unwrap(),
            LineInput::Meta(MetaCommand::Quit)
        );
        assert_eq!(
            parse_line("\\?").unwrap(),
            LineInput::Meta(MetaCommand::Help)
        );
    }

    #[test]
    fn test_parse_raw_takes_whole_rest() {
        assert_eq!(
            parse_line("\\r {\"code\": [\"now\", \"=>\", \"notify\"]}").unwrap(),
            LineInput::Meta(MetaCommand::Raw(
                "{\"code\": [\"now\", \"=>\", \"notify\"]}".into()
            ))
        );
    }

    #[test]
    fn test_parse_thingtalk_takes_whole_rest() {
        assert_eq!(
            parse_line("\\t now => @light.set_power(power=enum(on));").unwrap(),
            LineInput::Meta(MetaCommand::ThingTalk(
                "now => @light.set_power(power=enum(on));".into()
            ))
        );
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(
            parse_line("\\c 3").unwrap(),
            LineInput::Meta(MetaCommand::Choice(3))
        );
    }

    #[test]
    fn test_parse_choice_non_numeric_is_typed_error() {
        let err = parse_line("\\c three").unwrap_err();
        assert!(matches!(err, HearthError::InvalidArguments { .. }));
    }

    #[test]
    fn test_parse_app_verbs() {
        assert_eq!(
            parse_line("\\a list").unwrap(),
            LineInput::Meta(MetaCommand::App(AppCommand::List))
        );
        assert_eq!(
            parse_line("\\a stop uuid-12").unwrap(),
            LineInput::Meta(MetaCommand::App(AppCommand::Stop("uuid-12".into())))
        );
    }

    #[test]
    fn test_parse_app_missing_argument() {
        let err = parse_line("\\a stop").unwrap_err();
        assert!(matches!(err, HearthError::InvalidArguments { .. }));
        let err = parse_line("\\a").unwrap_err();
        assert!(matches!(err, HearthError::InvalidArguments { .. }));
    }

    #[test]
    fn test_parse_device_oauth_spellings() {
        for spelling in ["start-oauth", "start-oauth2"] {
            assert_eq!(
                parse_line(&format!("\\d {spelling} com.example.tv")).unwrap(),
                LineInput::Meta(MetaCommand::Device(DeviceCommand::StartOAuth(
                    "com.example.tv".into()
                )))
            );
        }
        for spelling in ["complete-oauth", "complete-oauth2"] {
            assert_eq!(
                parse_line(&format!("\\d {spelling} https://x/cb?code=1")).unwrap(),
                LineInput::Meta(MetaCommand::Device(DeviceCommand::CompleteOAuth(
                    "https://x/cb?code=1".into()
                )))
            );
        }
    }

    #[test]
    fn test_parse_messaging_verbs() {
        assert_eq!(
            parse_line("\\m self").unwrap(),
            LineInput::Meta(MetaCommand::Messaging(MessagingCommand::OwnIdentities))
        );
        assert_eq!(
            parse_line("\\m identity phone:+15551234567").unwrap(),
            LineInput::Meta(MetaCommand::Messaging(MessagingCommand::Identity(
                "phone:+15551234567".into()
            )))
        );
        assert_eq!(
            parse_line("\\m search alice").unwrap(),
            LineInput::Meta(MetaCommand::Messaging(MessagingCommand::Search(
                "alice".into()
            )))
        );
    }

    #[test]
    fn test_parse_permission_verbs() {
        assert_eq!(
            parse_line("\\p list").unwrap(),
            LineInput::Meta(MetaCommand::Permission(PermissionCommand::List))
        );
        assert_eq!(
            parse_line("\\p revoke grant-7").unwrap(),
            LineInput::Meta(MetaCommand::Permission(PermissionCommand::Revoke(
                "grant-7".into()
            )))
        );
    }

    #[test]
    fn test_parse_diagnostic() {
        assert_eq!(
            parse_line("\\i").unwrap(),
            LineInput::Meta(MetaCommand::Diagnostic)
        );
    }

    #[test]
    fn test_parse_unknown_verb() {
        let err = parse_line("\\z").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: \\z");
    }

    #[tokio::test]
    async fn test_dispatch_choice_forwards_structured_answer() {
        let engine = MockEngine::new();
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        dispatch_meta(MetaCommand::Choice(3), &engine, &mut pairing, &registry)
            .await
            .unwrap();

        let handled = engine.loopback().handled();
        assert_eq!(handled.len(), 1);
        let HandledInput::Parsed(json) = &handled[0] else {
            panic!("expected a parsed command, got {handled:?}");
        };
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"answer": {"type": "Choice", "value": 3}})
        );
    }

    #[tokio::test]
    async fn test_dispatch_raw_and_thingtalk_route_to_assistant() {
        let engine = MockEngine::new();
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        dispatch_meta(
            MetaCommand::Raw("{\"program\": []}".into()),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();
        dispatch_meta(
            MetaCommand::ThingTalk("now => notify;".into()),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();

        assert_eq!(
            engine.loopback().handled(),
            vec![
                HandledInput::Parsed("{\"program\": []}".into()),
                HandledInput::ThingTalk("now => notify;".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_app_stop_missing_id_leaves_apps_untouched() {
        let engine = MockEngine::new();
        engine.seed_app("app-1", "Morning brew", "start the kettle at 7am");
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        let err = dispatch_meta(
            MetaCommand::App(AppCommand::Stop("no-such-app".into())),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, HearthError::NotFound { what: "app", .. }));
        assert_eq!(engine.apps().get_all_apps().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_app_stop_removes_by_id() {
        let engine = MockEngine::new();
        engine.seed_app("app-1", "Morning brew", "start the kettle at 7am");
        engine.seed_app("app-2", "Night lights", "dim the lights at 10pm");
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        dispatch_meta(
            MetaCommand::App(AppCommand::Stop("app-1".into())),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();

        let remaining = engine.apps().get_all_apps().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "app-2");
    }

    #[tokio::test]
    async fn test_dispatch_oauth_round_trip_registers_device() {
        let engine = MockEngine::new();
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        dispatch_meta(
            MetaCommand::Device(DeviceCommand::StartOAuth("com.example.tv".into())),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();
        assert_eq!(pairing.pending_kind(), Some("com.example.tv"));

        dispatch_meta(
            MetaCommand::Device(DeviceCommand::CompleteOAuth(
                "https://127.0.0.1:3000/callback?code=xyz".into(),
            )),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();
        assert!(pairing.pending_kind().is_none());
        assert_eq!(engine.factory().paired().len(), 1);
        assert_eq!(engine.factory().paired()[0].kind, "com.example.tv");
    }

    #[tokio::test]
    async fn test_dispatch_permission_revoke() {
        let engine = MockEngine::new();
        engine.seed_permission("grant-7", "read-calendar", "calendar access");
        let mut pairing = OAuthPairing::new();
        let registry = VerbRegistry::with_defaults();

        dispatch_meta(
            MetaCommand::Permission(PermissionCommand::Revoke("grant-7".into())),
            &engine,
            &mut pairing,
            &registry,
        )
        .await
        .unwrap();

        assert!(engine
            .permissions()
            .get_all_permissions()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_diagnostics_emit_one_line_per_query() {
        let engine = MockEngine::new();
        engine.seed_app("app-1", "Morning brew", "start the kettle at 7am");
        engine.seed_failure("lamp offline since 09:12");

        let mut lines = Vec::new();
        run_diagnostics(engine.diagnostics(), |line| lines.push(line)).await;

        assert_eq!(lines.len(), 4);
        assert!(lines.iter().any(|l| l == "running automations: 1"));
        assert!(lines.iter().any(|l| l == "paired devices: 0"));
        assert!(lines.iter().any(|l| l == "granted permissions: 0"));
        assert!(
            lines
                .iter()
                .any(|l| l == "recent failures: lamp offline since 09:12")
        );
    }
}
