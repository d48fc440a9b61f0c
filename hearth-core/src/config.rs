//! Configuration for the Hearth console.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config -> environment. Configuration is read from
//! `~/.config/hearth/config.toml` and/or `.hearth/config.toml` in the
//! workspace directory; no file is required to exist.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which engine implementation the binary wires up.
///
/// Real engines implement [`crate::engine::Engine`]; the only one shipped in
/// this repository is the in-process loopback used for development and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Loopback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Loopback,
        }
    }
}

/// Top-level configuration for the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Prompt string redrawn after each completed command.
    pub prompt: String,
    /// Whether the renderer emits ANSI color.
    pub color: bool,
    pub engine: EngineConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            color: true,
            engine: EngineConfig::default(),
        }
    }
}

/// Check whether a config file exists at any of the known locations.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = directories::ProjectDirs::from("dev", "hearth", "hearth")
        && dirs.config_dir().join("config.toml").exists()
    {
        return true;
    }
    if let Some(ws) = workspace
        && ws.join(".hearth").join("config.toml").exists()
    {
        return true;
    }
    false
}

/// Load configuration with the standard layering.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConsoleConfig>,
) -> Result<ConsoleConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ConsoleConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "hearth", "hearth") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".hearth").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (HEARTH_PROMPT, HEARTH_ENGINE__KIND, ...)
    figment = figment.merge(Env::prefixed("HEARTH_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
