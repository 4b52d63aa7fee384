// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Engine configuration: model provider, sandbox, protocol and session
//! settings with serde defaults, loaded from a TOML file plus environment
//! overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key. The key itself never
    /// lives in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_image")]
    pub image: String,

    /// Docker network for the container. `host` gives direct access to
    /// locally hosted targets.
    #[serde(default = "default_network")]
    pub network: String,

    /// Optional host path bind-mounted read-only at /challenge
    #[serde(default)]
    pub volume_path: Option<PathBuf>,

    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// First hop used for proxied payload delivery
    #[serde(default = "default_proxy_addr")]
    pub proxy_addr: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where per-session context files live. Defaults to
    /// `$HOME/.cache/haukka/sessions`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_request_timeout() -> u64 {
    120
}

fn default_sandbox_image() -> String {
    "xoxruns/sandboxed_kali:latest".to_string()
}

fn default_network() -> String {
    "host".to_string()
}

fn default_exec_timeout() -> u64 {
    120
}

fn default_proxy_addr() -> String {
    "localhost:8080".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    5
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_sandbox_image(),
            network: default_network(),
            volume_path: None,
            exec_timeout_secs: default_exec_timeout(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            proxy_addr: default_proxy_addr(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl SessionConfig {
    /// Resolved sessions directory, falling back to the user cache dir.
    pub fn sessions_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".cache").join("haukka").join("sessions")
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. A missing file is not an error; defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", p.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Ok(image) = std::env::var("HAUKKA_SANDBOX_IMAGE") {
        config.sandbox.image = image;
    }
    if let Ok(network) = std::env::var("HAUKKA_SANDBOX_NETWORK") {
        config.sandbox.network = network;
    }
    if let Ok(model) = std::env::var("HAUKKA_MODEL") {
        config.model.model = model;
    }
    if let Ok(dir) = std::env::var("HAUKKA_SESSIONS_DIR") {
        config.sessions.dir = Some(PathBuf::from(dir));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = EngineConfig::default();
        assert_eq!(config.sandbox.network, "host");
        assert_eq!(config.protocol.proxy_addr, "localhost:8080");
        assert!(config.model.max_tokens > 0);
    }

    #[test]
    fn parses_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            [sandbox]
            image = "ubuntu:latest"
            "#,
        )
        .unwrap();
        assert_eq!(config.sandbox.image, "ubuntu:latest");
        // Untouched sections keep their defaults
        assert_eq!(config.sandbox.network, "host");
        assert_eq!(config.model.api_key_env, "ANTHROPIC_API_KEY");
    }
}
