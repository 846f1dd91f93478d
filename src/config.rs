use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::path::PathBuf;

use crate::github::DEFAULT_API_URL;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Credential handed to the AI backend process
    pub anthropic_api_key: Option<Secret<String>>,
    /// Bearer token for the source-control API
    pub github_token: Option<Secret<String>>,
    /// Exposes internal failure messages to clients when set
    pub development: bool,
    /// Upper bound on conversational turns for a single chat prompt
    pub chat_max_turns: u32,
    pub github_api_url: String,
    pub github_org: String,
    pub mcp_config_path: PathBuf,
    pub claude_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("PORT must be a valid number, got {port:?}"))?,
            Err(_) => defaults.port,
        };

        let chat_max_turns = match env::var("CHAT_MAX_TURNS") {
            Ok(turns) => turns
                .parse()
                .with_context(|| format!("CHAT_MAX_TURNS must be a valid number, got {turns:?}"))?,
            Err(_) => defaults.chat_max_turns,
        };
        if chat_max_turns == 0 {
            bail!("CHAT_MAX_TURNS must be at least 1");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            anthropic_api_key: secret_var("ANTHROPIC_API_KEY"),
            github_token: secret_var("GITHUB_TOKEN"),
            development: env::var("APP_ENV").is_ok_and(|v| v == "development"),
            chat_max_turns,
            github_api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.github_api_url),
            github_org: env::var("GITHUB_ORG").unwrap_or(defaults.github_org),
            mcp_config_path: env::var("MCP_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.mcp_config_path),
            claude_path: env::var("CLAUDE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.claude_path),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_ref().map(|t| t.expose_secret().as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            anthropic_api_key: None,
            github_token: None,
            development: false,
            chat_max_turns: 3,
            github_api_url: DEFAULT_API_URL.to_string(),
            github_org: "alexbot".to_string(),
            mcp_config_path: PathBuf::from("./mcp-config.json"),
            claude_path: PathBuf::from("claude"),
        }
    }
}

// Unset and empty values are both treated as missing.
fn secret_var(name: &str) -> Option<Secret<String>> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Secret::new)
}
