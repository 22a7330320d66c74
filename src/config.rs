use crate::error::RelayError;
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_WEBHOOK_PATH: &str = "/endpoint";
pub const REGISTER_WEBHOOK_PATH: &str = "/registerWebhook";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Process-wide settings, resolved once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub telegram_api_url: Url,
    pub webhook_path: String,
    pub webhook_secret: String,
    pub memos_api: Url,
    /// Always carries the `Bearer ` prefix.
    pub memos_token: String,
    pub listen_addr: SocketAddr,
    pub public_url: Option<Url>,
}

/// Intermediate type: every key is optional until the environment overlay is applied.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    telegram_bot_token: Option<String>,
    telegram_api_url: Option<String>,
    webhook_path: Option<String>,
    webhook_secret: Option<String>,
    memos_api: Option<String>,
    memos_token: Option<String>,
    listen_addr: Option<String>,
    public_url: Option<String>,
}

impl RawConfig {
    /// Environment values win over the file. Empty values count as unset.
    fn overlay_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let slots = [
            ("TG_BOT_TOKEN", &mut self.telegram_bot_token),
            ("TG_API_URL", &mut self.telegram_api_url),
            ("TG_WEBHOOK_PATH", &mut self.webhook_path),
            ("TG_WEBHOOK_SECRET", &mut self.webhook_secret),
            ("MEMOS_API", &mut self.memos_api),
            ("MEMOS_TOKEN", &mut self.memos_token),
            ("RELAY_LISTEN_ADDR", &mut self.listen_addr),
            ("RELAY_PUBLIC_URL", &mut self.public_url),
        ];
        for (key, slot) in slots {
            if let Some(value) = env(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        }
    }
}

impl Config {
    /// Loads the TOML file (explicit path, or the default location if present)
    /// and overlays the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut raw = match path {
            Some(path) => read_raw(path)?,
            None => {
                let default_path = config_file_path()?;
                if default_path.exists() {
                    read_raw(&default_path)?
                } else {
                    RawConfig::default()
                }
            }
        };
        raw.overlay_env(env);

        let config = Self::from_raw(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawConfig) -> anyhow::Result<Self> {
        let telegram_bot_token = required(raw.telegram_bot_token, "telegram_bot_token")?;
        let webhook_secret = required(raw.webhook_secret, "webhook_secret")?;
        let memos_token = required(raw.memos_token, "memos_token")?;
        let memos_api = parse_url(&required(raw.memos_api, "memos_api")?, "memos_api")?;

        let telegram_api_url = parse_url(
            raw.telegram_api_url
                .as_deref()
                .unwrap_or(DEFAULT_TELEGRAM_API_URL),
            "telegram_api_url",
        )?;

        let webhook_path = raw
            .webhook_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());

        let listen_addr_str = raw.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen_addr: SocketAddr = listen_addr_str.trim().parse().map_err(|e| {
            RelayError::ConfigInvalid(format!("listen_addr {listen_addr_str:?} is invalid: {e}"))
        })?;

        let public_url = raw
            .public_url
            .as_deref()
            .map(|u| parse_url(u, "public_url"))
            .transpose()?;

        Ok(Self {
            telegram_bot_token,
            telegram_api_url,
            webhook_path,
            webhook_secret,
            memos_api,
            memos_token: normalize_bearer(&memos_token),
            listen_addr,
            public_url,
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.webhook_path.starts_with('/') {
            anyhow::bail!("webhook_path must start with '/'");
        }
        if self.webhook_path == REGISTER_WEBHOOK_PATH {
            anyhow::bail!("webhook_path must not be {REGISTER_WEBHOOK_PATH}");
        }
        if self
            .webhook_path
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '*' | '?' | '#' | ':'))
        {
            anyhow::bail!(
                "webhook_path contains characters not allowed in a route: {}",
                self.webhook_path
            );
        }
        for (name, url) in [
            ("telegram_api_url", Some(&self.telegram_api_url)),
            ("memos_api", Some(&self.memos_api)),
            ("public_url", self.public_url.as_ref()),
        ] {
            if let Some(url) = url
                && !matches!(url.scheme(), "http" | "https")
            {
                anyhow::bail!("{name} must be an http(s) URL");
            }
        }
        Ok(())
    }
}

fn read_raw(path: &Path) -> anyhow::Result<RawConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigInvalid(format!("Cannot read config at {}: {}", path.display(), e))
    })?;
    let raw = toml::from_str(&contents).map_err(|e| {
        RelayError::ConfigInvalid(format!("Invalid TOML in {}: {}", path.display(), e))
    })?;
    Ok(raw)
}

fn required(value: Option<String>, name: &str) -> anyhow::Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("{name} must not be empty"),
    }
}

fn parse_url(value: &str, name: &str) -> anyhow::Result<Url> {
    Url::parse(value.trim())
        .map_err(|e| RelayError::ConfigInvalid(format!("{name} {value:?} is not a valid URL: {e}")))
        .map_err(Into::into)
}

/// The Memos token may be configured with or without the scheme prefix.
pub fn normalize_bearer(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

fn config_file_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RelayError::ConfigInvalid("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join("memos-relay").join("config.toml"))
}
