use anyhow::bail;
use std::env;

/// Default REST base for the Tinkoff Invest public API.
pub const DEFAULT_API_BASE: &str = "https://invest-public-api.tinkoff.ru/rest";

/// Hub configuration derived from environment variables.
///
/// The upstream credential is required: construction fails fast at startup
/// rather than letting every candle fetch 401 later.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: String,
    pub port: u16,
    /// Invest API bearer token.
    pub token: String,
    /// REST base URL; overridable so tests can point at a local stub.
    pub api_base: String,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_required(name: &str, hint: &str) -> anyhow::Result<String> {
    let value = env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    match value {
        Some(v) => Ok(v),
        None => bail!("{name} is not set; {hint}"),
    }
}

impl HubConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind: env_str("ANOMALY_HUB_BIND", "0.0.0.0"),
            port: env_u16("ANOMALY_HUB_PORT", 8080),
            token: env_required(
                "TINKOFF_TOKEN",
                "the hub cannot reach the Invest API without it",
            )?,
            api_base: env_str("TINKOFF_API_BASE", DEFAULT_API_BASE),
        })
    }
}

/// Telegram bot configuration. The bot is a separate frontend process and
/// only needs its own credential plus the hub's address.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// Base URL of the hub HTTP API the bot proxies.
    pub api_url: String,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bot_token: env_required("BOT_TOKEN", "the bot cannot talk to Telegram without it")?,
            api_url: env_str("API_URL", "http://127.0.0.1:8080"),
        })
    }
}
