//! Telegram frontend: maps bot commands to the hub's analysis endpoints.
//!
//! The bot is a separate process from the hub and talks to it over plain
//! HTTP, so the two can be deployed (and scaled) independently.

use serde::Deserialize;
use serde_json::Value;

// ── Update payload ───────────────────────────────────────────────────────

/// Incoming webhook update, reduced to the message subset the bot reacts to.
/// Unknown fields from the Bot API are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Update {
    pub message: Option<Message>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub from: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub username: Option<String>,
}

/// Reply the bot wants delivered back to the chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
}

// ── Commands ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Analysis(Analysis),
}

/// One bot command per analysis endpoint; the mapping mirrors the HTTP
/// surface path for path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analysis {
    AnomalousVolumes,
    AnomalousLimits,
    NetFlow,
    ShortSqueeze,
}

impl Command {
    fn parse(word: &str) -> Option<Self> {
        // Group chats address commands as "/cmd@BotName"; strip the suffix.
        let word = word.split('@').next().unwrap_or(word);
        match word {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/anomalous_volumes" => Some(Self::Analysis(Analysis::AnomalousVolumes)),
            "/anomalous_limits" => Some(Self::Analysis(Analysis::AnomalousLimits)),
            "/net_flow" => Some(Self::Analysis(Analysis::NetFlow)),
            "/short_squeeze" => Some(Self::Analysis(Analysis::ShortSqueeze)),
            _ => None,
        }
    }
}

impl Analysis {
    fn endpoint(self) -> &'static str {
        match self {
            Self::AnomalousVolumes => "/anomalous_volumes",
            Self::AnomalousLimits => "/anomalous_limits",
            Self::NetFlow => "/net_flow",
            Self::ShortSqueeze => "/short_squeeze",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::AnomalousVolumes => "Anomalous volumes",
            Self::AnomalousLimits => "Anomalous limit orders",
            Self::NetFlow => "Net flow",
            Self::ShortSqueeze => "Short squeeze",
        }
    }
}

const COMMAND_LIST: &str = "Available commands:\n\
    /anomalous_volumes [ticker] - anomalous trading volumes\n\
    /anomalous_limits [ticker] - anomalous limit orders\n\
    /net_flow [ticker] - net buy/sell flow indicator\n\
    /short_squeeze [ticker] - short-squeeze indicator\n\
    /help - this list";

// ── Clients ──────────────────────────────────────────────────────────────

/// Thin client for the hub's own HTTP API.
pub struct HubApi {
    http: reqwest::Client,
    base: String,
}

impl HubApi {
    pub fn new(api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET an analysis endpoint; the raw JSON body becomes the reply text.
    async fn query(&self, endpoint: &str, ticker: &str) -> Result<String, reqwest::Error> {
        let resp = self
            .http
            .get(format!("{}{}", self.base, endpoint))
            .query(&[("ticker", ticker)])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        Ok(body.to_string())
    }
}

/// Bot API client used to deliver replies.
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
        }
    }

    pub async fn send_message(&self, reply: &Reply) -> Result<(), reqwest::Error> {
        self.http
            .post(format!(
                "https://api.telegram.org/bot{}/sendMessage",
                self.token
            ))
            .json(&serde_json::json!({
                "chat_id": reply.chat_id,
                "text": reply.text,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

// ── Update handling ──────────────────────────────────────────────────────

/// Decide the reply for one update. Analysis commands proxy to the hub;
/// everything else is answered locally. `None` means nothing to send.
pub async fn build_reply(api: &HubApi, update: Update) -> Option<Reply> {
    let message = update.message?;
    let chat_id = message.chat.id;
    let text = message.text?;

    let mut words = text.split_whitespace();
    let first = words.next()?;

    let Some(command) = Command::parse(first) else {
        // Free text gets a greeting, same as the original bot.
        let name = message
            .from
            .and_then(|u| u.username)
            .unwrap_or_else(|| "there".to_string());
        return Some(Reply {
            chat_id,
            text: format!("Hi, {name}!"),
        });
    };

    let text = match command {
        Command::Start => {
            format!("Hi! I analyse Moscow Exchange stocks.\n{COMMAND_LIST}")
        }
        Command::Help => COMMAND_LIST.to_string(),
        Command::Analysis(analysis) => {
            let Some(ticker) = words.next() else {
                return Some(Reply {
                    chat_id,
                    text: format!("Please supply a ticker after {first}"),
                });
            };
            match api.query(analysis.endpoint(), ticker).await {
                Ok(body) => format!("{} for {ticker}: {body}", analysis.label()),
                Err(e) => {
                    tracing::error!("hub request {} for {ticker} failed: {e}", analysis.endpoint());
                    format!(
                        "Could not fetch {} data, try again later.",
                        analysis.label().to_lowercase()
                    )
                }
            }
        }
    };

    Some(Reply { chat_id, text })
}
