//! Telegram webhook entry point: one platform HTTP event on stdin whose
//! body carries a Bot API update. Replies are delivered through the Bot
//! API; the webhook ack JSON goes to stdout, logs to stderr.

use std::collections::HashMap;
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use anomaly_hub::config::BotConfig;
use anomaly_hub::serverless::{FunctionEvent, FunctionResponse};
use anomaly_hub::telegram::{self, HubApi, TelegramClient, Update};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = BotConfig::from_env()?;
    let api = HubApi::new(&cfg.api_url);
    let tg = TelegramClient::new(&cfg.bot_token);

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw).await?;
    let event: FunctionEvent = serde_json::from_str(&raw)?;

    // Telegram only needs an ack; failures 500 so the webhook redelivers.
    let status_code = match process(&api, &tg, &event).await {
        Ok(()) => 200,
        Err(e) => {
            tracing::error!("update handling failed: {e}");
            500
        }
    };

    let response = FunctionResponse {
        status_code,
        headers: HashMap::new(),
        body: String::new(),
    };

    let mut stdout = io::stdout();
    stdout.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}

async fn process(api: &HubApi, tg: &TelegramClient, event: &FunctionEvent) -> anyhow::Result<()> {
    let update: Update = serde_json::from_str(event.body.as_deref().unwrap_or("{}"))?;
    if let Some(reply) = telegram::build_reply(api, update).await {
        tg.send_message(&reply).await?;
    }
    Ok(())
}
