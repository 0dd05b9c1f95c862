//! Single-shot cloud-function entry point: one HTTP event JSON on stdin,
//! one response JSON on stdout. Logs go to stderr so stdout stays clean
//! for the platform.

use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use anomaly_hub::config::HubConfig;
use anomaly_hub::serverless::{self, FunctionEvent};
use anomaly_hub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = HubConfig::from_env()?;
    let app = anomaly_hub::app(AppState::new(cfg));

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw).await?;
    let event: FunctionEvent = serde_json::from_str(&raw)?;

    let response = serverless::handle_event(app, event).await?;

    let mut stdout = io::stdout();
    stdout.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}
