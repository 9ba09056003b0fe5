//! Public display binary.
//!
//! Renders the display to the terminal. Type `reset` and press enter to clear
//! the claim.

use shield_client::console::ConsoleDisplay;
use shield_client::{ClientConfig, DisplayCommand, DisplayFlow, HttpApi, SyncChannel, WsConnector};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shield_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("Display following {}", config.server_url);

    let api = Arc::new(HttpApi::new(&config.server_url, config.http_timeout)?);
    let connector = WsConnector::new(config.push_url()?);
    let channel = SyncChannel::spawn(Arc::clone(&api), connector, &config.sync);

    let surface = ConsoleDisplay::new(config.join_url());
    let flow = DisplayFlow::new(api, surface, config.script.clone());

    let (commands, rx) = mpsc::channel(8);
    tokio::spawn(read_commands(commands));

    tokio::select! {
        _ = flow.run(channel, rx) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    Ok(())
}

async fn read_commands(commands: mpsc::Sender<DisplayCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "reset" => {
                    if commands.send(DisplayCommand::Reset).await.is_err() {
                        return;
                    }
                }
                "" => {}
                other => tracing::warn!("Unknown command {:?}, try `reset`", other),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin closed: {}", e);
                break;
            }
        }
    }
    // Without stdin the display keeps running; hold the sender open.
    std::future::pending::<()>().await;
    drop(commands);
}
