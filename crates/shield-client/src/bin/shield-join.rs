//! Participant join binary.
//!
//! `shield-join [NAME]`: claims with NAME if given, otherwise prompts on
//! stdin. After a rejection the status is checked again; the binary exits
//! once a claim succeeds or someone else holds the shield.

use shield_client::console::ConsoleJoin;
use shield_client::{ClientConfig, HttpApi, JoinFlow, JoinPhase, SubmitOutcome};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shield_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    let api = Arc::new(HttpApi::new(&config.server_url, config.http_timeout)?);
    let mut flow = JoinFlow::new(api, ConsoleJoin::new(), config.script.clone());

    if let JoinPhase::TooLate(_) = flow.load().await {
        return Ok(());
    }

    let mut pending = std::env::args().nth(1);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while flow.is_open() {
        let input = match pending.take() {
            Some(name) => name,
            None => {
                stdout.write_all(b"Your name: ").await?;
                stdout.flush().await?;
                match lines.next_line().await? {
                    Some(line) => line,
                    None => break,
                }
            }
        };

        match flow.submit(&input).await {
            SubmitOutcome::Claimed(_) | SubmitOutcome::Closed => break,
            SubmitOutcome::Rejected(_) => {
                if let JoinPhase::TooLate(_) = flow.load().await {
                    break;
                }
            }
            SubmitOutcome::EmptyName => {}
        }
    }

    Ok(())
}
