//! emblem - multi-relay Nostr badge viewer

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emblem::{
    config::Args,
    engine::BadgeEngine,
    identity,
    pool::{Incoming, RelayPool},
    render::TermRender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("emblem={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let pubkey = match identity::decode_npub(&args.npub) {
        Ok(pubkey) => pubkey,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let relays = args.relay_list();
    info!("======================================");
    info!(
        "  emblem {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown")
    );
    info!("======================================");
    info!("Subject: {}", args.npub);
    info!("Relays: {}", relays.len());
    for url in &relays {
        info!("  {}", url);
    }
    info!("Request limit: {}", args.request_limit);
    info!("======================================");

    let (pool, mut rx) = RelayPool::open_all(&relays);
    let mut engine =
        BadgeEngine::new(pool, TermRender::new()).with_request_limit(args.request_limit);

    // Queries reach only endpoints that are already open, so hold the
    // load until the first relay comes up (the original client gates
    // its load action the same way).
    loop {
        match rx.recv().await {
            Some(incoming) => {
                let ready = matches!(
                    incoming,
                    Incoming::Connectivity { connected, .. } if connected > 0
                );
                engine.handle(incoming).await;
                if ready {
                    break;
                }
            }
            None => {
                error!("No relay could be reached");
                std::process::exit(1);
            }
        }
    }

    engine.load_subject(&pubkey).await?;

    // Listen for a bounded window, then summarize and exit. There is no
    // per-query timeout; whatever has not resolved by now stays pending.
    let deadline = tokio::time::sleep(Duration::from_secs(args.wait_secs));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            maybe = rx.recv() => match maybe {
                Some(incoming) => engine.handle(incoming).await,
                None => break,
            },
        }
    }

    info!(
        "Done: {} definitions resolved, {} received, {} listed, {} still pending",
        engine.resolved_count(),
        engine.received_count(),
        engine.listed_count(),
        engine.pending_count()
    );
    Ok(())
}
