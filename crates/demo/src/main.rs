//! Elixir SDK demo
//!
//! Resumes or establishes a session, shows the player profile, NFT
//! collections and tournaments, then closes the session.
//!
//! ```text
//! ELIXIR_API_KEY=... elixir-demo -rei <device key>
//! ```
//!
//! Pass `--watch` to keep the session alive (driving the refresh countdown)
//! until Ctrl-C.

use std::time::Duration;

use anyhow::Context;
use elixir_domain::{ElixirError, RefreshDriver};
use elixir_infra::logging::{self, LogFormat};
use elixir_infra::ElixirSdk;
use tracing::{info, warn};

const TICK: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(LogFormat::from_env());

    let sdk = ElixirSdk::from_env().context("loading Elixir SDK configuration")?;
    let watch = std::env::args().any(|arg| arg == "--watch");

    match sdk.start().await {
        Ok(_) => info!("Session ready"),
        Err(err) if err.requires_login() => {
            warn!("No stored session; launch with -rei <device key> to log in");
            return Ok(());
        }
        Err(err) => return Err(err).context("establishing session"),
    }

    show_player(&sdk).await?;

    if watch {
        keep_alive(&sdk).await;
    }

    sdk.shutdown().await;
    Ok(())
}

async fn show_player(sdk: &ElixirSdk) -> anyhow::Result<()> {
    let user = sdk.user().user_info().await.context("fetching user profile")?;
    info!(elixir_id = %user.elixir_id, nickname = %user.nickname, "Player");

    match sdk.nfts().collections_for(&user).await {
        Ok(collections) => {
            for collection in &collections {
                for nft in &collection.nfts {
                    info!(collection = %collection.collection_name, nft = %nft.name, "NFT");
                }
            }
        }
        Err(ElixirError::NoWallet) => info!("Player has no wallet, skipping NFTs"),
        Err(err) => warn!(error = %err, "Could not fetch NFTs"),
    }

    match sdk.tournaments().tournaments().await {
        Ok(tournaments) => {
            for tournament in &tournaments {
                info!(
                    id = tournament.id.as_deref().unwrap_or_default(),
                    name = tournament.name.as_deref().unwrap_or_default(),
                    "Tournament"
                );
            }
        }
        Err(err) => warn!(error = %err, "Could not fetch tournaments"),
    }

    Ok(())
}

/// Drive the refresh countdown until Ctrl-C.
async fn keep_alive(sdk: &ElixirSdk) {
    let session = sdk.session();
    let tick_driven = sdk.config().refresh_driver == RefreshDriver::Tick;
    let mut interval = tokio::time::interval(TICK);
    info!("Watching session, press Ctrl-C to exit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                if !tick_driven {
                    continue;
                }
                if let Some(refresh) = session.check_token(TICK) {
                    tokio::spawn(async move {
                        match refresh.await {
                            Ok(Ok(_)) => info!("Session refreshed"),
                            Ok(Err(err)) => warn!(error = %err, "Session refresh failed"),
                            Err(err) => warn!(error = %err, "Refresh task did not complete"),
                        }
                    });
                }
            }
        }
    }
}
