//! Offering peer: sends the offer over HTTP, then streams messages on the
//! `data` channel until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use sdp_signal::cli::{ctrl_c_token, Args};
use sdp_signal::peer::DataChannelBridge;
use sdp_signal::{logger, ConnectionEstablisher, HttpSignalingClient, NegotiationEngine, WebRtcEngine};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    logger::init();

    let cancel = ctrl_c_token();
    let engine = WebRtcEngine::new(&config)
        .await
        .context("create peer connection")?;
    let events = engine.take_events()?;
    let signaler = HttpSignalingClient::new(&config.address)?;
    info!("Signaling via {}", signaler.url());

    let bridge = DataChannelBridge::open(&engine, &config)
        .await
        .context("create data channel")?;

    let session = ConnectionEstablisher::new(&engine, &config, cancel.clone())
        .offer(&signaler)
        .await
        .context("handshake")?;
    info!(session = %session.id, "P2P session established");

    let result = bridge.run(events, cancel, |_, _| {}).await;

    engine.close().await.context("close peer connection")?;
    let stats = result.context("data channel")?;
    info!("Sent {} messages", stats.sent);
    Ok(())
}
