//! Answering peer: listens for the offer over HTTP, answers it, then logs
//! every message arriving on the peer's data channel until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use sdp_signal::cli::{ctrl_c_token, Args};
use sdp_signal::peer::DataChannelBridge;
use sdp_signal::{logger, ConnectionEstablisher, HttpSignalingServer, NegotiationEngine, WebRtcEngine};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    logger::init();

    let cancel = ctrl_c_token();
    let engine = WebRtcEngine::new(&config)
        .await
        .context("create peer connection")?;
    // канал может прийти в любой момент после рукопожатия; события буферизуются
    let events = engine.take_events()?;
    let mut signaler = HttpSignalingServer::bind(&config.address, &cancel)
        .await
        .context("start signaling server")?;

    let session = ConnectionEstablisher::new(&engine, &config, cancel.clone())
        .answer(&mut signaler)
        .await
        .context("handshake")?;
    info!(session = %session.id, "P2P session established");

    let result = DataChannelBridge::accept(&config)
        .run(events, cancel, |_, _| {})
        .await;

    signaler.shutdown();
    engine.close().await.context("close peer connection")?;
    let stats = result.context("data channel")?;
    info!("Received {} messages", stats.received);
    Ok(())
}
