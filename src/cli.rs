//! Общие аргументы командной строки для `offer` и `answer`

use crate::config::{SessionConfig, DEFAULT_ADDRESS, DEFAULT_CHANNEL_LABEL, DEFAULT_STUN};
use crate::error::Result;
use crate::peer::types::ServerConfig;
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address of the signaling HTTP server (bind address for answer, target for offer)
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// ICE servers; a bare host:port is treated as STUN, `turn:`/`turns:` URLs as TURN
    #[arg(long = "ice-server", value_delimiter = ',', default_value = DEFAULT_STUN)]
    pub ice_servers: Vec<String>,

    /// Username for the TURN servers in `--ice-server`
    #[arg(long)]
    pub ice_username: Option<String>,

    /// Credential for the TURN servers in `--ice-server`
    #[arg(long)]
    pub ice_credential: Option<String>,

    /// Seconds between messages sent by the offering side
    #[arg(long, default_value_t = 5)]
    pub interval_secs: u64,

    /// Give up on a signaling step after this many seconds (waits forever if unset)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Data channel label
    #[arg(long, default_value = DEFAULT_CHANNEL_LABEL)]
    pub label: String,

    /// Also gather loopback candidates (both peers on one host)
    #[arg(long)]
    pub loopback: bool,
}

impl Args {
    pub fn into_config(self) -> Result<SessionConfig> {
        let username = self.ice_username;
        let credential = self.ice_credential;
        let config = SessionConfig {
            address: self.address,
            ice_servers: self
                .ice_servers
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .map(|url| ice_server(url, &username, &credential))
                .collect(),
            channel_label: self.label,
            send_interval: Duration::from_secs(self.interval_secs),
            signaling_timeout: self.timeout_secs.map(Duration::from_secs),
            include_loopback: self.loopback,
        };
        config.validate()?;
        Ok(config)
    }
}

// TURN получает общие учётные данные, STUN идёт без них
fn ice_server(
    url: String,
    username: &Option<String>,
    credential: &Option<String>,
) -> ServerConfig {
    if url.starts_with("turn:") || url.starts_with("turns:") {
        ServerConfig {
            id: url.clone(),
            r#type: "turn".into(),
            url,
            username: username.clone(),
            credential: credential.clone(),
        }
    } else {
        ServerConfig::stun(url)
    }
}

/// Токен, который отменяется по Ctrl+C
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => warn!("cannot listen for Ctrl+C: {e}"),
        }
        cancel.cancel();
    });
    token
}
