// Конфигурация сессии
// Передаётся явно в движок, сигналинг и мост канала; глобального состояния нет

use crate::error::{Error, Result};
use crate::peer::types::ServerConfig;
use std::time::Duration;

// В режиме отладки пишем подробный лог, в продакшене только info и выше.
// RUST_LOG всегда имеет приоритет.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "debug";

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_ADDRESS: &str = ":50000";
pub const DEFAULT_STUN: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_CHANNEL_LABEL: &str = "data";
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(5);

/// Всё, что нужно одной сессии
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Адрес сигналинга: bind для answerer, цель для offerer
    pub address: String,
    pub ice_servers: Vec<ServerConfig>,
    pub channel_label: String,
    /// Период отправки сообщений offerer'ом
    pub send_interval: Duration,
    /// Предел ожидания каждого шага сигналинга; `None` ждёт бесконечно
    pub signaling_timeout: Option<Duration>,
    /// Собирать кандидатов и на loopback интерфейсе
    pub include_loopback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            ice_servers: vec![ServerConfig::stun(DEFAULT_STUN)],
            channel_label: DEFAULT_CHANNEL_LABEL.into(),
            send_interval: DEFAULT_SEND_INTERVAL,
            signaling_timeout: None,
            include_loopback: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Config("signaling address cannot be empty".into()));
        }
        if self.channel_label.is_empty() {
            return Err(Error::Config("channel label cannot be empty".into()));
        }
        if self.send_interval.is_zero() {
            return Err(Error::Config("send interval must be positive".into()));
        }
        for server in &self.ice_servers {
            validate_ice_server(server)?;
        }
        Ok(())
    }
}

/// Те же правила, что и для пользовательских серверов в UI
pub fn validate_ice_server(server: &ServerConfig) -> Result<()> {
    if server.url.is_empty() {
        return Err(Error::Config("Server URL cannot be empty".into()));
    }
    if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
        return Err(Error::Config(format!(
            "TURN server {} requires username and credential",
            server.url
        )));
    }
    Ok(())
}
