use crate::error::{Error, Result};
use crate::peer::types::ServerConfig;
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Функция для добавления схемы протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Если у url уже есть схема, возвращаем как есть
    if ["turn:", "turns:", "stun:", "stuns:"]
        .iter()
        .any(|scheme| config.url.starts_with(scheme))
    {
        config.url.clone()
    } else {
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

// ":50000" слушает на всех интерфейсах, как в Go
pub fn bind_address(address: &str) -> Result<String> {
    let address = address.trim();
    let (host, port) = split_host_port(address)?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(format!("{host}:{port}"))
}

// ":50000" как цель означает локальный хост
pub fn signaling_url(address: &str) -> Result<String> {
    let address = address.trim();
    let address = address
        .strip_prefix("http://")
        .unwrap_or(address)
        .trim_end_matches('/');
    let (host, port) = split_host_port(address)?;
    let host = if host.is_empty() { "localhost" } else { host };
    Ok(format!("http://{host}:{port}/"))
}

fn split_host_port(address: &str) -> Result<(&str, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| Error::Config(format!("address {address:?} has no port")))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| Error::Config(format!("address {address:?} has an invalid port")))?;
    Ok((host, port))
}

/// Текст периодического сообщения, например `offer to answer: 4242`
pub fn random_message(from: &str, to: &str) -> String {
    format!("{from} to {to}: {}", rand::rng().random_range(0..100_000))
}
