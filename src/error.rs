//! Ошибки рукопожатия, сигналинга и моста канала данных

/// Result с ошибкой крейта
pub type Result<T> = std::result::Result<T, Error>;

/// Ошибки установки и работы P2P сессии
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Тело сигналинга не разбирается как описание сессии
    #[error("Decode error: {0}")]
    Decode(String),

    /// Сетевая ошибка во время сигналинга
    #[error("Transport error: {0}")]
    Transport(String),

    /// Движок отверг offer, answer или описание
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// Отправка в открытый канал данных не удалась
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Истёк предел ожидания
    #[error("Timed out while {0}")]
    Timeout(&'static str),

    /// Сессию отменил владелец
    #[error("Cancelled while {0}")]
    Cancelled(&'static str),

    /// Неверный параметр конфигурации
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Шаг рукопожатия вне очереди
    #[error("Invalid handshake transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl Error {
    /// Ошибки, после которых имеет смысл повторить с новой сессией
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Timeout(_) | Error::Decode(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<webrtc::Error> for Error {
    fn from(e: webrtc::Error) -> Self {
        Error::Negotiation(e.to_string())
    }
}
