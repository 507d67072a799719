use serde::{Deserialize, Serialize};
use std::fmt;

/// Тип описания сессии на проводе
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpType::Offer => f.write_str("offer"),
            SdpType::Answer => f.write_str("answer"),
        }
    }
}

/// Описание сессии, которым стороны обмениваются через сигналинг.
///
/// `payload` непрозрачен для этого крейта: его производит и потребляет
/// движок согласования.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub payload: String,
}

impl SessionDescription {
    pub fn offer(payload: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            payload: payload.into(),
        }
    }

    pub fn answer(payload: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            payload: payload.into(),
        }
    }
}

/// Роль процесса в рукопожатии
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    /// Тип описания, который эта роль создаёт сама
    pub fn local_kind(self) -> SdpType {
        match self {
            Role::Offerer => SdpType::Offer,
            Role::Answerer => SdpType::Answer,
        }
    }

    /// Тип описания, который эта роль ждёт от пира
    pub fn remote_kind(self) -> SdpType {
        match self {
            Role::Offerer => SdpType::Answer,
            Role::Answerer => SdpType::Offer,
        }
    }

    /// Префикс для логов канала данных
    pub fn tag(self) -> &'static str {
        match self {
            Role::Offerer => "offer",
            Role::Answerer => "answer",
        }
    }
}

/// Состояние транспортного соединения, как его сообщает движок
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Состояния, о которых стоит предупредить в логах
    pub fn is_degraded(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::New => "new",
            ConnectionState::Checking => "checking",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Жизненный цикл канала данных
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Opening,
    Open,
    Closed,
}

/// Метка и id канала данных
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub label: String,
    pub id: u16,
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'-'{}'", self.label, self.id)
    }
}

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl ServerConfig {
    /// STUN сервер без учётных данных
    pub fn stun(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            r#type: "stun".into(),
            url,
            username: None,
            credential: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_wire_shape() {
        let desc = SessionDescription::offer("X");
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "offer", "payload": "X" }));

        let back: SessionDescription =
            serde_json::from_str(r#"{"type":"answer","payload":"Y"}"#).unwrap();
        assert_eq!(back, SessionDescription::answer("Y"));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let res = serde_json::from_str::<SessionDescription>(r#"{"type":"pranswer","payload":""}"#);
        assert!(res.is_err());
    }

    #[test]
    fn missing_payload_is_rejected() {
        let res = serde_json::from_str::<SessionDescription>(r#"{"type":"offer"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn role_directions() {
        assert_eq!(Role::Offerer.local_kind(), SdpType::Offer);
        assert_eq!(Role::Offerer.remote_kind(), SdpType::Answer);
        assert_eq!(Role::Answerer.local_kind(), SdpType::Answer);
        assert_eq!(Role::Answerer.remote_kind(), SdpType::Offer);
    }

    #[test]
    fn degraded_states() {
        assert!(ConnectionState::Failed.is_degraded());
        assert!(ConnectionState::Disconnected.is_degraded());
        assert!(!ConnectionState::Checking.is_degraded());
    }
}
