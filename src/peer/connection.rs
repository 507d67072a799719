use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::logger::{dump_candidate, dump_selected_pair};
use crate::peer::engine::{
    event_channel, DataChannel, EngineEvent, EngineEvents, EventSink, EventSlot, NegotiationEngine,
};
use crate::peer::types::{ChannelInfo, ConnectionState, SdpType, ServerConfig, SessionDescription};
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::{
    api::{setting_engine::SettingEngine, APIBuilder},
    data_channel::RTCDataChannel,
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

/// Канал данных webrtc-rs
pub struct WebRtcChannel {
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for WebRtcChannel {
    fn info(&self) -> ChannelInfo {
        channel_info(&self.dc)
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.dc
            .send_text(text.to_string())
            .await
            .map(|_| ())
            .map_err(|e| Error::ChannelSend(e.to_string()))
    }
}

fn channel_info(dc: &RTCDataChannel) -> ChannelInfo {
    ChannelInfo {
        label: dc.label().to_string(),
        id: dc.id(),
    }
}

/// Движок согласования поверх webrtc-rs
pub struct WebRtcEngine {
    pc: Arc<RTCPeerConnection>,
    sink: EventSink<WebRtcChannel>,
    events: EventSlot<WebRtcChannel>,
    gather_timeout: Option<Duration>,
}

impl WebRtcEngine {
    /// создаём Peer и подписываемся на все его колбэки
    pub async fn new(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let mut setting = SettingEngine::default();
        setting.set_include_loopback_candidate(config.include_loopback);
        let api = APIBuilder::new().with_setting_engine(setting).build();
        let pc = Arc::new(api.new_peer_connection(rtc_config(&config.ice_servers)).await?);
        let (sink, events) = event_channel();

        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            match cand {
                Some(c) => dump_candidate("LOCAL", &c),
                None => debug!("ICE candidate gathering completed"),
            }
            Box::pin(async {})
        }));

        let state_sink = sink.clone();
        pc.on_ice_connection_state_change(Box::new(move |st: RTCIceConnectionState| {
            debug!("ICE connection state changed to: {st}");
            state_sink.emit(EngineEvent::ConnectionStateChanged(map_ice_state(st)));
            Box::pin(async {})
        }));

        let pc_weak: Weak<RTCPeerConnection> = Arc::downgrade(&pc);
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            debug!("Peer connection state changed to: {st}");
            if matches!(
                st,
                RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Failed
            ) {
                if let Some(pc) = pc_weak.upgrade() {
                    tokio::spawn(async move {
                        dump_selected_pair(&pc, "BEFORE-FAIL").await;
                    });
                }
            }
            Box::pin(async {})
        }));

        let dc_sink = sink.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            debug!("New DataChannel {} {}", dc.label(), dc.id());
            attach_dc(&dc, &dc_sink);
            dc_sink.emit(EngineEvent::ChannelCreated(Arc::new(WebRtcChannel { dc })));
            Box::pin(async {})
        }));

        Ok(Self {
            pc,
            sink,
            events: EventSlot::new(events),
            gather_timeout: config.signaling_timeout,
        })
    }
}

#[async_trait]
impl NegotiationEngine for WebRtcEngine {
    type Channel = WebRtcChannel;

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await?;
        from_rtc(&offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.pc.create_answer(None).await?;
        from_rtc(&answer)
    }

    async fn set_local_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<SessionDescription> {
        // promise нужно взять до применения, иначе можно пропустить завершение
        let mut gather_complete = self.pc.gathering_complete_promise().await;
        self.pc.set_local_description(to_rtc(desc)?).await?;

        match self.gather_timeout {
            Some(limit) => {
                if timeout(limit, gather_complete.recv()).await.is_err() {
                    warn!("ICE gathering not complete after {limit:?}, signaling partial candidates");
                }
            }
            None => {
                let _ = gather_complete.recv().await;
            }
        }

        let local = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| Error::Negotiation("local description missing after apply".into()))?;
        from_rtc(&local)
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<WebRtcChannel>> {
        let dc = self.pc.create_data_channel(label, None).await?;
        attach_dc(&dc, &self.sink);
        Ok(Arc::new(WebRtcChannel { dc }))
    }

    fn take_events(&self) -> Result<EngineEvents<WebRtcChannel>> {
        self.events.take()
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}

/// общий обработчик data-channel: колбэки канала уходят в поток событий
fn attach_dc(dc: &Arc<RTCDataChannel>, sink: &EventSink<WebRtcChannel>) {
    let label = dc.label().to_string();

    dc.on_open(Box::new({
        let dc = Arc::downgrade(dc);
        let sink = sink.clone();
        move || {
            if let Some(dc) = dc.upgrade() {
                sink.emit(EngineEvent::ChannelOpen(channel_info(&dc)));
            }
            Box::pin(async {})
        }
    }));

    dc.on_message(Box::new({
        let dc = Arc::downgrade(dc);
        let sink = sink.clone();
        let label = label.clone();
        move |msg: DataChannelMessage| {
            let channel = dc
                .upgrade()
                .map(|dc| channel_info(&dc))
                .unwrap_or_else(|| ChannelInfo {
                    label: label.clone(),
                    id: 0,
                });
            if !msg.is_string {
                debug!("Binary message on '{}', length: {}", channel.label, msg.data.len());
            }
            let text = String::from_utf8_lossy(&msg.data).into_owned();
            sink.emit(EngineEvent::ChannelMessage { channel, text });
            Box::pin(async {})
        }
    }));

    dc.on_close(Box::new({
        let dc = Arc::downgrade(dc);
        let sink = sink.clone();
        move || {
            let channel = dc
                .upgrade()
                .map(|dc| channel_info(&dc))
                .unwrap_or_else(|| ChannelInfo {
                    label: label.clone(),
                    id: 0,
                });
            sink.emit(EngineEvent::ChannelClosed(channel));
            Box::pin(async {})
        }
    }));
}

/// Создает конфигурацию для peer connection
fn rtc_config(servers: &[ServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_ice_servers(servers),
        ..Default::default()
    }
}

pub fn get_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

fn map_ice_state(st: RTCIceConnectionState) -> ConnectionState {
    match st {
        RTCIceConnectionState::Unspecified | RTCIceConnectionState::New => ConnectionState::New,
        RTCIceConnectionState::Checking => ConnectionState::Checking,
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            ConnectionState::Connected
        }
        RTCIceConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCIceConnectionState::Failed => ConnectionState::Failed,
        RTCIceConnectionState::Closed => ConnectionState::Closed,
    }
}

fn to_rtc(desc: &SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.payload.clone())?,
        SdpType::Answer => RTCSessionDescription::answer(desc.payload.clone())?,
    };
    Ok(rtc)
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        other => {
            return Err(Error::Negotiation(format!(
                "unsupported description type: {other}"
            )))
        }
    };
    Ok(SessionDescription {
        kind,
        payload: desc.sdp.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ice_states_map_onto_connection_states() {
        assert_eq!(map_ice_state(RTCIceConnectionState::Completed), ConnectionState::Connected);
        assert_eq!(map_ice_state(RTCIceConnectionState::Unspecified), ConnectionState::New);
        assert_eq!(map_ice_state(RTCIceConnectionState::Failed), ConnectionState::Failed);
    }

    #[test]
    fn ice_servers_get_scheme_and_credentials() {
        let servers = vec![
            ServerConfig::stun("stun.l.google.com:19302"),
            ServerConfig {
                id: "relay".into(),
                r#type: "turn".into(),
                url: "turn.example.org:3478".into(),
                username: Some("user".into()),
                credential: Some("secret".into()),
            },
        ];
        let ice = get_ice_servers(&servers);
        assert_eq!(ice[0].urls, vec!["stun:stun.l.google.com:19302".to_string()]);
        assert_eq!(ice[1].urls, vec!["turn:turn.example.org:3478".to_string()]);
        assert_eq!(ice[1].username, "user");
        assert_eq!(ice[1].credential, "secret");
    }

    #[test]
    fn garbage_sdp_is_a_negotiation_error() {
        let err = to_rtc(&SessionDescription::offer("not an sdp")).unwrap_err();
        assert!(matches!(err, Error::Negotiation(_)));
    }

    #[tokio::test]
    async fn created_offer_converts_back_and_forth() {
        let config = SessionConfig {
            ice_servers: vec![],
            ..Default::default()
        };
        let engine = WebRtcEngine::new(&config).await.unwrap();
        let offer = engine.create_offer().await.unwrap();
        assert_eq!(offer.kind, SdpType::Offer);
        assert!(offer.payload.starts_with("v=0"));
        let rtc = to_rtc(&offer).unwrap();
        assert_eq!(from_rtc(&rtc).unwrap(), offer);
        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn offer_carries_the_data_channel() {
        let config = SessionConfig {
            ice_servers: vec![],
            ..Default::default()
        };
        let engine = WebRtcEngine::new(&config).await.unwrap();
        let channel = engine.create_data_channel("data").await.unwrap();
        assert_eq!(channel.info().label, "data");

        let offer = engine.create_offer().await.unwrap();
        assert!(offer.payload.contains("m=application"), "{}", offer.payload);
        engine.close().await.unwrap();
    }
}
