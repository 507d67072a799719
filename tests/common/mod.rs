//! In-process negotiation engine for handshake tests.
//!
//! Records every call so tests can check ordering, and can be linked to a
//! peer engine so that data-channel traffic flows between two bridges.

#![allow(dead_code)]

use async_trait::async_trait;
use sdp_signal::error::{Error, Result};
use sdp_signal::peer::engine::{event_channel, EngineEvents, EventSink, EventSlot};
use sdp_signal::peer::{ChannelInfo, DataChannel, EngineEvent, NegotiationEngine, SdpType};
use sdp_signal::signaling::OfferSignaler;
use sdp_signal::SessionDescription;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    Signal,
    CreateChannel(String),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct FakeChannel {
    info: ChannelInfo,
    sent: Mutex<Vec<String>>,
    peer: Option<EventSink<FakeChannel>>,
}

impl FakeChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for FakeChannel {
    fn info(&self) -> ChannelInfo {
        self.info.clone()
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if let Some(peer) = &self.peer {
            peer.emit(EngineEvent::ChannelMessage {
                channel: self.info.clone(),
                text: text.to_string(),
            });
        }
        Ok(())
    }
}

pub struct FakeEngine {
    payload: String,
    reject_remote: bool,
    log: CallLog,
    remote: Mutex<Option<SessionDescription>>,
    sink: EventSink<FakeChannel>,
    events: EventSlot<FakeChannel>,
    peer: Mutex<Option<EventSink<FakeChannel>>>,
}

impl FakeEngine {
    /// `payload` is what this engine puts into the descriptions it creates
    pub fn new(payload: &str) -> Self {
        let (sink, events) = event_channel();
        Self {
            payload: payload.to_string(),
            reject_remote: false,
            log: Arc::new(Mutex::new(Vec::new())),
            remote: Mutex::new(None),
            sink,
            events: EventSlot::new(events),
            peer: Mutex::new(None),
        }
    }

    pub fn rejecting_remote(payload: &str) -> Self {
        Self {
            reject_remote: true,
            ..Self::new(payload)
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    /// Channels created here show up as inbound channels on `peer`
    pub fn link(&self, peer: &FakeEngine) {
        *self.peer.lock().unwrap() = Some(peer.sink.clone());
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NegotiationEngine for FakeEngine {
    type Channel = FakeChannel;

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record(Call::CreateOffer);
        Ok(SessionDescription::offer(self.payload.clone()))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        if self.remote.lock().unwrap().is_none() {
            return Err(Error::Negotiation("create_answer without remote offer".into()));
        }
        self.record(Call::CreateAnswer);
        Ok(SessionDescription::answer(self.payload.clone()))
    }

    async fn set_local_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<SessionDescription> {
        self.record(Call::SetLocal(desc.kind));
        Ok(desc.clone())
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        if self.reject_remote {
            return Err(Error::Negotiation("remote description rejected".into()));
        }
        self.record(Call::SetRemote(desc.kind));
        *self.remote.lock().unwrap() = Some(desc.clone());
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<FakeChannel>> {
        self.record(Call::CreateChannel(label.to_string()));
        let info = ChannelInfo {
            label: label.to_string(),
            id: 1,
        };
        let peer = self.peer.lock().unwrap().clone();

        if let Some(peer) = &peer {
            let inbound = Arc::new(FakeChannel {
                info: info.clone(),
                sent: Mutex::new(Vec::new()),
                peer: Some(self.sink.clone()),
            });
            peer.emit(EngineEvent::ChannelCreated(inbound));
        }
        self.sink.emit(EngineEvent::ChannelOpen(info.clone()));

        Ok(Arc::new(FakeChannel {
            info,
            sent: Mutex::new(Vec::new()),
            peer,
        }))
    }

    fn take_events(&self) -> Result<EngineEvents<FakeChannel>> {
        self.events.take()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Offer signaler that notes in the engine's call log when it transmits
pub struct RecordingSignaler<S> {
    pub inner: S,
    pub log: CallLog,
}

#[async_trait]
impl<S: OfferSignaler> OfferSignaler for RecordingSignaler<S> {
    async fn send(&self, description: &SessionDescription) -> Result<SessionDescription> {
        self.log.lock().unwrap().push(Call::Signal);
        self.inner.send(description).await
    }
}
