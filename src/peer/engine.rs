//! Граница с движком согласования (ICE/DTLS/SCTP живут по ту сторону).
//!
//! Колбэки движка превращаются в типизированный поток событий с одним
//! потребителем, вместо разрозненных замыканий.

use crate::error::{Error, Result};
use crate::peer::types::{ChannelInfo, ConnectionState, SessionDescription};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Канал данных, как его видит приложение
#[async_trait]
pub trait DataChannel: Send + Sync + 'static {
    fn info(&self) -> ChannelInfo;

    /// Отправка текстового сообщения. Валидна только после Open.
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// События движка. Порядок относительно рукопожатия не гарантирован.
pub enum EngineEvent<C> {
    ConnectionStateChanged(ConnectionState),
    /// Пир открыл канал (сторона answerer)
    ChannelCreated(Arc<C>),
    ChannelOpen(ChannelInfo),
    ChannelMessage { channel: ChannelInfo, text: String },
    ChannelClosed(ChannelInfo),
}

impl<C> std::fmt::Debug for EngineEvent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::ConnectionStateChanged(s) => write!(f, "ConnectionStateChanged({s})"),
            EngineEvent::ChannelCreated(_) => f.write_str("ChannelCreated"),
            EngineEvent::ChannelOpen(c) => write!(f, "ChannelOpen({c})"),
            EngineEvent::ChannelMessage { channel, text } => {
                write!(f, "ChannelMessage({channel}, {} bytes)", text.len())
            }
            EngineEvent::ChannelClosed(c) => write!(f, "ChannelClosed({c})"),
        }
    }
}

/// Отправляющая половина потока событий; клонируется в колбэки движка
pub struct EventSink<C> {
    tx: mpsc::UnboundedSender<EngineEvent<C>>,
}

impl<C> Clone for EventSink<C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<C> EventSink<C> {
    /// Подписчик мог уже уйти; событие тогда просто теряется
    pub fn emit(&self, event: EngineEvent<C>) {
        let _ = self.tx.send(event);
    }
}

/// Принимающая половина потока событий
pub struct EngineEvents<C> {
    rx: mpsc::UnboundedReceiver<EngineEvent<C>>,
}

impl<C> EngineEvents<C> {
    pub async fn next(&mut self) -> Option<EngineEvent<C>> {
        self.rx.recv().await
    }
}

/// События буферизуются с момента создания, так что подписка после
/// рукопожатия ничего не теряет.
pub fn event_channel<C>() -> (EventSink<C>, EngineEvents<C>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EngineEvents { rx })
}

/// Держатель потока событий, который можно забрать ровно один раз
pub struct EventSlot<C> {
    inner: Mutex<Option<EngineEvents<C>>>,
}

impl<C> EventSlot<C> {
    pub fn new(events: EngineEvents<C>) -> Self {
        Self {
            inner: Mutex::new(Some(events)),
        }
    }

    pub fn take(&self) -> Result<EngineEvents<C>> {
        self.inner
            .lock()
            .map_err(|_| Error::Negotiation("event slot lock poisoned".into()))?
            .take()
            .ok_or_else(|| Error::Negotiation("engine events already taken".into()))
    }
}

/// Движок согласования: создаёт и применяет описания, ведёт ICE.
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    type Channel: DataChannel;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Применяет локальное описание и возвращает то, что следует отправить
    /// пиру. Движок без trickle-ICE возвращает описание уже с кандидатами.
    async fn set_local_description(&self, desc: &SessionDescription)
        -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<()>;

    async fn create_data_channel(&self, label: &str) -> Result<Arc<Self::Channel>>;

    /// Единственный поток событий движка
    fn take_events(&self) -> Result<EngineEvents<Self::Channel>>;

    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoChannel;

    #[tokio::test]
    async fn events_are_buffered_until_taken() {
        let (sink, events) = event_channel::<NoChannel>();
        sink.emit(EngineEvent::ConnectionStateChanged(ConnectionState::Checking));
        sink.emit(EngineEvent::ConnectionStateChanged(ConnectionState::Connected));

        let slot = EventSlot::new(events);
        let mut events = slot.take().unwrap();
        assert!(matches!(
            events.next().await,
            Some(EngineEvent::ConnectionStateChanged(ConnectionState::Checking))
        ));
        assert!(matches!(
            events.next().await,
            Some(EngineEvent::ConnectionStateChanged(ConnectionState::Connected))
        ));
    }

    #[test]
    fn events_can_be_taken_once() {
        let (_sink, events) = event_channel::<NoChannel>();
        let slot = EventSlot::new(events);
        assert!(slot.take().is_ok());
        assert!(matches!(slot.take(), Err(Error::Negotiation(_))));
    }

    #[test]
    fn emit_after_subscriber_dropped_is_silent() {
        let (sink, events) = event_channel::<NoChannel>();
        drop(events);
        sink.emit(EngineEvent::ChannelClosed(ChannelInfo {
            label: "data".into(),
            id: 1,
        }));
    }
}
