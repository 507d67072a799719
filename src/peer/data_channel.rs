use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::peer::engine::{DataChannel, EngineEvent, EngineEvents, NegotiationEngine};
use crate::peer::types::{ChannelInfo, ChannelState, Role};
use crate::utils::random_message;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Счётчики сообщений за время жизни моста
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub sent: u64,
    pub received: u64,
}

/// Мост канала данных: один именованный канал на сессию.
///
/// Offerer создаёт канал и после Open шлёт сообщения с периодом
/// `send_interval`. Answerer принимает первый входящий канал и только
/// читает из него.
pub struct DataChannelBridge<C> {
    role: Role,
    label: String,
    interval: Duration,
    channel: Option<Arc<C>>,
    state: ChannelState,
    stats: BridgeStats,
}

enum Flow {
    Continue,
    Stop,
}

enum Step<C> {
    Cancelled,
    Tick,
    Event(Option<EngineEvent<C>>),
}

impl<C: DataChannel> DataChannelBridge<C> {
    /// Сторона offerer. Вызывать до `create_offer`: без канала в offer нет
    /// секции `m=application`, и канал никогда не откроется.
    pub async fn open<E>(engine: &E, config: &SessionConfig) -> Result<Self>
    where
        E: NegotiationEngine<Channel = C>,
    {
        let channel = engine.create_data_channel(&config.channel_label).await?;
        debug!("Created data channel '{}'", config.channel_label);
        Ok(Self::offering(channel, config))
    }

    /// Offerer с уже созданным каналом
    pub fn offering(channel: Arc<C>, config: &SessionConfig) -> Self {
        Self {
            role: Role::Offerer,
            label: config.channel_label.clone(),
            interval: config.send_interval,
            channel: Some(channel),
            state: ChannelState::Opening,
            stats: BridgeStats::default(),
        }
    }

    /// Сторона answerer: канал придёт от пира
    pub fn accept(config: &SessionConfig) -> Self {
        Self {
            role: Role::Answerer,
            label: config.channel_label.clone(),
            interval: config.send_interval,
            channel: None,
            state: ChannelState::Opening,
            stats: BridgeStats::default(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Цикл событий сессии. Завершается отменой, закрытием канала или
    /// ошибкой отправки.
    pub async fn run<F>(
        mut self,
        mut events: EngineEvents<C>,
        cancel: CancellationToken,
        mut on_message: F,
    ) -> Result<BridgeStats>
    where
        F: FnMut(&ChannelInfo, &str) + Send,
    {
        let mut ticker: Option<Interval> = None;

        loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => Step::Cancelled,
                _ = tick(&mut ticker) => Step::Tick,
                event = events.next() => Step::Event(event),
            };

            match step {
                Step::Cancelled => {
                    debug!("Data channel bridge cancelled");
                    return Ok(self.stats);
                }
                Step::Tick => self.send_periodic().await?,
                Step::Event(None) => {
                    debug!("Engine event stream ended");
                    return Ok(self.stats);
                }
                Step::Event(Some(event)) => {
                    if let Flow::Stop = self.handle(event, &mut ticker, &mut on_message) {
                        return Ok(self.stats);
                    }
                }
            }
        }
    }

    fn handle<F>(
        &mut self,
        event: EngineEvent<C>,
        ticker: &mut Option<Interval>,
        on_message: &mut F,
    ) -> Flow
    where
        F: FnMut(&ChannelInfo, &str),
    {
        match event {
            EngineEvent::ConnectionStateChanged(st) => {
                if st.is_degraded() {
                    warn!("ICE Connection State has changed: {st}");
                } else {
                    info!("ICE Connection State has changed: {st}");
                }
            }

            EngineEvent::ChannelCreated(channel) => {
                let ch = channel.info();
                if self.role == Role::Answerer && self.channel.is_none() {
                    info!("New DataChannel {} {}", ch.label, ch.id);
                    self.channel = Some(channel);
                    // канал от пира приходит уже открытым
                    self.state = ChannelState::Open;
                } else {
                    warn!("Ignoring extra data channel {ch}");
                }
            }

            EngineEvent::ChannelOpen(ch) => {
                if !self.is_ours(&ch) {
                    return Flow::Continue;
                }
                self.state = ChannelState::Open;
                info!("[{}] Data channel {ch} open.", self.role.tag());
                if self.role == Role::Offerer && ticker.is_none() {
                    let mut t = interval_at(Instant::now() + self.interval, self.interval);
                    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    *ticker = Some(t);
                }
            }

            EngineEvent::ChannelMessage { channel, text } => {
                if !self.is_ours(&channel) {
                    return Flow::Continue;
                }
                self.stats.received += 1;
                info!(
                    "[{}] Message from DataChannel '{}': '{}'",
                    self.role.tag(),
                    channel.label,
                    text
                );
                on_message(&channel, &text);
            }

            EngineEvent::ChannelClosed(ch) => {
                if self.is_ours(&ch) {
                    info!("[{}] Data channel {ch} closed", self.role.tag());
                    self.state = ChannelState::Closed;
                    return Flow::Stop;
                }
            }
        }
        Flow::Continue
    }

    fn is_ours(&self, ch: &ChannelInfo) -> bool {
        match &self.channel {
            Some(channel) => channel.info().label == ch.label,
            None => false,
        }
    }

    async fn send_periodic(&mut self) -> Result<()> {
        let Some(channel) = self.channel.as_ref() else {
            return Ok(());
        };
        if self.state != ChannelState::Open {
            return Ok(());
        }

        let message = random_message(self.role.tag(), Role::Answerer.tag());
        channel.send_text(&message).await.map_err(|e| match e {
            Error::ChannelSend(_) => e,
            other => Error::ChannelSend(other.to_string()),
        })?;
        self.stats.sent += 1;
        debug!("[{}] sent '{}' on '{}'", self.role.tag(), message, self.label);
        Ok(())
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
