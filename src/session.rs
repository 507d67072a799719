use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::peer::engine::NegotiationEngine;
use crate::peer::state::{HandshakeMachine, HandshakeState};
use crate::peer::types::{Role, SdpType, SessionDescription};
use crate::signaling::{AnswerSignaler, OfferSignaler};
use crate::utils::random_id;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Итог рукопожатия: оба описания и пройденный путь.
/// Каждое рукопожатие создаёт новую сессию со своим id, ничего не переиспользуется.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub role: Role,
    pub local: SessionDescription,
    pub remote: SessionDescription,
    pub history: Vec<HandshakeState>,
}

/// Проводит рукопожатие одной роли через движок и сигналинг.
///
/// Любая ошибка шага возвращается вызывающему; частичное состояние не
/// восстанавливается, для повтора нужна новая сессия.
pub struct ConnectionEstablisher<'a, E> {
    engine: &'a E,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a, E: NegotiationEngine> ConnectionEstablisher<'a, E> {
    pub fn new(engine: &'a E, config: &SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            engine,
            timeout: config.signaling_timeout,
            cancel,
        }
    }

    /// create-offer → set-local → signal → await-answer → set-remote
    pub async fn offer<S>(&self, signaler: &S) -> Result<Session>
    where
        S: OfferSignaler + ?Sized,
    {
        let id = random_id();
        let span = info_span!("handshake", role = "offer", session = %id);
        self.run_offer(id, signaler).instrument(span).await
    }

    /// await-offer → set-remote → create-answer → set-local → signal-back
    pub async fn answer<S>(&self, signaler: &mut S) -> Result<Session>
    where
        S: AnswerSignaler + ?Sized,
    {
        let id = random_id();
        let span = info_span!("handshake", role = "answer", session = %id);
        self.run_answer(id, signaler).instrument(span).await
    }

    async fn run_offer<S>(&self, id: String, signaler: &S) -> Result<Session>
    where
        S: OfferSignaler + ?Sized,
    {
        let mut machine = HandshakeMachine::new(Role::Offerer);

        let offer = self
            .bounded("creating offer", self.engine.create_offer())
            .await?;
        expect_kind(&offer, SdpType::Offer)?;
        machine.advance(HandshakeState::OfferCreated)?;

        // локальное описание до отправки, чтобы движок начал сбор кандидатов
        let local = self
            .bounded(
                "setting local description",
                self.engine.set_local_description(&offer),
            )
            .await?;
        machine.advance(HandshakeState::LocalSet)?;

        machine.advance(HandshakeState::AwaitingAnswer)?;
        info!("Sending offer, waiting for answer");
        let answer = self.bounded("awaiting answer", signaler.send(&local)).await?;
        expect_kind(&answer, SdpType::Answer)?;

        self.bounded(
            "setting remote description",
            self.engine.set_remote_description(&answer),
        )
        .await?;
        machine.advance(HandshakeState::RemoteSet)?;
        machine.advance(HandshakeState::Established)?;
        debug_assert!(machine.is_complete());
        info!("Handshake complete");

        Ok(Session {
            id,
            role: Role::Offerer,
            local,
            remote: answer,
            history: machine.history().to_vec(),
        })
    }

    async fn run_answer<S>(&self, id: String, signaler: &mut S) -> Result<Session>
    where
        S: AnswerSignaler + ?Sized,
    {
        let mut machine = HandshakeMachine::new(Role::Answerer);

        machine.advance(HandshakeState::AwaitingOffer)?;
        info!("Waiting for offer");
        let exchange = self.bounded("awaiting offer", signaler.receive()).await?;
        let offer = exchange.description().clone();
        expect_kind(&offer, SdpType::Offer)?;

        self.bounded(
            "setting remote description",
            self.engine.set_remote_description(&offer),
        )
        .await?;
        machine.advance(HandshakeState::RemoteSet)?;

        let answer = self
            .bounded("creating answer", self.engine.create_answer())
            .await?;
        expect_kind(&answer, SdpType::Answer)?;
        machine.advance(HandshakeState::AnswerCreated)?;

        let local = self
            .bounded(
                "setting local description",
                self.engine.set_local_description(&answer),
            )
            .await?;
        machine.advance(HandshakeState::LocalSet)?;

        exchange.respond(local.clone())?;
        machine.advance(HandshakeState::Responded)?;
        debug_assert!(machine.is_complete());
        info!("Answer sent, handshake complete");

        Ok(Session {
            id,
            role: Role::Answerer,
            local,
            remote: offer,
            history: machine.history().to_vec(),
        })
    }

    /// Ожидание шага с таймаутом и отменой
    async fn bounded<T, F>(&self, stage: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limited = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| Error::Timeout(stage))?,
                None => fut.await,
            }
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled(stage)),
            res = limited => res,
        }
    }
}

fn expect_kind(desc: &SessionDescription, expected: SdpType) -> Result<()> {
    if desc.kind == expected {
        Ok(())
    } else {
        Err(Error::Negotiation(format!(
            "expected {expected} description, got {}",
            desc.kind
        )))
    }
}
