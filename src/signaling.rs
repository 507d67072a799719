//! Обмен описаниями сессии через HTTP: один POST, один ответ.
//!
//! Offerer отправляет offer и ждёт answer в теле ответа. Answerer держит
//! HTTP запрос открытым, пока не будет готов answer.

use crate::error::{Error, Result};
use crate::peer::types::SessionDescription;
use crate::utils::{bind_address, signaling_url};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Сторона offerer: отправить своё описание и получить описание пира
#[async_trait]
pub trait OfferSignaler: Send + Sync {
    async fn send(&self, description: &SessionDescription) -> Result<SessionDescription>;
}

/// Сторона answerer: принять одно описание и ответить ровно один раз
#[async_trait]
pub trait AnswerSignaler: Send {
    async fn receive(&mut self) -> Result<PendingExchange>;
}

/// Принятое описание, на которое ещё не ответили.
///
/// `respond` поглощает обмен, так что ответить дважды нельзя. Если обмен
/// уничтожен без ответа, запрашивающая сторона получает ошибку.
#[derive(Debug)]
pub struct PendingExchange {
    description: SessionDescription,
    reply: oneshot::Sender<SessionDescription>,
}

impl PendingExchange {
    pub fn new(
        description: SessionDescription,
    ) -> (Self, oneshot::Receiver<SessionDescription>) {
        let (reply, rx) = oneshot::channel();
        (Self { description, reply }, rx)
    }

    pub fn description(&self) -> &SessionDescription {
        &self.description
    }

    pub fn respond(self, description: SessionDescription) -> Result<()> {
        self.reply
            .send(description)
            .map_err(|_| Error::Transport("peer went away before the answer was sent".into()))
    }
}

// ========== CLIENT (offerer) ==========

/// HTTP клиент сигналинга
#[derive(Debug, Clone)]
pub struct HttpSignalingClient {
    http: reqwest::Client,
    url: String,
}

impl HttpSignalingClient {
    pub fn new(address: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            url: signaling_url(address)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OfferSignaler for HttpSignalingClient {
    async fn send(&self, description: &SessionDescription) -> Result<SessionDescription> {
        let body = serde_json::to_vec(description)?;
        debug!("POST {} ({} bytes)", self.url, body.len());

        let resp = self
            .http
            .post(&self.url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "signaling peer answered {status}"
            )));
        }

        let bytes = resp.bytes().await?;
        let answer: SessionDescription = serde_json::from_slice(&bytes)?;
        debug!("received {} description ({} bytes)", answer.kind, bytes.len());
        Ok(answer)
    }
}

// ========== SERVER (answerer) ==========

type Inbound = Result<PendingExchange>;

/// Точка встречи на один обмен. Отправитель забирается первым запросом.
struct ExchangeSlot {
    tx: Mutex<Option<mpsc::Sender<Inbound>>>,
}

impl ExchangeSlot {
    fn claim(&self) -> Option<mpsc::Sender<Inbound>> {
        match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        }
    }
}

/// HTTP сервер сигналинга. Слушает, пока не отменён токен или не уничтожен.
pub struct HttpSignalingServer {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<Inbound>,
    shutdown: CancellationToken,
}

impl HttpSignalingServer {
    pub async fn bind(address: &str, cancel: &CancellationToken) -> Result<Self> {
        let bind = bind_address(address)?;
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .map_err(|e| Error::Transport(format!("bind {bind}: {e}")))?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(1);
        let slot = Arc::new(ExchangeSlot {
            tx: Mutex::new(Some(tx)),
        });
        let app = Router::new()
            .route("/", post(handle_description))
            .with_state(slot);

        let shutdown = cancel.child_token();
        let serve_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
                .await;
            if let Err(e) = res {
                warn!("signaling server stopped: {e}");
            }
        });

        info!("Listening on {local_addr}");
        Ok(Self {
            local_addr,
            rx,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Остановить прослушивание
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for HttpSignalingServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl AnswerSignaler for HttpSignalingServer {
    async fn receive(&mut self) -> Result<PendingExchange> {
        match self.rx.recv().await {
            Some(inbound) => inbound,
            None => Err(Error::Transport(
                "signaling exchange already consumed".into(),
            )),
        }
    }
}

async fn handle_description(State(slot): State<Arc<ExchangeSlot>>, body: Bytes) -> Response {
    let Some(tx) = slot.claim() else {
        warn!("rejecting signaling request: exchange already used");
        return (StatusCode::CONFLICT, "signaling exchange already used").into_response();
    };

    let description: SessionDescription = match serde_json::from_slice(&body) {
        Ok(d) => d,
        Err(e) => {
            warn!("malformed signaling payload: {e}");
            let _ = tx.send(Err(Error::Decode(e.to_string()))).await;
            return (StatusCode::BAD_REQUEST, "malformed session description").into_response();
        }
    };
    debug!("received {} description ({} bytes)", description.kind, body.len());

    let (exchange, reply) = PendingExchange::new(description);
    if tx.send(Ok(exchange)).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "answerer is gone").into_response();
    }

    match reply.await {
        Ok(answer) => Json(answer).into_response(),
        Err(_) => {
            warn!("exchange dropped without an answer");
            (StatusCode::INTERNAL_SERVER_ERROR, "no answer was produced").into_response()
        }
    }
}
