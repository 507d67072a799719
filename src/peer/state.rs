use crate::error::{Error, Result};
use crate::peer::types::Role;
use tracing::debug;

/// Шаги рукопожатия. Для каждой роли допустим только свой порядок.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    // offerer
    OfferCreated,
    AwaitingAnswer,
    Established,
    // answerer
    AwaitingOffer,
    AnswerCreated,
    Responded,
    // обе роли
    LocalSet,
    RemoteSet,
}

impl HandshakeState {
    pub fn name(self) -> &'static str {
        match self {
            HandshakeState::Idle => "Idle",
            HandshakeState::OfferCreated => "OfferCreated",
            HandshakeState::AwaitingAnswer => "AwaitingAnswer",
            HandshakeState::Established => "Established",
            HandshakeState::AwaitingOffer => "AwaitingOffer",
            HandshakeState::AnswerCreated => "AnswerCreated",
            HandshakeState::Responded => "Responded",
            HandshakeState::LocalSet => "LocalSet",
            HandshakeState::RemoteSet => "RemoteSet",
        }
    }
}

const OFFERER_PATH: [HandshakeState; 6] = [
    HandshakeState::Idle,
    HandshakeState::OfferCreated,
    HandshakeState::LocalSet,
    HandshakeState::AwaitingAnswer,
    HandshakeState::RemoteSet,
    HandshakeState::Established,
];

const ANSWERER_PATH: [HandshakeState; 6] = [
    HandshakeState::Idle,
    HandshakeState::AwaitingOffer,
    HandshakeState::RemoteSet,
    HandshakeState::AnswerCreated,
    HandshakeState::LocalSet,
    HandshakeState::Responded,
];

/// Машина состояний рукопожатия одной роли.
///
/// Переход разрешён только на следующий шаг пути роли, так что
/// `RemoteSet` у answerer'а всегда предшествует `AnswerCreated`,
/// а `LocalSet` у offerer'а предшествует `AwaitingAnswer`.
#[derive(Debug, Clone)]
pub struct HandshakeMachine {
    role: Role,
    step: usize,
    history: Vec<HandshakeState>,
}

impl HandshakeMachine {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            step: 0,
            history: vec![HandshakeState::Idle],
        }
    }

    fn path(&self) -> &'static [HandshakeState] {
        match self.role {
            Role::Offerer => &OFFERER_PATH,
            Role::Answerer => &ANSWERER_PATH,
        }
    }

    pub fn current(&self) -> HandshakeState {
        self.path()[self.step]
    }

    /// Все пройденные состояния, начиная с `Idle`
    pub fn history(&self) -> &[HandshakeState] {
        &self.history
    }

    /// Рукопожатие этой роли дошло до конца
    pub fn is_complete(&self) -> bool {
        self.step + 1 == self.path().len()
    }

    pub fn advance(&mut self, next: HandshakeState) -> Result<()> {
        let from = self.current();
        match self.path().get(self.step + 1) {
            Some(&expected) if expected == next => {
                self.step += 1;
                self.history.push(next);
                debug!(role = ?self.role, "handshake {} -> {}", from.name(), next.name());
                Ok(())
            }
            _ => Err(Error::InvalidTransition {
                from: from.name(),
                to: next.name(),
            }),
        }
    }
}
