pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use peer::{DataChannelBridge, NegotiationEngine, Role, SessionDescription, WebRtcEngine};
pub use session::{ConnectionEstablisher, Session};
pub use signaling::{AnswerSignaler, HttpSignalingClient, HttpSignalingServer, OfferSignaler};
