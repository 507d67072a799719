pub mod connection;
pub mod data_channel;
pub mod engine;
pub mod state;
pub mod types;

pub use connection::{WebRtcChannel, WebRtcEngine};
pub use data_channel::{BridgeStats, DataChannelBridge};
pub use engine::{DataChannel, EngineEvent, EngineEvents, NegotiationEngine};
pub use state::{HandshakeMachine, HandshakeState};
pub use types::{
    ChannelInfo, ChannelState, ConnectionState, Role, SdpType, ServerConfig, SessionDescription,
};
