//! Voice transport engines

pub mod reconnect;
pub mod socket;

pub use reconnect::ReconnectPolicy;
pub use socket::{
    VoiceCommands, VoiceSocketClient, CONNECTION_ERROR, INVALID_ENDPOINT_ERROR, MAX_RECONNECT_ERROR,
};
