//! Client → server messages: connecting, input, and pings.

use serde::{Deserialize, Serialize};

use super::WireMessage;
use crate::MessageType;

/// First message a client sends on a new connection.
///
/// All three strings are expected to be non-empty. This layer carries
/// them as-is; the auth system behind the server validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequestMessage {
    pub player_id: String,
    /// Opaque token issued by the auth system.
    pub session_id: String,
    pub match_id: String,
}

impl WireMessage for ConnectRequestMessage {
    const MESSAGE_TYPE: MessageType = MessageType::ConnectRequest;
}

/// One frame of player input.
///
/// `tick` is the client's local tick when the input was sampled. The
/// server uses it for lag compensation; nothing here checks it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInputMessage {
    pub tick: u32,
    /// Expected in `-1.0..=1.0`. Not enforced on the wire.
    pub move_x: f32,
    /// Expected in `-1.0..=1.0`. Not enforced on the wire.
    pub move_y: f32,
    pub action1: bool,
    pub action2: bool,
    pub action3: bool,
    pub dodge: bool,
}

impl PlayerInputMessage {
    /// `true` if both movement axes are within `-1.0..=1.0`.
    ///
    /// NaN fails the check.
    pub fn move_in_range(&self) -> bool {
        (-1.0..=1.0).contains(&self.move_x) && (-1.0..=1.0).contains(&self.move_y)
    }
}

impl WireMessage for PlayerInputMessage {
    const MESSAGE_TYPE: MessageType = MessageType::PlayerInput;
}

/// Keep-alive and round-trip probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {
    /// Client clock at send time, in milliseconds.
    pub client_time_ms: u64,
}

impl WireMessage for PingMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Ping;
}
