use serde::{Deserialize, Serialize};

/// The chat payload as it travels over the gateway. Relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub room: String,
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayCommand {
    /// Become a member of a room. No reply.
    Join { username: String, room: String },

    /// Persist a message and relay it to the room.
    Message(ChatPayload),
}

/// Events sent FROM server TO client over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A message was stored and is being relayed to the room
    ReceiveMessage(ChatPayload),

    /// The connection's last command could not be carried out
    Error { reason: String },
}
