pub mod connection;
pub mod relay;
pub mod rooms;

pub use relay::{Relay, RelayError};
pub use rooms::RoomRegistry;
