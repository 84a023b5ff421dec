pub mod auth;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod middleware;
