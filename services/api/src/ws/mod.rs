//! WebSocket Classroom Sessions
//!
//! - `protocol`: the plain-text frame contract between client and server.
//! - `session`: the connection lifecycle and the streamed lecture loop.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
