//! WebSocket module for the relay server
//!
//! The gateway admits upgrade requests on the multiplayer endpoint and
//! hands each accepted socket to a session actor bound to its room.

mod gateway;
mod session;

pub use gateway::{admit, validate, Admission};
pub use session::RelaySession;
