//! Room module for the relay server
//!
//! One coordinator actor per room key owns the room's membership and
//! fans every decoded frame out to all members. The registry makes sure
//! each key maps to exactly one live coordinator.

mod auto_response;
mod coordinator;
mod registry;

pub use auto_response::{AutoResponse, KEEP_ALIVE_REQUEST, KEEP_ALIVE_RESPONSE};
pub use coordinator::{
    Connect, Disconnect, Inbound, Joined, Relay, RoomCoordinator, RoomStats, Stats, TransportFault,
};
pub use registry::{RoomHandle, RoomRegistry, RoomSettings};
