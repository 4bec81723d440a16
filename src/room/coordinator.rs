use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::auto_response::AutoResponse;
use super::registry::RoomRegistry;
use crate::codec::{self, Frame};
use crate::error::RoomError;

/// A canonical JSON frame delivered to one member.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Relay(pub Arc<str>);

/// Admits a connection into the room's membership.
#[derive(Message)]
#[rtype(result = "Result<Joined, RoomError>")]
pub struct Connect {
    pub connection: Uuid,
    pub recipient: Recipient<Relay>,
}

/// Reply to a successful [`Connect`].
#[derive(Debug)]
pub struct Joined {
    /// Room-wide responder the connection must apply before forwarding frames.
    pub auto_response: Arc<AutoResponse>,
}

/// A frame received from a member.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct Inbound {
    pub connection: Uuid,
    pub frame: Frame,
}

#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub connection: Uuid,
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

/// A transport-level error observed on a member's socket.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct TransportFault {
    pub connection: Uuid,
    pub error: String,
}

#[derive(Message)]
#[rtype(result = "RoomStats")]
pub struct Stats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub members: usize,
    pub relayed: u64,
    pub dropped: u64,
    pub failed_deliveries: u64,
    pub faults: u64,
}

/// Owns one room's membership and relays every decoded frame to all members.
///
/// All events for a room go through this actor's mailbox, so membership is
/// only ever touched by one handler at a time.
pub struct RoomCoordinator {
    key: Arc<str>,
    instance: Uuid,
    registry: RoomRegistry,
    members: HashMap<Uuid, Recipient<Relay>>,
    auto_response: Option<Arc<AutoResponse>>,
    idle_timeout: Option<Duration>,
    idle_timer: Option<SpawnHandle>,
    closing: bool,
    stats: RoomStats,
}

impl RoomCoordinator {
    pub fn new(
        key: Arc<str>,
        instance: Uuid,
        registry: RoomRegistry,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            key,
            instance,
            registry,
            members: HashMap::new(),
            auto_response: None,
            idle_timeout,
            idle_timer: None,
            closing: false,
            stats: RoomStats::default(),
        }
    }

    fn broadcast(&mut self, frame: Arc<str>) {
        for (connection, recipient) in &self.members {
            if let Err(e) = recipient.try_send(Relay(frame.clone())) {
                self.stats.failed_deliveries += 1;
                warn!("Failed to relay to connection {} in room {}: {}", connection, self.key, e);
            }
        }
    }

    fn schedule_eviction(&mut self, ctx: &mut Context<Self>) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };
        if let Some(handle) = self.idle_timer.take() {
            ctx.cancel_future(handle);
        }

        self.idle_timer = Some(ctx.run_later(timeout, move |act, ctx| {
            act.idle_timer = None;
            if !act.members.is_empty() {
                return;
            }
            act.closing = true;
            act.registry.evict(&act.key, act.instance);
            info!("Room {} idle for {:?}, evicting instance {}", act.key, timeout, act.instance);
            ctx.stop();
        }));
    }
}

impl Actor for RoomCoordinator {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Room {} started (instance {})", self.key, self.instance);
        self.schedule_eviction(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("Room {} stopped (instance {})", self.key, self.instance);
    }
}

impl Handler<Connect> for RoomCoordinator {
    type Result = Result<Joined, RoomError>;

    fn handle(&mut self, msg: Connect, ctx: &mut Self::Context) -> Self::Result {
        if self.closing {
            return Err(RoomError::Closing);
        }
        if let Some(handle) = self.idle_timer.take() {
            ctx.cancel_future(handle);
        }

        let auto_response = self
            .auto_response
            .get_or_insert_with(|| Arc::new(AutoResponse::keep_alive()))
            .clone();

        self.members.insert(msg.connection, msg.recipient);
        info!(
            "Connection {} joined room {} ({} members)",
            msg.connection,
            self.key,
            self.members.len()
        );

        Ok(Joined { auto_response })
    }
}

impl Handler<Inbound> for RoomCoordinator {
    type Result = ();

    fn handle(&mut self, msg: Inbound, _ctx: &mut Self::Context) {
        let Some(value) = codec::decode(&msg.frame) else {
            self.stats.dropped += 1;
            debug!("Dropped malformed frame from connection {} in room {}", msg.connection, self.key);
            return;
        };

        self.stats.relayed += 1;
        self.broadcast(Arc::from(codec::encode(&value)));
    }
}

impl Handler<Disconnect> for RoomCoordinator {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) {
        if self.members.remove(&msg.connection).is_none() {
            return;
        }
        info!(
            "Connection {} left room {} (code {}, reason {:?}, clean: {}), {} members remain",
            msg.connection,
            self.key,
            msg.code,
            msg.reason,
            msg.was_clean,
            self.members.len()
        );

        if self.members.is_empty() {
            self.schedule_eviction(ctx);
        }
    }
}

impl Handler<TransportFault> for RoomCoordinator {
    type Result = ();

    fn handle(&mut self, msg: TransportFault, _ctx: &mut Self::Context) {
        self.stats.faults += 1;
        error!("Transport error on connection {} in room {}: {}", msg.connection, self.key, msg.error);
    }
}

impl Handler<Stats> for RoomCoordinator {
    type Result = MessageResult<Stats>;

    fn handle(&mut self, _msg: Stats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(RoomStats {
            members: self.members.len(),
            ..self.stats
        })
    }
}
