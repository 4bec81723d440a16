use std::sync::Arc;

use actix::prelude::*;
use actix_web_actors::ws;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::codec::Frame;
use crate::room::{AutoResponse, Disconnect, Inbound, Relay, RoomHandle, RoomRegistry, TransportFault};

// Close codes reported when the peer gave none.
const CLOSE_NO_STATUS: u16 = 1005;
const CLOSE_ABNORMAL: u16 = 1006;

#[derive(Debug)]
struct CloseInfo {
    code: u16,
    reason: String,
    was_clean: bool,
}

impl Default for CloseInfo {
    fn default() -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: String::new(),
            was_clean: false,
        }
    }
}

impl CloseInfo {
    fn from_frame(reason: Option<&ws::CloseReason>) -> Self {
        match reason {
            Some(reason) => Self {
                code: reason.code.into(),
                reason: reason.description.clone().unwrap_or_default(),
                was_clean: true,
            },
            None => Self {
                code: CLOSE_NO_STATUS,
                reason: String::new(),
                was_clean: true,
            },
        }
    }
}

/// One participant's websocket, bridged into its room's coordinator.
pub struct RelaySession {
    id: Uuid,
    participant: String,
    registry: RoomRegistry,
    room: RoomHandle,
    auto_response: Option<Arc<AutoResponse>>,
    mailbox_capacity: usize,
    close: CloseInfo,
}

impl RelaySession {
    pub fn new(
        participant: String,
        registry: RoomRegistry,
        room: RoomHandle,
        mailbox_capacity: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant,
            registry,
            room,
            auto_response: None,
            mailbox_capacity,
            close: CloseInfo::default(),
        }
    }

    /// Joins the room, holding back every other event until the coordinator answers.
    fn join(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let registry = self.registry.clone();
        let room = self.room.clone();
        let connection = self.id;
        let recipient = ctx.address().recipient();

        async move { registry.join(room, connection, recipient).await }
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok((room, joined)) => {
                        act.room = room;
                        act.auto_response = Some(joined.auto_response);
                    }
                    Err(e) => {
                        error!("Connection {} could not join room {}: {}", act.id, act.room.key(), e);
                        ctx.stop();
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn forward(&self, frame: Frame) {
        self.room.addr().do_send(Inbound {
            connection: self.id,
            frame,
        });
    }
}

impl Actor for RelaySession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "Connection {} (session {}) opened for room {}",
            self.id,
            self.participant,
            self.room.key()
        );
        ctx.set_mailbox_capacity(self.mailbox_capacity);
        self.join(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if self.auto_response.is_some() {
            self.room.addr().do_send(Disconnect {
                connection: self.id,
                code: self.close.code,
                reason: std::mem::take(&mut self.close.reason),
                was_clean: self.close.was_clean,
            });
        }
        info!("Connection {} (session {}) closed", self.id, self.participant);
    }
}

impl Handler<Relay> for RelaySession {
    type Result = ();

    fn handle(&mut self, msg: Relay, ctx: &mut Self::Context) {
        ctx.text(&*msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let reply = self
                    .auto_response
                    .as_ref()
                    .and_then(|responder| responder.reply_to(&text));
                match reply {
                    Some(reply) => ctx.text(reply),
                    None => self.forward(Frame::Text(text.to_string())),
                }
            }
            Ok(ws::Message::Binary(bin)) => {
                self.forward(Frame::Binary(bin));
            }
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) | Ok(ws::Message::Nop) => {}
            Ok(ws::Message::Continuation(_)) => {
                warn!("Ignoring fragmented frame on connection {}", self.id);
            }
            Ok(ws::Message::Close(reason)) => {
                self.close = CloseInfo::from_frame(reason.as_ref());
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                let fatal = !matches!(e, ws::ProtocolError::Io(_));
                self.room.addr().do_send(TransportFault {
                    connection: self.id,
                    error: e.to_string(),
                });
                // Io covers undecodable text and payload read errors; the frame is
                // already consumed and a dead payload ends the stream on its own.
                if fatal {
                    ctx.close(Some(ws::CloseCode::Protocol.into()));
                    ctx.stop();
                }
            }
        }
    }
}
