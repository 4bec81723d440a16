use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::coordinator::{Connect, Joined, Relay, RoomCoordinator};
use crate::error::RoomError;

/// Times a join re-resolves its room after landing on a closing or stopped coordinator.
const JOIN_RETRIES: u8 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSettings {
    /// How long a room may sit with no members before it is evicted.
    /// `None` keeps rooms alive for the life of the process.
    pub idle_timeout: Option<Duration>,
}

/// Handle to the coordinator currently owning a room key.
#[derive(Clone)]
pub struct RoomHandle {
    key: Arc<str>,
    instance: Uuid,
    addr: Addr<RoomCoordinator>,
}

impl RoomHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }

    pub fn addr(&self) -> &Addr<RoomCoordinator> {
        &self.addr
    }
}

/// Maps room keys to their single live coordinator, starting one on first use.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    rooms: DashMap<Arc<str>, RoomHandle>,
    settings: RoomSettings,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                settings,
            }),
        }
    }

    /// Returns the coordinator for `key`, starting it if none exists or the
    /// mapped one has stopped.
    ///
    /// Must be called from within a running actix system.
    pub fn resolve(&self, key: &str) -> RoomHandle {
        if let Some(handle) = self.inner.rooms.get(key) {
            if handle.addr.connected() {
                return handle.value().clone();
            }
        }

        match self.inner.rooms.entry(Arc::from(key)) {
            Entry::Occupied(mut entry) => {
                if !entry.get().addr.connected() {
                    warn!(
                        "Room {} instance {} stopped without eviction, replacing it",
                        key,
                        entry.get().instance
                    );
                    entry.insert(self.spawn(key));
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry.insert(self.spawn(key)).value().clone(),
        }
    }

    /// Connects a member to `room`, moving to the key's current coordinator
    /// when `room` is closing or gone. Returns the handle actually joined.
    pub async fn join(
        &self,
        mut room: RoomHandle,
        connection: Uuid,
        recipient: Recipient<Relay>,
    ) -> Result<(RoomHandle, Joined), RoomError> {
        for attempt in 0..=JOIN_RETRIES {
            let connect = Connect {
                connection,
                recipient: recipient.clone(),
            };
            match room.addr.send(connect).await {
                Ok(Ok(joined)) => return Ok((room, joined)),
                Ok(Err(e)) => warn!(
                    "Room {} instance {} refused connection {}: {}",
                    room.key, room.instance, connection, e
                ),
                Err(e) => warn!(
                    "Room {} instance {} unreachable for connection {}: {}",
                    room.key, room.instance, connection, e
                ),
            }

            if attempt < JOIN_RETRIES {
                room = self.resolve(&room.key);
            }
        }

        Err(RoomError::Unavailable)
    }

    pub fn get(&self, key: &str) -> Option<RoomHandle> {
        self.inner.rooms.get(key).map(|handle| handle.value().clone())
    }

    /// Removes `key` only while it still maps to `instance`.
    pub fn evict(&self, key: &str, instance: Uuid) -> bool {
        self.inner
            .rooms
            .remove_if(key, |_, handle| handle.instance == instance)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rooms.is_empty()
    }

    fn spawn(&self, key: &str) -> RoomHandle {
        let key: Arc<str> = Arc::from(key);
        let instance = Uuid::new_v4();
        let addr = RoomCoordinator::new(
            key.clone(),
            instance,
            self.clone(),
            self.inner.settings.idle_timeout,
        )
        .start();
        info!("Created room {} (instance {})", key, instance);

        RoomHandle { key, instance, addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;
    use crate::room::coordinator::{Disconnect, Inbound, Stats};
    use crate::room::test_support::Collector;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[actix::test]
    async fn test_resolve_returns_same_instance() {
        let registry = RoomRegistry::new(RoomSettings::default());

        let first = registry.resolve("room1");
        let second = registry.resolve("room1");
        let other = registry.resolve("room2");

        assert_eq!(first.instance(), second.instance());
        assert_ne!(first.instance(), other.instance());
        assert_eq!(registry.len(), 2);
    }

    // Each thread runs its own actix system, so the resolves really overlap.
    #[test]
    fn test_concurrent_resolves_share_one_coordinator() {
        const THREADS: usize = 8;
        let registry = RoomRegistry::new(RoomSettings::default());
        let start = Arc::new(Barrier::new(THREADS));
        let done = Arc::new(Barrier::new(THREADS));

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = registry.clone();
                let start = start.clone();
                let done = done.clone();
                thread::spawn(move || {
                    System::new().block_on(async move {
                        start.wait();
                        let instance = registry.resolve("shared").instance();
                        // Keep every runtime, and so the winning coordinator, alive
                        // until all threads have resolved.
                        done.wait();
                        instance
                    })
                })
            })
            .collect();

        let instances: Vec<Uuid> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(instances.len(), THREADS);
        assert!(instances.iter().all(|id| *id == instances[0]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_replaces_stopped_coordinator() {
        let registry = RoomRegistry::new(RoomSettings::default());

        // The coordinator dies with the system that started it; its entry stays.
        let stale = {
            let registry = registry.clone();
            thread::spawn(move || System::new().block_on(async move { registry.resolve("room1") }))
                .join()
                .unwrap()
        };
        assert!(!stale.addr().connected());
        assert_eq!(registry.get("room1").map(|h| h.instance()), Some(stale.instance()));

        System::new().block_on(async {
            let fresh = registry.resolve("room1");

            assert_ne!(fresh.instance(), stale.instance());
            assert!(fresh.addr().connected());
            assert_eq!(registry.len(), 1);
            assert_eq!(registry.resolve("room1").instance(), fresh.instance());
            assert_eq!(fresh.addr().send(Stats).await.unwrap().members, 0);
        });
    }

    #[actix::test]
    async fn test_evict_ignores_stale_instance() {
        let registry = RoomRegistry::new(RoomSettings::default());
        let handle = registry.resolve("room1");

        assert!(!registry.evict("room1", Uuid::new_v4()));
        assert!(registry.get("room1").is_some());

        assert!(registry.evict("room1", handle.instance()));
        assert!(registry.is_empty());
    }

    #[actix::test]
    async fn test_idle_room_is_evicted() {
        let registry = RoomRegistry::new(RoomSettings {
            idle_timeout: Some(Duration::from_millis(50)),
        });
        let handle = registry.resolve("room1");
        let member = Collector::start_new();
        let connection = Uuid::new_v4();

        handle
            .addr()
            .send(Connect { connection, recipient: member.recipient() })
            .await
            .unwrap()
            .unwrap();
        handle.addr().do_send(Disconnect {
            connection,
            code: 1000,
            reason: String::new(),
            was_clean: true,
        });

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(registry.get("room1").is_none());
        assert!(!handle.addr().connected());
        assert_ne!(registry.resolve("room1").instance(), handle.instance());
    }

    #[actix::test]
    async fn test_rejoin_before_timeout_keeps_instance() {
        let registry = RoomRegistry::new(RoomSettings {
            idle_timeout: Some(Duration::from_millis(150)),
        });
        let handle = registry.resolve("room1");
        let member = Collector::start_new();
        let connection = Uuid::new_v4();

        handle
            .addr()
            .send(Connect { connection, recipient: member.clone().recipient() })
            .await
            .unwrap()
            .unwrap();
        handle.addr().do_send(Disconnect {
            connection,
            code: 1001,
            reason: String::new(),
            was_clean: true,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle
            .addr()
            .send(Connect { connection: Uuid::new_v4(), recipient: member.recipient() })
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(registry.resolve("room1").instance(), handle.instance());
        assert_eq!(handle.addr().send(Stats).await.unwrap().members, 1);
    }

    #[actix::test]
    async fn test_join_on_evicted_room_moves_to_fresh_coordinator() {
        let registry = RoomRegistry::new(RoomSettings {
            idle_timeout: Some(Duration::from_millis(50)),
        });
        let stale = registry.resolve("room1");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.get("room1").is_none());
        assert!(!stale.addr().connected());

        let member = Collector::start_new();
        let connection = Uuid::new_v4();
        let (room, joined) = registry
            .join(stale.clone(), connection, member.clone().recipient())
            .await
            .expect("join should follow the key to a fresh coordinator");

        assert_ne!(room.instance(), stale.instance());
        assert_eq!(registry.get("room1").map(|h| h.instance()), Some(room.instance()));
        assert_eq!(joined.auto_response.reply_to("yo"), Some("oy"));

        room.addr().do_send(Inbound {
            connection,
            frame: Frame::Text(r#"{"x":1}"#.to_string()),
        });
        let stats = room.addr().send(Stats).await.unwrap();

        assert_eq!(stats.members, 1);
        assert_eq!(Collector::drain(&member).await, vec![r#"{"x":1}"#.to_string()]);
    }
}
