// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of live rooms, their idle heartbeats and server-wide
//! announcements

use crate::config::ServerConfig;
use crate::event::Event;
use crate::fetch::Fetcher;
use crate::loader::Loader;
use crate::room::{Room, RoomSettings};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// A message shown once to every connection until it expires
#[derive(Debug, Clone)]
pub struct Announcement {
    pub id: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
    notified: HashSet<String>,
}

impl Announcement {
    pub fn new(message: impl Into<String>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            expires_at: Utc::now() + ttl,
            notified: HashSet::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn event(&self) -> Event {
        Event::new("global", json!(self.message))
    }
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    config: ServerConfig,
    loader: Arc<dyn Loader>,
    fetcher: Arc<dyn Fetcher>,
    announcements: parking_lot::Mutex<Vec<Announcement>>,
}

impl RoomRegistry {
    pub fn new(config: ServerConfig, loader: Arc<dyn Loader>, fetcher: Arc<dyn Fetcher>) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            loader,
            fetcher,
            announcements: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn settings(&self) -> RoomSettings {
        RoomSettings::from(&self.config)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(id).cloned()
    }

    pub async fn room_ids(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Find a room, restoring it from storage or creating it if needed
    pub async fn get_or_create(self: &Arc<Self>, id: &str) -> Arc<Room> {
        if let Some(room) = self.get(id).await.filter(|r| !r.is_closed()) {
            return room;
        }
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(id).filter(|r| !r.is_closed()) {
            return room.clone();
        }

        let restored = match self.loader.load_room(id) {
            Ok(Some(saved)) => match Room::restore(&saved, self.settings(), self.fetcher.clone()) {
                Ok(room) => Some(room),
                Err(e) => {
                    tracing::warn!(room = %id, "Discarding unreadable snapshot: {e:#}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(room = %id, "Failed to load snapshot: {e:#}");
                None
            }
        };
        let room =
            restored.unwrap_or_else(|| Room::new(id, self.settings(), self.fetcher.clone()));
        rooms.insert(id.to_string(), room.clone());
        drop(rooms);

        self.spawn_heartbeat(room.clone());
        tracing::info!(room = %id, "room opened");
        room
    }

    /// Attach a connection: register it, send it the position and any
    /// live announcements, then tell everyone who is here
    pub async fn join(
        self: &Arc<Self>,
        room_id: &str,
        conn_id: &str,
    ) -> (Arc<Room>, mpsc::UnboundedReceiver<Event>) {
        let room = self.get_or_create(room_id).await;
        let rx = room.register_connection(conn_id).await;

        let pending: Vec<Event> = {
            let mut announcements = self.announcements.lock();
            announcements
                .iter_mut()
                .filter_map(|a| a.notified.insert(conn_id.to_string()).then(|| a.event()))
                .collect()
        };
        for evt in pending {
            room.send_to(conn_id, evt).await;
        }

        room.broadcast_user_list().await;
        (room, rx)
    }

    /// Forget a room and delete its snapshot
    pub async fn remove(&self, id: &str) {
        self.rooms.write().await.remove(id);
        if let Err(e) = self.loader.delete_room(id) {
            tracing::warn!(room = %id, "Failed to delete snapshot: {e:#}");
        }
    }

    fn spawn_heartbeat(self: &Arc<Self>, room: Arc<Room>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let every = Duration::from_secs(self.config.heartbeat_secs.max(1));
        let span = tracing::debug_span!("heartbeat", room = %room.id());
        tokio::spawn(heartbeat(registry, room, every).instrument(span))
    }

    /// Snapshot every room. Returns how many were saved.
    pub async fn save_all(&self) -> Result<usize> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut saved = 0;
        for room in rooms {
            let snapshot = room.save().await;
            match self.loader.save_room(&snapshot) {
                Ok(()) => saved += 1,
                Err(e) => tracing::error!(room = %room.id(), "Failed to save room: {e:#}"),
            }
        }
        tracing::debug!(saved, "saved rooms");
        Ok(saved)
    }

    /// Restore every stored room. Returns how many came back.
    pub async fn load_all(self: &Arc<Self>) -> Result<usize> {
        let stored = self.loader.load_all_rooms()?;
        let mut loaded = 0;
        for saved in stored {
            if self.get(&saved.id).await.is_some() {
                continue;
            }
            match Room::restore(&saved, self.settings(), self.fetcher.clone()) {
                Ok(room) => {
                    self.rooms.write().await.insert(saved.id.clone(), room.clone());
                    self.spawn_heartbeat(room);
                    loaded += 1;
                }
                Err(e) => tracing::warn!(room = %saved.id, "Skipping room: {e:#}"),
            }
        }
        tracing::info!(loaded, "restored rooms");
        Ok(loaded)
    }

    /// Pick up new announcements, drop expired ones and deliver the rest
    /// to anyone who has not seen them
    pub async fn poll_announcements(&self) -> Result<()> {
        let incoming = self.loader.load_messages()?;
        if !incoming.is_empty() {
            self.loader.delete_messages()?;
        }

        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let members = futures::future::join_all(rooms.into_iter().map(|room| async move {
            let ids = room.connection_ids().await;
            (room, ids)
        }))
        .await;

        let mut deliveries = Vec::new();
        {
            let mut announcements = self.announcements.lock();
            for msg in incoming {
                announcements.push(Announcement::new(msg.message, Duration::from_secs(msg.ttl)));
            }
            let now = Utc::now();
            announcements.retain(|a| !a.is_expired(now));

            for announcement in announcements.iter_mut() {
                for (room, ids) in &members {
                    for id in ids {
                        if announcement.notified.insert(id.clone()) {
                            deliveries.push((room.clone(), id.clone(), announcement.event()));
                        }
                    }
                }
            }
        }

        for (room, id, evt) in deliveries {
            room.send_to(&id, evt).await;
        }
        Ok(())
    }

    pub fn announcement_count(&self) -> usize {
        self.announcements.lock().len()
    }

    /// Poll for announcements forever
    pub fn spawn_announcements(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let every = Duration::from_secs(self.config.announcement_poll_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let Some(registry) = registry.upgrade() else { break };
                if let Err(e) = registry.poll_announcements().await {
                    tracing::warn!("Announcement poll failed: {e:#}");
                }
            }
        })
    }
}

/// Close the room once it has been idle past its timeout
async fn heartbeat(registry: Weak<RoomRegistry>, room: Arc<Room>, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        if room.is_closed() {
            break;
        }
        let timeout = room.timeout().await;
        let idle = room.idle_for();
        if idle < timeout {
            continue;
        }
        tracing::info!(room = %room.id(), idle_secs = idle.as_secs(), "room timed out");
        // unlist first so nobody joins a room that is about to close
        if let Some(registry) = registry.upgrade() {
            registry.remove(room.id()).await;
        }
        room.close().await;
        break;
    }
}
