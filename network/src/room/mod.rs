// SPDX-License-Identifier: MIT OR Apache-2.0

//! A room: one shared game tree and everyone looking at it.
//!
//! All reads and writes of the tree go through a single async mutex, so
//! decode, mutate, diff and broadcast happen atomically per event. Only the
//! debounce bookkeeping sits outside it, behind its own lightweight lock.

pub mod handlers;
pub mod plugin;

use crate::config::ServerConfig;
use crate::dispatch::Activity;
use crate::event::Event;
use crate::fetch::Fetcher;
use crate::loader::LoadJson;
use crate::password;
use anyhow::{Context, Result};
use goboard_core::{GameError, GameTree, TreeJsonType};
use plugin::{LiveMove, Plugin};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};

/// Board size for rooms nobody has configured yet
pub const DEFAULT_BOARD_SIZE: u8 = 19;

/// Per-room timing knobs, taken from the server config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    pub input_buffer_ms: u64,
    pub user_buffer_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RoomSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            input_buffer_ms: config.input_buffer_ms,
            user_buffer_ms: config.user_buffer_ms,
            timeout_secs: config.room_timeout_secs,
        }
    }
}

/// Everything guarded by the room lock
pub struct RoomState {
    pub id: String,
    pub tree: GameTree,
    /// Outbound queue per connection id
    pub conns: HashMap<String, mpsc::UnboundedSender<Event>>,
    pub nicks: HashMap<String, String>,
    /// Connections that have passed the password
    pub auth: HashSet<String>,
    /// Password hash, empty when the room is open
    pub password: String,
    pub activity: Arc<parking_lot::Mutex<Activity>>,
    /// Minimum gap between two events from the same user
    pub user_buffer: Duration,
    plugins: HashMap<String, Box<dyn Plugin>>,
    pending_fetch: Option<Result<String, String>>,
}

impl RoomState {
    pub fn new(id: &str, size: u8, settings: RoomSettings) -> Self {
        let mut tree = GameTree::new(size);
        tree.set_input_buffer(settings.input_buffer_ms);
        tree.set_timeout(settings.timeout_secs);
        Self {
            id: id.to_string(),
            tree,
            conns: HashMap::new(),
            nicks: HashMap::new(),
            auth: HashSet::new(),
            password: String::new(),
            activity: Arc::new(parking_lot::Mutex::new(Activity::new())),
            user_buffer: Duration::from_millis(settings.user_buffer_ms),
            plugins: HashMap::new(),
            pending_fetch: None,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn is_authorized(&self, user: &str) -> bool {
        !self.has_password() || self.auth.contains(user)
    }

    pub fn check_password(&self, attempt: &str) -> bool {
        password::verify(attempt, &self.password)
    }

    /// Hash and store `plain`; an empty string opens the room
    pub fn set_password(&mut self, plain: &str) {
        self.password = if plain.is_empty() {
            String::new()
        } else {
            password::hash(plain)
        };
    }

    /// Clear everyone currently connected
    pub fn set_auth_all(&mut self) {
        self.auth.extend(self.conns.keys().cloned());
    }

    pub fn send_to(&self, id: &str, evt: Event) {
        if let Some(tx) = self.conns.get(id) {
            if tx.send(evt).is_err() {
                tracing::debug!(conn = %id, "send to closed connection");
            }
        }
    }

    pub fn broadcast(&self, evt: &Event) {
        for (id, tx) in &self.conns {
            if tx.send(evt.clone()).is_err() {
                tracing::debug!(conn = %id, "broadcast to closed connection");
            }
        }
    }

    pub fn full_frame_event(&self) -> Event {
        Event::frame(&self.tree.full_frame(TreeJsonType::Full))
    }

    pub fn broadcast_full_frame(&self) {
        self.broadcast(&self.full_frame_event());
    }

    pub fn user_list(&self) -> Event {
        Event::new("connected_users", json!(self.nicks))
    }

    pub fn broadcast_user_list(&self) {
        self.broadcast(&self.user_list());
    }

    /// Swap in a new tree, keeping the room's timing settings
    pub fn replace_tree(&mut self, mut tree: GameTree) {
        tree.set_input_buffer(self.tree.input_buffer());
        tree.set_timeout(self.tree.timeout());
        self.tree = tree;
    }

    /// Replace the tree with a parsed record. On error the old tree stays.
    pub fn load_sgf(&mut self, text: &str) -> std::result::Result<(), GameError> {
        let tree = GameTree::from_sgf(text)?;
        self.replace_tree(tree);
        Ok(())
    }

    /// Start `plugin` under `key`, ending whatever ran there before
    pub fn register_plugin(&mut self, key: &str, mut plugin: Box<dyn Plugin>, args: &Value) {
        self.deregister_plugin(key);
        plugin.start(args);
        self.plugins.insert(key.to_string(), plugin);
    }

    pub fn deregister_plugin(&mut self, key: &str) {
        if let Some(mut old) = self.plugins.remove(key) {
            old.end();
        }
    }

    pub fn has_plugin(&self, key: &str) -> bool {
        self.plugins.contains_key(key)
    }

    pub fn end_plugins(&mut self) {
        for (key, mut plugin) in self.plugins.drain() {
            tracing::debug!(room = %self.id, %key, "ending plugin");
            plugin.end();
        }
    }

    pub(crate) fn take_fetch(&mut self) -> Option<Result<String, String>> {
        self.pending_fetch.take()
    }

    fn push_head(&mut self, mv: LiveMove) {
        self.tree.push_head(mv.coord, mv.color);
        // a live game counts as activity but does not take the board
        self.activity.lock().last_active = Instant::now();
        self.broadcast_full_frame();
    }

    pub fn save(&self) -> LoadJson {
        LoadJson {
            id: self.id.clone(),
            state: self.tree.save(),
            password: self.password.clone(),
        }
    }
}

pub struct Room {
    id: String,
    state: Mutex<RoomState>,
    activity: Arc<parking_lot::Mutex<Activity>>,
    closed: watch::Sender<bool>,
    fetcher: Arc<dyn Fetcher>,
}

impl Room {
    pub fn new(id: &str, settings: RoomSettings, fetcher: Arc<dyn Fetcher>) -> Arc<Self> {
        Self::from_state(RoomState::new(id, DEFAULT_BOARD_SIZE, settings), fetcher)
    }

    /// Rebuild a room from its snapshot
    pub fn restore(saved: &LoadJson, settings: RoomSettings, fetcher: Arc<dyn Fetcher>) -> Result<Arc<Self>> {
        let tree = GameTree::load(&saved.state)
            .with_context(|| format!("Failed to restore room {}", saved.id))?;
        let mut state = RoomState::new(&saved.id, tree.size(), settings);
        state.tree = tree;
        state.tree.set_timeout(settings.timeout_secs);
        state.password = saved.password.clone();
        Ok(Self::from_state(state, fetcher))
    }

    fn from_state(state: RoomState, fetcher: Arc<dyn Fetcher>) -> Arc<Self> {
        let (closed, _) = watch::channel(false);
        Arc::new(Self {
            id: state.id.clone(),
            activity: state.activity.clone(),
            state: Mutex::new(state),
            closed,
            fetcher,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exclusive access to the room state
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    /// Run one inbound event through its pipeline
    #[tracing::instrument(level = "debug", skip(self, evt), fields(room = %self.id, event = %evt.event))]
    pub async fn handle(&self, conn_id: &str, mut evt: Event) {
        evt.userid = conn_id.to_string();
        // network fetches happen before the lock is taken
        let fetched = if evt.event == "request_sgf" {
            Some(self.fetch_requested(&evt.value).await)
        } else {
            None
        };

        let handler = handlers::handler_for(&evt.event);
        let mut state = self.state.lock().await;
        state.pending_fetch = fetched;
        let out = handler(&mut *state, evt);
        state.pending_fetch = None;
        tracing::trace!(reply = %out.event, "handled");
    }

    async fn fetch_requested(&self, value: &Value) -> Result<String, String> {
        let url = value
            .as_str()
            .ok_or_else(|| "request_sgf expects a URL".to_string())?;
        let body = self.fetcher.fetch(url).await.map_err(|e| format!("{e:#}"))?;
        if body == "Permission denied" {
            return Err("Error fetching SGF. Is it a private game?".to_string());
        }
        Ok(body)
    }

    /// Add a connection and send it the current position
    pub async fn register_connection(&self, id: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        state.conns.insert(id.to_string(), tx);
        state.nicks.insert(id.to_string(), String::new());
        self.activity.lock().last_user = id.to_string();
        let frame = state.full_frame_event();
        state.send_to(id, frame);
        tracing::info!(room = %self.id, conn = %id, "connection joined");
        rx
    }

    pub async fn deregister_connection(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.conns.remove(id);
        state.nicks.remove(id);
        state.auth.remove(id);
        self.activity.lock().last_messages.remove(id);
        state.broadcast_user_list();
        tracing::info!(room = %self.id, conn = %id, "connection left");
    }

    pub async fn broadcast_user_list(&self) {
        self.state.lock().await.broadcast_user_list();
    }

    pub async fn send_to(&self, id: &str, evt: Event) {
        self.state.lock().await.send_to(id, evt);
    }

    pub async fn connection_ids(&self) -> Vec<String> {
        self.state.lock().await.conns.keys().cloned().collect()
    }

    /// Apply a move from a live feed and show it to everyone
    pub async fn push_head(&self, mv: LiveMove) {
        self.state.lock().await.push_head(mv);
    }

    /// As [`Room::push_head`], unless `stop` was raised while waiting for
    /// the lock
    pub(crate) async fn push_live(&self, mv: LiveMove, stop: &AtomicBool) -> bool {
        let mut state = self.state.lock().await;
        if stop.load(Ordering::Acquire) {
            return false;
        }
        state.push_head(mv);
        true
    }

    pub async fn register_plugin(&self, key: &str, plugin: Box<dyn Plugin>, args: &Value) {
        self.state.lock().await.register_plugin(key, plugin, args);
    }

    pub async fn deregister_plugin(&self, key: &str) {
        self.state.lock().await.deregister_plugin(key);
    }

    pub async fn save(&self) -> LoadJson {
        self.state.lock().await.save()
    }

    pub async fn to_sgf(&self) -> String {
        self.state.lock().await.tree.to_sgf(false)
    }

    /// Time since anyone last acted
    pub fn idle_for(&self) -> Duration {
        self.activity.lock().last_active.elapsed()
    }

    pub async fn timeout(&self) -> Duration {
        Duration::from_secs(self.state.lock().await.tree.timeout())
    }

    /// Drop every connection and stop plugins. Readers watching
    /// [`Room::subscribe_closed`] wake up.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.end_plugins();
        state.conns.clear();
        self.closed.send_replace(true);
        tracing::info!(room = %self.id, "room closed");
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn subscribe_closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
