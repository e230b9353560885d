// SPDX-License-Identifier: MIT OR Apache-2.0

//! External feeds attached to a room.
//!
//! A plugin is started with free-form arguments and ended explicitly. It
//! may only change the room through the room's own locked entry points.

use super::Room;
use goboard_core::PatternMove;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// A move arriving from a live game
pub type LiveMove = PatternMove;

pub trait Plugin: Send {
    fn start(&mut self, args: &Value);
    fn end(&mut self);
}

/// Replays moves from a channel onto the room's head
pub struct LiveFeedPlugin {
    room: Weak<Room>,
    moves: Option<mpsc::Receiver<LiveMove>>,
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl LiveFeedPlugin {
    /// The plugin and the sender that feeds it
    pub fn new(room: &Arc<Room>, capacity: usize) -> (Self, mpsc::Sender<LiveMove>) {
        let (tx, rx) = mpsc::channel(capacity);
        let plugin = Self {
            room: Arc::downgrade(room),
            moves: Some(rx),
            stop: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            task: None,
        };
        (plugin, tx)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Plugin for LiveFeedPlugin {
    fn start(&mut self, args: &Value) {
        let Some(mut moves) = self.moves.take() else {
            tracing::warn!("live feed already started");
            return;
        };
        let key = args
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or("live")
            .to_string();
        let room = self.room.clone();
        let stop = self.stop.clone();
        let wake = self.wake.clone();

        self.task = Some(tokio::spawn(async move {
            loop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let next = tokio::select! {
                    mv = moves.recv() => mv,
                    _ = wake.notified() => continue,
                };
                let Some(mv) = next else { break };
                let Some(room) = room.upgrade() else { break };
                if !room.push_live(mv, &stop).await {
                    break;
                }
            }
            tracing::debug!(%key, "live feed stopped");
        }));
    }

    fn end(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.wake.notify_one();
    }
}

impl Drop for LiveFeedPlugin {
    fn drop(&mut self) {
        self.end();
    }
}
