// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room snapshot storage and the announcement inbox.
//!
//! The registry only talks to storage through the [`Loader`] trait.
//! [`MemoryLoader`] keeps everything in process; [`FileLoader`] keeps one
//! JSON file per room under a directory.

use anyhow::{Context, Result};
use goboard_core::StateJson;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A persisted room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadJson {
    pub id: String,
    #[serde(flatten)]
    pub state: StateJson,
    /// Hash of the room password, empty when unprotected
    #[serde(default)]
    pub password: String,
}

/// An announcement waiting to be picked up. `ttl` is in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageJson {
    pub message: String,
    pub ttl: u64,
}

pub trait Loader: Send + Sync {
    fn save_room(&self, room: &LoadJson) -> Result<()>;
    fn load_room(&self, id: &str) -> Result<Option<LoadJson>>;
    fn load_all_rooms(&self) -> Result<Vec<LoadJson>>;
    fn delete_room(&self, id: &str) -> Result<()>;
    fn load_messages(&self) -> Result<Vec<MessageJson>>;
    fn delete_messages(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryLoader {
    rooms: Mutex<HashMap<String, LoadJson>>,
    messages: Mutex<Vec<MessageJson>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an announcement for the next poll
    pub fn push_message(&self, message: impl Into<String>, ttl: u64) {
        self.messages.lock().push(MessageJson {
            message: message.into(),
            ttl,
        });
    }
}

impl Loader for MemoryLoader {
    fn save_room(&self, room: &LoadJson) -> Result<()> {
        self.rooms.lock().insert(room.id.clone(), room.clone());
        Ok(())
    }

    fn load_room(&self, id: &str) -> Result<Option<LoadJson>> {
        Ok(self.rooms.lock().get(id).cloned())
    }

    fn load_all_rooms(&self) -> Result<Vec<LoadJson>> {
        Ok(self.rooms.lock().values().cloned().collect())
    }

    fn delete_room(&self, id: &str) -> Result<()> {
        self.rooms.lock().remove(id);
        Ok(())
    }

    fn load_messages(&self) -> Result<Vec<MessageJson>> {
        Ok(self.messages.lock().clone())
    }

    fn delete_messages(&self) -> Result<()> {
        self.messages.lock().clear();
        Ok(())
    }
}

/// Stores `rooms/<hex id>.json` and `messages.json` under a directory
#[derive(Debug, Clone)]
pub struct FileLoader {
    dir: PathBuf,
}

impl FileLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join("rooms"))
            .with_context(|| format!("Failed to create storage directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn rooms_dir(&self) -> PathBuf {
        self.dir.join("rooms")
    }

    // room ids come from clients, so they never reach the filesystem raw
    fn room_path(&self, id: &str) -> PathBuf {
        self.rooms_dir().join(format!("{}.json", hex::encode(id)))
    }

    fn messages_path(&self) -> PathBuf {
        self.dir.join("messages.json")
    }

    fn read_room(path: &Path) -> Result<LoadJson> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read room file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse room file: {}", path.display()))
    }
}

impl Loader for FileLoader {
    fn save_room(&self, room: &LoadJson) -> Result<()> {
        let path = self.room_path(&room.id);
        let content = serde_json::to_string(room).context("Failed to serialize room")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write room file: {}", path.display()))
    }

    fn load_room(&self, id: &str) -> Result<Option<LoadJson>> {
        let path = self.room_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_room(&path).map(Some)
    }

    fn load_all_rooms(&self) -> Result<Vec<LoadJson>> {
        let mut rooms = Vec::new();
        let entries = fs::read_dir(self.rooms_dir()).context("Failed to list room files")?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_room(&path) {
                Ok(room) => rooms.push(room),
                Err(e) => tracing::warn!("Skipping unreadable room file: {e:#}"),
            }
        }
        Ok(rooms)
    }

    fn delete_room(&self, id: &str) -> Result<()> {
        let path = self.room_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete room file: {}", path.display()))?;
        }
        Ok(())
    }

    fn load_messages(&self) -> Result<Vec<MessageJson>> {
        let path = self.messages_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).context("Failed to read messages file")?;
        serde_json::from_str(&content).context("Failed to parse messages file")
    }

    fn delete_messages(&self) -> Result<()> {
        let path = self.messages_path();
        if path.exists() {
            fs::remove_file(&path).context("Failed to delete messages file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goboard_core::GameTree;
    use tempfile::tempdir;

    fn sample(id: &str) -> LoadJson {
        LoadJson {
            id: id.to_string(),
            state: GameTree::new(9).save(),
            password: String::new(),
        }
    }

    #[test]
    fn load_json_is_flat() {
        let json = serde_json::to_value(sample("r")).unwrap();
        for key in ["id", "sgf", "loc", "prefs", "buffer", "next_index", "password"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn memory_loader_messages_drain() -> Result<()> {
        let loader = MemoryLoader::new();
        loader.push_message("maintenance at noon", 60);
        assert_eq!(loader.load_messages()?.len(), 1);
        loader.delete_messages()?;
        assert!(loader.load_messages()?.is_empty());
        Ok(())
    }

    #[test]
    fn file_loader_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let loader = FileLoader::new(dir.path())?;
        let room = sample("../escape");
        loader.save_room(&room)?;
        assert_eq!(loader.load_room("../escape")?, Some(room.clone()));
        assert_eq!(loader.load_all_rooms()?, vec![room]);

        loader.delete_room("../escape")?;
        assert!(loader.load_room("../escape")?.is_none());
        assert!(loader.load_all_rooms()?.is_empty());
        Ok(())
    }

    #[test]
    fn file_loader_messages() -> Result<()> {
        let dir = tempdir()?;
        let loader = FileLoader::new(dir.path())?;
        assert!(loader.load_messages()?.is_empty());
        let msgs = vec![MessageJson {
            message: "hello".into(),
            ttl: 5,
        }];
        fs::write(dir.path().join("messages.json"), serde_json::to_string(&msgs)?)?;
        assert_eq!(loader.load_messages()?, msgs);
        loader.delete_messages()?;
        assert!(loader.load_messages()?.is_empty());
        Ok(())
    }
}
