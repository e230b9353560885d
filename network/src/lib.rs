// SPDX-License-Identifier: MIT OR Apache-2.0

//! goboard network - shared rooms over framed JSON sockets
//!
//! This crate provides the multi-client side of goboard:
//! - Wire events and their length-prefixed codec
//! - Decoding events into game-tree commands and running them
//! - A middleware pipeline for debounce, auth and broadcast
//! - Rooms, their registry, idle timeouts and announcements
//! - Snapshot storage, remote SGF fetching and server config

#![deny(unsafe_code)]

pub mod codec;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod fetch;
pub mod loader;
pub mod password;
pub mod registry;
pub mod room;
pub mod server;

pub use config::{ServerConfig, StorageConfig};
pub use event::Event;
pub use fetch::{Fetcher, HttpFetcher};
pub use loader::{FileLoader, LoadJson, Loader, MemoryLoader, MessageJson};
pub use registry::{Announcement, RoomRegistry};
pub use room::plugin::{LiveFeedPlugin, LiveMove, Plugin};
pub use room::{Room, RoomSettings, RoomState};

/// Room identifier as sent in the join frame
pub type RoomId = String;
