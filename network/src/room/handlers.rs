// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal handlers and the chain each event type runs through

use super::RoomState;
use crate::command::{self, Command};
use crate::dispatch::{
    authorized, broadcast_after, broadcast_connected_users_after, broadcast_full_frame_after,
    chain, end_live_feed, handler, log, outside_buffer, set_time_after, slow, Handler,
};
use crate::event::Event;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use goboard_core::{sgf, GameTree, MAX_BOARD_SIZE};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read};

static HANDLERS: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Handler> = HashMap::new();
    m.insert("isprotected", handler(is_protected));
    m.insert("checkpassword", handler(check_password));
    m.insert("debug", handler(reply_to_sender));
    m.insert("ping", handler(reply_to_sender));
    m.insert(
        "upload_sgf",
        chain(
            handler(upload_sgf),
            &[outside_buffer, authorized, log, end_live_feed, broadcast_after],
        ),
    );
    m.insert(
        "request_sgf",
        chain(
            handler(request_sgf),
            &[outside_buffer, authorized, log, end_live_feed, broadcast_after],
        ),
    );
    m.insert(
        "trash",
        chain(
            handler(trash),
            &[outside_buffer, authorized, end_live_feed, broadcast_after],
        ),
    );
    m.insert(
        "update_nickname",
        chain(handler(update_nickname), &[broadcast_after]),
    );
    m.insert(
        "update_settings",
        chain(
            handler(update_settings),
            &[
                authorized,
                broadcast_connected_users_after,
                broadcast_after,
                broadcast_full_frame_after,
            ],
        ),
    );
    m.insert(
        "add_stone",
        chain(
            handler(board_event),
            &[outside_buffer, authorized, slow, broadcast_after, set_time_after],
        ),
    );
    m.insert(
        "graft",
        chain(
            handler(board_event),
            &[outside_buffer, authorized, broadcast_full_frame_after],
        ),
    );
    m
});

static DEFAULT: Lazy<Handler> = Lazy::new(|| {
    chain(
        handler(board_event),
        &[outside_buffer, authorized, broadcast_after, set_time_after],
    )
});

/// The pipeline for an event type
pub fn handler_for(event: &str) -> &'static Handler {
    HANDLERS.get(event).unwrap_or(&*DEFAULT)
}

/// Tell the sender what went wrong; nobody else hears about it
fn reject(state: &RoomState, user: &str, message: impl Into<String>) -> Event {
    state.send_to(user, Event::error(message).with_user(user));
    Event::nop()
}

fn is_protected(state: &mut RoomState, evt: Event) -> Event {
    let reply = Event::new("isprotected", json!(state.has_password())).with_user(&evt.userid);
    state.send_to(&evt.userid, reply);
    Event::nop()
}

fn check_password(state: &mut RoomState, mut evt: Event) -> Event {
    let attempt = evt.value.as_str().unwrap_or_default();
    if state.check_password(attempt) {
        state.auth.insert(evt.userid.clone());
    } else {
        evt.value = json!("");
    }
    state.send_to(&evt.userid.clone(), evt);
    Event::nop()
}

fn reply_to_sender(state: &mut RoomState, evt: Event) -> Event {
    state.send_to(&evt.userid.clone(), evt);
    Event::nop()
}

/// Total bytes an uploaded archive may expand to
const MAX_UNZIPPED: u64 = 32 * 1024 * 1024;

fn decode_base64(v: &Value) -> Result<Vec<u8>, String> {
    let text = v.as_str().ok_or("upload_sgf expects base64 text")?;
    STANDARD
        .decode(text)
        .map_err(|e| format!("Error decoding upload: {e}"))
}

fn utf8(bytes: Vec<u8>) -> Result<String, String> {
    String::from_utf8(bytes).map_err(|e| format!("Error decoding upload: {e}"))
}

fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes.starts_with(b"PK")
}

/// Every file in a zip archive, as text. Entries that cannot be read are
/// skipped.
fn unzip_sgfs(bytes: &[u8]) -> Result<Vec<String>, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("Error reading zip: {e}"))?;
    let mut budget = MAX_UNZIPPED;
    let mut files = Vec::new();
    for i in 0..archive.len() {
        let Ok(entry) = archive.by_index(i) else {
            continue;
        };
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        if let Err(e) = entry.take(budget + 1).read_to_end(&mut data) {
            tracing::debug!("skipping zip entry {i}: {e}");
            continue;
        }
        let len = data.len() as u64;
        if len > budget {
            return Err("Error reading zip: archive is too large".to_string());
        }
        budget -= len;
        files.push(String::from_utf8_lossy(&data).into_owned());
    }
    Ok(files)
}

/// One base64 string, which may hold a zip of records, or an array of
/// them. Several records are merged.
fn decode_upload(value: &Value) -> Result<String, String> {
    match value {
        Value::Array(items) => {
            let sgfs = items
                .iter()
                .map(|v| decode_base64(v).and_then(utf8))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sgf::merge(&sgfs))
        }
        other => {
            let bytes = decode_base64(other)?;
            if is_zip(&bytes) {
                Ok(sgf::merge(&unzip_sgfs(&bytes)?))
            } else {
                utf8(bytes)
            }
        }
    }
}

/// Replace the tree with `text`, leaving it untouched if parsing fails
fn replace_from_sgf(state: &mut RoomState, user: &str, text: &str) -> Event {
    match state.load_sgf(text) {
        Ok(()) => state.full_frame_event().with_user(user),
        Err(e) => reject(state, user, format!("Error parsing SGF: {e}")),
    }
}

fn upload_sgf(state: &mut RoomState, evt: Event) -> Event {
    match decode_upload(&evt.value) {
        Ok(text) => replace_from_sgf(state, &evt.userid, &text),
        Err(message) => reject(state, &evt.userid, message),
    }
}

/// The fetch itself runs before the room lock is taken
fn request_sgf(state: &mut RoomState, evt: Event) -> Event {
    match state.take_fetch() {
        Some(Ok(text)) => replace_from_sgf(state, &evt.userid, &text),
        Some(Err(message)) => reject(state, &evt.userid, message),
        None => reject(state, &evt.userid, "nothing was fetched"),
    }
}

fn trash(state: &mut RoomState, evt: Event) -> Event {
    let size = state.tree.size();
    state.replace_tree(GameTree::new(size));
    state.full_frame_event().with_user(evt.userid)
}

fn update_nickname(state: &mut RoomState, evt: Event) -> Event {
    let Some(nick) = evt.value.as_str() else {
        return reject(state, &evt.userid, "update_nickname expects a string");
    };
    state.nicks.insert(evt.userid.clone(), nick.to_string());
    state.user_list().with_user(evt.userid)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    /// Absent keeps the room's current input buffer
    buffer: Option<u64>,
    size: u8,
    nickname: String,
    black: String,
    white: String,
    komi: String,
    password: String,
}

fn update_settings(state: &mut RoomState, mut evt: Event) -> Event {
    let settings: Settings = match serde_json::from_value(evt.value.clone()) {
        Ok(s) => s,
        Err(e) => return reject(state, &evt.userid, format!("bad settings: {e}")),
    };
    let size = if settings.size == 0 {
        state.tree.size()
    } else {
        settings.size
    };
    if size > MAX_BOARD_SIZE {
        return reject(state, &evt.userid, format!("invalid board size: {size}"));
    }

    if let Some(buffer) = settings.buffer {
        state.tree.set_input_buffer(buffer);
    }
    if size != state.tree.size() {
        state.replace_tree(GameTree::new(size));
    }

    for (key, value) in [
        ("PB", &settings.black),
        ("PW", &settings.white),
        ("KM", &settings.komi),
    ] {
        if !value.is_empty() {
            state.tree.overwrite_root_field(key, value.as_str());
        }
    }
    state.nicks.insert(evt.userid.clone(), settings.nickname);

    // everyone already here keeps access, including whoever set it
    state.set_auth_all();
    state.set_password(&settings.password);

    if let Some(obj) = evt.value.as_object_mut() {
        obj.insert("password".into(), json!(""));
    }
    evt
}

/// Decode, apply and describe a board command
fn board_event(state: &mut RoomState, evt: Event) -> Event {
    let cmd = match command::decode(&evt) {
        Ok(cmd) => cmd,
        Err(e) => return reject(state, &evt.userid, e.to_string()),
    };
    let is_move = matches!(cmd, Command::AddStone { .. });
    match command::execute(&mut state.tree, cmd) {
        Ok(Some(frame)) => Event::frame(&frame).with_user(evt.userid),
        // a stone that could not be placed changes nothing
        Ok(None) if is_move => Event::nop(),
        Ok(None) => evt,
        Err(e) => reject(state, &evt.userid, e.to_string()),
    }
}
