// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-event middleware pipeline.
//!
//! A [`Handler`] takes the locked room state and an event and returns the
//! event to hand back up the chain. A [`Middleware`] wraps a handler and may
//! act before delegating, after it, or instead of it. [`chain`] applies a
//! list outermost first, so `chain(h, &[a, b])` runs `a` then `b` on the way
//! in and `b` then `a` on the way out.
//!
//! A middleware rejects by returning [`Event::nop`] without calling the
//! inner handler. Nop events are never broadcast.

use crate::event::Event;
use crate::room::RoomState;
use std::time::{Duration, Instant};

pub type Handler = Box<dyn Fn(&mut RoomState, Event) -> Event + Send + Sync>;

pub type Middleware = fn(Handler) -> Handler;

/// Wrap `handler` in `middlewares`, first one outermost
pub fn chain(handler: Handler, middlewares: &[Middleware]) -> Handler {
    middlewares.iter().rev().fold(handler, |inner, mw| mw(inner))
}

/// Box a plain function as a handler
pub fn handler(f: fn(&mut RoomState, Event) -> Event) -> Handler {
    Box::new(f)
}

/// Last-activity bookkeeping used by the debounce middlewares.
///
/// This lives behind its own lock because every inbound event touches it.
#[derive(Debug)]
pub struct Activity {
    pub last_active: Instant,
    pub last_user: String,
    pub last_messages: std::collections::HashMap<String, Instant>,
}

impl Activity {
    pub fn new() -> Self {
        Self {
            last_active: Instant::now(),
            last_user: String::new(),
            last_messages: Default::default(),
        }
    }

    /// Mark `user` as the latest to act
    pub fn touch(&mut self, user: &str) {
        self.last_active = Instant::now();
        self.last_user = user.to_string();
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop the event if a different user acted within the room's input buffer
pub fn outside_buffer(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let buffer = Duration::from_millis(state.tree.input_buffer());
        {
            let activity = state.activity.lock();
            if activity.last_user != evt.userid && activity.last_active.elapsed() < buffer {
                tracing::debug!(user = %evt.userid, event = %evt.event, "inside input buffer");
                return Event::nop();
            }
        }
        inner(state, evt)
    })
}

/// Drop the event if the room has a password the sender has not passed
pub fn authorized(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        if !state.is_authorized(&evt.userid) {
            tracing::debug!(user = %evt.userid, event = %evt.event, "unauthorized");
            return Event::nop();
        }
        inner(state, evt)
    })
}

/// Drop the event if the same user sent one within the user buffer
pub fn slow(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let now = Instant::now();
        let previous = state
            .activity
            .lock()
            .last_messages
            .insert(evt.userid.clone(), now);
        if let Some(prev) = previous {
            if now.duration_since(prev) < state.user_buffer {
                tracing::debug!(user = %evt.userid, "flood guard");
                return Event::nop();
            }
        }
        inner(state, evt)
    })
}

pub fn log(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        tracing::info!(room = %state.id, user = %evt.userid, event = %evt.event, "room event");
        inner(state, evt)
    })
}

/// Stop every live feed before the tree is replaced
pub fn end_live_feed(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        state.end_plugins();
        inner(state, evt)
    })
}

/// Send the result to every connection
pub fn broadcast_after(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let out = inner(state, evt);
        if !out.is_nop() {
            state.broadcast(&out);
        }
        out
    })
}

/// Record the sender as the latest to act
pub fn set_time_after(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let user = evt.userid.clone();
        let out = inner(state, evt);
        state.activity.lock().touch(&user);
        out
    })
}

pub fn broadcast_full_frame_after(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let out = inner(state, evt);
        state.broadcast_full_frame();
        out
    })
}

pub fn broadcast_connected_users_after(inner: Handler) -> Handler {
    Box::new(move |state, evt| {
        let out = inner(state, evt);
        state.broadcast_user_list();
        out
    })
}
