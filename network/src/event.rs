// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON envelope exchanged with clients

use goboard_core::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One message in either direction.
///
/// `userid` is always overwritten with the connection id on receipt, so
/// clients cannot speak for each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub userid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventid: Option<String>,
}

impl Event {
    pub fn new(event: impl Into<String>, value: Value) -> Self {
        Self {
            event: event.into(),
            value,
            userid: String::new(),
            eventid: None,
        }
    }

    /// Sentinel meaning "do nothing"; never sent to a client
    pub fn nop() -> Self {
        Self::new("nop", Value::Null)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", Value::String(message.into()))
    }

    pub fn frame(frame: &Frame) -> Self {
        match serde_json::to_value(frame) {
            Ok(value) => Self::new("frame", value),
            Err(e) => Self::error(format!("frame encoding failed: {e}")),
        }
    }

    pub fn with_user(mut self, userid: impl Into<String>) -> Self {
        self.userid = userid.into();
        self
    }

    pub fn is_nop(&self) -> bool {
        self.event == "nop"
    }

    pub fn is_error(&self) -> bool {
        self.event == "error"
    }
}
