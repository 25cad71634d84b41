//! Message sink: where schemas, records and state go.
//!
//! [`JsonLinesSink`] writes Singer messages, one JSON object per line.
//! [`MemorySink`] keeps them in a `Vec` for inspection.

use std::io::Write;

use serde::{Deserialize, Serialize};

use dynamics_core::{Record, ReplicationState, Schema};

use crate::error::SyncError;

/// One Singer message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Schema,
        key_properties: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Record,
    },
    State {
        value: ReplicationState,
    },
}

/// Destination for emitted messages.
pub trait Sink {
    fn write_message(&mut self, message: &Message) -> Result<(), SyncError>;
}

/// Newline-delimited JSON over any writer, flushed after every state message.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn write_message(&mut self, message: &Message) -> Result<(), SyncError> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n").map_err(SyncError::Emit)?;
        if matches!(message, Message::State { .. }) {
            self.out.flush().map_err(SyncError::Emit)?;
        }
        Ok(())
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<Message>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted for `stream`, in order.
    pub fn records(&self, stream: &str) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record { stream: s, record } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Every emitted state, in order.
    pub fn states(&self) -> Vec<&ReplicationState> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Streams whose schema was emitted, in order.
    pub fn schema_streams(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Sink for MemorySink {
    fn write_message(&mut self, message: &Message) -> Result<(), SyncError> {
        self.messages.push(message.clone());
        Ok(())
    }
}
