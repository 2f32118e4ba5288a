//! Response envelope normalization.
//!
//! The REST API wraps record lists as `{"results": [...]}`. Through the
//! FortiManager proxy the same payload arrives as a list of per-target
//! entries, each carrying the device's answer under `response`. Both shapes
//! are reduced to a plain record list here so the topology engine never has
//! to look at the transport's framing.

use crate::config::ConnectionMode;
use serde_json::Value;

/// Shape of a record-list response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// `{"results": [...]}`
    Paged(Vec<Value>),
    /// `[{"response": {"results": [...]}}]` or `[{"response": [...]}]`
    Proxied(Vec<Value>),
    /// A bare list of records
    Bare(Vec<Value>),
    /// Anything else; treated as "no records"
    Unrecognized,
}

impl ResponseEnvelope {
    pub fn classify(mode: ConnectionMode, value: Value) -> Self {
        match (mode, value) {
            (_, Value::Object(mut map)) => match map.remove("results") {
                Some(Value::Array(records)) => ResponseEnvelope::Paged(records),
                _ => ResponseEnvelope::Unrecognized,
            },
            (ConnectionMode::Manager, Value::Array(mut entries)) => {
                let response = entries
                    .first_mut()
                    .and_then(|entry| entry.as_object_mut())
                    .and_then(|entry| entry.remove("response"));
                match response {
                    Some(Value::Object(mut inner)) => match inner.remove("results") {
                        Some(Value::Array(records)) => ResponseEnvelope::Proxied(records),
                        _ => ResponseEnvelope::Proxied(Vec::new()),
                    },
                    Some(Value::Array(records)) => ResponseEnvelope::Proxied(records),
                    Some(_) => ResponseEnvelope::Unrecognized,
                    None => ResponseEnvelope::Bare(entries),
                }
            }
            _ => ResponseEnvelope::Unrecognized,
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            ResponseEnvelope::Paged(records)
            | ResponseEnvelope::Proxied(records)
            | ResponseEnvelope::Bare(records) => records,
            ResponseEnvelope::Unrecognized => Vec::new(),
        }
    }
}

/// Unwrap a record-list response, degrading to an empty list on unknown shapes.
pub fn unwrap_records(mode: ConnectionMode, kind: &str, value: Value) -> Vec<Value> {
    let envelope = ResponseEnvelope::classify(mode, value);
    if envelope == ResponseEnvelope::Unrecognized {
        tracing::warn!("Warning: No {} loaded (unrecognized response shape)", kind);
    }
    envelope.into_records()
}
