use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use tradeflow_core::ExpectedVersion;
use tradeflow_events::EventEnvelope;

/// An event ready to be appended (no sequence number yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: u64,

    /// Monotonically increasing position in the aggregate stream, from 1.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Decode the payload into a typed envelope.
    pub fn to_envelope<E>(&self) -> Result<EventEnvelope<E>, EventStoreError>
    where
        E: DeserializeOwned,
    {
        let payload: E = serde_json::from_value(self.payload.clone())
            .map_err(|e| EventStoreError::Decode(e.to_string()))?;
        Ok(EventEnvelope::new(
            self.event_id,
            self.aggregate_type.clone(),
            self.aggregate_id,
            self.sequence_number,
            self.event_type.clone(),
            self.occurred_at,
            payload,
        ))
    }
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("stored payload could not be decoded: {0}")]
    Decode(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Append-only store of per-aggregate event streams.
///
/// Streams are keyed by `(aggregate_type, aggregate_id)` so purchase and sale
/// orders can share numeric ids. `append` checks the expected version and
/// assigns sequence numbers `current + 1 ..` atomically; `load_stream` returns
/// an empty vector for a stream that does not exist yet.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Ids of every stream of the given aggregate type, ascending.
    fn list_streams(&self, aggregate_type: &str) -> Result<Vec<u64>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_type, aggregate_id)
    }

    fn list_streams(&self, aggregate_type: &str) -> Result<Vec<u64>, EventStoreError> {
        (**self).list_streams(aggregate_type)
    }
}

impl UncommittedEvent {
    /// Serialize a typed domain event, capturing its metadata.
    pub fn from_typed<E>(
        aggregate_type: impl Into<String>,
        aggregate_id: u64,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: tradeflow_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            aggregate_type: aggregate_type.into(),
            aggregate_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
