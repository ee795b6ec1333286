use std::collections::BTreeMap;
use std::sync::RwLock;

use tradeflow_core::ExpectedVersion;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

type StreamKey = (String, u64);

/// In-memory append-only event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<BTreeMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        // One batch, one stream.
        let key: StreamKey = (first.aggregate_type.clone(), first.aggregate_id);
        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != key.1 {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate ids (index {idx})"
                )));
            }
            if e.aggregate_type != key.0 {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate types (index {idx})"
                )));
            }
        }

        let mut streams = self.streams.write().map_err(|_| EventStoreError::Poisoned)?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        let mut committed = Vec::with_capacity(events.len());
        let mut next = current + 1;
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_type: e.aggregate_type,
                aggregate_id: e.aggregate_id,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    fn list_streams(&self, aggregate_type: &str) -> Result<Vec<u64>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams
            .iter()
            .filter(|((ty, _), stream)| ty == aggregate_type && !stream.is_empty())
            .map(|((_, id), _)| *id)
            .collect())
    }
}
