//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   -> load stream
//!   -> validate ordering
//!   -> rehydrate
//!   -> handle (pure)
//!   -> append with ExpectedVersion::Exact(loaded version)
//! ```
//!
//! A command that decides no events is a no-op and appends nothing.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use tradeflow_core::{Aggregate, DomainError, ExpectedVersion};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Deterministic business failure from the aggregate or a collaborator.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Another writer appended to the stream first.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// A stored payload no longer matches the aggregate event type.
    #[error("failed to decode history: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),

    /// The order was committed but its side effects could not be queued.
    #[error("side effects not queued: {0}")]
    Outbox(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::Decode(msg) => DispatchError::Deserialize(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Outcome of a dispatched command.
#[derive(Debug, Clone)]
pub struct Dispatched<A: Aggregate> {
    /// State after applying the new events.
    pub aggregate: A,
    /// Events decided by the command, in order. Empty for a no-op.
    pub events: Vec<A::Event>,
    pub committed: Vec<StoredEvent>,
}

#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Rehydrate an aggregate together with its raw stream.
    pub fn load<A>(
        &self,
        aggregate_type: &str,
        aggregate_id: A::Id,
    ) -> Result<(A, Vec<StoredEvent>), DispatchError>
    where
        A: Aggregate,
        A::Id: Copy + Into<u64>,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_type, aggregate_id.into())?;
        validate_loaded_stream(aggregate_type, aggregate_id.into(), &history)?;

        let events = decode_history::<A>(&history)?;
        let aggregate = A::rehydrate(aggregate_id, &events);
        Ok((aggregate, history))
    }

    /// Run a command against the current state of a stream and append what it
    /// decides.
    ///
    /// The append expects the version that was loaded, so a concurrent writer
    /// makes this fail with `DispatchError::Concurrency` rather than
    /// interleave.
    pub fn dispatch<A>(
        &self,
        aggregate_type: &str,
        aggregate_id: A::Id,
        command: A::Command,
    ) -> Result<Dispatched<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Id: Copy + Into<u64>,
        A::Event: tradeflow_events::Event + Serialize + DeserializeOwned,
    {
        let (mut aggregate, history) = self.load::<A>(aggregate_type, aggregate_id)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                aggregate,
                events: vec![],
                committed: vec![],
            });
        }

        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_type, aggregate_id.into(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        Ok(Dispatched {
            aggregate,
            events: decided,
            committed,
        })
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_type: &str,
    aggregate_id: u64,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id || e.aggregate_type != aggregate_type {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains a foreign event at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn decode_history<A>(history: &[StoredEvent]) -> Result<Vec<A::Event>, DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    history
        .iter()
        .map(|stored| {
            serde_json::from_value(stored.payload.clone())
                .map_err(|e| DispatchError::Deserialize(e.to_string()))
        })
        .collect()
}
