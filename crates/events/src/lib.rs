//! Event contract shared by the order aggregates and the event store.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
