//! Aggregate contract for event-sourced domain models.

/// Identity and version of an aggregate.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied to this instance (the stream revision).
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a stream append.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Pure decision and evolution logic.
///
/// - `handle(&self, cmd)` decides which events a command produces, without
///   mutating state. An empty vector means the command is a no-op.
/// - `apply(&mut self, event)` evolves state and bumps `version()` by one.
///
/// Aggregates perform no IO. Side effects are planned from committed events by
/// the caller.
pub trait Aggregate: AggregateRoot + Sized {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Blank instance used as the starting point for rehydration.
    fn empty(id: Self::Id) -> Self;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Rebuild state by folding a history over an empty instance.
    fn rehydrate<'a, I>(id: Self::Id, history: I) -> Self
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        let mut aggregate = Self::empty(id);
        for event in history {
            aggregate.apply(event);
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_must_match() {
        assert!(ExpectedVersion::Any.matches(7));
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(2).matches(3));
    }
}
