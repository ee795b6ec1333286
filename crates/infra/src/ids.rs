use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source starting at 1.
#[derive(Debug)]
pub struct IdSequence {
    last: AtomicU64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one_and_increments() {
        let ids = IdSequence::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
    }
}
