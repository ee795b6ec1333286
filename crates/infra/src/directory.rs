//! Supplier/customer lookup.
//!
//! Master data is owned elsewhere; orders only need to know that a
//! counterparty exists and what to call it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use tradeflow_core::CounterpartyId;
use tradeflow_orders::CounterpartyRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: CounterpartyId,
    pub name: String,
}

pub trait CounterpartyDirectory: Send + Sync {
    fn resolve(&self, role: CounterpartyRole, id: CounterpartyId) -> Option<Counterparty>;
}

impl<D> CounterpartyDirectory for Arc<D>
where
    D: CounterpartyDirectory + ?Sized,
{
    fn resolve(&self, role: CounterpartyRole, id: CounterpartyId) -> Option<Counterparty> {
        (**self).resolve(role, id)
    }
}

/// In-memory directory seeded from configuration.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<HashMap<(CounterpartyRole, CounterpartyId), String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, role: CounterpartyRole, id: CounterpartyId, name: impl Into<String>) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((role, id), name.into());
        }
    }

    pub fn with(self, role: CounterpartyRole, id: u64, name: impl Into<String>) -> Self {
        self.register(role, CounterpartyId::new(id), name);
        self
    }
}

impl CounterpartyDirectory for InMemoryDirectory {
    fn resolve(&self, role: CounterpartyRole, id: CounterpartyId) -> Option<Counterparty> {
        let map = self.inner.read().ok()?;
        map.get(&(role, id)).map(|name| Counterparty {
            id,
            name: name.clone(),
        })
    }
}
