//! Per-key single-flight guard for network-backed actions

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::errors::ConsoleError;

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Held while an action runs; dropping it lets the next caller in
pub struct Flight {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots,
}

impl Flight {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        // release the guard first so its reference to the slot goes away
        self.guard.take();

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idle = slots
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) == 1)
            .unwrap_or(false);
        if idle {
            slots.remove(&self.key);
        }
    }
}

/// At most one outstanding invocation per action key
///
/// A slot lives only while some caller holds or waits on it.
#[derive(Default)]
pub struct SingleFlight {
    slots: Slots,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn flight(&self, key: &str, guard: OwnedMutexGuard<()>) -> Flight {
        Flight {
            key: key.to_string(),
            guard: Some(guard),
            slots: self.slots.clone(),
        }
    }

    /// Claim `key`, failing with [`ConsoleError::Busy`] if it is already claimed
    pub fn try_begin(&self, key: &str) -> Result<Flight, ConsoleError> {
        let guard = self
            .slot(key)
            .try_lock_owned()
            .map_err(|_| ConsoleError::Busy(key.to_string()))?;
        Ok(self.flight(key, guard))
    }

    /// Claim `key`, waiting for the current holder to finish first
    pub async fn begin(&self, key: &str) -> Flight {
        let guard = self.slot(key).lock_owned().await;
        self.flight(key, guard)
    }

    /// Whether an invocation for `key` is outstanding
    pub fn in_flight(&self, key: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(key)
            .map(|slot| slot.try_lock().is_err())
            .unwrap_or(false)
    }
}
