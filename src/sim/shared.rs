//! Lock-per-equipment handle for hosts that run equipment on several threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::event::Event;
use crate::equipment::SimulationControl;
use crate::error::Result;

/// Shared ownership of one equipment behind a single exclusive lock.
///
/// The lock is held only while one event executes, so events against the
/// same equipment are serialized while different equipment run freely.
#[derive(Debug)]
pub struct SharedEquipment<E> {
    inner: Arc<Mutex<E>>,
}

impl<E> Clone for SharedEquipment<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: SimulationControl> SharedEquipment<E> {
    pub fn new(equipment: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(equipment)),
        }
    }

    /// Executes `event` while holding the equipment lock.
    ///
    /// Cancellation is checked under the same lock, right before execution.
    pub fn execute(&self, event: &Event) -> Result<()> {
        let mut guard = self.lock();
        if event.is_cancelled() {
            return Ok(());
        }
        event.execute_on(&mut *guard)
    }

    /// Runs `f` with read access to the equipment.
    pub fn read<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&*self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, E> {
        // Mutation happens only after all preconditions pass, so a poisoned
        // lock still guards consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
