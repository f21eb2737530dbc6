//! Per-session export admission.
//!
//! At most one export runs per session; a second start for a busy session
//! is rejected.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use station_common::SessionId;

use crate::error::ExportError;

/// Tracks sessions with an export in flight.
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    running: Arc<Mutex<HashSet<SessionId>>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the export slot of `session`. The slot is released when the
    /// returned guard is dropped.
    pub fn try_acquire(&self, session: SessionId) -> Result<ExportSlot, ExportError> {
        if !self.lock().insert(session) {
            return Err(ExportError::AlreadyRunning(session));
        }
        Ok(ExportSlot {
            registry: self.clone(),
            session,
        })
    }

    pub fn is_running(&self, session: &SessionId) -> bool {
        self.lock().contains(session)
    }

    /// Number of exports in flight.
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SessionId>> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held for the lifetime of one export.
#[derive(Debug)]
pub struct ExportSlot {
    registry: ExportRegistry,
    session: SessionId,
}

impl ExportSlot {
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl Drop for ExportSlot {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_until_release() {
        let registry = ExportRegistry::new();
        let session = SessionId::new();

        let slot = registry.try_acquire(session).unwrap();
        assert!(matches!(
            registry.try_acquire(session),
            Err(ExportError::AlreadyRunning(s)) if s == session
        ));
        assert!(registry.try_acquire(SessionId::new()).is_ok());

        drop(slot);
        assert!(!registry.is_running(&session));
        assert!(registry.try_acquire(session).is_ok());
    }
}
