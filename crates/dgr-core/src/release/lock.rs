//! Per-project advisory locks.
//!
//! At most one activation of a project runs at a time. Further callers queue
//! behind it in FIFO order and run once the previous activation released the
//! lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::domain::project::ProjectId;

#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<ProjectId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the project is free and locks it until the guard is dropped.
    pub async fn lock(&self, project_id: &ProjectId) -> ProjectLockGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(project_id.clone()).or_default())
        };
        let guard = Arc::clone(&mutex).lock_owned().await;
        ProjectLockGuard {
            locks: self,
            project_id: project_id.clone(),
            mutex,
            guard: Some(guard),
        }
    }

    pub fn is_locked(&self, project_id: &ProjectId) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .get(project_id)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }

    /// Number of projects currently locked or waited for.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the project lock on drop and forgets the project once nobody waits for it.
pub struct ProjectLockGuard<'a> {
    locks: &'a ProjectLocks,
    project_id: ProjectId,
    mutex: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ProjectLockGuard<'_> {
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }
}

impl Drop for ProjectLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the map, one here: nobody else waits
        if Arc::strong_count(&self.mutex) == 2 {
            locks.remove(&self.project_id);
        }
    }
}
