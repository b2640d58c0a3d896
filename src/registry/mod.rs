//! Shared crawl-state registry: the single channel through which the
//! pipeline can tell a running spider to stop. The pipeline flips a task to
//! `Error`; the spider's launcher polls the state before each record it
//! emits and exits early when the task is no longer `Running`.

#[cfg(test)]
mod tests;

use crate::core::{TaskDescriptor, TaskId};
use log::{debug, info};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrawlState {
    Running,
    Complete,
    Error,
}

impl CrawlState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlState::Complete | CrawlState::Error)
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry still holds {0} tasks from a previous run")]
    AlreadyBuilt(usize),

    #[error("no task with id {0} in the registry")]
    UnknownTask(TaskId),
}

#[derive(Debug)]
struct RegistryEntry {
    descriptor: TaskDescriptor,
    state: CrawlState,
}

/// Run-scoped task registry, constructed by the crawl session and passed by
/// handle to the launcher and the pipeline. Empty between runs. Writes are
/// serialized behind the lock; readers only use the state as an advisory
/// "should I stop" check, so slightly stale reads are fine.
#[derive(Default)]
pub struct CrawlStateRegistry {
    entries: RwLock<HashMap<TaskId, RegistryEntry>>,
}

impl CrawlStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the registry for a new run. All tasks start `Running`.
    /// Fails if a previous run's registry was not cleared.
    pub fn build(&self, descriptors: Vec<TaskDescriptor>) -> Result<(), RegistryError> {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            return Err(RegistryError::AlreadyBuilt(entries.len()));
        }
        for descriptor in descriptors {
            entries.insert(
                descriptor.id,
                RegistryEntry {
                    descriptor,
                    state: CrawlState::Running,
                },
            );
        }
        debug!("crawl registry built with {} tasks", entries.len());
        Ok(())
    }

    /// Transitions a task's lifecycle state. Terminal states absorb later
    /// transitions: the pipeline may flip the same task to `Error` for
    /// several in-flight records, and `Complete`/`Error` never revert.
    pub fn set_state(&self, id: TaskId, state: CrawlState) -> Result<(), RegistryError> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(RegistryError::UnknownTask(id))?;
        if entry.state.is_terminal() {
            debug!(
                "task {} already {:?}, ignoring transition to {:?}",
                id, entry.state, state
            );
            return Ok(());
        }
        entry.state = state;
        Ok(())
    }

    /// Marks a task broken so it stops producing records.
    pub fn mark_error(&self, id: TaskId) -> Result<(), RegistryError> {
        self.set_state(id, CrawlState::Error)
    }

    pub fn state(&self, id: TaskId) -> Result<CrawlState, RegistryError> {
        self.entries
            .read()
            .get(&id)
            .map(|entry| entry.state)
            .ok_or(RegistryError::UnknownTask(id))
    }

    pub fn descriptor(&self, id: TaskId) -> Result<TaskDescriptor, RegistryError> {
        self.entries
            .read()
            .get(&id)
            .map(|entry| entry.descriptor.clone())
            .ok_or(RegistryError::UnknownTask(id))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Empties the registry. Only safe once the launcher and the pipeline
    /// have both finished.
    pub fn clear(&self) {
        self.entries.write().clear();
        info!("crawl registry cleared");
    }
}
