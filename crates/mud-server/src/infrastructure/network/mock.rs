//! In-memory person doubles for tests.
//!
//! [`RecordingPerson`] keeps every line it is told.  [`MemoryPersonConnector`]
//! hands out registered recorders and an [`UnreachablePerson`] for anyone
//! else, which is how tests simulate a player whose connection has died.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mud_core::{PersonId, PersonRef};
use tokio::sync::{Mutex, Notify};
use tokio::time;

use crate::application::person::{DeliveryError, PersonConnector, PersonHandle};

/// Records every delivered line.
pub struct RecordingPerson {
    person: PersonRef,
    lines: Mutex<Vec<String>>,
    changed: Notify,
}

impl RecordingPerson {
    pub fn new(person: PersonRef) -> Arc<Self> {
        Arc::new(Self {
            person,
            lines: Mutex::new(Vec::new()),
            changed: Notify::new(),
        })
    }

    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }

    /// Waits until `line` has been delivered.  Returns `false` on timeout.
    pub async fn wait_for(&self, line: &str, timeout: Duration) -> bool {
        let deadline = time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            if self.lines.lock().await.iter().any(|l| l == line) {
                return true;
            }
            if time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

#[async_trait]
impl PersonHandle for RecordingPerson {
    fn person(&self) -> &PersonRef {
        &self.person
    }

    async fn tell(&self, text: &str) -> Result<(), DeliveryError> {
        self.lines.lock().await.push(text.to_string());
        self.changed.notify_waiters();
        Ok(())
    }
}

/// Fails every delivery.
pub struct UnreachablePerson {
    person: PersonRef,
}

impl UnreachablePerson {
    pub fn new(person: PersonRef) -> Self {
        Self { person }
    }
}

#[async_trait]
impl PersonHandle for UnreachablePerson {
    fn person(&self) -> &PersonRef {
        &self.person
    }

    async fn tell(&self, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unreachable {
            person: self.person.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Hands out registered handles by person id.
#[derive(Default)]
pub struct MemoryPersonConnector {
    known: std::sync::Mutex<HashMap<PersonId, Arc<dyn PersonHandle>>>,
}

impl MemoryPersonConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<dyn PersonHandle>) {
        let mut known = self.known.lock().unwrap_or_else(|e| e.into_inner());
        known.insert(handle.person().id, handle);
    }
}

impl PersonConnector for MemoryPersonConnector {
    fn connect(&self, person: &PersonRef) -> Arc<dyn PersonHandle> {
        let known = self.known.lock().unwrap_or_else(|e| e.into_inner());
        match known.get(&person.id) {
            Some(handle) => Arc::clone(handle),
            None => Arc::new(UnreachablePerson::new(person.clone())),
        }
    }
}
