//! User-visible error registry fed by the query cache's failure hooks.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// One error surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    pub details: Value,
}

/// Destination for user-visible errors.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink: Send + Sync {
    fn add_error(&self, error: ErrorRecord);
}

/// In-memory error registry.
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    errors: Mutex<Vec<ErrorRecord>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded errors, oldest first.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every recorded error.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        std::mem::take(&mut *self.errors.lock().unwrap())
    }
}

impl ErrorSink for ErrorRegistry {
    fn add_error(&self, error: ErrorRecord) {
        debug!("Recording error {}: {}", error.code, error.message);
        self.errors.lock().unwrap().push(error);
    }
}
