//! Recording analytics sinks

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::domain::experiment::{DataLayer, Gtag};

/// One captured `gtag(...)` invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GtagCall {
    pub command: String,
    pub action: String,
    pub params: Value,
}

/// A `gtag` function that remembers its calls
#[derive(Debug, Default)]
pub struct RecordingGtag {
    calls: Mutex<Vec<GtagCall>>,
}

impl RecordingGtag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GtagCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Gtag for RecordingGtag {
    fn call(&self, command: &str, action: &str, params: Value) {
        let call = GtagCall {
            command: command.to_string(),
            action: action.to_string(),
            params,
        };

        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(e) => error!(error = %e, "Failed to record gtag call"),
        }
    }
}

/// A data layer array that remembers what was pushed
#[derive(Debug, Default)]
pub struct RecordingDataLayer {
    entries: Mutex<Vec<Value>>,
}

impl RecordingDataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Value> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl DataLayer for RecordingDataLayer {
    fn push(&self, entry: Value) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(e) => error!(error = %e, "Failed to record data layer entry"),
        }
    }
}
