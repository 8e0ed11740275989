// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Completion events
//!
//! Every build run publishes exactly one event when it resolves, on the
//! topic `<name>.build.<invocation>.finished`. The payload says whether the
//! run succeeded, so listeners never have to infer it from log output.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Topic a build run publishes its completion on
pub fn completion_topic(name: &str, invocation: &str) -> String {
    format!("{}.build.{}.finished", name, invocation)
}

/// Payload of the completion signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub topic: String,
    pub invocation: String,
    pub succeeded: bool,
    /// Stage that failed first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Publishes completion events
pub trait EventBus: Send + Sync {
    fn send(&self, event: CompletionEvent);
}

/// Bus that logs events as JSON through `tracing`
#[derive(Debug, Default)]
pub struct TracingBus;

impl EventBus for TracingBus {
    fn send(&self, event: CompletionEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        info!(topic = %event.topic, "{}", payload);
    }
}

/// Bus that forwards events to an in-process receiver
#[derive(Debug, Clone)]
pub struct ChannelBus {
    tx: mpsc::UnboundedSender<CompletionEvent>,
}

impl ChannelBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompletionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventBus for ChannelBus {
    fn send(&self, event: CompletionEvent) {
        // A dropped receiver just means nobody is listening
        let _ = self.tx.send(event);
    }
}
