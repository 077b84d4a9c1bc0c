//! Append-only, in-memory audit ledger.
//!
//! Storage order is execution order. Anything that wants a
//! reverse-chronological view inverts at render time.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::{AuditEvent, Outcome};

/// Ordered sequence of audit events for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLedger {
    events: Vec<AuditEvent>,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new event and return it.
    ///
    /// Timestamps are strictly increasing: if the clock has not advanced since
    /// the previous event, the new one is placed one microsecond after it.
    pub fn record(
        &mut self,
        step: &str,
        action: impl Into<String>,
        outcome: Outcome,
        metadata: Option<Value>,
    ) -> &AuditEvent {
        let mut event = AuditEvent::new(self.events.len() as u64, step, action, outcome);
        if let Some(metadata) = metadata {
            event = event.with_metadata(metadata);
        }

        if let Some(last) = self.events.last() {
            if event.timestamp <= last.timestamp {
                event = event.at(last.timestamp + Duration::microseconds(1));
            }
        }

        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEvent> {
        self.events.last()
    }

    /// Events with an `error` outcome
    pub fn errors(&self) -> impl Iterator<Item = &AuditEvent> {
        self.events.iter().filter(|e| e.is_error())
    }

    /// True if sequences are gapless and timestamps strictly increase
    pub fn is_chronological(&self) -> bool {
        self.events
            .iter()
            .enumerate()
            .all(|(i, e)| e.sequence == i as u64)
            && self
                .events
                .windows(2)
                .all(|pair| pair[0].timestamp < pair[1].timestamp)
    }

    /// Reverse-chronological view for display
    pub fn newest_first(&self) -> impl Iterator<Item = &AuditEvent> {
        self.events.iter().rev()
    }

    /// Render one line per event, newest first
    pub fn render(&self) -> String {
        self.newest_first()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Export as newline-delimited JSON, oldest first
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Format a single event for terminal display
pub fn render_line(event: &AuditEvent) -> String {
    let mut line = format!(
        "{} {:<14} {:<7} {}",
        event.timestamp.format("%H:%M:%S%.3f"),
        event.step,
        event.status,
        event.action
    );
    if let Some(ref metadata) = event.metadata {
        line.push(' ');
        line.push_str(&metadata.to_string());
    }
    line
}
