use serde::Serialize;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failed => "failed",
        }
    }
}

/// One upstream call for one variant.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptEvent {
    pub variant: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl AttemptEvent {
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at)
            .as_seconds_f64()
            .max(0.0)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ResolveSummary {
    pub attempts: usize,
    pub failures: usize,
    pub succeeded_with: Option<String>,
    pub upstream_seconds: f64,
    pub elapsed_seconds: f64,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub name: String,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Per-request record of upstream attempts and notable pipeline events.
#[derive(Clone)]
pub struct ResolveMonitor {
    inner: Arc<Mutex<ResolveState>>,
}

struct ResolveState {
    created: OffsetDateTime,
    attempts: Vec<AttemptEvent>,
    notes: Vec<Note>,
}

impl Default for ResolveMonitor {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResolveState {
                created: OffsetDateTime::now_utc(),
                attempts: Vec::new(),
                notes: Vec::new(),
            })),
        }
    }
}

impl ResolveMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: AttemptEvent) {
        self.inner.lock().unwrap().attempts.push(event);
    }

    pub fn note_event(&self, name: &str, payload: serde_json::Value) {
        self.inner.lock().unwrap().notes.push(Note {
            name: name.to_string(),
            payload,
            timestamp: OffsetDateTime::now_utc(),
        });
    }

    pub fn attempts(&self) -> Vec<AttemptEvent> {
        self.inner.lock().unwrap().attempts.clone()
    }

    pub fn failures(&self) -> Vec<AttemptEvent> {
        self.inner
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|event| event.outcome == AttemptOutcome::Failed)
            .cloned()
            .collect()
    }

    pub fn summarize(&self) -> ResolveSummary {
        let state = self.inner.lock().unwrap();
        let elapsed = (OffsetDateTime::now_utc() - state.created).max(Duration::ZERO);
        ResolveSummary {
            attempts: state.attempts.len(),
            failures: state
                .attempts
                .iter()
                .filter(|event| event.outcome == AttemptOutcome::Failed)
                .count(),
            succeeded_with: state
                .attempts
                .iter()
                .find(|event| event.outcome == AttemptOutcome::Success)
                .map(|event| event.variant.clone()),
            upstream_seconds: state
                .attempts
                .iter()
                .map(AttemptEvent::duration_seconds)
                .sum(),
            elapsed_seconds: elapsed.as_seconds_f64(),
            notes: state.notes.clone(),
        }
    }
}
