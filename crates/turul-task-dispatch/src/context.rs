//! Diagnostic context: request-scoped identifiers for logging and tracing.
//!
//! The context is an explicit value. The dispatcher clones it into the
//! submitted closure and re-establishes it there, rather than relying on
//! ambient thread state surviving the hop to the execution resource.

use std::sync::{Arc, Mutex};

use tracing::{Span, field, info_span};

pub const TASK_ID_KEY: &str = "task_id";
pub const ACTION_KEY: &str = "action";
pub const TARGET_KEY: &str = "target";

/// Identifiers describing one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticContext {
    pub task_id: Option<String>,
    pub action: String,
    pub target: String,
}

impl DiagnosticContext {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task_id: None,
            action: action.into(),
            target: target.into(),
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Key/value pairs in the order they are set.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![(TARGET_KEY, self.target.as_str())];
        if let Some(task_id) = &self.task_id {
            entries.push((TASK_ID_KEY, task_id.as_str()));
            entries.push((ACTION_KEY, self.action.as_str()));
        }
        entries
    }

    /// Span covering the caller-side part of a dispatch.
    pub fn dispatch_span(&self) -> Span {
        let span = info_span!(
            "dispatch",
            action = %self.action,
            target = %self.target,
            task_id = field::Empty
        );
        if let Some(task_id) = &self.task_id {
            span.record(TASK_ID_KEY, task_id.as_str());
        }
        span
    }

    /// Span covering background execution of a task.
    pub fn task_span(&self) -> Span {
        let span = info_span!(
            "task",
            action = %self.action,
            target = %self.target,
            task_id = field::Empty
        );
        if let Some(task_id) = &self.task_id {
            span.record(TASK_ID_KEY, task_id.as_str());
        }
        span
    }
}

/// Provider of ambient diagnostic identifiers (an MDC-style key/value store).
///
/// Every `set` issued by the dispatcher is matched by a `clear` of the same
/// key, on every exit path.
pub trait ContextPropagator: Send + Sync {
    fn set(&self, key: &'static str, value: &str);
    fn clear(&self, key: &'static str);
}

/// Propagator that does nothing. The dispatcher's tracing spans still carry
/// the same fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContextPropagator;

impl ContextPropagator for NoopContextPropagator {
    fn set(&self, _key: &'static str, _value: &str) {}
    fn clear(&self, _key: &'static str) {}
}

/// RAII scope: sets every context entry on creation, clears them on drop.
///
/// Dropping on unwind counts, so a panicking unit of work still releases its
/// context.
pub struct ContextScope {
    propagator: Arc<dyn ContextPropagator>,
    keys: Vec<&'static str>,
}

impl ContextScope {
    pub fn enter(propagator: Arc<dyn ContextPropagator>, context: &DiagnosticContext) -> Self {
        let mut keys = Vec::new();
        for (key, value) in context.entries() {
            propagator.set(key, value);
            keys.push(key);
        }
        Self { propagator, keys }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        for key in self.keys.iter().rev() {
            self.propagator.clear(key);
        }
    }
}

/// One call observed by [`RecordingContextPropagator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    Set { key: &'static str, value: String },
    Clear { key: &'static str },
}

/// Propagator that journals every call, for auditing set/clear pairing.
#[derive(Debug, Default)]
pub struct RecordingContextPropagator {
    events: Mutex<Vec<ContextEvent>>,
}

impl RecordingContextPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ContextEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Values set under `key`, in call order.
    pub fn values_set(&self, key: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ContextEvent::Set { key: k, value } if k == key => Some(value),
                _ => None,
            })
            .collect()
    }

    /// `true` when every key has been cleared as many times as it was set.
    pub fn is_balanced(&self) -> bool {
        let events = self.events();
        [TASK_ID_KEY, ACTION_KEY, TARGET_KEY].iter().all(|key| {
            let sets = events
                .iter()
                .filter(|e| matches!(e, ContextEvent::Set { key: k, .. } if k == key))
                .count();
            let clears = events
                .iter()
                .filter(|e| matches!(e, ContextEvent::Clear { key: k } if k == key))
                .count();
            sets == clears
        })
    }

    fn record(&self, event: ContextEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl ContextPropagator for RecordingContextPropagator {
    fn set(&self, key: &'static str, value: &str) {
        self.record(ContextEvent::Set {
            key,
            value: value.to_string(),
        });
    }

    fn clear(&self, key: &'static str) {
        self.record(ContextEvent::Clear { key });
    }
}
