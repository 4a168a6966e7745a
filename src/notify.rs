//! Toast notifications and input debouncing.
//!
//! Both are driven by explicit `Instant`s so callers decide what "now" is;
//! the CLI passes `Instant::now()`, tests pass fixed offsets.

use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Success,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastMessage {
    pub id: String,
    pub text: String,
    pub severity: Severity,
    #[serde(skip)]
    pub created_at: Instant,
}

/// Active toasts, each removed after `ttl` or on dismissal.
#[derive(Debug, Clone)]
pub struct Toasts {
    items: Vec<ToastMessage>,
    ttl: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Add a toast and return its id.
    pub fn push(&mut self, text: impl Into<String>, severity: Severity) -> String {
        self.push_at(text, severity, Instant::now())
    }

    pub fn push_at(
        &mut self,
        text: impl Into<String>,
        severity: Severity,
        now: Instant,
    ) -> String {
        let toast = ToastMessage {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            severity,
            created_at: now,
        };
        tracing::debug!(severity = severity.as_str(), text = %toast.text, "toast");
        let id = toast.id.clone();
        self.items.push(toast);
        id
    }

    pub fn success(&mut self, text: impl Into<String>) -> String {
        self.push(text, Severity::Success)
    }

    pub fn error(&mut self, text: impl Into<String>) -> String {
        self.push(text, Severity::Error)
    }

    pub fn info(&mut self, text: impl Into<String>) -> String {
        self.push(text, Severity::Info)
    }

    /// Remove a toast early. Returns whether it was still active.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|toast| toast.id != id);
        self.items.len() != before
    }

    /// Drop toasts older than the ttl, returning them.
    pub fn expire(&mut self, now: Instant) -> Vec<ToastMessage> {
        let ttl = self.ttl;
        let (expired, active) = self
            .items
            .drain(..)
            .partition(|toast| now.saturating_duration_since(toast.created_at) >= ttl);
        self.items = active;
        expired
    }

    pub fn active(&self) -> &[ToastMessage] {
        &self.items
    }

    /// Take every active toast, leaving none.
    pub fn drain(&mut self) -> Vec<ToastMessage> {
        std::mem::take(&mut self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Holds the latest value until `delay` passes without a newer one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// The pending value once the quiet period has elapsed.
    pub fn ready(&mut self, now: Instant) -> Option<T> {
        let quiet = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.delay);
        if quiet {
            self.flush()
        } else {
            None
        }
    }

    /// Take the pending value regardless of timing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_ttl() {
        let start = Instant::now();
        let mut toasts = Toasts::new(Duration::from_millis(3000));
        toasts.push_at("Task created successfully", Severity::Success, start);
        toasts.push_at(
            "Task marked as finished",
            Severity::Info,
            start + Duration::from_millis(1000),
        );

        assert!(toasts.expire(start + Duration::from_millis(2999)).is_empty());
        let expired = toasts.expire(start + Duration::from_millis(3000));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].text, "Task created successfully");
        assert_eq!(toasts.len(), 1);

        toasts.expire(start + Duration::from_millis(4000));
        assert!(toasts.is_empty());
    }

    #[test]
    fn dismiss_removes_only_that_toast() {
        let mut toasts = Toasts::default();
        let first = toasts.success("one");
        toasts.error("two");

        assert!(toasts.dismiss(&first));
        assert!(!toasts.dismiss(&first));
        assert_eq!(toasts.active().len(), 1);
        assert_eq!(toasts.active()[0].severity, Severity::Error);
    }

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.push("t", start);
        debouncer.push("tr", start + Duration::from_millis(100));
        assert_eq!(debouncer.ready(start + Duration::from_millis(350)), None);
        assert_eq!(
            debouncer.ready(start + Duration::from_millis(400)),
            Some("tr")
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn debouncer_flush_ignores_timing() {
        let mut debouncer = Debouncer::new(Duration::from_secs(60));
        debouncer.push(1, Instant::now());
        assert_eq!(debouncer.flush(), Some(1));
        assert_eq!(debouncer.flush(), None);
    }
}
