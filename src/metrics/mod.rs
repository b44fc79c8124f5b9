// Private module declaration
mod export;

use prometheus::{IntCounterVec, Opts, Registry};

// Re-export for public API
pub use export::render_metrics;

// ============================================================================
// Metrics Module - Prometheus metrics for behavior engines
// ============================================================================
//
// Provides counters for:
// - Configuration procedure runs (one per behavior entry)
// - Committed transitions
// - Messages and reminders nobody handled
// - Faulted user hooks and handlers
//
// One BehaviorMetrics is typically shared (Arc) by every engine of a process.
// ============================================================================

pub struct BehaviorMetrics {
    registry: Registry,

    pub configurations: IntCounterVec,
    pub transitions: IntCounterVec,
    pub unhandled_messages: IntCounterVec,
    pub unhandled_reminders: IntCounterVec,
    pub hook_failures: IntCounterVec,
}

impl BehaviorMetrics {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Register the behavior metrics on an existing registry
    pub fn with_registry(registry: Registry) -> anyhow::Result<Self> {
        let configurations = IntCounterVec::new(
            Opts::new("behavior_configurations_total", "Configuration procedure runs"),
            &["actor", "behavior"],
        )?;
        registry.register(Box::new(configurations.clone()))?;

        let transitions = IntCounterVec::new(
            Opts::new("behavior_transitions_total", "Committed behavior transitions"),
            &["actor", "from", "to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let unhandled_messages = IntCounterVec::new(
            Opts::new("behavior_unhandled_messages_total", "Messages no behavior handled"),
            &["actor", "behavior"],
        )?;
        registry.register(Box::new(unhandled_messages.clone()))?;

        let unhandled_reminders = IntCounterVec::new(
            Opts::new("behavior_unhandled_reminders_total", "Reminders no behavior handled"),
            &["actor", "behavior"],
        )?;
        registry.register(Box::new(unhandled_reminders.clone()))?;

        let hook_failures = IntCounterVec::new(
            Opts::new("behavior_hook_failures_total", "User hooks and handlers that failed"),
            &["actor", "behavior", "hook"],
        )?;
        registry.register(Box::new(hook_failures.clone()))?;

        Ok(Self {
            registry,
            configurations,
            transitions,
            unhandled_messages,
            unhandled_reminders,
            hook_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_configuration(&self, actor: &str, behavior: &str) {
        self.configurations.with_label_values(&[actor, behavior]).inc();
    }

    pub fn record_transition(&self, actor: &str, from: &str, to: &str) {
        self.transitions.with_label_values(&[actor, from, to]).inc();
    }

    pub fn record_unhandled_message(&self, actor: &str, behavior: &str) {
        self.unhandled_messages.with_label_values(&[actor, behavior]).inc();
    }

    pub fn record_unhandled_reminder(&self, actor: &str, behavior: &str) {
        self.unhandled_reminders.with_label_values(&[actor, behavior]).inc();
    }

    pub fn record_hook_failure(&self, actor: &str, behavior: &str, hook: &str) {
        self.hook_failures.with_label_values(&[actor, behavior, hook]).inc();
    }
}
