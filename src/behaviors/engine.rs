use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::callbacks::{HookFuture, SetOnce, TransitionHook, UnhandledReceive, UnhandledReminder};
use super::{BehaviorRegistry, Configurator, CustomBehavior, Transition};
use crate::actor::Actor;
use crate::errors::{BehaviorError, ConfigurationError};
use crate::message::{Message, Reply};
use crate::metrics::BehaviorMetrics;

// ============================================================================
// Behavior Engine - per actor instance
// ============================================================================
//
// Owns the actor state and the behavior it is currently in. The engine
// starts in the Null behavior; Initial configures the first one, Become
// swaps behaviors running the lifecycle hooks strictly in order:
//
//   from.deactivate -> from.unbecome -> [swap] -> to.become -> on_become -> to.activate
//
// The host must serialize every entry point per instance. Nothing here locks.
//
// ============================================================================

pub struct BehaviorEngine<A> {
    actor: A,
    registry: Arc<BehaviorRegistry<A>>,
    current: Arc<CustomBehavior<A>>,
    /// Behavior being transitioned to, if any
    configuring: Option<String>,

    become_callback: SetOnce<TransitionHook<A>>,
    unhandled_receive: SetOnce<UnhandledReceive<A>>,
    unhandled_reminder: SetOnce<UnhandledReminder<A>>,

    metrics: Option<Arc<BehaviorMetrics>>,
}

impl<A: Actor> BehaviorEngine<A> {
    pub fn new(actor: A, registry: Arc<BehaviorRegistry<A>>) -> Self {
        Self {
            actor,
            registry,
            current: Arc::new(CustomBehavior::null()),
            configuring: None,
            become_callback: SetOnce::new("OnBecome"),
            unhandled_receive: SetOnce::new("Unhandled message"),
            unhandled_reminder: SetOnce::new("Unhandled reminder"),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<BehaviorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut A {
        &mut self.actor
    }

    pub fn into_actor(self) -> A {
        self.actor
    }

    pub fn registry(&self) -> &Arc<BehaviorRegistry<A>> {
        &self.registry
    }

    /// Name of the current behavior, None before Initial
    pub fn current(&self) -> Option<&str> {
        if self.current.is_null() {
            None
        } else {
            Some(self.current.name())
        }
    }

    pub fn current_behavior(&self) -> &Arc<CustomBehavior<A>> {
        &self.current
    }

    pub fn is_initialized(&self) -> bool {
        !self.current.is_null()
    }

    /// True while a Become is running
    pub fn is_configuring(&self) -> bool {
        self.configuring.is_some()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Configure the first behavior. Does not run its activate hook; the host
    /// does that through handle_activate.
    pub fn initial(&mut self, name: &str) -> Result<(), BehaviorError> {
        if self.is_initialized() {
            return Err(ConfigurationError::AlreadyInitialized.into());
        }

        self.registry.require(name)?;

        // procedures only see the actor state, never the engine
        self.current = Configurator::configure(&mut self.actor, &self.registry, &self.current, name)?;

        if let Some(metrics) = &self.metrics {
            metrics.record_configuration(A::type_name(), name);
        }

        tracing::debug!(
            actor = A::type_name(),
            behavior = %name,
            "Initial behavior configured"
        );

        Ok(())
    }

    /// Switch to another behavior. Its configuration procedure runs anew, then
    /// the lifecycle hooks run one after another. A failing hook aborts the
    /// remaining steps; once the swap has happened the new behavior stays
    /// current even if a later hook fails.
    pub async fn become_behavior(&mut self, name: &str) -> Result<(), BehaviorError> {
        self.registry.require(name)?;

        if !self.is_initialized() {
            return Err(ConfigurationError::NotInitialized.into());
        }

        if self.is_configuring() {
            return Err(ConfigurationError::BecomeWhileConfiguring.into());
        }

        if self.current.name() == name {
            return Err(ConfigurationError::AlreadyBehavingAs(name.to_string()).into());
        }

        self.configuring = Some(name.to_string());
        let result = self.transition(name).await;
        self.configuring = None;

        result
    }

    async fn transition(&mut self, name: &str) -> Result<(), BehaviorError> {
        let next = Configurator::configure(&mut self.actor, &self.registry, &self.current, name)?;

        if let Some(metrics) = &self.metrics {
            metrics.record_configuration(A::type_name(), name);
        }

        let from = self.current.clone();
        let transition = Transition::new(from.clone(), next.clone());

        tracing::debug!(
            actor = A::type_name(),
            from = %transition.from(),
            to = %transition.to(),
            "Becoming"
        );

        let result = from.handle_deactivate(self, Some(transition.clone())).await;
        self.observe_hook(from.name(), "OnDeactivate", result)?;

        let result = from.handle_unbecome(self, transition.clone()).await;
        self.observe_hook(from.name(), "OnUnbecome", result)?;

        self.current = next.clone();

        if let Some(metrics) = &self.metrics {
            metrics.record_transition(A::type_name(), transition.from(), transition.to());
        }

        let result = next.handle_become(self, transition.clone()).await;
        self.observe_hook(next.name(), "OnBecome", result)?;

        if let Some(callback) = self.become_callback.get().cloned() {
            let result = callback(self, transition.clone()).await.map_err(BehaviorError::from);
            self.observe_hook(next.name(), "global OnBecome", result)?;
        }

        let result = next.handle_activate(self, Some(transition)).await;
        self.observe_hook(next.name(), "OnActivate", result)?;

        tracing::debug!(
            actor = A::type_name(),
            behavior = %next.name(),
            "Behavior activated"
        );

        Ok(())
    }

    // ========================================================================
    // Global callbacks
    // ========================================================================

    /// Called on every Become, after the new behavior's OnBecome hook
    pub fn on_become<F>(&mut self, callback: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Transition<A>) -> HookFuture<'e> + Send + Sync + 'static,
    {
        let configuring = self.is_configuring();
        Ok(self.become_callback.set(Arc::new(callback), configuring)?)
    }

    /// Fallback for messages no behavior in the current chain handles;
    /// receives the message and the current behavior name
    pub fn on_unhandled_receive<F>(&mut self, callback: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Message, String) -> HookFuture<'e, Reply>
            + Send
            + Sync
            + 'static,
    {
        let configuring = self.is_configuring();
        Ok(self.unhandled_receive.set(Arc::new(callback), configuring)?)
    }

    /// Fallback for reminders no behavior in the current chain handles;
    /// receives the reminder id and the current behavior name
    pub fn on_unhandled_reminder<F>(&mut self, callback: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, String, String) -> HookFuture<'e>
            + Send
            + Sync
            + 'static,
    {
        let configuring = self.is_configuring();
        Ok(self.unhandled_reminder.set(Arc::new(callback), configuring)?)
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    pub async fn handle_activate(&mut self) -> Result<(), BehaviorError> {
        let current = self.current.clone();
        let result = current.handle_activate(self, None).await;
        self.observe_hook(current.name(), "OnActivate", result)
    }

    pub async fn handle_deactivate(&mut self) -> Result<(), BehaviorError> {
        let current = self.current.clone();
        let result = current.handle_deactivate(self, None).await;
        self.observe_hook(current.name(), "OnDeactivate", result)
    }

    pub async fn handle_receive(&mut self, message: Message) -> Result<Reply, BehaviorError> {
        let current = self.current.clone();
        let fallback = self.unhandled_receive.get().cloned();

        let result = current.handle_receive(self, message, fallback).await;

        if let Err(BehaviorError::UnhandledMessage { message, .. }) = &result {
            if self.registry.config().warn_on_unhandled {
                tracing::warn!(
                    actor = A::type_name(),
                    behavior = %current.name(),
                    message = %message,
                    "Unhandled message"
                );
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_unhandled_message(A::type_name(), current.name());
            }
        }

        self.observe_hook(current.name(), "receive", result)
    }

    pub async fn handle_reminder(&mut self, id: &str) -> Result<(), BehaviorError> {
        let current = self.current.clone();
        let fallback = self.unhandled_reminder.get().cloned();

        let result = current.handle_reminder(self, id, fallback).await;

        if let Err(BehaviorError::UnhandledReminder { .. }) = &result {
            if self.registry.config().warn_on_unhandled {
                tracing::warn!(
                    actor = A::type_name(),
                    behavior = %current.name(),
                    reminder = %id,
                    "Unhandled reminder"
                );
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_unhandled_reminder(A::type_name(), current.name());
            }
        }

        self.observe_hook(current.name(), "reminder", result)
    }

    /// Count and log user hook faults, passing the result through unchanged
    fn observe_hook<T>(
        &self,
        behavior: &str,
        hook: &'static str,
        result: Result<T, BehaviorError>,
    ) -> Result<T, BehaviorError> {
        if let Err(BehaviorError::Hook(error)) = &result {
            tracing::error!(
                actor = A::type_name(),
                behavior = %behavior,
                hook = hook,
                error = %error,
                "Behavior hook failed"
            );

            if let Some(metrics) = &self.metrics {
                metrics.record_hook_failure(A::type_name(), behavior, hook);
            }
        }

        result
    }
}

impl<A> Deref for BehaviorEngine<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.actor
    }
}

impl<A> DerefMut for BehaviorEngine<A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut self.actor
    }
}

impl<A> fmt::Debug for BehaviorEngine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorEngine")
            .field("actor", &self.registry.actor())
            .field("current", &self.current.name())
            .field("configuring", &self.configuring)
            .field("on_become", &self.become_callback.is_set())
            .field("on_unhandled_receive", &self.unhandled_receive.is_set())
            .field("on_unhandled_reminder", &self.unhandled_reminder.is_set())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::RegistryBuilder;
    use crate::config::BehaviorConfig;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    #[error("door jammed")]
    struct Jammed;

    #[derive(Debug)]
    struct Switch(&'static str);

    #[derive(Default)]
    struct Probe {
        log: Vec<String>,
        configured: HashMap<String, u32>,
        fail_on: Option<&'static str>,
        nested: Option<String>,
    }

    fn describe(transition: &Option<Transition<Probe>>) -> String {
        transition
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "host".to_string())
    }

    fn hit(engine: &mut BehaviorEngine<Probe>, label: &str, transition: String) -> anyhow::Result<()> {
        if engine.fail_on == Some(label) {
            return Err(Jammed.into());
        }

        let current = engine.current().unwrap_or("null").to_string();
        engine.log.push(format!("{}({})@{}", label, transition, current));
        Ok(())
    }

    impl Probe {
        fn lifecycle(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            let name = cfg.name().to_string();
            *cfg.actor().configured.entry(name.clone()).or_default() += 1;

            let label = format!("{}.deactivate", name);
            cfg.on_deactivate_sync(move |actor, t| hit(actor, &label, describe(&t)))?;

            let label = format!("{}.unbecome", name);
            cfg.on_unbecome_sync(move |actor, t| hit(actor, &label, t.to_string()))?;

            let label = format!("{}.become", name);
            cfg.on_become_sync(move |actor, t| hit(actor, &label, t.to_string()))?;

            let label = format!("{}.activate", name);
            cfg.on_activate_sync(move |actor, t| hit(actor, &label, describe(&t)))?;

            Ok(())
        }

        fn with_p(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            Self::lifecycle(cfg)?;
            cfg.super_behavior("P")
        }

        fn derived(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            Self::lifecycle(cfg)?;
            cfg.super_behavior("A")
        }

        fn idle(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_receive_sync(|_actor, greeting: String| Ok(format!("{}, stranger", greeting)))
        }

        fn typed(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_receive_sync(|_actor, _: String| Ok("typed"))?;
            cfg.on_receive_any(|_actor, message| {
                let name = message.type_name();
                Box::pin(async move { anyhow::Ok(Reply::new(format!("any:{}", name))) })
            })?;
            cfg.super_behavior("Base")
        }

        fn base(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_receive_sync(|_actor, n: u32| Ok(n * 2))
        }

        fn leaf(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("Base")
        }

        fn chain_a(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("ChainB")
        }

        fn chain_b(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("ChainC")
        }

        fn chain_c(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_reminder_sync("r", |actor| {
                actor.log.push("C handled r".to_string());
                Ok(())
            })
        }

        fn reminders(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_reminder_sync("tick", |actor| {
                actor.log.push("tick".to_string());
                Ok(())
            })?;
            cfg.on_any_reminder(|actor, id| {
                actor.log.push(format!("any:{}", id));
                Box::pin(async move { anyhow::Ok(()) })
            })?;
            cfg.super_behavior("ChainC")
        }

        fn guarded(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_receive_sync(|actor, amount: i64| {
                if amount < 0 {
                    anyhow::bail!("negative amount {}", amount);
                }
                actor.log.push(format!("accepted {}", amount));
                Ok(amount)
            })
        }

        fn self_super(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("SelfSuper")
        }

        fn x(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("Y")
        }

        fn y(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("Z")
        }

        fn z(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.super_behavior("X")
        }

        fn nested(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_become(|actor, _t| {
                Box::pin(async move {
                    let result = actor.become_behavior("A").await;
                    actor.nested = result.err().map(|e| e.to_string());
                    anyhow::Ok(())
                })
            })
        }

        fn callback_in_hook(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_activate(|actor, _t| {
                let result = actor.on_unhandled_receive(|_actor, _message, _behavior| {
                    Box::pin(async move { anyhow::Ok(Reply::unit()) })
                });
                actor.nested = result.err().map(|e| e.to_string());
                Box::pin(async move { anyhow::Ok(()) })
            })
        }

        fn switcher(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_receive(|actor, switch: Switch| {
                Box::pin(async move {
                    actor.become_behavior(switch.0).await?;
                    anyhow::Ok(())
                })
            })
        }

        fn duplicate(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_activate(|_actor, _t| Box::pin(async move { anyhow::Ok(()) }))?;
            cfg.on_activate_sync(|_actor, _t| Ok(()))
        }

        fn blank_reminder(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
            cfg.on_reminder_sync("  ", |_actor| Ok(()))
        }
    }

    impl Actor for Probe {
        fn type_name() -> &'static str {
            "Probe"
        }

        fn register(behaviors: &mut RegistryBuilder<Self>) {
            behaviors
                .behavior("A", Self::lifecycle)
                .behavior("B", Self::lifecycle)
                .behavior("C", Self::lifecycle)
                .behavior("P", Self::lifecycle)
                .behavior("WithP1", Self::with_p)
                .behavior("WithP2", Self::with_p)
                .behavior("Derived", Self::derived)
                .behavior("Idle", Self::idle)
                .behavior("Active", |_| Ok(()))
                .behavior("Typed", Self::typed)
                .behavior("Base", Self::base)
                .behavior("Leaf", Self::leaf)
                .behavior("ChainA", Self::chain_a)
                .behavior("ChainB", Self::chain_b)
                .behavior("ChainC", Self::chain_c)
                .behavior("Reminders", Self::reminders)
                .behavior("Guarded", Self::guarded)
                .behavior("SelfSuper", Self::self_super)
                .behavior("X", Self::x)
                .behavior("Y", Self::y)
                .behavior("Z", Self::z)
                .behavior("Nested", Self::nested)
                .behavior("CallbackInHook", Self::callback_in_hook)
                .behavior("Switcher", Self::switcher)
                .behavior("Duplicate", Self::duplicate)
                .behavior("BlankReminder", Self::blank_reminder);
        }
    }

    fn engine() -> BehaviorEngine<Probe> {
        BehaviorEngine::new(Probe::default(), BehaviorRegistry::build().unwrap())
    }

    fn configuration_error(error: BehaviorError) -> ConfigurationError {
        match error {
            BehaviorError::Configuration(e) => e,
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    // ------------------------------------------------------------------------
    // Initial / Become guards
    // ------------------------------------------------------------------------

    #[test]
    fn test_engine_starts_in_null_behavior() {
        let engine = engine();

        assert!(!engine.is_initialized());
        assert_eq!(engine.current(), None);
        assert!(engine.current_behavior().is_null());
    }

    #[test]
    fn test_initial_only_once() {
        let mut engine = engine();

        engine.initial("A").unwrap();
        assert_eq!(engine.current(), Some("A"));

        let error = configuration_error(engine.initial("B").unwrap_err());
        assert_eq!(error, ConfigurationError::AlreadyInitialized);
        assert_eq!(engine.current(), Some("A"));
    }

    #[test]
    fn test_initial_does_not_activate() {
        let mut engine = engine();

        engine.initial("A").unwrap();

        assert!(engine.log.is_empty());
        assert!(!engine.is_configuring());
    }

    #[test]
    fn test_initial_unknown_behavior() {
        let mut engine = engine();

        let error = configuration_error(engine.initial("Missing").unwrap_err());
        assert_eq!(
            error,
            ConfigurationError::UnknownBehavior {
                actor: "Probe".to_string(),
                behavior: "Missing".to_string(),
            }
        );
        assert!(!engine.is_initialized());
    }

    #[tokio::test]
    async fn test_become_before_initial_fails() {
        let mut engine = engine();

        let error = configuration_error(engine.become_behavior("A").await.unwrap_err());
        assert_eq!(error, ConfigurationError::NotInitialized);
    }

    #[tokio::test]
    async fn test_become_to_current_behavior_fails() {
        let mut engine = engine();
        engine.initial("A").unwrap();

        let error = configuration_error(engine.become_behavior("A").await.unwrap_err());
        assert_eq!(error, ConfigurationError::AlreadyBehavingAs("A".to_string()));
        assert!(engine.log.is_empty());
    }

    #[tokio::test]
    async fn test_become_unknown_behavior_leaves_engine_untouched() {
        let mut engine = engine();
        engine.initial("A").unwrap();

        let error = configuration_error(engine.become_behavior("Missing").await.unwrap_err());
        assert!(matches!(error, ConfigurationError::UnknownBehavior { .. }));
        assert_eq!(engine.current(), Some("A"));
        assert!(engine.log.is_empty());
    }

    // ------------------------------------------------------------------------
    // Transition ordering
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_become_runs_hooks_in_order() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        engine
            .on_become(|actor, t| {
                let result = hit(actor, "global", t.to_string());
                Box::pin(async move { result })
            })
            .unwrap();

        engine.become_behavior("B").await.unwrap();
        engine.become_behavior("C").await.unwrap();

        assert_eq!(
            engine.log,
            vec![
                "A.deactivate(A -> B)@A",
                "A.unbecome(A -> B)@A",
                "B.become(A -> B)@B",
                "global(A -> B)@B",
                "B.activate(A -> B)@B",
                "B.deactivate(B -> C)@B",
                "B.unbecome(B -> C)@B",
                "C.become(B -> C)@C",
                "global(B -> C)@C",
                "C.activate(B -> C)@C",
            ]
        );
        assert_eq!(engine.current(), Some("C"));
        assert!(!engine.is_configuring());
    }

    #[tokio::test]
    async fn test_host_activation_is_separate_from_initial() {
        let mut engine = engine();
        engine.initial("A").unwrap();

        engine.handle_activate().await.unwrap();
        engine.handle_deactivate().await.unwrap();

        assert_eq!(engine.log, vec!["A.activate(host)@A", "A.deactivate(host)@A"]);
    }

    #[tokio::test]
    async fn test_configuration_reruns_on_every_entry() {
        let mut engine = engine();
        engine.initial("A").unwrap();

        engine.become_behavior("B").await.unwrap();
        engine.become_behavior("A").await.unwrap();
        engine.become_behavior("B").await.unwrap();

        assert_eq!(engine.configured["A"], 2);
        assert_eq!(engine.configured["B"], 2);
    }

    #[tokio::test]
    async fn test_hook_failure_before_swap_keeps_current() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        engine.fail_on = Some("A.unbecome");

        let error = engine.become_behavior("B").await.unwrap_err();

        assert!(matches!(&error, BehaviorError::Hook(e) if e.downcast_ref::<Jammed>().is_some()));
        assert_eq!(engine.current(), Some("A"));
        assert_eq!(engine.log, vec!["A.deactivate(A -> B)@A"]);
        assert!(!engine.is_configuring());
    }

    #[tokio::test]
    async fn test_hook_failure_after_swap_commits_new_behavior() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        engine.fail_on = Some("B.activate");

        let error = engine.become_behavior("B").await.unwrap_err();

        assert!(matches!(error, BehaviorError::Hook(_)));
        assert_eq!(engine.current(), Some("B"));
        assert_eq!(
            engine.log,
            vec![
                "A.deactivate(A -> B)@A",
                "A.unbecome(A -> B)@A",
                "B.become(A -> B)@B",
            ]
        );

        // a faulted transition does not wedge the engine
        engine.fail_on = None;
        engine.become_behavior("C").await.unwrap();
        assert_eq!(engine.current(), Some("C"));
    }

    #[tokio::test]
    async fn test_become_hook_failure_skips_callback_and_activate() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        engine
            .on_become(|actor, t| {
                let result = hit(actor, "global", t.to_string());
                Box::pin(async move { result })
            })
            .unwrap();
        engine.actor_mut().fail_on = Some("B.become");

        let error = engine.become_behavior("B").await.unwrap_err();

        assert!(matches!(&error, BehaviorError::Hook(e) if e.downcast_ref::<Jammed>().is_some()));
        assert_eq!(engine.current(), Some("B"));
        assert_eq!(engine.log, vec!["A.deactivate(A -> B)@A", "A.unbecome(A -> B)@A"]);
        assert!(!engine.is_configuring());
    }

    #[tokio::test]
    async fn test_global_callback_failure_skips_activate() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        engine
            .on_become(|actor, t| {
                let result = hit(actor, "global", t.to_string());
                Box::pin(async move { result })
            })
            .unwrap();
        engine.actor_mut().fail_on = Some("global");

        let error = engine.become_behavior("B").await.unwrap_err();

        assert!(matches!(&error, BehaviorError::Hook(e) if e.downcast_ref::<Jammed>().is_some()));
        assert_eq!(engine.current(), Some("B"));
        assert_eq!(
            engine.log,
            vec![
                "A.deactivate(A -> B)@A",
                "A.unbecome(A -> B)@A",
                "B.become(A -> B)@B",
            ]
        );
        assert!(!engine.is_configuring());
    }

    #[tokio::test]
    async fn test_become_from_transition_hook_fails() {
        let mut engine = engine();
        engine.initial("B").unwrap();

        engine.become_behavior("Nested").await.unwrap();

        assert_eq!(engine.current(), Some("Nested"));
        assert_eq!(
            engine.nested.as_deref(),
            Some("Become cannot be called while configuring behavior")
        );
    }

    #[tokio::test]
    async fn test_become_from_message_handler() {
        let mut engine = engine();
        engine.initial("Switcher").unwrap();

        let reply = engine.handle_receive(Message::new(Switch("A"))).await.unwrap();

        assert!(reply.is_unit());
        assert_eq!(engine.current(), Some("A"));
    }

    #[tokio::test]
    async fn test_configuration_error_from_handler_is_not_wrapped() {
        let mut engine = engine();
        engine.initial("Switcher").unwrap();

        let error = engine.handle_receive(Message::new(Switch("Switcher"))).await.unwrap_err();

        assert!(error.is_configuration());
        assert!(!error.is_unhandled());
        assert_eq!(
            error.as_configuration(),
            Some(&ConfigurationError::AlreadyBehavingAs("Switcher".to_string()))
        );
    }

    // ------------------------------------------------------------------------
    // Super behaviors
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_super_is_reused_from_current_chain() {
        let mut engine = engine();
        engine.initial("WithP1").unwrap();
        let first = engine.current_behavior().super_behavior().cloned().unwrap();

        engine.become_behavior("WithP2").await.unwrap();

        let second = engine.current_behavior().super_behavior().unwrap();
        assert!(Arc::ptr_eq(&first, second));
        assert_eq!(engine.configured["P"], 1);
    }

    #[tokio::test]
    async fn test_super_reuses_current_behavior_itself() {
        let mut engine = engine();
        engine.initial("A").unwrap();
        let a = engine.current_behavior().clone();
        engine
            .on_become(|actor, t| {
                let shared = t
                    .to_behavior()
                    .super_behavior()
                    .is_some_and(|parent| Arc::ptr_eq(parent, t.from_behavior()));
                actor.nested = Some(format!("shared={}", shared));
                Box::pin(async move { anyhow::Ok(()) })
            })
            .unwrap();

        engine.become_behavior("Derived").await.unwrap();

        let parent = engine.current_behavior().super_behavior().unwrap();
        assert!(Arc::ptr_eq(&a, parent));
        assert_eq!(engine.configured["A"], 1);
        assert_eq!(engine.nested.as_deref(), Some("shared=true"));
    }

    #[test]
    fn test_super_builds_chain_in_order() {
        let mut engine = engine();
        engine.initial("ChainA").unwrap();

        let names: Vec<&str> = engine.current_behavior().chain().map(|b| b.name()).collect();
        assert_eq!(names, vec!["ChainA", "ChainB", "ChainC"]);
        assert!(engine.current_behavior().includes("ChainC"));
        assert_eq!(engine.current_behavior().depth(), 2);
    }

    #[test]
    fn test_direct_self_super_fails() {
        let mut engine = engine();

        let error = configuration_error(engine.initial("SelfSuper").unwrap_err());
        assert_eq!(
            error,
            ConfigurationError::CyclicSuper {
                behavior: "SelfSuper".to_string(),
                parent: "SelfSuper".to_string(),
            }
        );
        assert!(!engine.is_initialized());
        assert!(!engine.is_configuring());
    }

    #[test]
    fn test_indirect_cycle_fails_when_closed() {
        let mut engine = engine();

        let error = configuration_error(engine.initial("X").unwrap_err());
        assert_eq!(
            error,
            ConfigurationError::CyclicSuper {
                behavior: "Z".to_string(),
                parent: "X".to_string(),
            }
        );
    }

    #[test]
    fn test_super_chain_depth_is_bounded() {
        let registry =
            BehaviorRegistry::build_with(BehaviorConfig::default().with_max_super_depth(1)).unwrap();
        let mut engine = BehaviorEngine::new(Probe::default(), registry);

        let error = configuration_error(engine.initial("ChainA").unwrap_err());
        assert_eq!(
            error,
            ConfigurationError::SuperChainTooDeep {
                behavior: "ChainA".to_string(),
                max: 1,
            }
        );
    }

    // ------------------------------------------------------------------------
    // Message dispatch
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_exact_type_beats_catch_all() {
        let mut engine = engine();
        engine.initial("Typed").unwrap();

        let reply = engine.handle_receive(Message::new("hi".to_string())).await.unwrap();
        assert_eq!(reply.downcast::<&str>().unwrap(), "typed");

        // the node's catch-all wins over an exact handler further up the chain
        let reply = engine.handle_receive(Message::new(21u32)).await.unwrap();
        assert_eq!(reply.downcast::<String>().unwrap(), "any:u32");
    }

    #[tokio::test]
    async fn test_receive_delegates_to_super() {
        let mut engine = engine();
        engine.initial("Leaf").unwrap();

        let reply = engine.handle_receive(Message::new(21u32)).await.unwrap();
        assert_eq!(reply.downcast::<u32>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_unhandled_message_names_behavior_and_type() {
        let mut engine = engine();
        engine.initial("Leaf").unwrap();

        let error = engine.handle_receive(Message::new(true)).await.unwrap_err();
        assert!(error.is_unhandled());
        assert!(error.as_configuration().is_none());
        match error {
            BehaviorError::UnhandledMessage {
                actor,
                behavior,
                message,
            } => {
                assert_eq!(actor, "Probe");
                assert_eq!(behavior, "Leaf");
                assert_eq!(message, "bool");
            }
            other => panic!("expected unhandled message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_idle_active_scenario() {
        let mut engine = engine();
        engine.initial("Idle").unwrap();

        let reply = engine.handle_receive(Message::new("hi".to_string())).await.unwrap();
        assert_eq!(reply.downcast::<String>().unwrap(), "hi, stranger");

        engine.become_behavior("Active").await.unwrap();

        let error = engine.handle_receive(Message::new("hi".to_string())).await.unwrap_err();
        assert!(matches!(
            error,
            BehaviorError::UnhandledMessage { ref behavior, .. } if behavior == "Active"
        ));

        engine
            .on_unhandled_receive(|_actor, message, behavior| {
                let text = message.downcast_ref::<String>().cloned().unwrap_or_default();
                let reply = Reply::new(format!("{} ignored {}", behavior, text));
                Box::pin(async move { anyhow::Ok(reply) })
            })
            .unwrap();

        let reply = engine.handle_receive(Message::new("hi".to_string())).await.unwrap();
        assert_eq!(reply.downcast::<String>().unwrap(), "Active ignored hi");
    }

    #[tokio::test]
    async fn test_sync_handler_replies_and_fails() {
        let mut engine = engine();
        engine.initial("Guarded").unwrap();

        let reply = engine.handle_receive(Message::new(5i64)).await.unwrap();
        assert_eq!(reply.downcast::<i64>().unwrap(), 5);

        let error = engine.handle_receive(Message::new(-1i64)).await.unwrap_err();
        assert!(matches!(&error, BehaviorError::Hook(e) if e.to_string() == "negative amount -1"));
        assert_eq!(engine.current(), Some("Guarded"));

        let probe = engine.into_actor();
        assert_eq!(probe.log, vec!["accepted 5"]);
    }

    // ------------------------------------------------------------------------
    // Reminder dispatch
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reminder_resolves_through_super_chain() {
        let mut engine = engine();
        engine.initial("ChainA").unwrap();

        engine.handle_reminder("r").await.unwrap();

        assert_eq!(engine.log, vec!["C handled r"]);
    }

    #[tokio::test]
    async fn test_reminder_precedence() {
        let mut engine = engine();
        engine.initial("Reminders").unwrap();

        engine.handle_reminder("tick").await.unwrap();
        engine.handle_reminder("r").await.unwrap();

        // the id-less catch-all wins over the super's exact handler
        assert_eq!(engine.log, vec!["tick", "any:r"]);
    }

    #[tokio::test]
    async fn test_unhandled_reminder() {
        let mut engine = engine();
        engine.initial("ChainA").unwrap();

        let error = engine.handle_reminder("missing").await.unwrap_err();
        assert!(matches!(
            error,
            BehaviorError::UnhandledReminder { ref behavior, ref reminder, .. }
                if behavior == "ChainA" && reminder == "missing"
        ));

        engine
            .on_unhandled_reminder(|actor, id, behavior| {
                actor.log.push(format!("{} fallback {}", behavior, id));
                Box::pin(async move { anyhow::Ok(()) })
            })
            .unwrap();

        engine.handle_reminder("missing").await.unwrap();
        assert_eq!(engine.log, vec!["ChainA fallback missing"]);
    }

    // ------------------------------------------------------------------------
    // Global callbacks & declaration errors
    // ------------------------------------------------------------------------

    #[test]
    fn test_global_callbacks_are_set_once() {
        let mut engine = engine();

        engine
            .on_unhandled_reminder(|_actor, _id, _behavior| Box::pin(async move { anyhow::Ok(()) }))
            .unwrap();
        let error = engine
            .on_unhandled_reminder(|_actor, _id, _behavior| Box::pin(async move { anyhow::Ok(()) }))
            .unwrap_err();
        assert_eq!(
            configuration_error(error),
            ConfigurationError::CallbackAlreadySet("Unhandled reminder")
        );

        engine
            .on_become(|_actor, _t| Box::pin(async move { anyhow::Ok(()) }))
            .unwrap();
        assert!(engine
            .on_become(|_actor, _t| Box::pin(async move { anyhow::Ok(()) }))
            .is_err());
    }

    #[tokio::test]
    async fn test_global_callback_rejected_during_transition() {
        let mut engine = engine();
        engine.initial("A").unwrap();

        engine.become_behavior("CallbackInHook").await.unwrap();

        assert_eq!(
            engine.nested.as_deref(),
            Some("Unhandled message callback cannot be set while configuring behavior")
        );
    }

    #[test]
    fn test_duplicate_hook_declaration_fails() {
        let mut engine = engine();

        let error = configuration_error(engine.initial("Duplicate").unwrap_err());
        assert_eq!(
            error,
            ConfigurationError::DuplicateHandler {
                behavior: "Duplicate".to_string(),
                handler: "OnActivate".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_reminder_id_fails() {
        let mut engine = engine();

        let error = configuration_error(engine.initial("BlankReminder").unwrap_err());
        assert_eq!(error, ConfigurationError::InvalidReminderId);
    }

    #[tokio::test]
    async fn test_metrics_are_recorded() {
        let metrics = Arc::new(BehaviorMetrics::new().unwrap());
        let mut engine = engine().with_metrics(metrics.clone());

        engine.initial("A").unwrap();
        engine.become_behavior("B").await.unwrap();
        let _ = engine.handle_receive(Message::new(1u8)).await;
        let _ = engine.handle_reminder("missing").await;
        engine.fail_on = Some("B.deactivate");
        let _ = engine.become_behavior("C").await;

        assert_eq!(metrics.configurations.with_label_values(&["Probe", "A"]).get(), 1);
        assert_eq!(metrics.transitions.with_label_values(&["Probe", "A", "B"]).get(), 1);
        assert_eq!(metrics.unhandled_messages.with_label_values(&["Probe", "B"]).get(), 1);
        assert_eq!(metrics.unhandled_reminders.with_label_values(&["Probe", "B"]).get(), 1);
        assert_eq!(
            metrics.hook_failures.with_label_values(&["Probe", "B", "OnDeactivate"]).get(),
            1
        );
        assert_eq!(metrics.transitions.with_label_values(&["Probe", "B", "C"]).get(), 0);
    }
}
