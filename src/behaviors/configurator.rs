use std::any::{Any, TypeId};
use std::sync::Arc;

use super::callbacks::{receive_handler, reminder_handler, HookFuture};
use super::{BehaviorEngine, BehaviorRegistry, CustomBehavior, Transition};
use crate::actor::Actor;
use crate::errors::{BehaviorError, ConfigurationError};
use crate::message::{Message, Reply};

// ============================================================================
// Configurator - the behavior under construction
// ============================================================================
//
// Handed to a configuration procedure while it runs. It owns the node being
// populated and knows the lineage of nodes still under construction above it,
// so a Super declaration can be cycle-checked and configured recursively
// without touching any engine state.
//
// ============================================================================

pub struct Configurator<'a, A> {
    actor: &'a mut A,
    registry: &'a BehaviorRegistry<A>,
    current: &'a Arc<CustomBehavior<A>>,
    lineage: Vec<String>,
    node: CustomBehavior<A>,
}

impl<'a, A: Actor> Configurator<'a, A> {
    /// Run the procedure registered under `name` and freeze the resulting node
    pub(crate) fn configure(
        actor: &'a mut A,
        registry: &'a BehaviorRegistry<A>,
        current: &'a Arc<CustomBehavior<A>>,
        name: &str,
    ) -> Result<Arc<CustomBehavior<A>>, BehaviorError> {
        let procedure = registry.require(name)?;

        let mut configurator = Configurator {
            actor,
            registry,
            current,
            lineage: vec![name.to_string()],
            node: CustomBehavior::new(name),
        };

        procedure(&mut configurator)?;
        Ok(Arc::new(configurator.node))
    }

    /// Mutable access to the actor state while configuring
    pub fn actor(&mut self) -> &mut A {
        self.actor
    }

    /// Name of the behavior being configured
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Declare `parent` as the fallback behavior of the one being configured.
    ///
    /// A parent already present in the current behavior's chain is shared
    /// as-is; otherwise its procedure runs to build a fresh node.
    pub fn super_behavior(&mut self, parent: &str) -> Result<(), BehaviorError> {
        let procedure = self.registry.require(parent)?;

        if self.lineage.iter().any(|name| name == parent) || self.node.includes(parent) {
            return Err(self.cyclic(parent).into());
        }

        let max = self.registry.config().max_super_depth;

        if let Some(existing) = self.current.find_super(parent) {
            if existing.chain().any(|node| self.lineage.iter().any(|name| name == node.name())) {
                return Err(self.cyclic(parent).into());
            }

            if self.lineage.len() + existing.depth() > max {
                return Err(self.too_deep(max).into());
            }

            tracing::debug!(
                actor = A::type_name(),
                behavior = %self.node.name(),
                parent = %parent,
                "Reusing existing super behavior"
            );

            self.node.set_super(existing);
            return Ok(());
        }

        if self.lineage.len() > max {
            return Err(self.too_deep(max).into());
        }

        let mut lineage = self.lineage.clone();
        lineage.push(parent.to_string());

        let mut child = Configurator {
            actor: &mut *self.actor,
            registry: self.registry,
            current: self.current,
            lineage,
            node: CustomBehavior::new(parent),
        };

        procedure(&mut child)?;

        tracing::debug!(
            actor = A::type_name(),
            behavior = %self.node.name(),
            parent = %parent,
            "Configured super behavior"
        );

        self.node.set_super(Arc::new(child.node));
        Ok(())
    }

    fn cyclic(&self, parent: &str) -> ConfigurationError {
        ConfigurationError::CyclicSuper {
            behavior: self.node.name().to_string(),
            parent: parent.to_string(),
        }
    }

    fn too_deep(&self, max: usize) -> ConfigurationError {
        ConfigurationError::SuperChainTooDeep {
            behavior: self.lineage.first().cloned().unwrap_or_default(),
            max,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle hooks
    // ------------------------------------------------------------------------

    pub fn on_become<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Transition<A>) -> HookFuture<'e> + Send + Sync + 'static,
    {
        Ok(self.node.set_on_become(Arc::new(hook))?)
    }

    pub fn on_unbecome<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Transition<A>) -> HookFuture<'e> + Send + Sync + 'static,
    {
        Ok(self.node.set_on_unbecome(Arc::new(hook))?)
    }

    /// Runs when this behavior becomes active, with the transition that led
    /// here, or with None when the host activates the actor
    pub fn on_activate<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Option<Transition<A>>) -> HookFuture<'e>
            + Send
            + Sync
            + 'static,
    {
        Ok(self.node.set_on_activate(Arc::new(hook))?)
    }

    pub fn on_deactivate<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Option<Transition<A>>) -> HookFuture<'e>
            + Send
            + Sync
            + 'static,
    {
        Ok(self.node.set_on_deactivate(Arc::new(hook))?)
    }

    // Synchronous forms, for hooks that never await

    pub fn on_become_sync<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: Fn(&mut BehaviorEngine<A>, Transition<A>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_become(move |engine, transition| {
            let result = hook(engine, transition);
            Box::pin(async move { result })
        })
    }

    pub fn on_unbecome_sync<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: Fn(&mut BehaviorEngine<A>, Transition<A>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_unbecome(move |engine, transition| {
            let result = hook(engine, transition);
            Box::pin(async move { result })
        })
    }

    pub fn on_activate_sync<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: Fn(&mut BehaviorEngine<A>, Option<Transition<A>>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.on_activate(move |engine, transition| {
            let result = hook(engine, transition);
            Box::pin(async move { result })
        })
    }

    pub fn on_deactivate_sync<F>(&mut self, hook: F) -> Result<(), BehaviorError>
    where
        F: Fn(&mut BehaviorEngine<A>, Option<Transition<A>>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.on_deactivate(move |engine, transition| {
            let result = hook(engine, transition);
            Box::pin(async move { result })
        })
    }

    // ------------------------------------------------------------------------
    // Message handlers
    // ------------------------------------------------------------------------

    /// Handle messages of type `M`; the handler's output becomes the reply
    pub fn on_receive<M, R, F>(&mut self, handler: F) -> Result<(), BehaviorError>
    where
        M: Any + Send,
        R: Any + Send,
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, M) -> HookFuture<'e, R> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<M>();

        let erased = receive_handler(move |engine, message| {
            let reply = match message.downcast::<M>() {
                Ok(message) => Ok(handler(engine, message)),
                Err(message) => Err(message),
            };

            Box::pin(async move {
                match reply {
                    Ok(reply) => reply.await.map(Reply::new),
                    Err(message) => Err(anyhow::anyhow!(
                        "message of type {} routed to handler for {}",
                        message.type_name(),
                        type_name
                    )),
                }
            })
        });

        Ok(self.node.add_receiver(TypeId::of::<M>(), type_name, erased)?)
    }

    /// Like on_receive, for handlers that compute their reply without awaiting
    pub fn on_receive_sync<M, R, F>(&mut self, handler: F) -> Result<(), BehaviorError>
    where
        M: Any + Send,
        R: Any + Send,
        F: Fn(&mut BehaviorEngine<A>, M) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.on_receive::<M, R, _>(move |engine, message| {
            let result = handler(engine, message);
            Box::pin(async move { result })
        })
    }

    /// Catch-all handler, consulted after every typed handler of this behavior
    pub fn on_receive_any<F>(&mut self, handler: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, Message) -> HookFuture<'e, Reply> + Send + Sync + 'static,
    {
        Ok(self.node.set_receive_any(Arc::new(handler))?)
    }

    // ------------------------------------------------------------------------
    // Reminder handlers
    // ------------------------------------------------------------------------

    pub fn on_reminder<F>(&mut self, id: &str, handler: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>) -> HookFuture<'e> + Send + Sync + 'static,
    {
        if id.trim().is_empty() {
            return Err(ConfigurationError::InvalidReminderId.into());
        }

        let erased = reminder_handler(move |engine, _id| handler(engine));
        Ok(self.node.add_reminder(id.to_string(), erased)?)
    }

    pub fn on_reminder_sync<F>(&mut self, id: &str, handler: F) -> Result<(), BehaviorError>
    where
        F: Fn(&mut BehaviorEngine<A>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_reminder(id, move |engine| {
            let result = handler(engine);
            Box::pin(async move { result })
        })
    }

    /// Catch-all reminder handler; receives the reminder id
    pub fn on_any_reminder<F>(&mut self, handler: F) -> Result<(), BehaviorError>
    where
        F: for<'e> Fn(&'e mut BehaviorEngine<A>, String) -> HookFuture<'e> + Send + Sync + 'static,
    {
        Ok(self.node.set_reminder_any(Arc::new(handler))?)
    }
}
