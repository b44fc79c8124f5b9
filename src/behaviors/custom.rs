use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::callbacks::{
    LifecycleHook, ReceiveHandler, ReminderHandler, TransitionHook, UnhandledReceive,
    UnhandledReminder,
};
use super::{BehaviorEngine, Transition};
use crate::actor::Actor;
use crate::errors::{BehaviorError, ConfigurationError};
use crate::message::{Message, Reply};

// ============================================================================
// Custom Behavior - one node per named mode
// ============================================================================
//
// A node is populated by its configuration procedure and frozen behind an Arc
// once that procedure returns. Lifecycle hooks only ever run on the node they
// were declared on. Message and reminder dispatch walk the super chain:
//
//   exact key on node -> catch-all on node -> same on super -> ... -> fallback
//
// ============================================================================

pub struct CustomBehavior<A> {
    name: String,
    sentinel: bool,
    super_behavior: Option<Arc<CustomBehavior<A>>>,

    on_become: Option<TransitionHook<A>>,
    on_unbecome: Option<TransitionHook<A>>,
    on_activate: Option<LifecycleHook<A>>,
    on_deactivate: Option<LifecycleHook<A>>,

    receivers: HashMap<TypeId, (&'static str, ReceiveHandler<A>)>,
    receive_any: Option<ReceiveHandler<A>>,

    reminders: HashMap<String, ReminderHandler<A>>,
    reminder_any: Option<ReminderHandler<A>>,
}

impl<A> CustomBehavior<A> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sentinel: false,
            super_behavior: None,
            on_become: None,
            on_unbecome: None,
            on_activate: None,
            on_deactivate: None,
            receivers: HashMap::new(),
            receive_any: None,
            reminders: HashMap::new(),
            reminder_any: None,
        }
    }

    /// The behavior every engine starts in, before Initial
    pub(crate) fn null() -> Self {
        Self {
            sentinel: true,
            ..Self::new("")
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_null(&self) -> bool {
        self.sentinel
    }

    pub fn super_behavior(&self) -> Option<&Arc<CustomBehavior<A>>> {
        self.super_behavior.as_ref()
    }

    /// This node followed by its super chain
    pub fn chain(&self) -> impl Iterator<Item = &CustomBehavior<A>> {
        std::iter::successors(Some(self), |node| node.super_behavior.as_deref())
    }

    /// Number of super behaviors below this node
    pub fn depth(&self) -> usize {
        self.chain().count() - 1
    }

    /// True if `name` is this node or anywhere in its super chain
    pub fn includes(&self, name: &str) -> bool {
        self.chain().any(|node| node.name == name)
    }

    /// First node in the chain (starting with this one) called `name`
    pub fn find_super(self: &Arc<Self>, name: &str) -> Option<Arc<CustomBehavior<A>>> {
        let mut node = Some(self);
        while let Some(current) = node {
            if current.name == name {
                return Some(current.clone());
            }
            node = current.super_behavior.as_ref();
        }
        None
    }

    // ------------------------------------------------------------------------
    // Declaration (only reachable through a Configurator)
    // ------------------------------------------------------------------------

    pub(crate) fn set_super(&mut self, parent: Arc<CustomBehavior<A>>) {
        self.super_behavior = Some(parent);
    }

    pub(crate) fn set_on_become(&mut self, hook: TransitionHook<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.on_become;
        Self::fill(&self.name, "OnBecome", slot, hook)
    }

    pub(crate) fn set_on_unbecome(&mut self, hook: TransitionHook<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.on_unbecome;
        Self::fill(&self.name, "OnUnbecome", slot, hook)
    }

    pub(crate) fn set_on_activate(&mut self, hook: LifecycleHook<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.on_activate;
        Self::fill(&self.name, "OnActivate", slot, hook)
    }

    pub(crate) fn set_on_deactivate(&mut self, hook: LifecycleHook<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.on_deactivate;
        Self::fill(&self.name, "OnDeactivate", slot, hook)
    }

    pub(crate) fn add_receiver(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        handler: ReceiveHandler<A>,
    ) -> Result<(), ConfigurationError> {
        if self.receivers.contains_key(&type_id) {
            return Err(ConfigurationError::DuplicateHandler {
                behavior: self.name.clone(),
                handler: format!("receive({})", type_name),
            });
        }

        self.receivers.insert(type_id, (type_name, handler));
        Ok(())
    }

    pub(crate) fn set_receive_any(&mut self, handler: ReceiveHandler<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.receive_any;
        Self::fill(&self.name, "receive(any)", slot, handler)
    }

    pub(crate) fn add_reminder(
        &mut self,
        id: String,
        handler: ReminderHandler<A>,
    ) -> Result<(), ConfigurationError> {
        if self.reminders.contains_key(&id) {
            return Err(ConfigurationError::DuplicateHandler {
                behavior: self.name.clone(),
                handler: format!("reminder({})", id),
            });
        }

        self.reminders.insert(id, handler);
        Ok(())
    }

    pub(crate) fn set_reminder_any(&mut self, handler: ReminderHandler<A>) -> Result<(), ConfigurationError> {
        let slot = &mut self.reminder_any;
        Self::fill(&self.name, "reminder(any)", slot, handler)
    }

    fn fill<T>(
        behavior: &str,
        handler: &str,
        slot: &mut Option<T>,
        value: T,
    ) -> Result<(), ConfigurationError> {
        if slot.is_some() {
            return Err(ConfigurationError::DuplicateHandler {
                behavior: behavior.to_string(),
                handler: handler.to_string(),
            });
        }

        *slot = Some(value);
        Ok(())
    }

    fn resolve_receive(&self, message: &Message) -> Option<&ReceiveHandler<A>> {
        self.receivers
            .get(&message.type_id())
            .map(|(_, handler)| handler)
            .or(self.receive_any.as_ref())
    }

    fn resolve_reminder(&self, id: &str) -> Option<&ReminderHandler<A>> {
        self.reminders.get(id).or(self.reminder_any.as_ref())
    }
}

impl<A: Actor> CustomBehavior<A> {
    // ------------------------------------------------------------------------
    // Lifecycle hooks (never delegated to super)
    // ------------------------------------------------------------------------

    pub async fn handle_activate(
        &self,
        engine: &mut BehaviorEngine<A>,
        transition: Option<Transition<A>>,
    ) -> Result<(), BehaviorError> {
        if let Some(hook) = &self.on_activate {
            hook(engine, transition).await?;
        }
        Ok(())
    }

    pub async fn handle_deactivate(
        &self,
        engine: &mut BehaviorEngine<A>,
        transition: Option<Transition<A>>,
    ) -> Result<(), BehaviorError> {
        if let Some(hook) = &self.on_deactivate {
            hook(engine, transition).await?;
        }
        Ok(())
    }

    pub async fn handle_become(
        &self,
        engine: &mut BehaviorEngine<A>,
        transition: Transition<A>,
    ) -> Result<(), BehaviorError> {
        if let Some(hook) = &self.on_become {
            hook(engine, transition).await?;
        }
        Ok(())
    }

    pub async fn handle_unbecome(
        &self,
        engine: &mut BehaviorEngine<A>,
        transition: Transition<A>,
    ) -> Result<(), BehaviorError> {
        if let Some(hook) = &self.on_unbecome {
            hook(engine, transition).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatch a message through this node and its super chain. Without a
    /// fallback, an unhandled message fails with `UnhandledMessage`.
    pub async fn handle_receive(
        &self,
        engine: &mut BehaviorEngine<A>,
        message: Message,
        fallback: Option<UnhandledReceive<A>>,
    ) -> Result<Reply, BehaviorError> {
        let resolved = self
            .chain()
            .find_map(|node| node.resolve_receive(&message).map(|handler| (node, handler)));

        if let Some((node, handler)) = resolved {
            tracing::trace!(
                actor = A::type_name(),
                behavior = %self.name,
                handled_by = %node.name,
                message = message.type_name(),
                "Dispatching message"
            );
            return Ok(handler(engine, message).await?);
        }

        match fallback {
            Some(fallback) => Ok(fallback(engine, message, self.name.clone()).await?),
            None => Err(BehaviorError::UnhandledMessage {
                actor: A::type_name().to_string(),
                behavior: self.name.clone(),
                message: message.type_name().to_string(),
            }),
        }
    }

    /// Dispatch a reminder through this node and its super chain. Without a
    /// fallback, an unhandled reminder fails with `UnhandledReminder`.
    pub async fn handle_reminder(
        &self,
        engine: &mut BehaviorEngine<A>,
        id: &str,
        fallback: Option<UnhandledReminder<A>>,
    ) -> Result<(), BehaviorError> {
        let resolved = self
            .chain()
            .find_map(|node| node.resolve_reminder(id).map(|handler| (node, handler)));

        if let Some((node, handler)) = resolved {
            tracing::trace!(
                actor = A::type_name(),
                behavior = %self.name,
                handled_by = %node.name,
                reminder = id,
                "Dispatching reminder"
            );
            return Ok(handler(engine, id.to_string()).await?);
        }

        match fallback {
            Some(fallback) => Ok(fallback(engine, id.to_string(), self.name.clone()).await?),
            None => Err(BehaviorError::UnhandledReminder {
                actor: A::type_name().to_string(),
                behavior: self.name.clone(),
                reminder: id.to_string(),
            }),
        }
    }
}

impl<A> fmt::Debug for CustomBehavior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomBehavior")
            .field("name", &self.name)
            .field("super", &self.super_behavior.as_ref().map(|s| s.name()))
            .field("receivers", &self.receivers.values().map(|(n, _)| *n).collect::<Vec<_>>())
            .field("reminders", &self.reminders.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
