use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::{BehaviorEngine, Transition};
use crate::errors::ConfigurationError;
use crate::message::{Message, Reply};

// ============================================================================
// Hook & Handler Signatures
// ============================================================================
//
// Every user callback gets the engine itself (which derefs to the actor
// state), so handlers can read and mutate state and trigger transitions.
// Callbacks are stored behind Arc so dispatch can clone one out of the node
// before handing the engine to it mutably.
//
// ============================================================================

/// Future returned by hooks and handlers
pub type HookFuture<'a, T = ()> = BoxFuture<'a, anyhow::Result<T>>;

pub(crate) type TransitionHook<A> =
    Arc<dyn for<'a> Fn(&'a mut BehaviorEngine<A>, Transition<A>) -> HookFuture<'a> + Send + Sync>;

pub(crate) type LifecycleHook<A> = Arc<
    dyn for<'a> Fn(&'a mut BehaviorEngine<A>, Option<Transition<A>>) -> HookFuture<'a>
        + Send
        + Sync,
>;

pub(crate) type ReceiveHandler<A> =
    Arc<dyn for<'a> Fn(&'a mut BehaviorEngine<A>, Message) -> HookFuture<'a, Reply> + Send + Sync>;

pub(crate) type ReminderHandler<A> =
    Arc<dyn for<'a> Fn(&'a mut BehaviorEngine<A>, String) -> HookFuture<'a> + Send + Sync>;

/// Global fallback for messages: (engine, message, current behavior name)
pub(crate) type UnhandledReceive<A> = Arc<
    dyn for<'a> Fn(&'a mut BehaviorEngine<A>, Message, String) -> HookFuture<'a, Reply>
        + Send
        + Sync,
>;

/// Global fallback for reminders: (engine, reminder id, current behavior name)
pub(crate) type UnhandledReminder<A> = Arc<
    dyn for<'a> Fn(&'a mut BehaviorEngine<A>, String, String) -> HookFuture<'a> + Send + Sync,
>;

// Pin a closure to the higher-ranked handler signature before erasing it.
pub(crate) fn receive_handler<A, F>(handler: F) -> ReceiveHandler<A>
where
    F: for<'a> Fn(&'a mut BehaviorEngine<A>, Message) -> HookFuture<'a, Reply> + Send + Sync + 'static,
{
    Arc::new(handler)
}

pub(crate) fn reminder_handler<A, F>(handler: F) -> ReminderHandler<A>
where
    F: for<'a> Fn(&'a mut BehaviorEngine<A>, String) -> HookFuture<'a> + Send + Sync + 'static,
{
    Arc::new(handler)
}

// ============================================================================
// Set-once Callback Slot
// ============================================================================

/// A global callback that may be assigned once and never mid-configuration
pub(crate) struct SetOnce<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> SetOnce<T> {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    pub(crate) fn set(&mut self, value: T, configuring: bool) -> Result<(), ConfigurationError> {
        if self.value.is_some() {
            return Err(ConfigurationError::CallbackAlreadySet(self.name));
        }

        if configuring {
            return Err(ConfigurationError::CallbackWhileConfiguring(self.name));
        }

        self.value = Some(value);
        Ok(())
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn is_set(&self) -> bool {
        self.value.is_some()
    }
}
