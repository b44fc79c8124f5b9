// ============================================================================
// Actor Behaviors
// ============================================================================
//
// Named, runtime-switchable behaviors for message-driven actors: ordered
// transitions with async lifecycle hooks, and hierarchical fallback of
// message/reminder handling through super behaviors.
//
// ============================================================================

mod actor;
mod config;
mod errors;
mod message;

pub mod behaviors;
pub mod host;
pub mod metrics;

pub use actor::Actor;
pub use behaviors::{
    BehaviorEngine, BehaviorRegistry, Configurator, Configure, CustomBehavior, HookFuture,
    RegistryBuilder, Transition,
};
pub use config::BehaviorConfig;
pub use errors::{BehaviorError, ConfigurationError, Result};
pub use message::{Message, Reply};
pub use metrics::BehaviorMetrics;
