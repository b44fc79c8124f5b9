// ============================================================================
// Behaviors Module
// ============================================================================
//
// Runtime-switchable actor behaviors.
//
// Structure:
// - registry      - per actor-class table of configuration procedures
// - custom        - one node per configured behavior (hooks + handlers + super)
// - transition    - (from, to) pair passed to lifecycle hooks
// - configurator  - the behavior under construction
// - callbacks     - hook signatures and set-once global callback slots
// - engine        - per-instance orchestrator (Initial / Become / dispatch)
//
// ============================================================================

mod callbacks;
mod configurator;
mod custom;
mod engine;
mod registry;
mod transition;

pub use callbacks::HookFuture;
pub use configurator::Configurator;
pub use custom::CustomBehavior;
pub use engine::BehaviorEngine;
pub use registry::{BehaviorRegistry, Configure, RegistryBuilder};
pub use transition::Transition;
