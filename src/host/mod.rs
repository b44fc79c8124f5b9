// ============================================================================
// Host Adapter
// ============================================================================
//
// Runs a BehaviorEngine inside a kameo actor. kameo delivers one message at a
// time per actor, which is exactly the serialization the engine relies on.
//
// ============================================================================

mod behavior_host;

pub use behavior_host::{BehaviorHost, BehaviorStatus, CurrentBehavior, Receive, Remind};
