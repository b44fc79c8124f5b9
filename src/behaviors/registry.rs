use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Configurator;
use crate::actor::Actor;
use crate::config::BehaviorConfig;
use crate::errors::{BehaviorError, ConfigurationError};

// ============================================================================
// Behavior Registry
// ============================================================================
//
// Per actor-class table: behavior name -> configuration procedure.
// Built once per class (Actor::register), immutable afterwards and shared
// read-only by every instance through an Arc.
//
// ============================================================================

/// Configuration procedure: declares a behavior's hooks on the mode under construction
pub type Configure<A> = fn(&mut Configurator<'_, A>) -> Result<(), BehaviorError>;

pub struct BehaviorRegistry<A> {
    actor: &'static str,
    behaviors: HashMap<String, Configure<A>>,
    config: BehaviorConfig,
}

impl<A: Actor> BehaviorRegistry<A> {
    /// Register the actor class with the default configuration
    pub fn build() -> Result<Arc<Self>, ConfigurationError> {
        Self::build_with(BehaviorConfig::default())
    }

    /// Register the actor class
    pub fn build_with(config: BehaviorConfig) -> Result<Arc<Self>, ConfigurationError> {
        let mut builder = RegistryBuilder::new();
        A::register(&mut builder);

        if let Some(error) = builder.error {
            return Err(error);
        }

        tracing::debug!(
            actor = A::type_name(),
            behaviors = builder.behaviors.len(),
            "Registered actor behaviors"
        );

        Ok(Arc::new(Self {
            actor: A::type_name(),
            behaviors: builder.behaviors,
            config,
        }))
    }

    /// Procedure registered under `name`, or None if there is none
    pub fn lookup(&self, name: &str) -> Option<Configure<A>> {
        self.behaviors.get(name).copied()
    }

    /// Like lookup, but absence is a configuration error naming the actor
    pub fn require(&self, name: &str) -> Result<Configure<A>, ConfigurationError> {
        self.lookup(name)
            .ok_or_else(|| ConfigurationError::UnknownBehavior {
                actor: self.actor.to_string(),
                behavior: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }
}

impl<A> BehaviorRegistry<A> {
    pub fn actor(&self) -> &'static str {
        self.actor
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Registered behavior names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.behaviors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl<A> fmt::Debug for BehaviorRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("actor", &self.actor)
            .field("behaviors", &self.names())
            .field("config", &self.config)
            .finish()
    }
}

/// Collects behavior declarations during Actor::register
pub struct RegistryBuilder<A> {
    behaviors: HashMap<String, Configure<A>>,
    error: Option<ConfigurationError>,
}

impl<A> RegistryBuilder<A> {
    fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            error: None,
        }
    }

    /// Declare a behavior. The first invalid or duplicate declaration is
    /// reported when the registry is built.
    pub fn behavior(&mut self, name: &str, configure: Configure<A>) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        if name.trim().is_empty() {
            self.error = Some(ConfigurationError::InvalidBehaviorName);
        } else if self.behaviors.insert(name.to_string(), configure).is_some() {
            self.error = Some(ConfigurationError::DuplicateBehavior(name.to_string()));
        }

        self
    }
}
