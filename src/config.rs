// ============================================================================
// Behavior Configuration
// ============================================================================
//
// Per actor-class settings, attached to the BehaviorRegistry when it is built
// and shared by every instance of that class.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BehaviorConfig {
    /// Maximum number of super behaviors chained below a single behavior
    pub max_super_depth: usize,
    /// Log a warning when a message or reminder falls through to the default failure
    pub warn_on_unhandled: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_super_depth: 16,
            warn_on_unhandled: true,
        }
    }
}

impl BehaviorConfig {
    /// Shallow hierarchies only, every unhandled dispatch is reported
    pub fn strict() -> Self {
        Self {
            max_super_depth: 4,
            warn_on_unhandled: true,
        }
    }

    /// Deep hierarchies allowed, unhandled dispatch is left to the caller
    pub fn relaxed() -> Self {
        Self {
            max_super_depth: 64,
            warn_on_unhandled: false,
        }
    }

    pub fn with_max_super_depth(mut self, depth: usize) -> Self {
        self.max_super_depth = depth;
        self
    }
}
