use crate::behaviors::RegistryBuilder;

// ============================================================================
// Actor Class
// ============================================================================
//
// An actor class declares its named behaviors once. The resulting table is
// built by BehaviorRegistry::build and shared by every instance of the class.
//
// ============================================================================

/// Trait for actor state types that switch between named behaviors
pub trait Actor: Send + Sized + 'static {
    /// Name used in logs, metrics and error messages
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declare every behavior of this actor class
    fn register(behaviors: &mut RegistryBuilder<Self>);
}
