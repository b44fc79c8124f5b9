// ============================================================================
// Behavior Errors
// ============================================================================
//
// ConfigurationError covers misuse of the engine (meant to surface during
// development). BehaviorError is what every engine operation returns.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "Can't find configuration procedure for behavior '{behavior}' defined on actor {actor}"
    )]
    UnknownBehavior { actor: String, behavior: String },

    #[error("Behavior '{0}' is registered more than once")]
    DuplicateBehavior(String),

    #[error("Behavior name cannot be empty or whitespace")]
    InvalidBehaviorName,

    #[error("Initial behavior has been already set")]
    AlreadyInitialized,

    #[error("Initial behavior should be set before calling Become")]
    NotInitialized,

    #[error("Become cannot be called while configuring behavior")]
    BecomeWhileConfiguring,

    #[error("Actor is already behaving as '{0}'")]
    AlreadyBehavingAs(String),

    #[error(
        "Detected cyclic declaration of super behaviors. '{parent}' is already within super chain of {behavior}"
    )]
    CyclicSuper { behavior: String, parent: String },

    #[error("Super chain of '{behavior}' exceeds the maximum depth of {max}")]
    SuperChainTooDeep { behavior: String, max: usize },

    #[error("{0} callback has been already set")]
    CallbackAlreadySet(&'static str),

    #[error("{0} callback cannot be set while configuring behavior")]
    CallbackWhileConfiguring(&'static str),

    #[error("Behavior '{behavior}' already has a {handler} handler")]
    DuplicateHandler { behavior: String, handler: String },

    #[error("Reminder id cannot be empty or whitespace")]
    InvalidReminderId,
}

#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Actor {actor} in behavior '{behavior}' has no handler for message of type {message}")]
    UnhandledMessage {
        actor: String,
        behavior: String,
        message: String,
    },

    #[error("Actor {actor} in behavior '{behavior}' has no handler for reminder '{reminder}'")]
    UnhandledReminder {
        actor: String,
        behavior: String,
        reminder: String,
    },

    /// A user hook or handler faulted; the original error is preserved.
    #[error(transparent)]
    Hook(anyhow::Error),
}

// Handlers that call back into the engine and bubble its error up with `?`
// get that error back as-is rather than wrapped as a hook failure.
impl From<anyhow::Error> for BehaviorError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<BehaviorError>() {
            Ok(inner) => inner,
            Err(error) => BehaviorError::Hook(error),
        }
    }
}

impl BehaviorError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, BehaviorError::Configuration(_))
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(
            self,
            BehaviorError::UnhandledMessage { .. } | BehaviorError::UnhandledReminder { .. }
        )
    }

    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            BehaviorError::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = BehaviorError> = std::result::Result<T, E>;
