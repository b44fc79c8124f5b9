use std::any::{Any, TypeId};
use std::fmt;

// ============================================================================
// Message & Reply Envelopes
// ============================================================================
//
// The host hands the engine arbitrary payloads. A Message remembers the
// runtime type of its payload so dispatch can pick the handler keyed by that
// type, and so unhandled failures can name it.
//
// ============================================================================

pub struct Message {
    payload: Box<dyn Any + Send>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Message {
    pub fn new<M: Any + Send>(payload: M) -> Self {
        Self {
            payload: Box::new(payload),
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<M: Any>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    pub fn downcast_ref<M: Any>(&self) -> Option<&M> {
        self.payload.downcast_ref::<M>()
    }

    /// Take the payload out, or get the message back if the type does not match
    pub fn downcast<M: Any>(self) -> Result<M, Message> {
        let Message {
            payload,
            type_id,
            type_name,
        } = self;

        match payload.downcast::<M>() {
            Ok(value) => Ok(*value),
            Err(payload) => Err(Message {
                payload,
                type_id,
                type_name,
            }),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Result of a handled message
pub struct Reply {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Reply {
    pub fn new<R: Any + Send>(value: R) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<R>(),
        }
    }

    /// Reply of handlers that produce no value
    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn is<R: Any>(&self) -> bool {
        self.value.is::<R>()
    }

    pub fn is_unit(&self) -> bool {
        self.is::<()>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.value.downcast_ref::<R>()
    }

    pub fn downcast<R: Any>(self) -> Result<R, Reply> {
        let Reply { value, type_name } = self;

        match value.downcast::<R>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Reply { value, type_name }),
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
