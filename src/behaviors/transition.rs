use std::fmt;
use std::sync::Arc;

use super::CustomBehavior;

/// The (from, to) pair handed to lifecycle hooks while a Become is running
pub struct Transition<A> {
    from: Arc<CustomBehavior<A>>,
    to: Arc<CustomBehavior<A>>,
}

impl<A> Transition<A> {
    pub(crate) fn new(from: Arc<CustomBehavior<A>>, to: Arc<CustomBehavior<A>>) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> &str {
        self.from.name()
    }

    pub fn to(&self) -> &str {
        self.to.name()
    }

    pub fn from_behavior(&self) -> &Arc<CustomBehavior<A>> {
        &self.from
    }

    pub fn to_behavior(&self) -> &Arc<CustomBehavior<A>> {
        &self.to
    }
}

impl<A> Clone for Transition<A> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

impl<A> fmt::Debug for Transition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from())
            .field("to", &self.to())
            .finish()
    }
}

impl<A> fmt::Display for Transition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from(), self.to())
    }
}
