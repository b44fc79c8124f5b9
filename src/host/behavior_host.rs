use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, Infallible};
use kameo::message::Context;
use kameo::reply::{Reply as KameoReply, ReplyError};

use crate::actor::Actor;
use crate::behaviors::BehaviorEngine;
use crate::errors::BehaviorError;
use crate::message::{Message, Reply};

// ============================================================================
// Messages
// ============================================================================

/// Deliver a message to the current behavior
#[derive(Debug)]
pub struct Receive(pub Message);

impl Receive {
    pub fn new<M: std::any::Any + Send>(payload: M) -> Self {
        Self(Message::new(payload))
    }
}

/// Deliver a reminder by id
#[derive(Debug, Clone)]
pub struct Remind(pub String);

/// Ask which behavior the actor is in
#[derive(Debug, Clone, Copy)]
pub struct CurrentBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorStatus {
    pub actor: &'static str,
    pub current: Option<String>,
}

impl KameoReply for BehaviorStatus {
    type Ok = Self;
    type Error = Infallible;
    type Value = Self;

    fn to_result(self) -> Result<Self, Infallible> {
        Ok(self)
    }

    fn into_any_err(self) -> Option<Box<dyn ReplyError>> {
        None
    }

    fn into_value(self) -> Self::Value {
        self
    }
}

// ============================================================================
// Behavior Host Actor
// ============================================================================

pub struct BehaviorHost<A> {
    engine: BehaviorEngine<A>,
}

impl<A: Actor> kameo::Actor for BehaviorHost<A> {
    type Args = BehaviorEngine<A>;
    type Error = BehaviorError;

    async fn on_start(
        engine: Self::Args,
        _actor_ref: ActorRef<Self>,
    ) -> Result<Self, Self::Error> {
        let mut host = Self { engine };

        host.engine.handle_activate().await?;

        tracing::info!(
            actor = A::type_name(),
            behavior = ?host.engine.current(),
            "Behavior host started"
        );

        Ok(host)
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        tracing::info!(
            actor = A::type_name(),
            behavior = ?self.engine.current(),
            reason = ?reason,
            "Behavior host stopping"
        );

        self.engine.handle_deactivate().await
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl<A: Actor> kameo::message::Message<Receive> for BehaviorHost<A> {
    type Reply = Result<Reply, BehaviorError>;

    async fn handle(&mut self, msg: Receive, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.engine.handle_receive(msg.0).await
    }
}

impl<A: Actor> kameo::message::Message<Remind> for BehaviorHost<A> {
    type Reply = Result<(), BehaviorError>;

    async fn handle(&mut self, msg: Remind, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.engine.handle_reminder(&msg.0).await
    }
}

impl<A: Actor> kameo::message::Message<CurrentBehavior> for BehaviorHost<A> {
    type Reply = BehaviorStatus;

    async fn handle(
        &mut self,
        _msg: CurrentBehavior,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        BehaviorStatus {
            actor: A::type_name(),
            current: self.engine.current().map(str::to_string),
        }
    }
}
