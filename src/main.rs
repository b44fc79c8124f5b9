use std::sync::Arc;

use kameo::actor::ActorRef;
use kameo::error::SendError;
use kameo::prelude::*;
use kameo::Actor as _;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use actor_behaviors::host::{BehaviorHost, CurrentBehavior, Receive, Remind};
use actor_behaviors::metrics::render_metrics;
use actor_behaviors::{
    Actor, BehaviorConfig, BehaviorEngine, BehaviorError, BehaviorMetrics, BehaviorRegistry,
    Configurator, RegistryBuilder, Reply,
};

// ============================================================================
// Door - demo actor
// ============================================================================
//
//   Closed --OpenDoor--> Open --CloseDoor--> Closed --Lock--> Locked --Unlock--> Closed
//
// Open and Locked share the Base behavior, which answers Status queries and
// handles the "inspect" reminder.
//
// ============================================================================

#[derive(Debug)]
struct OpenDoor;

#[derive(Debug)]
struct CloseDoor;

#[derive(Debug)]
struct Lock(String);

#[derive(Debug)]
struct Unlock(String);

#[derive(Debug)]
struct Status;

#[derive(Default)]
struct Door {
    code: Option<String>,
    openings: u32,
}

impl Door {
    fn closed(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
        cfg.on_receive(|door, _: OpenDoor| {
            Box::pin(async move {
                door.openings += 1;
                door.become_behavior("Open").await?;
                anyhow::Ok(())
            })
        })?;

        cfg.on_receive(|door, lock: Lock| {
            Box::pin(async move {
                door.code = Some(lock.0);
                door.become_behavior("Locked").await?;
                anyhow::Ok(())
            })
        })
    }

    fn open(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
        cfg.on_become_sync(|door, transition| {
            tracing::info!(from = %transition.from(), openings = door.openings, "Door opened");
            Ok(())
        })?;

        cfg.on_receive(|door, _: CloseDoor| {
            Box::pin(async move {
                door.become_behavior("Closed").await?;
                anyhow::Ok(())
            })
        })?;

        cfg.super_behavior("Base")
    }

    fn locked(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
        cfg.on_activate_sync(|_door, transition| {
            let from = transition.as_ref().map(|t| t.from().to_string());
            tracing::info!(from = ?from, "Door locked");
            Ok(())
        })?;

        cfg.on_receive(|door, unlock: Unlock| {
            Box::pin(async move {
                if door.code.as_deref() != Some(unlock.0.as_str()) {
                    anyhow::bail!("wrong code");
                }

                door.code = None;
                door.become_behavior("Closed").await?;
                anyhow::Ok(())
            })
        })?;

        cfg.super_behavior("Base")
    }

    fn base(cfg: &mut Configurator<'_, Self>) -> Result<(), BehaviorError> {
        cfg.on_receive_sync(|door, _: Status| {
            Ok(format!(
                "{} (opened {} times)",
                door.current().unwrap_or("uninitialized"),
                door.openings
            ))
        })?;

        cfg.on_reminder_sync("inspect", |door| {
            tracing::info!(behavior = ?door.current(), openings = door.openings, "Door inspected");
            Ok(())
        })
    }
}

impl Actor for Door {
    fn type_name() -> &'static str {
        "Door"
    }

    fn register(behaviors: &mut RegistryBuilder<Self>) {
        behaviors
            .behavior("Closed", Door::closed)
            .behavior("Open", Door::open)
            .behavior("Locked", Door::locked)
            .behavior("Base", Door::base);
    }
}

async fn send<M>(door: &ActorRef<BehaviorHost<Door>>, message: M) -> anyhow::Result<Reply>
where
    M: std::any::Any + Send,
{
    door.ask(Receive::new(message))
        .send()
        .await
        .map_err(|e| match e {
            SendError::HandlerError(error) => anyhow::Error::from(error),
            other => anyhow::anyhow!("door unreachable: {:?}", other),
        })
}

async fn status(door: &ActorRef<BehaviorHost<Door>>) -> anyhow::Result<String> {
    send(door, Status)
        .await?
        .downcast::<String>()
        .map_err(|reply| anyhow::anyhow!("unexpected status reply: {}", reply.type_name()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actor_behaviors=debug")),
        )
        .init();

    tracing::info!("Starting actor behaviors demo");

    // === 1. Metrics & registry ===
    let metrics = Arc::new(BehaviorMetrics::new()?);
    let registry = BehaviorRegistry::<Door>::build_with(BehaviorConfig::default())?;
    tracing::info!(behaviors = ?registry.names(), "Door behaviors registered");

    // === 2. Engine with global callbacks ===
    let mut engine = BehaviorEngine::new(Door::default(), registry).with_metrics(metrics.clone());

    engine.on_become(|_door, transition| {
        tracing::info!(transition = %transition, "Door changed behavior");
        Box::pin(async move { anyhow::Ok(()) })
    })?;

    engine.on_unhandled_receive(|_door, message, behavior| {
        let reply = Reply::new(format!("{} ignores {}", behavior, message.type_name()));
        Box::pin(async move { anyhow::Ok(reply) })
    })?;

    engine.initial("Closed")?;

    // === 3. Host the engine in a kameo actor ===
    let door = BehaviorHost::spawn(engine);

    let reply = send(&door, Status).await?;
    if let Some(text) = reply.downcast_ref::<String>() {
        tracing::info!(reply = %text, "Status while closed");
    }

    send(&door, OpenDoor).await?;
    tracing::info!(status = %status(&door).await?, "Door status");

    door.tell(Remind("inspect".to_string()))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("door unreachable: {:?}", e))?;

    send(&door, CloseDoor).await?;
    send(&door, Lock("1234".to_string())).await?;
    tracing::info!(status = %status(&door).await?, "Door status");

    if let Err(error) = send(&door, Unlock("0000".to_string())).await {
        tracing::warn!(error = %error, "Unlock rejected");
    }

    send(&door, Unlock("1234".to_string())).await?;

    let current = door
        .ask(CurrentBehavior)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("door unreachable: {:?}", e))?;
    tracing::info!(actor = current.actor, behavior = ?current.current, "Final behavior");

    // === 4. Shutdown ===
    door.stop_gracefully()
        .await
        .map_err(|e| anyhow::anyhow!("door unreachable: {:?}", e))?;
    door.wait_for_shutdown().await;

    println!("{}", render_metrics(metrics.registry())?);

    tracing::info!("Demo finished");
    Ok(())
}
