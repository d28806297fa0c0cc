use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowline_core::domain::{FlowlineError, User, UserId};
use flowline_core::impls::InMemoryStore;
use flowline_core::ports::{ClaimAction, Notifier, SystemClock, UlidGenerator};
use flowline_core::Engine;

/// Notifier that prints to the terminal instead of a chat platform.
struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_to_user(
        &self,
        user: UserId,
        text: &str,
        claim: Option<ClaimAction>,
    ) -> Result<(), FlowlineError> {
        match claim {
            Some(action) => println!(
                "-> to {user}: {text}\n   [claim: {}]",
                action.task_execution_id
            ),
            None => println!("-> to {user}: {text}"),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), FlowlineError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) Wire the engine over the in-memory adapters.
    let store = Arc::new(InMemoryStore::new());
    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(ConsoleNotifier),
        Arc::new(SystemClock),
        Arc::new(UlidGenerator::new(SystemClock)),
    );

    // (B) A team of two, enrolled by join key.
    let alice = User::new(UserId::new(1), "alice", "Alice", "Ng");
    let bob = User::new(UserId::new(2), "bob", "Bob", "Diaz");
    let team = engine.teams.create_team(&alice, "fulfillment", "order desk").await?;
    engine.teams.join(&bob, &team.join_key).await?;
    info!(team = %team.id, key = %team.join_key, "team ready");

    // (C) Author a small process: receive -> pack, receive -> close (final).
    let owner = User::new(UserId::new(99), "carol", "Carol", "Boss");
    let process = engine
        .authoring
        .create_process(&owner, "order fulfillment", "ship an incoming order")
        .await?;
    let receive = engine
        .authoring
        .create_task(process.id, "receive order", "log the incoming order", Some(team.id), false)
        .await?;
    let pack = engine
        .authoring
        .create_task(process.id, "pack shipment", "box the goods", Some(team.id), false)
        .await?;
    let close = engine
        .authoring
        .create_task(process.id, "close order", "confirm and archive", Some(team.id), true)
        .await?;
    engine.authoring.add_prerequisite(pack.id, receive.id).await?;
    engine.authoring.add_prerequisite(close.id, receive.id).await?;

    // (D) Start a run; the root task fans out to the team.
    let run = engine.start_process_execution(process.id).await?;
    print_counts(&engine, run.id).await?;

    // (E) Alice wins the claim; Bob is too late.
    let receive_exec = engine
        .runs
        .execution_for(run.id, receive.id)
        .await?
        .expect("root execution exists");
    engine.assign_task_execution(receive_exec.id, alice.id).await?;
    if let Err(err) = engine.assign_task_execution(receive_exec.id, bob.id).await {
        println!("bob lost the race: {err}");
    }

    // (F) Completing the root activates both dependents.
    engine.complete_task_execution(receive_exec.id, alice.id).await?;
    print_counts(&engine, run.id).await?;

    // (G) Bob closes the order; the final task terminates the run.
    let close_exec = engine
        .runs
        .execution_for(run.id, close.id)
        .await?
        .expect("close execution exists");
    engine.assign_task_execution(close_exec.id, bob.id).await?;
    engine.complete_task_execution(close_exec.id, bob.id).await?;

    let finished = engine.runs.run(run.id).await?;
    println!(
        "run {} finished: status={} completed_at={:?}",
        finished.id,
        serde_json::to_string(&finished.status).unwrap_or_default(),
        finished.completed_at
    );
    print_counts(&engine, run.id).await?;

    Ok(())
}

async fn print_counts(
    engine: &Engine,
    run: flowline_core::domain::ProcessExecutionId,
) -> Result<(), FlowlineError> {
    let counts = engine.runs.counts(run).await?;
    println!(
        "counts: {}",
        serde_json::to_string(&counts).unwrap_or_default()
    );
    Ok(())
}
