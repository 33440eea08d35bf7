//! Agent runtime: listener task plus day scheduler.
//!
//! [`run`] drives one [`Agent`] for a bounded number of simulated days:
//!
//! 1. Optionally subscribe to the readiness control topic (lines only).
//! 2. Subscribe to every topic the agent listens on and call
//!    [`Agent::on_subscribed`].
//! 3. Spawn the listener, which dispatches decoded commands to
//!    [`Agent::handle`] as they arrive.
//! 4. Optionally block until the warehouse announces readiness.
//! 5. Run [`Agent::on_day`] once per day, sleeping between days.
//!
//! The listener and the scheduler share the agent through an `Arc` and
//! never call each other. Malformed messages are logged and skipped,
//! transient store or bus failures are logged and left for the next day,
//! and fatal errors end the run.

use std::sync::Arc;
use std::time::Duration;

use kanban_bus::{MessageBus, Subscription};
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument as _, debug, error, info, info_span, warn};

use crate::agent::{Agent, AgentError};
use crate::config::SimulationConfig;
use crate::handshake;

/// How long and how fast an agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of simulated days before the agent exits.
    pub days_max: u32,
    /// Real time per simulated day.
    pub day_interval: Duration,
    /// Block the first day until the warehouse announces readiness.
    pub wait_for_warehouse: bool,
}

impl RunOptions {
    /// Pacing taken from the `simulation` config section.
    pub const fn from_simulation(config: &SimulationConfig, wait_for_warehouse: bool) -> Self {
        Self {
            days_max: config.days_max,
            day_interval: Duration::from_millis(config.day_interval_ms),
            wait_for_warehouse,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Days whose scheduled work was attempted.
    pub days_completed: u32,
}

/// Run `agent` against `bus` until `options.days_max` days have passed.
///
/// # Errors
///
/// Returns the first fatal [`AgentError`] raised by the scheduler or the
/// listener, or a store/bus error raised while subscribing.
pub async fn run(
    agent: Arc<dyn Agent>,
    bus: &dyn MessageBus,
    options: RunOptions,
) -> Result<RunSummary, AgentError> {
    let span = info_span!("agent", entity = agent.entity());
    drive(agent, bus, options).instrument(span).await
}

async fn drive(
    agent: Arc<dyn Agent>,
    bus: &dyn MessageBus,
    options: RunOptions,
) -> Result<RunSummary, AgentError> {
    // Subscribe to the control topic before anything can trigger the
    // warehouse's announcement.
    let readiness = if options.wait_for_warehouse {
        Some(handshake::subscribe_readiness(bus).await?)
    } else {
        None
    };

    let mut subscriptions = Vec::new();
    for topic in agent.subscriptions() {
        subscriptions.push(bus.subscribe(&topic).await?);
    }
    let inbound = Subscription::merge(subscriptions);
    agent.on_subscribed().await?;

    let mut listener: JoinHandle<Result<(), AgentError>> =
        tokio::spawn(listen(Arc::clone(&agent), inbound).in_current_span());

    let schedule = async {
        if let Some(mut readiness) = readiness {
            handshake::await_ready(&mut readiness).await?;
        }
        run_days(agent.as_ref(), options).await
    };

    let outcome = tokio::select! {
        result = schedule => result,
        joined = &mut listener => Err(listener_failure(joined)),
    };
    listener.abort();

    match &outcome {
        Ok(summary) => info!(days = summary.days_completed, "simulation finished"),
        Err(e) => error!(error = %e, "agent stopped"),
    }
    outcome
}

async fn run_days(agent: &dyn Agent, options: RunOptions) -> Result<RunSummary, AgentError> {
    let mut days_completed = 0_u32;
    for day in 1..=options.days_max {
        info!(day, days_max = options.days_max, "day started");
        if let Err(e) = agent.on_day(day).await {
            if e.is_fatal() {
                return Err(e);
            }
            error!(day, error = %e, "daily work failed");
        }
        days_completed = day;
        tokio::time::sleep(options.day_interval).await;
    }
    Ok(RunSummary { days_completed })
}

async fn listen(agent: Arc<dyn Agent>, mut inbound: Subscription) -> Result<(), AgentError> {
    while let Some(delivery) = inbound.next().await {
        let command = match delivery.command {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    topic = %delivery.topic,
                    payload = %delivery.payload,
                    error = %e,
                    "ignoring malformed message"
                );
                continue;
            }
        };
        debug!(topic = %delivery.topic, command = command.keyword(), "received");
        if let Err(e) = agent.handle(command).await {
            if e.is_fatal() {
                return Err(e);
            }
            error!(topic = %delivery.topic, error = %e, "handler failed");
        }
    }
    Ok(())
}

fn listener_failure(joined: Result<Result<(), AgentError>, JoinError>) -> AgentError {
    match joined {
        Ok(Ok(())) => AgentError::ListenerClosed,
        Ok(Err(e)) => e,
        Err(e) => AgentError::ListenerPanicked(e.to_string()),
    }
}
