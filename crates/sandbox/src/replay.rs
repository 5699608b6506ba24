//! Scenario replay against a live runtime.
use std::time::Duration;

use anyhow::Result;
use effect_content::{Scenario, ScenarioStep};
use effect_core::{ActorId, DispelSelector, EngineError, SkillId};
use effect_runtime::{RuntimeHandle, Topic};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How `Wait` steps pass time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Fire timers on the caller through `advance_to`.
    Virtual,
    /// Sleep and let the scheduler workers fire timers.
    RealTime,
}

/// Prints every effect event as one JSON line until the bus closes.
pub fn spawn_printer(handle: &RuntimeHandle) -> JoinHandle<Result<usize>> {
    let mut events = handle.subscribe(Topic::Effects);
    tokio::spawn(async move {
        let mut printed: usize = 0;
        loop {
            match events.recv().await {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    printed += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "sandbox", skipped, "event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok::<usize, anyhow::Error>(printed)
    })
}

/// Registers the scenario's actors and runs its steps in order.
pub async fn replay(handle: &RuntimeHandle, scenario: &Scenario, pacing: Pacing) {
    for actor in &scenario.actors {
        handle.spawn_actor(actor.to_profile());
    }
    info!(
        target: "sandbox",
        scenario = %scenario.name,
        actors = scenario.actors.len(),
        steps = scenario.steps.len(),
        "replaying scenario"
    );

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(target: "sandbox", index, ?step, "step");
        run_step(handle, step, pacing).await;
        // Give the printer a chance to keep up with bursts.
        tokio::task::yield_now().await;
    }
}

async fn run_step(handle: &RuntimeHandle, step: &ScenarioStep, pacing: Pacing) {
    match step {
        ScenarioStep::Cast { caster, target, .. } => {
            let Some(skill) = step.skill_ref() else {
                return;
            };
            for (template, result) in handle.apply_skill(ActorId(*caster), ActorId(*target), skill)
            {
                match result {
                    Ok(applied) => debug!(
                        target: "sandbox",
                        %template,
                        effect = %applied.effect,
                        refreshed = applied.refreshed,
                        "applied"
                    ),
                    Err(error) => {
                        let severity = error.severity();
                        if severity.is_internal() {
                            warn!(
                                target: "sandbox",
                                %template,
                                code = error.error_code(),
                                severity = severity.as_str(),
                                %error,
                                "cast failed"
                            );
                        } else {
                            info!(
                                target: "sandbox",
                                %template,
                                code = error.error_code(),
                                severity = severity.as_str(),
                                retryable = severity.is_recoverable(),
                                %error,
                                "cast rejected"
                            );
                        }
                    }
                }
            }
        }
        ScenarioStep::Dispel { actor, selector } => {
            let removed = handle.dispel(ActorId(*actor), *selector);
            info!(target: "sandbox", actor, removed, "dispel");
        }
        ScenarioStep::Cancel {
            requester,
            actor,
            skill,
        } => {
            let removed = handle.cancel_buff(ActorId(*requester), ActorId(*actor), SkillId(*skill));
            info!(target: "sandbox", requester, actor, removed, "cancel");
        }
        ScenarioStep::Cleanse { actor, abnormal } => {
            let removed = handle.dispel(ActorId(*actor), DispelSelector::Abnormal(*abnormal));
            info!(target: "sandbox", actor, %abnormal, removed, "cleanse");
        }
        ScenarioStep::Kill { actor } => {
            let removed = handle.on_actor_death(ActorId(*actor));
            info!(target: "sandbox", actor, removed, "actor died");
        }
        ScenarioStep::Remove { actor } => {
            let removed = handle.on_actor_removed(ActorId(*actor));
            info!(target: "sandbox", actor, removed, "actor removed");
        }
        ScenarioStep::Wait { ms } => match pacing {
            Pacing::Virtual => {
                let fired = handle.advance_to(handle.now_ms().saturating_add(*ms));
                debug!(target: "sandbox", ms, fired, "advanced");
            }
            Pacing::RealTime => tokio::time::sleep(Duration::from_millis(*ms)).await,
        },
    }
}
