// show/mod.rs
//! Multi-light shows: prime every target light, animate each one on its
//! own task, then wait for all of them before the finale.

mod client;
pub mod plan;
pub mod variants;

pub use client::GatewayClient;
pub use plan::{Segment, ShowPlan, Step};

use chrono::Utc;
use futures_util::future::join_all;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Barrier;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    control::LightControl,
    error::AppError,
    events::{EventBus, Outcome, Phase, ShowEvent},
    gate, metrics,
    models::{LightId, LightStatusSnapshot, StateCommand},
};

/// What happens to the lights once every animation worker is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finale {
    /// Toggle through the gateway, which switches lit lights off.
    #[default]
    Toggle,
    PowerOff,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed {
        applied: usize,
        skipped: usize,
    },
    /// Stopped at `step` after a failed call; later steps never ran.
    Failed {
        applied: usize,
        skipped: usize,
        step: usize,
        error: String,
    },
    TimedOut,
    Panicked,
}

impl WorkerOutcome {
    fn label(&self) -> &'static str {
        match self {
            WorkerOutcome::Completed { .. } => "completed",
            WorkerOutcome::Failed { .. } => "failed",
            WorkerOutcome::TimedOut => "timed_out",
            WorkerOutcome::Panicked => "panicked",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub light: LightId,
    pub outcome: WorkerOutcome,
}

#[derive(Debug, Clone)]
pub struct ShowReport {
    pub run_id: Uuid,
    /// Lights that passed the gate during priming.
    pub primed: usize,
    pub workers: Vec<WorkerReport>,
    /// Finale calls that the gateway acknowledged.
    pub finalized: usize,
}

pub struct Orchestrator {
    control: Arc<dyn LightControl>,
    events: Arc<EventBus>,
    baseline_brightness: i64,
    worker_timeout: Option<Duration>,
    finale: Finale,
}

impl Orchestrator {
    pub fn new(control: Arc<dyn LightControl>, events: Arc<EventBus>) -> Self {
        Self {
            control,
            events,
            baseline_brightness: 100,
            worker_timeout: None,
            finale: Finale::default(),
        }
    }

    pub fn with_baseline_brightness(mut self, brightness: i64) -> Self {
        self.baseline_brightness = brightness;
        self
    }

    pub fn with_worker_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.worker_timeout = timeout;
        self
    }

    pub fn with_finale(mut self, finale: Finale) -> Self {
        self.finale = finale;
        self
    }

    /// Runs prime, animate and finale in order. Only the initial status
    /// fetch can fail the run; everything after it is reported per light.
    pub async fn run(&self, plan: ShowPlan) -> Result<ShowReport, AppError> {
        let run_id = Uuid::new_v4();
        self.run_phases(run_id, plan)
            .instrument(info_span!("show", %run_id))
            .await
    }

    async fn run_phases(&self, run_id: Uuid, plan: ShowPlan) -> Result<ShowReport, AppError> {
        let reporter = Reporter {
            run_id,
            events: Arc::clone(&self.events),
        };
        let lights = plan.lights();

        let snapshot = Arc::new(self.control.status().await?);
        info!(
            targets = lights.len(),
            known = snapshot.len(),
            "Starting light show"
        );

        let primed = self.prime(&reporter, &snapshot, &lights).await;
        let workers = self.animate(&reporter, &snapshot, plan).await;
        let finalized = self.finalize(&reporter, &snapshot, &lights).await;

        info!(primed, finalized, workers = workers.len(), "Light show finished");
        Ok(ShowReport {
            run_id,
            primed,
            workers,
            finalized,
        })
    }

    /// Sequential: every worker assumes the lights are on at the baseline.
    async fn prime(
        &self,
        reporter: &Reporter,
        snapshot: &LightStatusSnapshot,
        lights: &[LightId],
    ) -> usize {
        let mut primed = 0;
        for light in lights {
            if !gate::permits(snapshot, light) {
                reporter.emit(Phase::Prime, light, "prime", Outcome::Skipped);
                continue;
            }
            primed += 1;

            let already_on = snapshot.get(light).is_some_and(|record| record.on);
            if !already_on {
                let outcome = outcome_of(self.control.toggle(light).await);
                reporter.emit(Phase::Prime, light, "toggle", outcome);
            }

            let outcome = outcome_of(
                self.control
                    .set_brightness(light, self.baseline_brightness)
                    .await,
            );
            reporter.emit(Phase::Prime, light, "set_brightness", outcome);
        }
        primed
    }

    async fn animate(
        &self,
        reporter: &Reporter,
        snapshot: &Arc<LightStatusSnapshot>,
        plan: ShowPlan,
    ) -> Vec<WorkerReport> {
        let segments = plan.into_segments();
        let start = Arc::new(Barrier::new(segments.len()));

        let mut lights = Vec::with_capacity(segments.len());
        let mut handles = Vec::with_capacity(segments.len());
        for segment in segments {
            lights.push(segment.light.clone());
            let worker = Worker {
                control: Arc::clone(&self.control),
                snapshot: Arc::clone(snapshot),
                reporter: reporter.clone(),
                start: Arc::clone(&start),
                timeout: self.worker_timeout,
            };
            handles.push(tokio::spawn(worker.run(segment).in_current_span()));
        }
        info!(workers = handles.len(), "Animation workers launched");

        // Join point: the finale must not start while any worker can still
        // send a command.
        let results = join_all(handles).await;

        lights
            .into_iter()
            .zip(results)
            .map(|(light, result)| {
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(light = %light, error = %e, "Animation worker died");
                        reporter.emit(
                            Phase::Animate,
                            &light,
                            "worker",
                            Outcome::Failed {
                                error: e.to_string(),
                            },
                        );
                        WorkerOutcome::Panicked
                    }
                };
                metrics::record_show_worker(outcome.label());
                WorkerReport { light, outcome }
            })
            .collect()
    }

    async fn finalize(
        &self,
        reporter: &Reporter,
        snapshot: &LightStatusSnapshot,
        lights: &[LightId],
    ) -> usize {
        let operation = match self.finale {
            Finale::Leave => return 0,
            Finale::Toggle => "toggle",
            Finale::PowerOff => "power_off",
        };

        let mut finalized = 0;
        for light in lights {
            if !gate::permits(snapshot, light) {
                reporter.emit(Phase::Finalize, light, operation, Outcome::Skipped);
                continue;
            }
            let result = if self.finale == Finale::Toggle {
                self.control.toggle(light).await
            } else {
                self.control.apply(light, StateCommand::power(false)).await
            };
            if result.is_ok() {
                finalized += 1;
            }
            reporter.emit(Phase::Finalize, light, operation, outcome_of(result));
        }
        finalized
    }
}

fn outcome_of<T>(result: Result<T, AppError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Applied,
        Err(e) => Outcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Logs a show action and publishes it on the event bus.
#[derive(Clone)]
struct Reporter {
    run_id: Uuid,
    events: Arc<EventBus>,
}

impl Reporter {
    fn emit(&self, phase: Phase, light: &LightId, operation: &'static str, outcome: Outcome) {
        match &outcome {
            Outcome::Failed { error } => {
                warn!(?phase, light = %light, operation, error = %error, "Show call failed")
            }
            Outcome::Skipped => {
                info!(?phase, light = %light, operation, "Light is not reachable, skipping")
            }
            other => debug!(?phase, light = %light, operation, outcome = ?other, "Show call"),
        }

        self.events.publish(&ShowEvent {
            run_id: self.run_id,
            at: Utc::now(),
            phase,
            light: light.clone(),
            operation,
            outcome,
        });
    }
}

struct Worker {
    control: Arc<dyn LightControl>,
    snapshot: Arc<LightStatusSnapshot>,
    reporter: Reporter,
    start: Arc<Barrier>,
    timeout: Option<Duration>,
}

impl Worker {
    async fn run(self, segment: Segment) -> WorkerOutcome {
        self.start.wait().await;
        let light = &segment.light;
        self.reporter
            .emit(Phase::Animate, light, "worker", Outcome::Started);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.play(&segment)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.reporter.emit(
                        Phase::Animate,
                        light,
                        "worker",
                        Outcome::Failed {
                            error: format!("timed out after {limit:?}"),
                        },
                    );
                    WorkerOutcome::TimedOut
                }
            },
            None => self.play(&segment).await,
        };

        if let WorkerOutcome::Completed { .. } = outcome {
            self.reporter
                .emit(Phase::Animate, light, "worker", Outcome::Finished);
        }
        outcome
    }

    async fn play(&self, segment: &Segment) -> WorkerOutcome {
        let light = &segment.light;
        let (mut applied, mut skipped) = (0, 0);

        for (index, step) in segment.steps.iter().enumerate() {
            if gate::permits(&self.snapshot, light) {
                match self.control.apply(light, step.command).await {
                    Ok(_) => {
                        applied += 1;
                        self.reporter
                            .emit(Phase::Animate, light, "apply_state", Outcome::Applied);
                    }
                    Err(e) => {
                        let error = e.to_string();
                        self.reporter.emit(
                            Phase::Animate,
                            light,
                            "apply_state",
                            Outcome::Failed {
                                error: error.clone(),
                            },
                        );
                        return WorkerOutcome::Failed {
                            applied,
                            skipped,
                            step: index,
                            error,
                        };
                    }
                }
            } else {
                skipped += 1;
                self.reporter
                    .emit(Phase::Animate, light, "apply_state", Outcome::Skipped);
            }

            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
        }

        WorkerOutcome::Completed { applied, skipped }
    }
}
