// Background runner for simulations
// At most one run is active per host; observers follow it through the event channel

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{LlmStudent, LlmTeacher};
use crate::config::{AppConfig, ModelProvider};
use crate::error::{TutorError, TutorResult};
use crate::integrations::{LanguageModel, ModelError};
use crate::reinforcement::{initialize_policy, StudyStrategy};
use crate::simulation::{
    Curriculum, EventSink, LearningEnvironment, RoundRecord, RunStatus, SimulationEvent,
    SimulationPlan, SummaryStatistics,
};

/// One learned Q-value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QValueEntry {
    pub topic: String,
    pub action: StudyStrategy,
    pub value: f64,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub records: Vec<RoundRecord<StudyStrategy>>,
    pub summary: SummaryStatistics,
    /// Curriculum at the end of the run
    pub curriculum: Vec<String>,
    /// Q-table snapshot ordered by topic, then action
    pub q_values: Vec<QValueEntry>,
    pub cancelled: bool,
}

struct RunHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    task: JoinHandle<TutorResult<RunReport>>,
}

/// Starts simulations on the tokio runtime and publishes their events
pub struct SimulationHost {
    events: broadcast::Sender<SimulationEvent>,
    active: Option<RunHandle>,
}

impl SimulationHost {
    /// Create a host whose event channel buffers `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            events,
            active: None,
        }
    }

    /// Sender side of the event channel, e.g. for the log forwarding layer
    pub fn events(&self) -> broadcast::Sender<SimulationEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Id and start time of the current (or last unawaited) run
    pub fn current_run(&self) -> Option<(Uuid, DateTime<Utc>)> {
        self.active
            .as_ref()
            .map(|handle| (handle.id, handle.started_at))
    }

    /// Launch a simulation in the background. Fails if one is already running.
    pub fn start(
        &mut self,
        model: Arc<dyn LanguageModel>,
        config: AppConfig,
    ) -> TutorResult<Uuid> {
        if let Some(handle) = self.active.as_ref().filter(|h| !h.task.is_finished()) {
            self.events.emit(SimulationEvent::status(
                RunStatus::Info,
                "Simulation already running.",
            ));
            return Err(TutorError::SimulationAlreadyRunning { run_id: handle.id });
        }
        config.validate()?;

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let cancel = CancellationToken::new();
        info!("Starting simulation run {}", id);
        self.events.emit(SimulationEvent::status(
            RunStatus::Info,
            "Starting simulation...",
        ));

        let task = tokio::spawn(execute(
            id,
            started_at,
            model,
            config,
            self.events.clone(),
            cancel.clone(),
        ));
        self.active = Some(RunHandle {
            id,
            started_at,
            cancel,
            task,
        });
        Ok(id)
    }

    /// Ask the active run to stop after its current round
    pub fn cancel(&self) -> TutorResult<()> {
        let handle = self.active.as_ref().ok_or(TutorError::NoActiveRun)?;
        warn!("Cancelling simulation run {}", handle.id);
        handle.cancel.cancel();
        Ok(())
    }

    /// Token that cancels the active run, for wiring to signals
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.active.as_ref().map(|handle| handle.cancel.clone())
    }

    /// Wait for the active run and return its report
    pub async fn wait(&mut self) -> TutorResult<RunReport> {
        let handle = self.active.take().ok_or(TutorError::NoActiveRun)?;
        match handle.task.await {
            Ok(result) => result,
            Err(e) => {
                // The task never reached its own error reporting
                error!("Simulation run {} aborted: {}", handle.id, e);
                self.events.emit(SimulationEvent::status(
                    RunStatus::Error,
                    format!("Simulation error: {}", e),
                ));
                Err(TutorError::task_failed(e.to_string()))
            }
        }
    }
}

impl Default for SimulationHost {
    fn default() -> Self {
        Self::new(256)
    }
}

fn unavailable_message(provider: ModelProvider) -> &'static str {
    match provider {
        ModelProvider::Ollama => "Ollama server not running.",
        ModelProvider::OpenAi => "OpenAI API not reachable.",
    }
}

async fn execute(
    run_id: Uuid,
    started_at: DateTime<Utc>,
    model: Arc<dyn LanguageModel>,
    config: AppConfig,
    events: broadcast::Sender<SimulationEvent>,
    cancel: CancellationToken,
) -> TutorResult<RunReport> {
    if !model.is_available().await {
        let message = unavailable_message(config.model.provider);
        error!("{}", message);
        events.emit(SimulationEvent::status(RunStatus::Error, message));
        return Err(ModelError::Unreachable {
            host: config.model.host.clone(),
            message: message.to_string(),
        }
        .into());
    }

    events.emit(SimulationEvent::status(
        RunStatus::Running,
        "Simulation started.",
    ));

    match simulate(run_id, started_at, model, &config, &events, &cancel).await {
        Ok(report) => {
            if report.cancelled {
                events.emit(SimulationEvent::status(
                    RunStatus::Cancelled,
                    "Simulation cancelled.",
                ));
            } else {
                events.emit(SimulationEvent::status(
                    RunStatus::Completed,
                    "Simulation finished successfully.",
                ));
            }
            events.emit(SimulationEvent::Finished {
                summary: report.summary.clone(),
                rounds: report.records.clone(),
            });
            Ok(report)
        }
        Err(e) => {
            error!("Simulation error: {}", e);
            events.emit(SimulationEvent::status(
                RunStatus::Error,
                format!("Simulation error: {}", e),
            ));
            Err(e)
        }
    }
}

async fn simulate(
    run_id: Uuid,
    started_at: DateTime<Utc>,
    model: Arc<dyn LanguageModel>,
    config: &AppConfig,
    events: &broadcast::Sender<SimulationEvent>,
    cancel: &CancellationToken,
) -> TutorResult<RunReport> {
    let teacher = LlmTeacher::new(model.clone(), config.model.teacher_model.clone());
    let student = LlmStudent::new(model, config.model.student_model.clone());
    let policy = initialize_policy(config.policy, config.simulation.seed);
    let curriculum = Curriculum::new(config.simulation.topics.iter().cloned())?;

    let sink: Arc<dyn EventSink> = Arc::new(events.clone());
    let mut environment = LearningEnvironment::new(teacher, student, policy).with_events(sink);
    if let Some(seed) = config.simulation.seed {
        // Topic sampling gets its own stream, distinct from the policy's
        environment = environment.with_seed(seed.wrapping_add(1));
    }

    let plan = SimulationPlan::from(&config.simulation);
    let outcome = environment.run_simulation(&plan, curriculum, cancel).await?;

    let mut q_values: Vec<QValueEntry> = environment
        .policy()
        .entries()
        .map(|(topic, action, value)| QValueEntry {
            topic: topic.clone(),
            action: *action,
            value,
        })
        .collect();
    q_values.sort_by(|a, b| a.topic.cmp(&b.topic).then(a.action.cmp(&b.action)));

    Ok(RunReport {
        run_id,
        started_at,
        records: environment.into_results(),
        summary: outcome.summary,
        curriculum: outcome.curriculum.into_topics(),
        q_values,
        cancelled: outcome.cancelled,
    })
}
