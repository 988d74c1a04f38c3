// Events published while a simulation runs
// Delivery is fire-and-forget: a sink must never block or fail the simulation

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::reinforcement::StudyStrategy;
use crate::simulation::{RoundRecord, SummaryStatistics};

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Info,
    Running,
    Completed,
    Cancelled,
    Error,
}

/// Notification sent to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// A round is about to start
    Progress {
        current_round: usize,
        total_rounds: usize,
    },
    Status {
        status: RunStatus,
        message: String,
    },
    /// A formatted log line
    Log { line: String },
    /// Final statistics and per-round records of a finished run
    Finished {
        summary: SummaryStatistics,
        rounds: Vec<RoundRecord<StudyStrategy>>,
    },
}

impl SimulationEvent {
    pub fn status(status: RunStatus, message: impl Into<String>) -> Self {
        SimulationEvent::Status {
            status,
            message: message.into(),
        }
    }
}

/// Receiver of simulation events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SimulationEvent);
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SimulationEvent) {}
}

impl EventSink for broadcast::Sender<SimulationEvent> {
    fn emit(&self, event: SimulationEvent) {
        // No subscribers is not an error
        let _ = self.send(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: SimulationEvent) {
        (**self).emit(event)
    }
}

/// Sink that keeps every event, for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink(pub std::sync::Mutex<Vec<SimulationEvent>>);

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<SimulationEvent> {
        self.0.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: SimulationEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let (tx, rx) = broadcast::channel::<SimulationEvent>(4);
        drop(rx);
        tx.emit(SimulationEvent::Progress {
            current_round: 1,
            total_rounds: 3,
        });
    }

    #[test]
    fn test_every_subscriber_receives_events() {
        let (tx, mut first) = broadcast::channel::<SimulationEvent>(4);
        let mut second = tx.subscribe();
        let sink: Arc<dyn EventSink> = Arc::new(tx);

        sink.emit(SimulationEvent::status(RunStatus::Running, "Simulation started."));

        for rx in [&mut first, &mut second] {
            assert_eq!(
                rx.try_recv().unwrap(),
                SimulationEvent::status(RunStatus::Running, "Simulation started.")
            );
        }
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_value(SimulationEvent::Progress {
            current_round: 2,
            total_rounds: 5,
        })
        .unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["current_round"], 2);

        let json = serde_json::to_value(SimulationEvent::status(RunStatus::Error, "boom")).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn test_finished_event_carries_rounds() {
        let record = RoundRecord {
            round_number: 1,
            topic: "Basic Math".to_string(),
            difficulty: crate::config::Difficulty::Easy,
            problem: "What is 2+2?".to_string(),
            action: StudyStrategy::AnswerConcisely,
            response: "4".to_string(),
            feedback: "Correct.".to_string(),
            reward: 1.0,
        };
        let json = serde_json::to_value(SimulationEvent::Finished {
            summary: SummaryStatistics::default(),
            rounds: vec![record],
        })
        .unwrap();

        assert_eq!(json["event"], "finished");
        assert_eq!(json["rounds"][0]["topic"], "Basic Math");
        assert_eq!(json["rounds"][0]["action"], "answer_concisely");
        assert_eq!(json["rounds"][0]["reward"], 1.0);
    }
}
