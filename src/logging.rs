use chrono::Local;
use std::fmt::{self, Write as _};
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{info, Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter, Layer};

use crate::error::{TutorError, TutorResult};
use crate::simulation::SimulationEvent;

/// Initialize tracing output on stderr, optionally mirroring INFO+ lines to `events`.
///
/// `RUST_LOG` controls the filter and defaults to `info`. Pass `ansi = false` when stderr
/// is not a terminal or the output is being captured.
pub fn init_with_logger(
    ansi: bool,
    events: Option<broadcast::Sender<SimulationEvent>>,
) -> TutorResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt_layer::layer()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_target(ansi);

    let forward = events.map(|tx| EventLogLayer::new(tx).with_filter(LevelFilter::INFO));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(forward)
        .try_init()
        .map_err(|e| TutorError::other(format!("Failed to initialize logging: {}", e)))?;

    info!("Initializing pedagogue v{}", crate::version());
    Ok(())
}

/// Layer that republishes formatted log lines as [`SimulationEvent::Log`]
pub struct EventLogLayer {
    events: broadcast::Sender<SimulationEvent>,
}

impl EventLogLayer {
    pub fn new(events: broadcast::Sender<SimulationEvent>) -> Self {
        Self { events }
    }
}

impl<S: Subscriber> Layer<S> for EventLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.metadata().level(),
            visitor.finish()
        );
        // Nobody listening is fine
        let _ = self.events.send(SimulationEvent::Log { line });
    }
}

/// Collects the message and any extra fields of an event
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
