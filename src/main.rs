use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use pedagogue::config::{AppConfig, ConfigLoader, Difficulty, ModelProvider};
use pedagogue::integrations::{self, OllamaClient};
use pedagogue::simulation::{RunReport, RunStatus, SimulationEvent, SimulationHost};

/// Number of Q-table entries shown after a run
const Q_TABLE_PREVIEW: usize = 10;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to <config dir>/pedagogue/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a teacher/student simulation
    Run {
        /// Number of rounds
        #[arg(short, long)]
        rounds: Option<usize>,

        /// Comma-separated initial topics
        #[arg(short, long, value_delimiter = ',')]
        topics: Option<Vec<String>>,

        /// Rounds between evolution points
        #[arg(short, long)]
        evolution_interval: Option<usize>,

        /// Problem difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Seed for reproducible topic and strategy sampling
        #[arg(short, long)]
        seed: Option<u64>,

        /// Stream events as JSON lines and print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the configured model service is reachable
    Check,

    /// Print the effective configuration as TOML
    Config {
        /// Write it to this file instead
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let loader = path.map(ConfigLoader::with_path).unwrap_or_default();
    loader.load().context("Failed to load configuration")
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose && env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "pedagogue=debug,info");
    }

    match cli.command {
        Commands::Run {
            rounds,
            topics,
            evolution_interval,
            difficulty,
            seed,
            json,
        } => {
            let mut host = SimulationHost::default();
            let forward = json.then(|| host.events());
            pedagogue::init_with_logger(!json && std::io::stderr().is_terminal(), forward)
                .context("Failed to initialize logging")?;

            let mut config = load_config(cli.config)?;
            if let Some(rounds) = rounds {
                config.simulation.num_rounds = rounds;
            }
            if let Some(topics) = topics {
                config.simulation.topics = topics;
            }
            if let Some(interval) = evolution_interval {
                config.simulation.evolution_interval = interval;
            }
            if let Some(difficulty) = difficulty {
                config.simulation.difficulty = difficulty;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            config.validate().context("Invalid simulation settings")?;

            run_simulation(&mut host, config, json).await
        }

        Commands::Check => {
            pedagogue::init_with_logger(std::io::stderr().is_terminal(), None)
                .context("Failed to initialize logging")?;
            let config = load_config(cli.config)?;
            check(&config).await
        }

        Commands::Config { write } => {
            pedagogue::init_with_logger(std::io::stderr().is_terminal(), None)
                .context("Failed to initialize logging")?;
            let config = load_config(cli.config)?;
            match write {
                Some(path) => {
                    config
                        .save(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Configuration written to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
    }
}

async fn run_simulation(host: &mut SimulationHost, config: AppConfig, json: bool) -> Result<()> {
    let model = integrations::connect(&config.model).context("Failed to create model client")?;

    let printer = tokio::spawn(print_events(host.subscribe(), json));
    let run_id = host
        .start(model, config)
        .context("Failed to start simulation")?;
    info!("Simulation run {} started", run_id);

    if let Some(token) = host.cancellation_token() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current round");
                token.cancel();
            }
        });
    }

    let result = host.wait().await;
    if result.is_ok() {
        let _ = printer.await;
    } else {
        printer.abort();
    }
    let report = result.context("Simulation failed")?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Print events until the run reaches a terminal state
async fn print_events(mut rx: broadcast::Receiver<SimulationEvent>, json: bool) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event printer skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
        } else {
            match &event {
                SimulationEvent::Progress {
                    current_round,
                    total_rounds,
                } => println!("Round {}/{}", current_round, total_rounds),
                SimulationEvent::Status { message, .. } => println!("{}", message),
                SimulationEvent::Log { .. } | SimulationEvent::Finished { .. } => {}
            }
        }

        let finished = matches!(
            event,
            SimulationEvent::Finished { .. }
                | SimulationEvent::Status {
                    status: RunStatus::Error,
                    ..
                }
        );
        if finished {
            break;
        }
    }
}

fn print_report(report: &RunReport) {
    println!("\n--- Final Simulation Summary ---");
    println!("{}", report.summary);
    println!("- Curriculum: {}", report.curriculum.join(", "));

    println!("\n--- Student Q-Table (first {} entries) ---", Q_TABLE_PREVIEW);
    if report.q_values.is_empty() {
        println!("(empty)");
    }
    for entry in report.q_values.iter().take(Q_TABLE_PREVIEW) {
        println!(
            "Q('{}', {}) = {:.3}",
            entry.topic, entry.action, entry.value
        );
    }
}

async fn check(config: &AppConfig) -> Result<()> {
    match config.model.provider {
        ModelProvider::Ollama => {
            let client = OllamaClient::new(&config.model).context("Failed to create Ollama client")?;
            let models = client
                .list_models()
                .await
                .with_context(|| format!("Ollama server not running at {}", client.host()))?;
            println!("Ollama server running at {}", client.host());
            println!("Available models: {}", models.join(", "));

            let mut wanted = vec![config.model.model.as_str()];
            wanted.extend(config.model.teacher_model.as_deref());
            wanted.extend(config.model.student_model.as_deref());
            for name in wanted {
                if !client.has_model(name).await? {
                    return Err(anyhow!(
                        "Model '{}' is not installed on {} (try `ollama pull {}`)",
                        name,
                        client.host(),
                        name
                    ));
                }
                println!("Model '{}' is installed", name);
            }
        }
        ModelProvider::OpenAi => {
            let model = integrations::connect(&config.model)?;
            if !model.is_available().await {
                return Err(anyhow!("OpenAI API not reachable"));
            }
            println!("OpenAI API reachable (model: {})", model.default_model());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await
}
