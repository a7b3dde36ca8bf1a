use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use strategos_core::pipeline::DecisionPipeline;
use strategos_core::simulator::SimulationParameters;
use strategos_core::store::InMemoryStore;
use strategos_core::types::Signal;

/// Strategos CLI - run the strategic decision pipeline from the shell
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a file of signals
    Run {
        /// Path to a JSON array of signals
        #[arg(short, long, value_name = "FILE")]
        signals: PathBuf,

        /// Mission id to tag the decision trail with
        #[arg(short, long)]
        mission: Option<String>,

        /// Seed for reproducible simulation runs
        #[arg(long)]
        seed: Option<u64>,

        /// Monte Carlo iterations for the simulation stage
        #[arg(long, default_value_t = 1000)]
        iterations: u32,

        /// Load governance policies from this TOML file instead of the
        /// built-in set
        #[arg(long, value_name = "FILE")]
        policies: Option<PathBuf>,

        /// Output the full decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active governance policies
    Policies,

    /// Show the registered consensus agents
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            signals,
            mission,
            seed,
            iterations,
            policies,
            json,
        } => {
            let content = std::fs::read_to_string(&signals)?;
            let signals: Vec<Signal> = serde_json::from_str(&content)?;

            let store = Arc::new(InMemoryStore::new());
            let pipeline = match seed {
                Some(seed) => DecisionPipeline::with_seed(store, seed),
                None => DecisionPipeline::new(store),
            };
            if let Some(path) = policies {
                let toml = std::fs::read_to_string(&path)?;
                let count = pipeline.governor().load_policies_from_toml(&toml)?;
                eprintln!("loaded {} policies from {:?}", count, path);
            }

            let parameters = SimulationParameters {
                iterations,
                ..Default::default()
            };
            let outcome = pipeline
                .run_configured(signals, mission.as_deref(), &[], parameters)
                .await?;
            if json {
                let report = serde_json::json!({
                    "proposal": outcome.proposal,
                    "simulation": outcome.simulation,
                    "evaluation": outcome.evaluation,
                    "consensus": outcome.consensus,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&outcome);
            }
        }
        Commands::Policies => {
            let pipeline = DecisionPipeline::new(Arc::new(InMemoryStore::new()));
            for policy in pipeline.governor().get_active_policies() {
                println!(
                    "[{}] {} (priority {})",
                    policy.id, policy.name, policy.priority
                );
                for rule in &policy.rules {
                    println!(
                        "    {} {} {} => {:?} ({:?})",
                        rule.metric, rule.comparator, rule.threshold, rule.action, rule.severity
                    );
                }
            }
        }
        Commands::Agents => {
            let pipeline = DecisionPipeline::new(Arc::new(InMemoryStore::new()));
            for agent in pipeline.reconciler().active_agents() {
                println!(
                    "{} ({:?}) weight {:.2}, confidence {:.0}",
                    agent.name, agent.role, agent.voting_weight, agent.confidence_level
                );
            }
        }
    }

    Ok(())
}

fn print_summary(outcome: &strategos_core::pipeline::DecisionOutcome) {
    if let Some(top) = outcome.proposal.top() {
        println!("STRATEGY: {} ({})", top.strategy_type, top.id);
    }
    println!(
        "RANKED:   {} candidates, context: {}",
        outcome.proposal.strategies.len(),
        outcome.proposal.context
    );

    println!("SIMULATION: {:?}", outcome.simulation.status);
    if let Some(metrics) = &outcome.simulation.metrics {
        println!(
            "  cost mean {:.0}, risk mean {:.1}, time mean {:.1}h",
            metrics.cost.mean, metrics.risk.mean, metrics.time.mean
        );
        println!("  confidence {:.0}%", outcome.simulation.confidence_level);
    }
    for warning in &outcome.simulation.warnings {
        println!("  warning: {}", warning);
    }

    println!("GOVERNANCE: {:?}", outcome.evaluation.decision);
    for violation in &outcome.evaluation.violations {
        println!(
            "  violation [{:?}] {}: {}",
            violation.severity, violation.rule_id, violation.description
        );
    }

    println!(
        "CONSENSUS: {:?} -> {:?} (score {:.0}, support {:.0})",
        outcome.consensus.status,
        outcome.consensus.final_decision,
        outcome.consensus.consensus_score,
        outcome.consensus.support_level
    );
    if let Some(rule) = &outcome.consensus.fallback_rule {
        println!("  fallback rule: {}", rule);
    }
    for recommendation in &outcome.consensus.recommendations {
        println!("  recommendation: {}", recommendation);
    }
}
