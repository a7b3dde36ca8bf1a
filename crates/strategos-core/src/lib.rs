//! Strategos Core - strategic decision pipeline for autonomous operations
//!
//! Strategos turns raw operational signals into governed, consensus-checked
//! strategic decisions. Every artifact along the way is archived so the
//! decision trail can be reconstructed per mission.
//!
//! # Architecture
//!
//! The pipeline is four components chained behind one façade:
//!
//! ```text
//! signals --> [Strategy Generator] --> ranked proposal
//!                     |
//!                     v
//!             [Outcome Simulator] --> Monte Carlo projection
//!                     |
//!                     v
//!             [Policy Governor]   --> approve / veto / escalate
//!                     |
//!                     v
//!          [Consensus Reconciler] --> proceed / reject / modify
//! ```
//!
//! 1. **Strategy Generator** (`generator`): bands signals by priority and
//!    derives ranked candidate strategies, adjusting learned success rates
//!    from execution feedback.
//! 2. **Outcome Simulator** (`simulator`): Monte Carlo projection of each
//!    strategy over best, expected, worst and conditional scenarios.
//! 3. **Policy Governor** (`governance`): threshold policies over impact
//!    metrics, a veto ledger with override control, and a bounded audit
//!    trail.
//! 4. **Consensus Reconciler** (`consensus`): role-specialized agents vote
//!    on the strategy; weighted agreement plus an ordered fallback chain
//!    produce the final decision.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use strategos_core::pipeline::DecisionPipeline;
//! use strategos_core::store::InMemoryStore;
//! use strategos_core::types::{Signal, SignalSource};
//!
//! let pipeline = DecisionPipeline::new(Arc::new(InMemoryStore::new()));
//!
//! pipeline.generator().receive_signal(Signal::new(
//!     "sig-1",
//!     SignalSource::Sensor,
//!     "engine_alert",
//!     85,
//! ));
//!
//! let proposal = pipeline
//!     .generator()
//!     .generate_strategies(Some("mission-1"))
//!     .unwrap();
//! assert!(proposal.strategies.len() >= 3);
//! ```
//!
//! # Design Principles
//!
//! 1. **Typed decisions**: statuses and decisions are enums, never strings
//! 2. **Best-effort archival**: a failing store never aborts a decision
//! 3. **Reproducibility**: seeded simulations replay identically
//! 4. **Bounded memory**: the audit trail is a fixed-capacity ring

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod consensus;
pub mod error;
pub mod generator;
pub mod governance;
pub mod pipeline;
pub mod simulator;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use consensus::{
    Agent, AgentRole, AgentVote, ConsensusReconciler, ConsensusResult, ConsensusStatus,
    FinalDecision, VoteValue,
};
pub use error::{Result, StrategosError};
pub use generator::StrategyGenerator;
pub use governance::{Decision, GovernanceEvaluation, GovernancePolicy, PolicyGovernor, VetoRecord};
pub use pipeline::{DecisionOutcome, DecisionPipeline};
pub use simulator::{
    OutcomeSimulator, SimulationParameters, SimulationResult, SimulationStatus,
};
pub use store::{Archive, DecisionStore, InMemoryStore, NullStore};
pub use types::{
    FeedbackOutcome, ImpactEstimate, Signal, SignalSource, Strategy, StrategyProposal,
    StrategyType, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
