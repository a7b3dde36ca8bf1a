//! Error types for Strategos Core
//!
//! Each pipeline component has its own error enum; they roll up into
//! [`StrategosError`] so callers can hold a single error type across the
//! whole decision pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Strategos operations
pub type Result<T> = std::result::Result<T, StrategosError>;

/// Main error type for Strategos operations
#[derive(Error, Debug)]
pub enum StrategosError {
    /// Strategy generation errors
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Outcome simulation errors
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Policy governance errors
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    /// Consensus reconciliation errors
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the strategy generator
#[derive(Error, Debug, Clone)]
pub enum GeneratorError {
    #[error("no active signals to generate strategies from")]
    NoActiveSignals,
}

/// Errors raised by the outcome simulator
#[derive(Error, Debug, Clone)]
pub enum SimulationError {
    #[error("simulation not found: {0}")]
    NotFound(Uuid),

    #[error("simulation {0} is not running and cannot be cancelled")]
    NotRunning(Uuid),

    #[error("simulation {id} failed: {reason}")]
    Failed { id: Uuid, reason: String },
}

/// Errors raised by the policy governor
#[derive(Error, Debug, Clone)]
pub enum GovernanceError {
    #[error("evaluation not found: {0}")]
    EvaluationNotFound(Uuid),

    #[error("evaluation {0} does not require approval")]
    ApprovalNotRequired(Uuid),

    #[error("veto record not found: {0}")]
    VetoNotFound(Uuid),

    #[error("veto {0} cannot be overridden (critical risk category)")]
    OverrideForbidden(Uuid),

    #[error("invalid policy configuration: {0}")]
    InvalidPolicy(String),
}

/// Errors raised by the consensus reconciler
#[derive(Error, Debug, Clone)]
pub enum ConsensusError {
    #[error("quorum too small: {selected} agents selected, at least {required} required")]
    QuorumTooSmall { selected: usize, required: usize },

    #[error("agent not found: {0}")]
    AgentNotFound(Uuid),
}

/// Errors raised by the persistence collaborator.
///
/// These never surface through [`StrategosError`]: archival writes are
/// best-effort and failures are logged and counted, not propagated.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("store rejected insert into '{table}': {reason}")]
    InsertRejected { table: String, reason: String },
}
