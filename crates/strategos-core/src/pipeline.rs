//! End-to-end decision pipeline
//!
//! Wires the four components together behind one façade: signals go in,
//! a governed, consensus-checked decision comes out. All components share
//! a single [`Archive`] so the full decision trail lands in one store.

use std::sync::Arc;

use crate::consensus::{AgentRole, ConsensusReconciler, ConsensusResult};
use crate::error::{GeneratorError, Result};
use crate::generator::StrategyGenerator;
use crate::governance::{GovernanceEvaluation, PolicyGovernor};
use crate::simulator::{OutcomeSimulator, SimulationParameters, SimulationResult};
use crate::store::{Archive, DecisionStore};
use crate::types::{Signal, StrategyProposal};

/// Everything one pipeline run produced, in stage order
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub proposal: StrategyProposal,
    /// Simulation of the top-ranked strategy
    pub simulation: SimulationResult,
    pub evaluation: GovernanceEvaluation,
    pub consensus: ConsensusResult,
}

/// The four pipeline components behind one entry point
pub struct DecisionPipeline {
    generator: StrategyGenerator,
    simulator: OutcomeSimulator,
    governor: PolicyGovernor,
    reconciler: ConsensusReconciler,
    archive: Arc<Archive>,
}

impl DecisionPipeline {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        let archive = Arc::new(Archive::new(store));
        Self {
            generator: StrategyGenerator::new(archive.clone()),
            simulator: OutcomeSimulator::new(archive.clone()),
            governor: PolicyGovernor::new(archive.clone()),
            reconciler: ConsensusReconciler::new(archive.clone()),
            archive,
        }
    }

    /// Pipeline whose simulations replay identically for a given seed
    pub fn with_seed(store: Arc<dyn DecisionStore>, seed: u64) -> Self {
        let archive = Arc::new(Archive::new(store));
        Self {
            generator: StrategyGenerator::new(archive.clone()),
            simulator: OutcomeSimulator::with_seed(archive.clone(), seed),
            governor: PolicyGovernor::new(archive.clone()),
            reconciler: ConsensusReconciler::new(archive.clone()),
            archive,
        }
    }

    /// Run the full chain: generate, simulate the top strategy, evaluate
    /// it against policy, then build agent consensus on it.
    pub async fn run(
        &self,
        signals: Vec<Signal>,
        mission_id: Option<&str>,
    ) -> Result<DecisionOutcome> {
        self.run_configured(signals, mission_id, &[], SimulationParameters::default())
            .await
    }

    /// Full run with an explicit set of roles required in the consensus
    pub async fn run_with_roles(
        &self,
        signals: Vec<Signal>,
        mission_id: Option<&str>,
        required_roles: &[AgentRole],
    ) -> Result<DecisionOutcome> {
        self.run_configured(
            signals,
            mission_id,
            required_roles,
            SimulationParameters::default(),
        )
        .await
    }

    /// Full run with explicit consensus roles and simulation parameters
    pub async fn run_configured(
        &self,
        signals: Vec<Signal>,
        mission_id: Option<&str>,
        required_roles: &[AgentRole],
        parameters: SimulationParameters,
    ) -> Result<DecisionOutcome> {
        for signal in signals {
            self.generator.receive_signal(signal);
        }

        let proposal = self.generator.generate_strategies(mission_id)?;
        let top = proposal
            .top()
            .cloned()
            .ok_or(GeneratorError::NoActiveSignals)?;

        let simulation = self
            .simulator
            .simulate_strategy(&top, parameters, mission_id)
            .await?;
        let evaluation = self.governor.evaluate_strategy(&top, Some(&simulation));
        let consensus = self
            .reconciler
            .build_consensus(&top, mission_id, required_roles)?;

        tracing::info!(
            "pipeline run for mission {:?}: {:?} / {:?}",
            mission_id,
            evaluation.decision,
            consensus.final_decision
        );
        Ok(DecisionOutcome {
            proposal,
            simulation,
            evaluation,
            consensus,
        })
    }

    pub fn generator(&self) -> &StrategyGenerator {
        &self.generator
    }

    pub fn simulator(&self) -> &OutcomeSimulator {
        &self.simulator
    }

    pub fn governor(&self) -> &PolicyGovernor {
        &self.governor
    }

    pub fn reconciler(&self) -> &ConsensusReconciler {
        &self.reconciler
    }

    /// Archival writes lost since the pipeline was built
    pub fn archive_failed_writes(&self) -> u64 {
        self.archive.failed_writes()
    }

    /// Archived rows for a mission, newest first
    pub fn decision_trail(&self, table: &str, mission_id: &str) -> Vec<serde_json::Value> {
        self.archive.fetch_by_mission(table, mission_id)
    }
}
