//! Consensus Reconciler - reconciles specialized agent viewpoints
//!
//! Selects a quorum of role-specialized synthetic agents for a strategy,
//! collects one deterministic vote per agent, computes a weighted
//! consensus score and raw support level, flags disagreements, and falls
//! back to an ordered rule chain when normal thresholds are not met.
//!
//! The votes are deterministic heuristics over the strategy's numbers,
//! not a trained model, and the "consensus" is in-process aggregation,
//! not a network protocol.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ConsensusError;
use crate::store::{tables, Archive};
use crate::types::{now, Strategy, StrategyType, Timestamp};

/// Minimum agents for a valid consensus run
const MIN_QUORUM: usize = 3;

/// Specialization of a synthetic agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Operational,
    Financial,
    Safety,
    Strategic,
    RiskManagement,
    ResourceOptimization,
}

/// A registered synthetic agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub role: AgentRole,
    /// Baseline confidence the agent reports with its votes, 0-100
    pub confidence_level: f64,
    /// Weight of this agent in the consensus score, 0-1
    pub voting_weight: f64,
    pub specializations: Vec<String>,
    pub active: bool,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        confidence_level: f64,
        voting_weight: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
            confidence_level: confidence_level.clamp(0.0, 100.0),
            voting_weight: voting_weight.clamp(0.0, 1.0),
            specializations: Vec::new(),
            active: true,
        }
    }
}

/// Ordinal vote cast by one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    StronglyOppose,
    Oppose,
    Neutral,
    Support,
    StronglySupport,
}

impl VoteValue {
    /// Ordinal score in {-2, -1, 0, 1, 2}
    pub fn ordinal(self) -> i32 {
        match self {
            VoteValue::StronglyOppose => -2,
            VoteValue::Oppose => -1,
            VoteValue::Neutral => 0,
            VoteValue::Support => 1,
            VoteValue::StronglySupport => 2,
        }
    }

    pub fn is_supporting(self) -> bool {
        matches!(self, VoteValue::Support | VoteValue::StronglySupport)
    }

    pub fn is_opposing(self) -> bool {
        matches!(self, VoteValue::Oppose | VoteValue::StronglyOppose)
    }
}

/// One agent's vote in a consensus run; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVote {
    pub agent_id: Uuid,
    pub agent_role: AgentRole,
    pub vote: VoteValue,
    /// Confidence in this particular vote, 0-100
    pub confidence_score: f64,
    pub reasoning: String,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: Timestamp,
}

/// Severity of a recorded disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementSeverity {
    Low,
    Medium,
    High,
}

/// A recorded conflict between supporting and opposing votes in one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disagreement {
    pub id: Uuid,
    pub consensus_id: Uuid,
    pub agent_ids: Vec<Uuid>,
    pub issue: String,
    /// Agent id -> stated position
    pub positions: HashMap<Uuid, String>,
    pub severity: DisagreementSeverity,
    pub resolved: bool,
}

/// Aggregate status of a consensus run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    Achieved,
    Partial,
    Deadlock,
    Failed,
}

/// Actionable decision produced by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    Proceed,
    Reject,
    Modify,
    Escalate,
}

/// Result of one consensus run over a fixed agent quorum and one strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub agent_ids: Vec<Uuid>,
    pub votes: Vec<AgentVote>,
    /// Weighted agreement, 0-100
    pub consensus_score: f64,
    /// Share of selected agents that voted, 0-100
    pub participation_rate: f64,
    /// Raw, unweighted lean of the vote set, -100..100
    pub support_level: f64,
    pub disagreements: Vec<Disagreement>,
    pub status: ConsensusStatus,
    pub final_decision: FinalDecision,
    /// True when the fallback chain, not the normal thresholds, decided
    pub fallback_applied: bool,
    pub fallback_rule: Option<String>,
    pub recommendations: Vec<String>,
    pub mission_id: Option<String>,
    pub timestamp: Timestamp,
}

/// Consensus reconciler component
pub struct ConsensusReconciler {
    /// Agent registry in registration order
    agents: RwLock<Vec<Agent>>,
    /// Every disagreement recorded by this process
    disagreement_log: RwLock<Vec<Disagreement>>,
    archive: Arc<Archive>,
}

impl ConsensusReconciler {
    /// Reconciler with the default six-role agent registry
    pub fn new(archive: Arc<Archive>) -> Self {
        Self {
            agents: RwLock::new(default_agents()),
            disagreement_log: RwLock::new(Vec::new()),
            archive,
        }
    }

    /// Reconciler starting from an explicit registry
    pub fn with_agents(archive: Arc<Archive>, agents: Vec<Agent>) -> Self {
        Self {
            agents: RwLock::new(agents),
            disagreement_log: RwLock::new(Vec::new()),
            archive,
        }
    }

    /// Register an additional agent
    pub fn add_agent(&self, agent: Agent) -> Uuid {
        let id = agent.id;
        tracing::info!("agent {} registered ({:?})", agent.name, agent.role);
        self.agents.write().push(agent);
        id
    }

    /// Deactivate an agent; it stays in the registry but is never selected
    pub fn remove_agent(&self, id: Uuid) -> Result<(), ConsensusError> {
        let mut agents = self.agents.write();
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ConsensusError::AgentNotFound(id))?;
        agent.active = false;
        tracing::info!("agent {} deactivated", agent.name);
        Ok(())
    }

    /// Active agents in registry order
    pub fn active_agents(&self) -> Vec<Agent> {
        self.agents
            .read()
            .iter()
            .filter(|a| a.active)
            .cloned()
            .collect()
    }

    /// All disagreements recorded so far
    pub fn get_disagreement_logs(&self) -> Vec<Disagreement> {
        self.disagreement_log.read().clone()
    }

    /// Run one consensus round over a strategy.
    ///
    /// Fails when fewer than three agents end up selected.
    pub fn build_consensus(
        &self,
        strategy: &Strategy,
        mission_id: Option<&str>,
        required_roles: &[AgentRole],
    ) -> Result<ConsensusResult, ConsensusError> {
        let selected = self.select_quorum(strategy, required_roles);
        if selected.len() < MIN_QUORUM {
            return Err(ConsensusError::QuorumTooSmall {
                selected: selected.len(),
                required: MIN_QUORUM,
            });
        }

        let votes: Vec<AgentVote> = selected.iter().map(|a| cast_vote(a, strategy)).collect();
        let consensus_id = Uuid::new_v4();

        let disagreements = detect_disagreement(consensus_id, &selected, &votes)
            .into_iter()
            .collect::<Vec<_>>();

        let consensus_score = weighted_consensus_score(&selected, &votes);
        let support_level = support_level(&votes);
        let participation_rate = votes.len() as f64 / selected.len() as f64 * 100.0;

        let status = classify_status(consensus_score, support_level);
        let (final_decision, fallback_applied, fallback_rule) = match status {
            ConsensusStatus::Achieved => {
                let decision = if support_level > 0.0 {
                    FinalDecision::Proceed
                } else {
                    FinalDecision::Reject
                };
                (decision, false, None)
            }
            ConsensusStatus::Partial => (FinalDecision::Modify, false, None),
            ConsensusStatus::Deadlock | ConsensusStatus::Failed => {
                let (decision, rule) = resolve_fallback(&votes, &disagreements, support_level);
                (decision, true, Some(rule))
            }
        };

        let result = ConsensusResult {
            id: consensus_id,
            strategy_id: strategy.id,
            agent_ids: selected.iter().map(|a| a.id).collect(),
            consensus_score,
            participation_rate,
            support_level,
            status,
            final_decision,
            fallback_applied,
            fallback_rule,
            recommendations: derive_recommendations(status, final_decision, &disagreements),
            votes,
            disagreements: disagreements.clone(),
            mission_id: mission_id.map(String::from),
            timestamp: now(),
        };

        for disagreement in &disagreements {
            self.archive.record(tables::DISAGREEMENTS, disagreement);
        }
        self.disagreement_log.write().extend(disagreements);
        self.archive.record(tables::CONSENSUS, &result);
        tracing::info!(
            "consensus {} on strategy {}: {:?} -> {:?} (score {:.0}, support {:.0})",
            result.id,
            strategy.id,
            result.status,
            result.final_decision,
            result.consensus_score,
            result.support_level
        );
        Ok(result)
    }

    /// Quorum selection, in fixed order, skipping agents already included:
    /// required roles, safety, type-specific specialists, financial for
    /// expensive strategies, strategic, then any remaining active agents.
    fn select_quorum(&self, strategy: &Strategy, required_roles: &[AgentRole]) -> Vec<Agent> {
        let agents = self.agents.read();
        let mut selected: Vec<Agent> = Vec::new();
        let push_role = |role: AgentRole, selected: &mut Vec<Agent>| {
            if selected.iter().any(|a| a.role == role) {
                return;
            }
            if let Some(agent) = agents.iter().find(|a| a.active && a.role == role) {
                selected.push(agent.clone());
            }
        };

        for role in required_roles {
            push_role(*role, &mut selected);
        }
        push_role(AgentRole::Safety, &mut selected);
        if strategy.strategy_type == StrategyType::RiskMitigation {
            push_role(AgentRole::RiskManagement, &mut selected);
        }
        if matches!(
            strategy.strategy_type,
            StrategyType::ResourceAllocation | StrategyType::Optimization
        ) {
            push_role(AgentRole::Operational, &mut selected);
        }
        if strategy.estimated_impact.cost > 5000.0 {
            push_role(AgentRole::Financial, &mut selected);
        }
        push_role(AgentRole::Strategic, &mut selected);

        if selected.len() < MIN_QUORUM {
            for agent in agents.iter().filter(|a| a.active) {
                if selected.len() >= MIN_QUORUM {
                    break;
                }
                if !selected.iter().any(|s| s.id == agent.id) {
                    selected.push(agent.clone());
                }
            }
        }
        selected
    }
}

/// Default registry: one agent per role
pub fn default_agents() -> Vec<Agent> {
    vec![
        Agent::new("Helm Safety Officer", AgentRole::Safety, 90.0, 1.0),
        Agent::new("Operations Analyst", AgentRole::Operational, 88.0, 0.9),
        Agent::new("Finance Controller", AgentRole::Financial, 85.0, 0.8),
        Agent::new("Strategy Advisor", AgentRole::Strategic, 82.0, 0.85),
        Agent::new("Risk Assessor", AgentRole::RiskManagement, 86.0, 0.9),
        Agent::new(
            "Resource Planner",
            AgentRole::ResourceOptimization,
            80.0,
            0.75,
        ),
    ]
}

/// Role-specific deterministic vote heuristic
fn cast_vote(agent: &Agent, strategy: &Strategy) -> AgentVote {
    let impact = &strategy.estimated_impact;
    let (vote, reasoning, concerns) = match agent.role {
        AgentRole::Safety => {
            if impact.risk > 80.0 {
                (
                    VoteValue::StronglyOppose,
                    format!("Risk {:.0} is far outside safe bounds", impact.risk),
                    vec!["Unacceptable risk to the crew".to_string()],
                )
            } else if impact.risk > 60.0 {
                (
                    VoteValue::Oppose,
                    format!("Risk {:.0} exceeds the comfort envelope", impact.risk),
                    vec!["Risk mitigation needed before execution".to_string()],
                )
            } else {
                (
                    VoteValue::Support,
                    format!("Risk {:.0} is within safe bounds", impact.risk),
                    Vec::new(),
                )
            }
        }
        AgentRole::Financial => {
            let reference_cost = if impact.cost > 0.0 { impact.cost } else { 1000.0 };
            let efficiency = strategy.success_probability / (reference_cost / 1000.0);
            if efficiency > 0.5 {
                (
                    VoteValue::StronglySupport,
                    format!("Cost efficiency {:.2} is excellent", efficiency),
                    Vec::new(),
                )
            } else if efficiency > 0.3 {
                (
                    VoteValue::Support,
                    format!("Cost efficiency {:.2} is acceptable", efficiency),
                    Vec::new(),
                )
            } else {
                (
                    VoteValue::Neutral,
                    format!("Cost efficiency {:.2} is marginal", efficiency),
                    vec!["Consider a cheaper alternative".to_string()],
                )
            }
        }
        AgentRole::Operational => {
            if impact.time_hours < 24.0 {
                (
                    VoteValue::StronglySupport,
                    format!("{:.0}h execution fits within one duty cycle", impact.time_hours),
                    Vec::new(),
                )
            } else if impact.time_hours < 72.0 {
                (
                    VoteValue::Support,
                    format!("{:.0}h execution is operationally workable", impact.time_hours),
                    Vec::new(),
                )
            } else {
                (
                    VoteValue::Neutral,
                    format!("{:.0}h execution strains the schedule", impact.time_hours),
                    vec!["Long execution window".to_string()],
                )
            }
        }
        AgentRole::Strategic => {
            if strategy.success_probability > 0.7 {
                (
                    VoteValue::StronglySupport,
                    format!(
                        "Success probability {:.0}% is strong",
                        strategy.success_probability * 100.0
                    ),
                    Vec::new(),
                )
            } else if strategy.success_probability > 0.5 {
                (
                    VoteValue::Support,
                    format!(
                        "Success probability {:.0}% is workable",
                        strategy.success_probability * 100.0
                    ),
                    Vec::new(),
                )
            } else {
                (
                    VoteValue::Oppose,
                    format!(
                        "Success probability {:.0}% is too low",
                        strategy.success_probability * 100.0
                    ),
                    vec!["Rework the strategy before committing".to_string()],
                )
            }
        }
        AgentRole::RiskManagement => {
            let exposure = (impact.risk + impact.crew_impact) / 2.0;
            if exposure < 30.0 {
                (
                    VoteValue::StronglySupport,
                    format!("Combined exposure {:.0} is low", exposure),
                    Vec::new(),
                )
            } else if exposure < 60.0 {
                (
                    VoteValue::Support,
                    format!("Combined exposure {:.0} is manageable", exposure),
                    Vec::new(),
                )
            } else {
                (
                    VoteValue::Oppose,
                    format!("Combined exposure {:.0} is too high", exposure),
                    vec!["Exposure across risk and crew is compounding".to_string()],
                )
            }
        }
        AgentRole::ResourceOptimization => (
            VoteValue::Neutral,
            "No resource-specific signal in this strategy".to_string(),
            Vec::new(),
        ),
    };

    AgentVote {
        agent_id: agent.id,
        agent_role: agent.role,
        vote,
        confidence_score: agent.confidence_level,
        reasoning,
        concerns,
        recommendations: Vec::new(),
        timestamp: now(),
    }
}

/// A disagreement exists exactly when the run contains both a supporting
/// and an opposing vote.
fn detect_disagreement(
    consensus_id: Uuid,
    agents: &[Agent],
    votes: &[AgentVote],
) -> Option<Disagreement> {
    let supporters: Vec<&AgentVote> = votes.iter().filter(|v| v.vote.is_supporting()).collect();
    let opposers: Vec<&AgentVote> = votes.iter().filter(|v| v.vote.is_opposing()).collect();
    if supporters.is_empty() || opposers.is_empty() {
        return None;
    }

    let safety_strongly_opposes = opposers.iter().any(|v| {
        v.agent_role == AgentRole::Safety && v.vote == VoteValue::StronglyOppose
    });
    let severity = if safety_strongly_opposes {
        DisagreementSeverity::High
    } else if opposers.len() > supporters.len() {
        DisagreementSeverity::Medium
    } else {
        DisagreementSeverity::Low
    };

    let involved: Vec<&AgentVote> = supporters.iter().chain(opposers.iter()).copied().collect();
    let name_of = |id: Uuid| {
        agents
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let positions = involved
        .iter()
        .map(|v| (v.agent_id, format!("{:?}: {}", v.vote, v.reasoning)))
        .collect();

    Some(Disagreement {
        id: Uuid::new_v4(),
        consensus_id,
        agent_ids: involved.iter().map(|v| v.agent_id).collect(),
        issue: format!(
            "{} supporting vs {} opposing ({} among them)",
            supporters.len(),
            opposers.len(),
            opposers
                .iter()
                .map(|v| name_of(v.agent_id))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        positions,
        severity,
        resolved: false,
    })
}

/// Weighted agreement in 0-100; 50 when total weight is zero
fn weighted_consensus_score(agents: &[Agent], votes: &[AgentVote]) -> f64 {
    let weight_of = |vote: &AgentVote| -> f64 {
        let agent_weight = agents
            .iter()
            .find(|a| a.id == vote.agent_id)
            .map(|a| a.voting_weight)
            .unwrap_or(0.0);
        agent_weight * (vote.confidence_score / 100.0)
    };

    let total_weight: f64 = votes.iter().map(&weight_of).sum();
    if total_weight == 0.0 {
        return 50.0;
    }
    let weighted_sum: f64 = votes
        .iter()
        .map(|v| v.vote.ordinal() as f64 * weight_of(v))
        .sum();
    (((weighted_sum / total_weight) + 2.0) * 25.0).clamp(0.0, 100.0)
}

/// Raw unweighted lean in -100..100
fn support_level(votes: &[AgentVote]) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    let sum: i32 = votes.iter().map(|v| v.vote.ordinal()).sum();
    (sum as f64 / votes.len() as f64 * 50.0).clamp(-100.0, 100.0)
}

fn classify_status(score: f64, support: f64) -> ConsensusStatus {
    if score >= 80.0 && support > 50.0 {
        ConsensusStatus::Achieved
    } else if score >= 60.0 && support > 20.0 {
        ConsensusStatus::Partial
    } else if support.abs() < 10.0 && score < 60.0 {
        ConsensusStatus::Deadlock
    } else {
        ConsensusStatus::Failed
    }
}

/// Ordered fallback chain; the first matching rule decides
fn resolve_fallback(
    votes: &[AgentVote],
    disagreements: &[Disagreement],
    support: f64,
) -> (FinalDecision, String) {
    let safety_strongly_opposes = votes.iter().any(|v| {
        v.agent_role == AgentRole::Safety && v.vote == VoteValue::StronglyOppose
    });
    if safety_strongly_opposes {
        return (FinalDecision::Reject, "Safety Override".to_string());
    }
    if disagreements
        .iter()
        .any(|d| d.severity == DisagreementSeverity::High)
    {
        return (FinalDecision::Escalate, "High-Severity Disagreement".to_string());
    }
    let mean_confidence =
        votes.iter().map(|v| v.confidence_score).sum::<f64>() / votes.len().max(1) as f64;
    if mean_confidence < 50.0 {
        return (FinalDecision::Reject, "Low Vote Confidence".to_string());
    }
    let supporters = votes.iter().filter(|v| v.vote.is_supporting()).count();
    let opposers = votes.iter().filter(|v| v.vote.is_opposing()).count();
    if supporters > opposers {
        return (FinalDecision::Proceed, "Majority Support".to_string());
    }
    if opposers > supporters {
        return (FinalDecision::Reject, "Majority Opposition".to_string());
    }
    if support >= 0.0 {
        (FinalDecision::Proceed, "Tie Break: Non-Negative Support".to_string())
    } else {
        (FinalDecision::Reject, "Tie Break: Negative Support".to_string())
    }
}

fn derive_recommendations(
    status: ConsensusStatus,
    decision: FinalDecision,
    disagreements: &[Disagreement],
) -> Vec<String> {
    let mut recommendations = Vec::new();
    match status {
        ConsensusStatus::Achieved => {}
        ConsensusStatus::Partial => {
            recommendations
                .push("Address the dissenting concerns before execution".to_string());
        }
        ConsensusStatus::Deadlock => {
            recommendations.push("Gather more data; the agent views cancel out".to_string());
        }
        ConsensusStatus::Failed => {
            recommendations.push("Revisit the strategy; consensus could not form".to_string());
        }
    }
    if disagreements
        .iter()
        .any(|d| d.severity == DisagreementSeverity::High)
    {
        recommendations.push("Safety objection on record; human review advised".to_string());
    }
    if decision == FinalDecision::Escalate {
        recommendations.push("Escalated to human decision-maker".to_string());
    }
    recommendations
}
