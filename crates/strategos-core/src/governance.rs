//! Policy Governor - rule-based governance over strategies
//!
//! Evaluates a strategy (optionally informed by a simulation) against the
//! ordered rules of every active policy, classifies risk, and issues one
//! of approved / vetoed / escalated / conditional. Vetoes land in a
//! ledger; every state change appends to a bounded in-memory audit ring
//! in addition to the durable store.
//!
//! Rule conditions are typed predicates (metric + comparator + threshold)
//! rather than parsed strings, so evaluation is direct.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GovernanceError;
use crate::simulator::SimulationResult;
use crate::store::{tables, Archive};
use crate::types::{now, Comparator, ImpactMetric, Strategy, Timestamp};

/// Audit ring keeps at most this many entries in memory
const AUDIT_CAPACITY: usize = 1000;

/// Severity of a policy rule and of the violations it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What a matched rule demands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Warn,
    Escalate,
    RequireApproval,
}

impl RuleAction {
    /// Remediation guidance attached to violations of this action
    fn remediation(self) -> &'static str {
        match self {
            RuleAction::Block => "Strategy cannot proceed as planned",
            RuleAction::Escalate => "Escalate to management for review",
            RuleAction::RequireApproval => "Obtain the required approvals before execution",
            RuleAction::Warn => "Proceed with caution",
        }
    }
}

/// A single threshold check within a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    pub description: String,
    pub metric: ImpactMetric,
    pub comparator: Comparator,
    pub threshold: f64,
    pub action: RuleAction,
    pub severity: Severity,
}

/// A named, prioritized group of threshold checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernancePolicy {
    pub id: String,
    pub name: String,
    /// Intended precedence only; every active policy is always checked
    pub priority: u32,
    pub active: bool,
    pub rules: Vec<PolicyRule>,
}

/// TOML file shape for externally configured policies
#[derive(Debug, Deserialize)]
struct PolicyFile {
    policies: Vec<GovernancePolicy>,
}

/// A rule match recorded during evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub policy_id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub description: String,
    /// The detected condition, e.g. "crew_impact 85 > 80"
    pub detected: String,
    pub remediation: Option<String>,
}

/// Overall risk classification of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

/// Governance decision for a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Vetoed,
    Escalated,
    Conditional,
}

/// Result of evaluating one strategy against the active policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEvaluation {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub decision: Decision,
    pub risk_category: RiskCategory,
    pub violations: Vec<Violation>,
    pub approval_required: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Ledger entry for a blocking decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoRecord {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub evaluation_id: Uuid,
    pub reason: String,
    pub violations: Vec<Violation>,
    /// False exactly when the risk category is critical
    pub can_override: bool,
    pub override_requirements: Vec<String>,
    pub created_at: Timestamp,
}

/// Immutable record of a governance state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub entity_id: String,
    pub actor: Option<String>,
    pub detail: String,
    pub timestamp: Timestamp,
}

/// Policy governor component
pub struct PolicyGovernor {
    policies: RwLock<Vec<GovernancePolicy>>,
    evaluations: RwLock<HashMap<Uuid, GovernanceEvaluation>>,
    vetoes: RwLock<HashMap<Uuid, VetoRecord>>,
    audit: RwLock<VecDeque<AuditEntry>>,
    archive: Arc<Archive>,
}

impl PolicyGovernor {
    /// Governor with the built-in default policy set
    pub fn new(archive: Arc<Archive>) -> Self {
        Self::with_policies(archive, default_policies())
    }

    pub fn with_policies(archive: Arc<Archive>, mut policies: Vec<GovernancePolicy>) -> Self {
        // Evaluation walks policies in priority order for stability;
        // semantics do not depend on it since all active policies apply.
        policies.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            policies: RwLock::new(policies),
            evaluations: RwLock::new(HashMap::new()),
            vetoes: RwLock::new(HashMap::new()),
            audit: RwLock::new(VecDeque::with_capacity(AUDIT_CAPACITY)),
            archive,
        }
    }

    /// Replace the policy set from a TOML document
    pub fn load_policies_from_toml(&self, document: &str) -> Result<usize, GovernanceError> {
        let file: PolicyFile = toml::from_str(document)
            .map_err(|e| GovernanceError::InvalidPolicy(e.to_string()))?;
        if file.policies.is_empty() {
            return Err(GovernanceError::InvalidPolicy(
                "policy file defines no policies".to_string(),
            ));
        }
        let mut policies = file.policies;
        policies.sort_by(|a, b| b.priority.cmp(&a.priority));
        let count = policies.len();
        *self.policies.write() = policies;
        tracing::info!("loaded {} governance policies", count);
        Ok(count)
    }

    /// Evaluate a strategy against every active policy.
    ///
    /// Metric values come from the simulation means when a simulation is
    /// supplied, otherwise from the strategy's own estimate.
    pub fn evaluate_strategy(
        &self,
        strategy: &Strategy,
        simulation: Option<&SimulationResult>,
    ) -> GovernanceEvaluation {
        let metric_value = |metric: ImpactMetric| -> f64 {
            simulation
                .and_then(|sim| sim.metrics.as_ref())
                .map(|m| match metric {
                    ImpactMetric::Cost => m.cost.mean,
                    ImpactMetric::Risk => m.risk.mean,
                    ImpactMetric::Time => m.time.mean,
                    ImpactMetric::CrewImpact => m.crew_impact.mean,
                })
                .unwrap_or_else(|| strategy.estimated_impact.metric(metric))
        };

        let mut violations = Vec::new();
        let mut matched_actions = Vec::new();
        for policy in self.policies.read().iter().filter(|p| p.active) {
            for rule in &policy.rules {
                let value = metric_value(rule.metric);
                if rule.comparator.evaluate(value, rule.threshold) {
                    matched_actions.push(rule.action);
                    violations.push(Violation {
                        policy_id: policy.id.clone(),
                        rule_id: rule.id.clone(),
                        severity: rule.severity,
                        description: rule.description.clone(),
                        detected: format!(
                            "{} {:.1} {} {:.1}",
                            rule.metric, value, rule.comparator, rule.threshold
                        ),
                        remediation: Some(rule.action.remediation().to_string()),
                    });
                }
            }
        }

        let sim_mean_risk = simulation
            .and_then(|sim| sim.metrics.as_ref())
            .map(|m| m.risk.mean);
        let risk_category = classify_risk(&violations, sim_mean_risk);

        let any_critical = violations.iter().any(|v| v.severity == Severity::Critical);
        let any_block = matched_actions.iter().any(|a| *a == RuleAction::Block);
        let any_escalating = matched_actions
            .iter()
            .any(|a| matches!(a, RuleAction::Escalate | RuleAction::RequireApproval));

        let decision = if any_critical || any_block {
            Decision::Vetoed
        } else if matches!(risk_category, RiskCategory::Critical | RiskCategory::High)
            || any_escalating
        {
            Decision::Escalated
        } else if risk_category == RiskCategory::Medium && !violations.is_empty() {
            Decision::Conditional
        } else {
            Decision::Approved
        };

        let evaluation = GovernanceEvaluation {
            id: Uuid::new_v4(),
            strategy_id: strategy.id,
            decision,
            risk_category,
            approval_required: decision == Decision::Escalated
                || risk_category == RiskCategory::Critical,
            violations,
            approved_by: None,
            approved_at: None,
            created_at: now(),
        };

        if decision == Decision::Vetoed {
            self.create_veto(&evaluation);
        }

        self.push_audit(
            "strategy_evaluated",
            evaluation.id.to_string(),
            None,
            format!(
                "strategy {} -> {:?} ({:?} risk, {} violations)",
                strategy.id,
                evaluation.decision,
                evaluation.risk_category,
                evaluation.violations.len()
            ),
        );
        self.archive.record(tables::EVALUATIONS, &evaluation);
        self.evaluations
            .write()
            .insert(evaluation.id, evaluation.clone());
        evaluation
    }

    /// Human approval of an evaluation that requires it
    pub fn approve_strategy(
        &self,
        evaluation_id: Uuid,
        approver: &str,
    ) -> Result<GovernanceEvaluation, GovernanceError> {
        let mut evaluations = self.evaluations.write();
        let evaluation = evaluations
            .get_mut(&evaluation_id)
            .ok_or(GovernanceError::EvaluationNotFound(evaluation_id))?;
        if !evaluation.approval_required {
            return Err(GovernanceError::ApprovalNotRequired(evaluation_id));
        }

        evaluation.decision = Decision::Approved;
        evaluation.approval_required = false;
        evaluation.approved_by = Some(approver.to_string());
        evaluation.approved_at = Some(now());
        let updated = evaluation.clone();
        drop(evaluations);

        self.push_audit(
            "strategy_approved",
            evaluation_id.to_string(),
            Some(approver.to_string()),
            format!("evaluation {} approved", evaluation_id),
        );
        self.archive.record(tables::EVALUATIONS, &updated);
        Ok(updated)
    }

    /// Human override of a non-critical veto. The veto record is removed
    /// from the ledger on success.
    pub fn override_veto(
        &self,
        veto_id: Uuid,
        overridden_by: &str,
        justification: &str,
    ) -> Result<GovernanceEvaluation, GovernanceError> {
        let veto = {
            let vetoes = self.vetoes.read();
            vetoes
                .get(&veto_id)
                .cloned()
                .ok_or(GovernanceError::VetoNotFound(veto_id))?
        };
        if !veto.can_override {
            return Err(GovernanceError::OverrideForbidden(veto_id));
        }

        let updated = {
            let mut evaluations = self.evaluations.write();
            let evaluation = evaluations
                .get_mut(&veto.evaluation_id)
                .ok_or(GovernanceError::EvaluationNotFound(veto.evaluation_id))?;
            evaluation.decision = Decision::Approved;
            evaluation.approval_required = false;
            evaluation.approved_by = Some(overridden_by.to_string());
            evaluation.approved_at = Some(now());
            evaluation.clone()
        };
        self.vetoes.write().remove(&veto_id);

        self.push_audit(
            "veto_overridden",
            veto_id.to_string(),
            Some(overridden_by.to_string()),
            format!("justification: {}", justification),
        );
        self.archive.record(tables::EVALUATIONS, &updated);
        tracing::info!("veto {} overridden by {}", veto_id, overridden_by);
        Ok(updated)
    }

    /// Most recent audit entries, newest last
    pub fn get_audit_trail(&self, limit: Option<usize>) -> Vec<AuditEntry> {
        let audit = self.audit.read();
        let take = limit.unwrap_or(audit.len()).min(audit.len());
        audit.iter().skip(audit.len() - take).cloned().collect()
    }

    pub fn get_active_policies(&self) -> Vec<GovernancePolicy> {
        self.policies
            .read()
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect()
    }

    pub fn get_evaluation(&self, id: Uuid) -> Option<GovernanceEvaluation> {
        self.evaluations.read().get(&id).cloned()
    }

    pub fn get_veto(&self, id: Uuid) -> Option<VetoRecord> {
        self.vetoes.read().get(&id).cloned()
    }

    /// Veto record attached to an evaluation, if still open
    pub fn veto_for_evaluation(&self, evaluation_id: Uuid) -> Option<VetoRecord> {
        self.vetoes
            .read()
            .values()
            .find(|v| v.evaluation_id == evaluation_id)
            .cloned()
    }

    fn create_veto(&self, evaluation: &GovernanceEvaluation) {
        let veto = VetoRecord {
            id: Uuid::new_v4(),
            strategy_id: evaluation.strategy_id,
            evaluation_id: evaluation.id,
            reason: evaluation
                .violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            violations: evaluation.violations.clone(),
            can_override: evaluation.risk_category != RiskCategory::Critical,
            override_requirements: override_requirements(evaluation.risk_category),
            created_at: now(),
        };
        self.push_audit(
            "veto_issued",
            veto.id.to_string(),
            None,
            format!(
                "strategy {} vetoed, override {}",
                veto.strategy_id,
                if veto.can_override { "possible" } else { "forbidden" }
            ),
        );
        self.archive.record(tables::VETOES, &veto);
        self.vetoes.write().insert(veto.id, veto);
    }

    fn push_audit(&self, action: &str, entity_id: String, actor: Option<String>, detail: String) {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            entity_id,
            actor,
            detail,
            timestamp: now(),
        };
        self.archive.record(tables::AUDIT, &entry);
        let mut audit = self.audit.write();
        if audit.len() == AUDIT_CAPACITY {
            audit.pop_front();
        }
        audit.push_back(entry);
    }
}

fn classify_risk(violations: &[Violation], sim_mean_risk: Option<f64>) -> RiskCategory {
    if violations.iter().any(|v| v.severity == Severity::Critical) {
        return RiskCategory::Critical;
    }
    let high_count = violations
        .iter()
        .filter(|v| v.severity == Severity::High)
        .count();
    if sim_mean_risk.map(|r| r > 70.0).unwrap_or(false) || high_count > 2 {
        return RiskCategory::High;
    }
    if !violations.is_empty() || sim_mean_risk.map(|r| r > 40.0).unwrap_or(false) {
        return RiskCategory::Medium;
    }
    RiskCategory::Low
}

fn override_requirements(category: RiskCategory) -> Vec<String> {
    match category {
        RiskCategory::Low | RiskCategory::Medium => {
            vec!["Supervisor approval".to_string()]
        }
        RiskCategory::High => vec![
            "Senior officer approval".to_string(),
            "Documented risk assessment".to_string(),
        ],
        RiskCategory::Critical => vec!["Not overridable".to_string()],
    }
}

/// Built-in policy set used when no external configuration is loaded
pub fn default_policies() -> Vec<GovernancePolicy> {
    vec![
        GovernancePolicy {
            id: "crew-safety".to_string(),
            name: "Crew Safety".to_string(),
            priority: 100,
            active: true,
            rules: vec![
                PolicyRule {
                    id: "crew-impact-block".to_string(),
                    description: "Crew impact above the hard safety limit".to_string(),
                    metric: ImpactMetric::CrewImpact,
                    comparator: Comparator::GreaterThan,
                    threshold: 80.0,
                    action: RuleAction::Block,
                    severity: Severity::Critical,
                },
                PolicyRule {
                    id: "crew-impact-approval".to_string(),
                    description: "Elevated crew impact requires sign-off".to_string(),
                    metric: ImpactMetric::CrewImpact,
                    comparator: Comparator::GreaterThan,
                    threshold: 60.0,
                    action: RuleAction::RequireApproval,
                    severity: Severity::High,
                },
            ],
        },
        GovernancePolicy {
            id: "risk-envelope".to_string(),
            name: "Risk Envelope".to_string(),
            priority: 90,
            active: true,
            rules: vec![
                PolicyRule {
                    id: "risk-escalate".to_string(),
                    description: "Risk outside the accepted envelope".to_string(),
                    metric: ImpactMetric::Risk,
                    comparator: Comparator::GreaterThan,
                    threshold: 90.0,
                    action: RuleAction::Escalate,
                    severity: Severity::High,
                },
                PolicyRule {
                    id: "risk-warn".to_string(),
                    description: "Risk approaching the envelope boundary".to_string(),
                    metric: ImpactMetric::Risk,
                    comparator: Comparator::GreaterThan,
                    threshold: 75.0,
                    action: RuleAction::Warn,
                    severity: Severity::Medium,
                },
            ],
        },
        GovernancePolicy {
            id: "budget-control".to_string(),
            name: "Budget Control".to_string(),
            priority: 80,
            active: true,
            rules: vec![
                PolicyRule {
                    id: "cost-approval".to_string(),
                    description: "Cost above the delegated spending limit".to_string(),
                    metric: ImpactMetric::Cost,
                    comparator: Comparator::GreaterThan,
                    threshold: 50_000.0,
                    action: RuleAction::RequireApproval,
                    severity: Severity::High,
                },
                PolicyRule {
                    id: "cost-warn".to_string(),
                    description: "Cost above the routine budget band".to_string(),
                    metric: ImpactMetric::Cost,
                    comparator: Comparator::GreaterThan,
                    threshold: 20_000.0,
                    action: RuleAction::Warn,
                    severity: Severity::Medium,
                },
            ],
        },
        GovernancePolicy {
            id: "schedule".to_string(),
            name: "Schedule Discipline".to_string(),
            priority: 70,
            active: true,
            rules: vec![PolicyRule {
                id: "time-warn".to_string(),
                description: "Execution time beyond two weeks".to_string(),
                metric: ImpactMetric::Time,
                comparator: Comparator::GreaterThan,
                threshold: 336.0,
                action: RuleAction::Warn,
                severity: Severity::Low,
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::{ImpactEstimate, StrategyAction, StrategyType};

    fn governor() -> PolicyGovernor {
        PolicyGovernor::new(Arc::new(Archive::new(Arc::new(InMemoryStore::new()))))
    }

    fn strategy(impact: ImpactEstimate) -> Strategy {
        Strategy {
            id: Uuid::new_v4(),
            strategy_type: StrategyType::Preventive,
            success_probability: 0.7,
            confidence_score: 75.0,
            estimated_impact: impact,
            actions: vec![StrategyAction::new(1, "Act")],
            signal_ids: vec![],
            created_at: now(),
        }
    }

    #[test]
    fn test_benign_strategy_is_approved() {
        let gov = governor();
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(500.0, 20.0, 8.0, 10.0)),
            None,
        );
        assert_eq!(eval.decision, Decision::Approved);
        assert_eq!(eval.risk_category, RiskCategory::Low);
        assert!(eval.violations.is_empty());
        assert!(!eval.approval_required);
    }

    #[test]
    fn test_critical_crew_impact_is_vetoed_without_override() {
        // Default safety policy: crew_impact > 80 => block, critical
        let gov = governor();
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(10_000.0, 30.0, 10.0, 85.0)),
            None,
        );

        assert_eq!(eval.decision, Decision::Vetoed);
        assert_eq!(eval.risk_category, RiskCategory::Critical);

        let veto = gov.veto_for_evaluation(eval.id).unwrap();
        assert!(!veto.can_override);
        let err = gov.override_veto(veto.id, "captain", "urgent").unwrap_err();
        assert!(matches!(err, GovernanceError::OverrideForbidden(_)));
    }

    #[test]
    fn test_critical_violation_dominates_lower_severities() {
        // crew 85 (critical block) + cost 25k (medium warn): still vetoed
        let gov = governor();
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(25_000.0, 20.0, 10.0, 85.0)),
            None,
        );
        assert_eq!(eval.decision, Decision::Vetoed);
        assert!(eval.violations.len() >= 2);
    }

    #[test]
    fn test_escalation_and_approval_flow() {
        // crew 70 matches require_approval (high severity) => escalated
        let gov = governor();
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(500.0, 20.0, 8.0, 70.0)),
            None,
        );
        assert_eq!(eval.decision, Decision::Escalated);
        assert!(eval.approval_required);

        let approved = gov.approve_strategy(eval.id, "flight-director").unwrap();
        assert_eq!(approved.decision, Decision::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("flight-director"));

        // A second approval is rejected: no longer required
        let err = gov.approve_strategy(eval.id, "someone-else").unwrap_err();
        assert!(matches!(err, GovernanceError::ApprovalNotRequired(_)));
    }

    #[test]
    fn test_conditional_on_medium_violation() {
        // risk 78 matches only the medium warn rule
        let gov = governor();
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(500.0, 78.0, 8.0, 10.0)),
            None,
        );
        assert_eq!(eval.decision, Decision::Conditional);
        assert_eq!(eval.risk_category, RiskCategory::Medium);
        assert!(!eval.approval_required);
    }

    #[test]
    fn test_override_of_non_critical_veto_clears_ledger() {
        let gov = PolicyGovernor::with_policies(
            Arc::new(Archive::new(Arc::new(InMemoryStore::new()))),
            vec![GovernancePolicy {
                id: "p".to_string(),
                name: "P".to_string(),
                priority: 1,
                active: true,
                rules: vec![PolicyRule {
                    id: "r".to_string(),
                    description: "cost ceiling".to_string(),
                    metric: ImpactMetric::Cost,
                    comparator: Comparator::GreaterThan,
                    threshold: 1000.0,
                    action: RuleAction::Block,
                    severity: Severity::High,
                }],
            }],
        );
        let eval = gov.evaluate_strategy(
            &strategy(ImpactEstimate::new(5000.0, 10.0, 8.0, 10.0)),
            None,
        );
        assert_eq!(eval.decision, Decision::Vetoed);

        let veto = gov.veto_for_evaluation(eval.id).unwrap();
        assert!(veto.can_override);

        let updated = gov
            .override_veto(veto.id, "commander", "budget reallocated")
            .unwrap();
        assert_eq!(updated.decision, Decision::Approved);
        // Overridden vetoes leave the in-memory ledger
        assert!(gov.get_veto(veto.id).is_none());
    }

    #[test]
    fn test_operations_on_missing_entities_error() {
        let gov = governor();
        assert!(matches!(
            gov.approve_strategy(Uuid::new_v4(), "x").unwrap_err(),
            GovernanceError::EvaluationNotFound(_)
        ));
        assert!(matches!(
            gov.override_veto(Uuid::new_v4(), "x", "y").unwrap_err(),
            GovernanceError::VetoNotFound(_)
        ));
        assert!(gov.get_evaluation(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_audit_ring_is_bounded() {
        let gov = governor();
        for _ in 0..600 {
            // Each evaluation pushes two entries (evaluation + veto)
            gov.evaluate_strategy(
                &strategy(ImpactEstimate::new(100.0, 10.0, 8.0, 85.0)),
                None,
            );
        }
        let trail = gov.get_audit_trail(None);
        assert_eq!(trail.len(), AUDIT_CAPACITY);

        let limited = gov.get_audit_trail(Some(10));
        assert_eq!(limited.len(), 10);
        // Newest entries are kept
        assert_eq!(limited.last().unwrap().id, trail.last().unwrap().id);
    }

    #[test]
    fn test_policies_load_from_toml() {
        let gov = governor();
        let doc = r#"
            [[policies]]
            id = "fuel"
            name = "Fuel Reserve"
            priority = 50
            active = true

            [[policies.rules]]
            id = "fuel-cost"
            description = "cost cap"
            metric = "cost"
            comparator = ">"
            threshold = 100.0
            action = "warn"
            severity = "low"
        "#;
        assert_eq!(gov.load_policies_from_toml(doc).unwrap(), 1);
        let active = gov.get_active_policies();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].rules[0].metric, ImpactMetric::Cost);

        assert!(gov.load_policies_from_toml("policies = []").is_err());
    }
}
