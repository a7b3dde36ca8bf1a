//! Core types shared across the decision pipeline
//!
//! This module defines the artifacts that flow between components:
//! signals, strategies, action plans and impact estimates. Components own
//! their specialized result types (simulation, governance, consensus) in
//! their own modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// Create a timestamp for the current moment
pub fn now() -> Timestamp {
    Utc::now()
}

/// Origin of an operational signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalSource {
    SituationalAwareness,
    Analytics,
    Manual,
    Sensor,
}

/// A timestamped, prioritized external observation.
///
/// Signals are produced externally, held in the generator's active set
/// until cleared, and never mutated. Receiving a second signal with the
/// same id replaces the first (last write wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub source: SignalSource,
    /// Free-form type string, e.g. "engine_alert" or "fuel_risk"
    pub signal_type: String,
    /// Priority in 0-100; >70 is the high band, 41-70 medium, <=40 low
    pub priority: u8,
    /// Opaque payload carried through to the durable record
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Signal {
    pub fn new(
        id: impl Into<String>,
        source: SignalSource,
        signal_type: impl Into<String>,
        priority: u8,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            signal_type: signal_type.into(),
            priority: priority.min(100),
            payload: serde_json::Value::Null,
            timestamp: now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Strategy classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    Preventive,
    Reactive,
    Optimization,
    RiskMitigation,
    ResourceAllocation,
    EmergencyResponse,
}

impl StrategyType {
    /// All strategy types, in declaration order
    pub const ALL: [StrategyType; 6] = [
        StrategyType::Preventive,
        StrategyType::Reactive,
        StrategyType::Optimization,
        StrategyType::RiskMitigation,
        StrategyType::ResourceAllocation,
        StrategyType::EmergencyResponse,
    ];
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyType::Preventive => "preventive",
            StrategyType::Reactive => "reactive",
            StrategyType::Optimization => "optimization",
            StrategyType::RiskMitigation => "risk-mitigation",
            StrategyType::ResourceAllocation => "resource-allocation",
            StrategyType::EmergencyResponse => "emergency-response",
        };
        write!(f, "{}", s)
    }
}

/// The metrics an impact estimate carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactMetric {
    Cost,
    Risk,
    Time,
    CrewImpact,
}

impl fmt::Display for ImpactMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImpactMetric::Cost => "cost",
            ImpactMetric::Risk => "risk",
            ImpactMetric::Time => "time",
            ImpactMetric::CrewImpact => "crew_impact",
        };
        write!(f, "{}", s)
    }
}

/// Estimated impact of executing a strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    /// Monetary cost, >= 0
    pub cost: f64,
    /// Risk score, 0-100
    pub risk: f64,
    /// Execution time in hours, > 0
    pub time_hours: f64,
    /// Crew impact score, 0-100
    pub crew_impact: f64,
}

impl ImpactEstimate {
    pub fn new(cost: f64, risk: f64, time_hours: f64, crew_impact: f64) -> Self {
        Self {
            cost: cost.max(0.0),
            risk: risk.clamp(0.0, 100.0),
            time_hours: time_hours.max(f64::MIN_POSITIVE),
            crew_impact: crew_impact.clamp(0.0, 100.0),
        }
    }

    /// Value of a single metric, used by governance rule evaluation
    pub fn metric(&self, metric: ImpactMetric) -> f64 {
        match metric {
            ImpactMetric::Cost => self.cost,
            ImpactMetric::Risk => self.risk,
            ImpactMetric::Time => self.time_hours,
            ImpactMetric::CrewImpact => self.crew_impact,
        }
    }

    /// Scale each metric by its own factor, clamping risk and crew impact
    /// back into 0-100.
    pub fn scaled(&self, cost: f64, risk: f64, time: f64, crew: f64) -> Self {
        Self::new(
            self.cost * cost,
            self.risk * risk,
            self.time_hours * time,
            self.crew_impact * crew,
        )
    }
}

/// One step in a strategy's action plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAction {
    /// Position in the plan, starting at 1
    pub order: u32,
    pub description: String,
    /// Orders of earlier actions this one depends on
    pub depends_on: Vec<u32>,
}

impl StrategyAction {
    pub fn new(order: u32, description: impl Into<String>) -> Self {
        Self {
            order,
            description: description.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, order: u32) -> Self {
        self.depends_on.push(order);
        self
    }
}

/// A typed, scored candidate course of action.
///
/// Immutable once generated; the generator retains a copy keyed by id so
/// later learning feedback can be associated with its type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub strategy_type: StrategyType,
    /// Estimated probability of success, 0-1
    pub success_probability: f64,
    /// Confidence in the estimate, 0-100
    pub confidence_score: f64,
    pub estimated_impact: ImpactEstimate,
    pub actions: Vec<StrategyAction>,
    /// Ids of the signals this strategy was generated from
    pub signal_ids: Vec<String>,
    pub created_at: Timestamp,
}

impl Strategy {
    /// Ranking key: confidence x success probability, higher is better
    pub fn ranking_score(&self) -> f64 {
        self.confidence_score * self.success_probability
    }
}

/// A ranked set of candidate strategies produced by one generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyProposal {
    pub id: Uuid,
    /// Up to 5 strategies, descending by ranking score; index 0 is the top
    pub strategies: Vec<Strategy>,
    /// Free-form analysis context describing the signal picture
    pub context: String,
    pub mission_id: Option<String>,
    pub created_at: Timestamp,
}

impl StrategyProposal {
    /// The top-ranked strategy, `None` for an empty proposal
    pub fn top(&self) -> Option<&Strategy> {
        self.strategies.first()
    }
}

/// Feedback outcome used to adjust the learned success rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Success,
    Partial,
    Failed,
    Pending,
}

/// Threshold comparator used in governance rule predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
}

impl Comparator {
    pub fn evaluate(&self, left: f64, right: f64) -> bool {
        match self {
            Comparator::GreaterThan => left > right,
            Comparator::LessThan => left < right,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::GreaterThan => write!(f, ">"),
            Comparator::LessThan => write!(f, "<"),
        }
    }
}
