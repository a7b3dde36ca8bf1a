//! Outcome Simulator - stress-tests a strategy under uncertainty
//!
//! Expands one strategy into a fixed scenario set, runs a Monte Carlo
//! sampling loop over it with a seedable PRNG, and aggregates the
//! cost/risk/time/crew-impact distributions into metrics, warnings and a
//! derived confidence level.
//!
//! Each run is a small state machine:
//!
//! ```text
//! queued -> running -> { completed | failed | cancelled }
//! ```
//!
//! Cancellation is cooperative: `cancel_simulation` flips a token that the
//! sampling loop checks every [`CANCEL_CHECK_INTERVAL`] iterations.

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SimulationError;
use crate::store::{tables, Archive};
use crate::types::{now, ImpactEstimate, Strategy, StrategyType, Timestamp};

/// Iterations between cancellation-token checks
const CANCEL_CHECK_INTERVAL: u32 = 100;
/// Strategies simulated concurrently by the batch runner
const DEFAULT_BATCH_CONCURRENCY: usize = 3;

/// Tunable parameters for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Monte Carlo iterations
    pub iterations: u32,
    /// Planning horizon in hours
    pub time_horizon_hours: f64,
    /// Perturbation amplitude applied to cost and time, 0-1
    pub uncertainty_factor: f64,
    /// Crew members available during execution
    pub crew_availability: u32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            iterations: 1000,
            time_horizon_hours: 168.0,
            uncertainty_factor: 0.2,
            crew_availability: 80,
        }
    }
}

/// Run status state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SimulationStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SimulationStatus::Completed | SimulationStatus::Failed | SimulationStatus::Cancelled
        )
    }
}

/// One possible outcome within a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub probability: f64,
    pub impact: ImpactEstimate,
    pub description: String,
}

/// A possible unfolding of a strategy's execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationScenario {
    pub id: Uuid,
    pub name: String,
    /// Selection weight in [0,1]; weights need not sum to 1 across a set
    pub probability: f64,
    pub outcomes: Vec<ScenarioOutcome>,
    /// Mitigation suggestions carried by adverse scenarios
    pub mitigations: Vec<String>,
}

/// Histogram of sampled risk values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHistogram {
    /// risk <= 30
    pub low: u32,
    /// 30 < risk <= 60
    pub medium: u32,
    /// 60 < risk <= 85
    pub high: u32,
    /// risk > 85
    pub critical: u32,
}

impl RiskHistogram {
    pub fn record(&mut self, risk: f64) {
        if risk <= 30.0 {
            self.low += 1;
        } else if risk <= 60.0 {
            self.medium += 1;
        } else if risk <= 85.0 {
            self.high += 1;
        } else {
            self.critical += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }

    /// Bucket holding the given value's count
    pub fn dominant_bucket(&self) -> &'static str {
        let buckets = [
            (self.low, "low"),
            (self.medium, "medium"),
            (self.high, "high"),
            (self.critical, "critical"),
        ];
        buckets
            .iter()
            .max_by_key(|(count, _)| *count)
            .map(|(_, name)| *name)
            .unwrap_or("low")
    }
}

/// min/max/mean summary of one sampled metric
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl MetricSummary {
    fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        Self { min, max, mean }
    }
}

/// Aggregated distributions of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub cost: MetricSummary,
    pub cost_variance: f64,
    pub risk: MetricSummary,
    pub risk_histogram: RiskHistogram,
    pub time: MetricSummary,
    /// The strategy's action names, in plan order
    pub critical_path: Vec<String>,
    pub crew_impact: MetricSummary,
    /// round(crew_availability x 0.7)
    pub affected_crew: u32,
}

/// Result of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub strategy_type: StrategyType,
    pub status: SimulationStatus,
    pub parameters: SimulationParameters,
    pub scenarios: Vec<SimulationScenario>,
    pub metrics: Option<SimulationMetrics>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    /// Confidence in the aggregate picture, 0-100
    pub confidence_level: f64,
    pub mission_id: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Per-iteration samples collected by the Monte Carlo loop
#[derive(Debug, Default)]
struct SampleSet {
    cost: Vec<f64>,
    risk: Vec<f64>,
    time: Vec<f64>,
    crew: Vec<f64>,
}

impl SampleSet {
    fn push(&mut self, cost: f64, risk: f64, time: f64, crew: f64) {
        self.cost.push(cost);
        self.risk.push(risk);
        self.time.push(time);
        self.crew.push(crew);
    }

    fn len(&self) -> usize {
        self.cost.len()
    }
}

/// Outcome simulator component
pub struct OutcomeSimulator {
    /// Every run ever started, keyed by id
    simulations: RwLock<HashMap<Uuid, SimulationResult>>,
    /// Run ids in start order, for the archive listing
    run_order: RwLock<Vec<Uuid>>,
    /// Cancellation tokens for runs currently in `running`
    cancel_tokens: RwLock<HashMap<Uuid, CancellationToken>>,
    /// Fixed seed for reproducible runs; entropy-seeded when absent
    seed: Option<u64>,
    archive: Arc<Archive>,
}

impl OutcomeSimulator {
    pub fn new(archive: Arc<Archive>) -> Self {
        Self {
            simulations: RwLock::new(HashMap::new()),
            run_order: RwLock::new(Vec::new()),
            cancel_tokens: RwLock::new(HashMap::new()),
            seed: None,
            archive,
        }
    }

    /// Simulator whose runs are reproducible under a fixed seed
    pub fn with_seed(archive: Arc<Archive>, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(archive)
        }
    }

    /// Run one strategy through the Monte Carlo loop.
    ///
    /// Invalid parameters fail the run (status `failed`) and surface the
    /// error; a cancellation observed mid-loop yields a `cancelled` result
    /// aggregated over the samples collected so far.
    pub async fn simulate_strategy(
        &self,
        strategy: &Strategy,
        parameters: SimulationParameters,
        mission_id: Option<&str>,
    ) -> Result<SimulationResult, SimulationError> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(strategy, parameters, mission_id, rng).await
    }

    /// Simulate several strategies in fixed-size sequential batches,
    /// preserving input order in the output.
    ///
    /// One failing strategy fails the whole batch call; results of runs
    /// completed before the failure remain in the simulation archive.
    pub async fn simulate_multiple_strategies(
        &self,
        strategies: &[Strategy],
        parameters: SimulationParameters,
        mission_id: Option<&str>,
    ) -> Result<Vec<SimulationResult>, SimulationError> {
        let mut results = Vec::with_capacity(strategies.len());
        for batch in strategies.chunks(DEFAULT_BATCH_CONCURRENCY) {
            let runs = batch
                .iter()
                .map(|s| self.simulate_strategy(s, parameters.clone(), mission_id));
            let batch_results = futures::future::try_join_all(runs).await?;
            results.extend(batch_results);
        }
        Ok(results)
    }

    /// Request cancellation of a running simulation.
    ///
    /// Only valid while the run is in `running`; any other state errors.
    pub fn cancel_simulation(&self, id: Uuid) -> Result<(), SimulationError> {
        let simulations = self.simulations.read();
        match simulations.get(&id) {
            Some(run) if run.status == SimulationStatus::Running => {
                if let Some(token) = self.cancel_tokens.read().get(&id) {
                    token.cancel();
                    tracing::info!("cancellation requested for simulation {}", id);
                    Ok(())
                } else {
                    Err(SimulationError::NotRunning(id))
                }
            }
            Some(_) => Err(SimulationError::NotRunning(id)),
            None => Err(SimulationError::NotFound(id)),
        }
    }

    /// Look up a run by id
    pub fn get_simulation(&self, id: Uuid) -> Option<SimulationResult> {
        self.simulations.read().get(&id).cloned()
    }

    /// All runs tagged with the given mission, in start order
    pub fn get_simulations_for_mission(&self, mission_id: &str) -> Vec<SimulationResult> {
        let simulations = self.simulations.read();
        self.run_order
            .read()
            .iter()
            .filter_map(|id| simulations.get(id))
            .filter(|run| run.mission_id.as_deref() == Some(mission_id))
            .cloned()
            .collect()
    }

    /// Every run this process has started, in start order
    pub fn get_simulation_archive(&self) -> Vec<SimulationResult> {
        let simulations = self.simulations.read();
        self.run_order
            .read()
            .iter()
            .filter_map(|id| simulations.get(id).cloned())
            .collect()
    }

    async fn run_with_rng<R: Rng>(
        &self,
        strategy: &Strategy,
        parameters: SimulationParameters,
        mission_id: Option<&str>,
        mut rng: R,
    ) -> Result<SimulationResult, SimulationError> {
        let id = Uuid::new_v4();
        let scenarios = build_scenarios(strategy);
        let token = CancellationToken::new();

        let mut result = SimulationResult {
            id,
            strategy_id: strategy.id,
            strategy_type: strategy.strategy_type,
            status: SimulationStatus::Queued,
            parameters: parameters.clone(),
            scenarios: scenarios.clone(),
            metrics: None,
            recommendations: Vec::new(),
            warnings: Vec::new(),
            confidence_level: 0.0,
            mission_id: mission_id.map(String::from),
            started_at: now(),
            completed_at: None,
        };
        self.register_run(result.clone(), token.clone());
        // Dropping this future mid-run (batch sibling abort, caller
        // timeout) must still leave the run in a terminal state
        let _guard = RunGuard { simulator: self, id };

        if let Err(reason) = validate_parameters(&parameters) {
            result.status = SimulationStatus::Failed;
            result.completed_at = Some(now());
            self.finish_run(&result);
            return Err(SimulationError::Failed { id, reason });
        }

        result.status = SimulationStatus::Running;
        self.update_run(&result);
        tracing::debug!(
            "simulation {} running: strategy {} ({}), {} iterations",
            id,
            strategy.id,
            strategy.strategy_type,
            parameters.iterations
        );

        let mut samples = SampleSet::default();
        let mut cancelled = false;
        for iteration in 0..parameters.iterations {
            if iteration % CANCEL_CHECK_INTERVAL == 0 {
                // Yield so a concurrent cancel_simulation call is observed
                tokio::task::yield_now().await;
                if token.is_cancelled() {
                    cancelled = true;
                    break;
                }
            }
            let scenario = pick_cumulative(&scenarios, |s| s.probability, rng.gen::<f64>());
            let outcome = pick_cumulative(&scenario.outcomes, |o| o.probability, rng.gen::<f64>());

            // Cost and time absorb the uncertainty; risk and crew impact
            // are structural and stay as modeled.
            let cost_jitter = 1.0 + (rng.gen::<f64>() - 0.5) * parameters.uncertainty_factor;
            let time_jitter = 1.0 + (rng.gen::<f64>() - 0.5) * parameters.uncertainty_factor;
            samples.push(
                outcome.impact.cost * cost_jitter,
                outcome.impact.risk,
                outcome.impact.time_hours * time_jitter,
                outcome.impact.crew_impact,
            );
        }

        let metrics = aggregate(&samples, strategy, &parameters);
        let (recommendations, warnings) =
            derive_advice(&metrics, &strategy.estimated_impact, &parameters);
        result.confidence_level = derive_confidence(&metrics, warnings.len());
        result.metrics = Some(metrics);
        result.recommendations = recommendations;
        result.warnings = warnings;
        result.status = if cancelled {
            SimulationStatus::Cancelled
        } else {
            SimulationStatus::Completed
        };
        result.completed_at = Some(now());
        self.finish_run(&result);

        tracing::info!(
            "simulation {} {}: {} samples, confidence {:.0}",
            id,
            if cancelled { "cancelled" } else { "completed" },
            samples.len(),
            result.confidence_level
        );
        Ok(result)
    }

    fn register_run(&self, result: SimulationResult, token: CancellationToken) {
        self.cancel_tokens.write().insert(result.id, token);
        self.run_order.write().push(result.id);
        self.simulations.write().insert(result.id, result);
    }

    fn update_run(&self, result: &SimulationResult) {
        self.simulations.write().insert(result.id, result.clone());
    }

    fn finish_run(&self, result: &SimulationResult) {
        self.cancel_tokens.write().remove(&result.id);
        self.simulations.write().insert(result.id, result.clone());
        self.archive.record(tables::SIMULATIONS, result);
    }
}

/// Closes out a run whose future never reached `finish_run`.
///
/// A run future can be dropped between polls: `try_join_all` drops the
/// in-flight siblings of a failing batch member, and callers may impose
/// their own timeouts. Without this guard the run would sit in `running`
/// forever with a leaked cancellation token.
struct RunGuard<'a> {
    simulator: &'a OutcomeSimulator,
    id: Uuid,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        {
            let mut simulations = self.simulator.simulations.write();
            if let Some(run) = simulations.get_mut(&self.id) {
                if !run.status.is_terminal() {
                    run.status = SimulationStatus::Cancelled;
                    run.completed_at = Some(now());
                    tracing::warn!("simulation {} abandoned before completion", self.id);
                    self.simulator.archive.record(tables::SIMULATIONS, &*run);
                }
            }
        }
        self.simulator.cancel_tokens.write().remove(&self.id);
    }
}

fn validate_parameters(parameters: &SimulationParameters) -> Result<(), String> {
    if parameters.iterations == 0 {
        return Err("iterations must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&parameters.uncertainty_factor) {
        return Err(format!(
            "uncertainty factor {} outside [0, 1]",
            parameters.uncertainty_factor
        ));
    }
    if parameters.time_horizon_hours <= 0.0 {
        return Err("time horizon must be positive".to_string());
    }
    Ok(())
}

/// Fixed scenario set for a strategy: best / expected / worst, plus one
/// conditional scenario for the strategy types that carry a tail event.
fn build_scenarios(strategy: &Strategy) -> Vec<SimulationScenario> {
    let base = strategy.estimated_impact;
    let mut scenarios = vec![
        SimulationScenario {
            id: Uuid::new_v4(),
            name: "best-case".to_string(),
            probability: 0.2,
            outcomes: vec![ScenarioOutcome {
                probability: 1.0,
                impact: base.scaled(0.8, 0.5, 0.8, 0.6),
                description: "Execution proceeds smoothly".to_string(),
            }],
            mitigations: Vec::new(),
        },
        SimulationScenario {
            id: Uuid::new_v4(),
            name: "expected-case".to_string(),
            probability: 0.6,
            outcomes: vec![ScenarioOutcome {
                probability: 1.0,
                impact: base,
                description: "Execution matches the estimate".to_string(),
            }],
            mitigations: Vec::new(),
        },
        SimulationScenario {
            id: Uuid::new_v4(),
            name: "worst-case".to_string(),
            probability: 0.15,
            outcomes: vec![ScenarioOutcome {
                probability: 1.0,
                impact: base.scaled(1.5, 1.8, 2.0, 1.5),
                description: "Compounding setbacks during execution".to_string(),
            }],
            mitigations: vec![
                "Pre-position spare capacity".to_string(),
                "Define abort criteria before execution".to_string(),
            ],
        },
    ];

    match strategy.strategy_type {
        StrategyType::RiskMitigation => scenarios.push(SimulationScenario {
            id: Uuid::new_v4(),
            name: "rare-high-impact-event".to_string(),
            probability: 0.05,
            outcomes: vec![ScenarioOutcome {
                probability: 1.0,
                impact: base.scaled(2.5, 2.0, 1.5, 2.0),
                description: "The mitigated risk materializes anyway".to_string(),
            }],
            mitigations: vec!["Escalate to emergency response".to_string()],
        }),
        StrategyType::ResourceAllocation => scenarios.push(SimulationScenario {
            id: Uuid::new_v4(),
            name: "resource-shortage".to_string(),
            probability: 0.1,
            outcomes: vec![ScenarioOutcome {
                probability: 1.0,
                impact: base.scaled(1.3, 1.4, 1.6, 1.3),
                description: "Allocated resources prove insufficient".to_string(),
            }],
            mitigations: vec!["Hold a reserve pool outside the allocation".to_string()],
        }),
        _ => {}
    }
    scenarios
}

/// Cumulative-probability selection. Falls back to the last element when
/// rounding leaves the draw unmatched.
fn pick_cumulative<'a, T, F: Fn(&T) -> f64>(items: &'a [T], weight: F, draw: f64) -> &'a T {
    let mut cumulative = 0.0;
    for item in items {
        cumulative += weight(item);
        if draw < cumulative {
            return item;
        }
    }
    items.last().expect("scenario sets are never empty")
}

fn aggregate(
    samples: &SampleSet,
    strategy: &Strategy,
    parameters: &SimulationParameters,
) -> SimulationMetrics {
    let cost = MetricSummary::from_samples(&samples.cost);
    let cost_variance = if samples.cost.is_empty() {
        0.0
    } else {
        samples
            .cost
            .iter()
            .map(|c| (c - cost.mean).powi(2))
            .sum::<f64>()
            / samples.cost.len() as f64
    };

    let mut risk_histogram = RiskHistogram::default();
    for risk in &samples.risk {
        risk_histogram.record(*risk);
    }

    SimulationMetrics {
        cost,
        cost_variance,
        risk: MetricSummary::from_samples(&samples.risk),
        risk_histogram,
        time: MetricSummary::from_samples(&samples.time),
        critical_path: strategy.actions.iter().map(|a| a.description.clone()).collect(),
        crew_impact: MetricSummary::from_samples(&samples.crew),
        affected_crew: (parameters.crew_availability as f64 * 0.7).round() as u32,
    }
}

fn derive_advice(
    metrics: &SimulationMetrics,
    estimate: &ImpactEstimate,
    parameters: &SimulationParameters,
) -> (Vec<String>, Vec<String>) {
    let mut recommendations = Vec::new();
    let mut warnings = Vec::new();

    if metrics.cost.mean > estimate.cost * 1.2 {
        recommendations.push(format!(
            "Mean cost {:.0} exceeds the estimate by more than 20%; budget contingency",
            metrics.cost.mean
        ));
    }
    if metrics.cost.max > estimate.cost * 2.0 {
        warnings.push(format!(
            "Cost overrun exposure: worst sampled cost {:.0} is over twice the estimate",
            metrics.cost.max
        ));
    }
    if metrics.risk.max > 90.0 {
        warnings.push(format!(
            "Critical risk exposure: max sampled risk {:.0} exceeds 90",
            metrics.risk.max
        ));
    }
    if metrics.time.mean > parameters.time_horizon_hours {
        warnings.push(format!(
            "Mean execution time {:.0}h exceeds the {:.0}h horizon",
            metrics.time.mean, parameters.time_horizon_hours
        ));
    }
    if metrics.crew_impact.mean > 60.0 {
        recommendations.push(
            "High mean crew impact; stagger execution across shifts".to_string(),
        );
    }

    (recommendations, warnings)
}

fn derive_confidence(metrics: &SimulationMetrics, warning_count: usize) -> f64 {
    let mut confidence = 100.0;

    if metrics.cost.mean > 0.0 {
        let dispersion = metrics.cost_variance / metrics.cost.mean;
        if dispersion > 0.3 {
            confidence -= 20.0;
        } else if dispersion > 0.2 {
            confidence -= 10.0;
        }
    }
    if metrics.risk.mean > 70.0 {
        confidence -= 15.0;
    } else if metrics.risk.mean > 50.0 {
        confidence -= 10.0;
    }
    confidence -= 5.0 * warning_count as f64;
    confidence.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::StrategyAction;
    use rand::RngCore;

    fn simulator() -> OutcomeSimulator {
        OutcomeSimulator::with_seed(
            Arc::new(Archive::new(Arc::new(InMemoryStore::new()))),
            42,
        )
    }

    fn strategy(strategy_type: StrategyType, impact: ImpactEstimate) -> Strategy {
        Strategy {
            id: Uuid::new_v4(),
            strategy_type,
            success_probability: 0.7,
            confidence_score: 75.0,
            estimated_impact: impact,
            actions: vec![
                StrategyAction::new(1, "Stabilize"),
                StrategyAction::new(2, "Execute").after(1),
            ],
            signal_ids: vec!["s1".to_string()],
            created_at: now(),
        }
    }

    /// Rng whose f64 draws follow a fixed sequence; 1<<63 maps to 0.5
    struct FixedRng {
        values: Vec<u64>,
        index: usize,
    }

    impl FixedRng {
        fn constant(value: u64) -> Self {
            Self {
                values: vec![value],
                index: 0,
            }
        }
    }

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            let value = self.values[self.index % self.values.len()];
            self.index += 1;
            value
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_pick_cumulative_selection_and_fallback() {
        let scenarios = build_scenarios(&strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        ));
        assert_eq!(scenarios.len(), 3);

        assert_eq!(pick_cumulative(&scenarios, |s| s.probability, 0.1).name, "best-case");
        assert_eq!(pick_cumulative(&scenarios, |s| s.probability, 0.5).name, "expected-case");
        assert_eq!(pick_cumulative(&scenarios, |s| s.probability, 0.9).name, "worst-case");
        // Probabilities sum to 0.95; an unmatched draw falls back to last
        assert_eq!(pick_cumulative(&scenarios, |s| s.probability, 0.99).name, "worst-case");
    }

    #[test]
    fn test_conditional_scenarios_per_type() {
        let rm = build_scenarios(&strategy(
            StrategyType::RiskMitigation,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        ));
        assert_eq!(rm.len(), 4);
        assert_eq!(rm[3].name, "rare-high-impact-event");
        assert!((rm[3].probability - 0.05).abs() < 1e-9);

        let ra = build_scenarios(&strategy(
            StrategyType::ResourceAllocation,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        ));
        assert_eq!(ra.len(), 4);
        assert_eq!(ra[3].name, "resource-shortage");
        assert!((ra[3].probability - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_metrics_bounds_and_histogram_sum() {
        let sim = simulator();
        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(5000.0, 55.0, 20.0, 30.0),
        );
        let parameters = SimulationParameters {
            iterations: 500,
            ..Default::default()
        };
        let result = sim
            .simulate_strategy(&strategy, parameters, Some("m1"))
            .await
            .unwrap();

        assert_eq!(result.status, SimulationStatus::Completed);
        let metrics = result.metrics.unwrap();
        for summary in [metrics.cost, metrics.risk, metrics.time, metrics.crew_impact] {
            assert!(summary.min <= summary.mean);
            assert!(summary.mean <= summary.max);
        }
        assert_eq!(metrics.risk_histogram.total(), 500);
        assert_eq!(metrics.critical_path, vec!["Stabilize", "Execute"]);
        assert_eq!(metrics.affected_crew, 56); // 80 * 0.7
        assert!(result.confidence_level >= 0.0 && result.confidence_level <= 100.0);
    }

    #[tokio::test]
    async fn test_expected_case_draw_with_zero_uncertainty() {
        // One iteration, uncertainty 0, every draw fixed at 0.5: the
        // scenario pick lands on expected-case and risk stays at 95.
        let sim = simulator();
        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(10_000.0, 95.0, 10.0, 20.0),
        );
        let parameters = SimulationParameters {
            iterations: 1,
            uncertainty_factor: 0.0,
            ..Default::default()
        };
        let result = sim
            .run_with_rng(&strategy, parameters, None, FixedRng::constant(1 << 63))
            .await
            .unwrap();

        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.risk.mean, 95.0);
        assert_eq!(metrics.risk_histogram.critical, 1);
        assert_eq!(metrics.cost.mean, 10_000.0);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("risk") && w.contains("90")));
    }

    #[tokio::test]
    async fn test_seeded_runs_are_reproducible() {
        let strategy = strategy(
            StrategyType::Optimization,
            ImpactEstimate::new(2000.0, 25.0, 12.0, 15.0),
        );
        let parameters = SimulationParameters {
            iterations: 200,
            ..Default::default()
        };

        let a = simulator()
            .simulate_strategy(&strategy, parameters.clone(), None)
            .await
            .unwrap();
        let b = simulator()
            .simulate_strategy(&strategy, parameters, None)
            .await
            .unwrap();

        let (ma, mb) = (a.metrics.unwrap(), b.metrics.unwrap());
        assert_eq!(ma.cost.mean, mb.cost.mean);
        assert_eq!(ma.risk_histogram, mb.risk_histogram);
    }

    #[tokio::test]
    async fn test_invalid_parameters_fail_the_run() {
        let sim = simulator();
        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        );
        let parameters = SimulationParameters {
            iterations: 0,
            ..Default::default()
        };
        let err = sim
            .simulate_strategy(&strategy, parameters, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::Failed { .. }));

        // The failed run is archived with a terminal status and a stamp
        let archived = sim.get_simulation_archive();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].status, SimulationStatus::Failed);
        assert!(archived[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_dropped_run_is_marked_cancelled() {
        let sim = simulator();
        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        );
        {
            let mut run = Box::pin(sim.simulate_strategy(
                &strategy,
                SimulationParameters::default(),
                None,
            ));
            // First poll registers the run, flips it to running and parks
            // at the first cancellation checkpoint
            assert!(futures::poll!(run.as_mut()).is_pending());
        } // future dropped mid-run

        let archived = sim.get_simulation_archive();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].status, SimulationStatus::Cancelled);
        assert!(archived[0].completed_at.is_some());
        // The leaked token is gone; cancel sees a terminal run
        assert!(matches!(
            sim.cancel_simulation(archived[0].id),
            Err(SimulationError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_mid_run_aggregates_partial_samples() {
        let sim = simulator();
        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        );
        let mut run = Box::pin(sim.simulate_strategy(
            &strategy,
            SimulationParameters::default(),
            None,
        ));
        // Two polls park the loop at the second checkpoint, 100 samples in
        assert!(futures::poll!(run.as_mut()).is_pending());
        assert!(futures::poll!(run.as_mut()).is_pending());

        let running = sim.get_simulation_archive().remove(0);
        assert_eq!(running.status, SimulationStatus::Running);
        sim.cancel_simulation(running.id).unwrap();

        let result = run.await.unwrap();
        assert_eq!(result.status, SimulationStatus::Cancelled);
        assert!(result.completed_at.is_some());
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.risk_histogram.total(), 100);
        assert_eq!(
            sim.get_simulation(running.id).unwrap().status,
            SimulationStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_requires_running_state() {
        let sim = simulator();
        assert!(matches!(
            sim.cancel_simulation(Uuid::new_v4()),
            Err(SimulationError::NotFound(_))
        ));

        let strategy = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 50.0, 10.0, 20.0),
        );
        let result = sim
            .simulate_strategy(&strategy, SimulationParameters::default(), None)
            .await
            .unwrap();
        // Completed runs are terminal and cannot be cancelled
        assert!(matches!(
            sim.cancel_simulation(result.id),
            Err(SimulationError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let sim = simulator();
        let strategies: Vec<Strategy> = (0..5)
            .map(|i| {
                strategy(
                    StrategyType::Preventive,
                    ImpactEstimate::new(1000.0 + i as f64, 40.0, 10.0, 20.0),
                )
            })
            .collect();
        let parameters = SimulationParameters {
            iterations: 50,
            ..Default::default()
        };
        let results = sim
            .simulate_multiple_strategies(&strategies, parameters, Some("m-batch"))
            .await
            .unwrap();

        assert_eq!(results.len(), 5);
        for (result, strategy) in results.iter().zip(&strategies) {
            assert_eq!(result.strategy_id, strategy.id);
        }
        assert_eq!(sim.get_simulations_for_mission("m-batch").len(), 5);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_failure() {
        let sim = simulator();
        let good = strategy(
            StrategyType::Preventive,
            ImpactEstimate::new(1000.0, 40.0, 10.0, 20.0),
        );
        let parameters = SimulationParameters {
            iterations: 0, // invalid, every run fails
            ..Default::default()
        };
        let err = sim
            .simulate_multiple_strategies(&[good.clone(), good], parameters, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::Failed { .. }));
        // No run is left in a non-terminal state after the abort
        assert!(sim
            .get_simulation_archive()
            .iter()
            .all(|r| r.status.is_terminal()));
    }

    proptest::proptest! {
        #[test]
        fn prop_summary_bounds_and_histogram_sum(
            samples in proptest::collection::vec(0.0f64..100.0, 1..300),
        ) {
            let summary = MetricSummary::from_samples(&samples);
            proptest::prop_assert!(summary.min <= summary.mean + 1e-9);
            proptest::prop_assert!(summary.mean <= summary.max + 1e-9);

            let mut histogram = RiskHistogram::default();
            for sample in &samples {
                histogram.record(*sample);
            }
            proptest::prop_assert_eq!(histogram.total() as usize, samples.len());
        }
    }
}
