//! Strategy Generator - turns prioritized signals into ranked strategies
//!
//! The generator holds the process-wide active signal set and the learned
//! per-type success rates. `generate_strategies` partitions the active
//! signals into priority bands and builds one candidate strategy per
//! applicable band, synthesizing deterministic alternatives until at least
//! three distinct strategy types exist. Later feedback nudges the learned
//! success rate of the strategy's type.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GeneratorError;
use crate::store::{tables, Archive};
use crate::types::{
    now, FeedbackOutcome, ImpactEstimate, Signal, Strategy, StrategyAction, StrategyProposal,
    StrategyType,
};

/// Learned success rates are clamped into this band
const RATE_FLOOR: f64 = 0.1;
const RATE_CEILING: f64 = 0.95;
/// Every strategy type starts at this rate
const RATE_SEED: f64 = 0.7;

/// A proposal keeps at most this many ranked strategies
const MAX_RANKED: usize = 5;
/// Minimum number of distinct strategy types per proposal
const MIN_TYPES: usize = 3;

/// Strategy generator component
pub struct StrategyGenerator {
    /// Active signals in arrival order; a duplicate id replaces in place
    active_signals: RwLock<Vec<Signal>>,
    /// Every strategy ever generated, for learning-feedback association
    strategies: RwLock<HashMap<Uuid, Strategy>>,
    /// Learned success rate per strategy type
    success_rates: RwLock<HashMap<StrategyType, f64>>,
    archive: Arc<Archive>,
}

impl StrategyGenerator {
    pub fn new(archive: Arc<Archive>) -> Self {
        let success_rates = StrategyType::ALL
            .iter()
            .map(|t| (*t, RATE_SEED))
            .collect();
        Self {
            active_signals: RwLock::new(Vec::new()),
            strategies: RwLock::new(HashMap::new()),
            success_rates: RwLock::new(success_rates),
            archive,
        }
    }

    /// Add a signal to the active set and archive it.
    ///
    /// Duplicate ids never error: the newer signal replaces the older one.
    pub fn receive_signal(&self, signal: Signal) {
        self.archive.record(tables::SIGNALS, &signal);
        let mut signals = self.active_signals.write();
        if let Some(existing) = signals.iter_mut().find(|s| s.id == signal.id) {
            tracing::debug!("signal {} replaced (last write wins)", signal.id);
            *existing = signal;
        } else {
            signals.push(signal);
        }
    }

    /// Number of signals currently in the active set
    pub fn active_signal_count(&self) -> usize {
        self.active_signals.read().len()
    }

    /// Reset the active set. Already-generated strategies keep their own
    /// signal-id references and are unaffected.
    pub fn clear_active_signals(&self) {
        let mut signals = self.active_signals.write();
        tracing::info!("clearing {} active signals", signals.len());
        signals.clear();
    }

    /// Current learned success rate for a strategy type
    pub fn learned_rate(&self, strategy_type: StrategyType) -> f64 {
        *self
            .success_rates
            .read()
            .get(&strategy_type)
            .unwrap_or(&RATE_SEED)
    }

    /// Look up a previously generated strategy
    pub fn get_strategy(&self, id: Uuid) -> Option<Strategy> {
        self.strategies.read().get(&id).cloned()
    }

    /// Convert the active signal set into a ranked strategy proposal.
    ///
    /// Fails if the active set is empty. Always produces at least three
    /// distinct strategy types; retains the top five by ranking score.
    pub fn generate_strategies(
        &self,
        mission_id: Option<&str>,
    ) -> Result<StrategyProposal, GeneratorError> {
        let signals = self.active_signals.read().clone();
        if signals.is_empty() {
            return Err(GeneratorError::NoActiveSignals);
        }

        let high: Vec<&Signal> = signals.iter().filter(|s| s.priority > 70).collect();
        let medium: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.priority > 40 && s.priority <= 70)
            .collect();
        let low: Vec<&Signal> = signals.iter().filter(|s| s.priority <= 40).collect();

        let mut candidates = Vec::new();
        if !high.is_empty() {
            candidates.push(self.build_preventive(&high));
        }
        if !medium.is_empty() {
            candidates.push(self.build_optimization(&medium));
        }
        let risk_triggers: Vec<&Signal> = signals
            .iter()
            .filter(|s| {
                let t = s.signal_type.to_lowercase();
                t.contains("risk") || t.contains("alert")
            })
            .collect();
        if !risk_triggers.is_empty() {
            candidates.push(self.build_risk_mitigation(&risk_triggers));
        }

        // Synthesize alternatives in fixed order until >=3 distinct types
        for alternative in [StrategyType::Reactive, StrategyType::ResourceAllocation] {
            let distinct = {
                let mut types: Vec<StrategyType> =
                    candidates.iter().map(|s| s.strategy_type).collect();
                types.dedup();
                types.sort_by_key(|t| *t as u8);
                types.dedup();
                types.len()
            };
            if distinct >= MIN_TYPES {
                break;
            }
            candidates.push(self.build_alternative(alternative, &signals));
        }

        candidates.sort_by(|a, b| {
            b.ranking_score()
                .partial_cmp(&a.ranking_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(MAX_RANKED);

        {
            let mut table = self.strategies.write();
            for strategy in &candidates {
                self.archive.record(tables::STRATEGIES, strategy);
                table.insert(strategy.id, strategy.clone());
            }
        }

        let proposal = StrategyProposal {
            id: Uuid::new_v4(),
            context: format!(
                "{} active signals ({} high, {} medium, {} low priority)",
                signals.len(),
                high.len(),
                medium.len(),
                low.len()
            ),
            strategies: candidates,
            mission_id: mission_id.map(String::from),
            created_at: now(),
        };
        self.archive.record(tables::PROPOSALS, &proposal);
        if let Some(top) = proposal.top() {
            tracing::info!(
                "proposal {} generated: {} strategies, top type {}",
                proposal.id,
                proposal.strategies.len(),
                top.strategy_type
            );
        }
        Ok(proposal)
    }

    /// Absorb outcome feedback for a strategy, nudging the learned rate of
    /// its type. Unknown strategy ids are a logged no-op.
    pub fn validate_with_learning(&self, strategy_id: Uuid, feedback: FeedbackOutcome) {
        let Some(strategy_type) = self
            .strategies
            .read()
            .get(&strategy_id)
            .map(|s| s.strategy_type)
        else {
            tracing::warn!(
                "learning feedback for unknown strategy {} ignored",
                strategy_id
            );
            return;
        };

        let delta = match feedback {
            FeedbackOutcome::Success => 0.05,
            FeedbackOutcome::Partial => 0.02,
            FeedbackOutcome::Failed => -0.05,
            FeedbackOutcome::Pending => 0.0,
        };

        let mut rates = self.success_rates.write();
        let rate = rates.entry(strategy_type).or_insert(RATE_SEED);
        *rate = (*rate + delta).clamp(RATE_FLOOR, RATE_CEILING);
        tracing::debug!(
            "learned rate for {} adjusted to {:.2} ({:?})",
            strategy_type,
            rate,
            feedback
        );
    }

    fn build_preventive(&self, high: &[&Signal]) -> Strategy {
        let actions = high
            .iter()
            .enumerate()
            .map(|(i, signal)| {
                StrategyAction::new(
                    i as u32 + 1,
                    format!("Mitigate {} ({})", signal.signal_type, signal.id),
                )
            })
            .collect();
        let avg_priority =
            high.iter().map(|s| s.priority as f64).sum::<f64>() / high.len() as f64;

        self.finish_strategy(
            StrategyType::Preventive,
            70.0 + avg_priority * 0.1,
            ImpactEstimate::new(
                1500.0 * high.len() as f64,
                avg_priority * 0.6,
                4.0 * high.len() as f64,
                20.0 + 5.0 * high.len() as f64,
            ),
            actions,
            high,
        )
    }

    fn build_optimization(&self, medium: &[&Signal]) -> Strategy {
        let actions = vec![
            StrategyAction::new(1, "Profile current resource utilization"),
            StrategyAction::new(2, "Rebalance workloads across systems").after(1),
            StrategyAction::new(3, "Verify efficiency targets").after(2),
        ];
        self.finish_strategy(
            StrategyType::Optimization,
            65.0,
            ImpactEstimate::new(800.0 * medium.len() as f64, 25.0, 12.0, 15.0),
            actions,
            medium,
        )
    }

    fn build_risk_mitigation(&self, triggers: &[&Signal]) -> Strategy {
        let actions = vec![
            StrategyAction::new(1, "Isolate affected subsystems"),
            StrategyAction::new(2, "Deploy redundant capacity").after(1),
            StrategyAction::new(3, "Establish continuous monitoring").after(1),
            StrategyAction::new(4, "Validate containment").after(2).after(3),
        ];
        let avg_priority =
            triggers.iter().map(|s| s.priority as f64).sum::<f64>() / triggers.len() as f64;
        self.finish_strategy(
            StrategyType::RiskMitigation,
            78.0,
            ImpactEstimate::new(
                5000.0 + 500.0 * triggers.len() as f64,
                avg_priority * 0.5,
                24.0,
                30.0,
            ),
            actions,
            triggers,
        )
    }

    fn build_alternative(&self, strategy_type: StrategyType, signals: &[Signal]) -> Strategy {
        let refs: Vec<&Signal> = signals.iter().collect();
        match strategy_type {
            StrategyType::Reactive => self.finish_strategy(
                StrategyType::Reactive,
                60.0,
                ImpactEstimate::new(1200.0, 40.0, 8.0, 25.0),
                vec![
                    StrategyAction::new(1, "Respond to highest-priority signal"),
                    StrategyAction::new(2, "Reassess signal picture").after(1),
                ],
                &refs,
            ),
            _ => self.finish_strategy(
                StrategyType::ResourceAllocation,
                55.0,
                ImpactEstimate::new(3000.0, 20.0, 16.0, 35.0),
                vec![
                    StrategyAction::new(1, "Inventory available resources"),
                    StrategyAction::new(2, "Reassign crews to priority tasks").after(1),
                    StrategyAction::new(3, "Confirm coverage of critical systems").after(2),
                ],
                &refs,
            ),
        }
    }

    fn finish_strategy(
        &self,
        strategy_type: StrategyType,
        confidence_score: f64,
        estimated_impact: ImpactEstimate,
        actions: Vec<StrategyAction>,
        signals: &[&Signal],
    ) -> Strategy {
        Strategy {
            id: Uuid::new_v4(),
            strategy_type,
            success_probability: self.learned_rate(strategy_type),
            confidence_score: confidence_score.clamp(0.0, 100.0),
            estimated_impact,
            actions,
            signal_ids: signals.iter().map(|s| s.id.clone()).collect(),
            created_at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::SignalSource;

    fn generator() -> StrategyGenerator {
        StrategyGenerator::new(Arc::new(Archive::new(Arc::new(InMemoryStore::new()))))
    }

    #[test]
    fn test_generate_fails_without_signals() {
        let gen = generator();
        assert!(matches!(
            gen.generate_strategies(None),
            Err(GeneratorError::NoActiveSignals)
        ));
    }

    #[test]
    fn test_duplicate_signal_id_last_write_wins() {
        let gen = generator();
        gen.receive_signal(Signal::new("s1", SignalSource::Sensor, "fuel_low", 50));
        gen.receive_signal(Signal::new("s1", SignalSource::Sensor, "fuel_low", 90));
        assert_eq!(gen.active_signal_count(), 1);

        let proposal = gen.generate_strategies(None).unwrap();
        // Priority 90 lands in the high band, so a preventive strategy exists
        assert!(proposal
            .strategies
            .iter()
            .any(|s| s.strategy_type == StrategyType::Preventive));
    }

    #[test]
    fn test_single_alert_signal_yields_three_types() {
        // Scenario: one priority-85 "engine_alert" signal
        let gen = generator();
        gen.receive_signal(Signal::new(
            "sig-1",
            SignalSource::Sensor,
            "engine_alert",
            85,
        ));

        let proposal = gen.generate_strategies(Some("mission-7")).unwrap();
        let types: Vec<StrategyType> =
            proposal.strategies.iter().map(|s| s.strategy_type).collect();

        assert!(proposal.strategies.len() >= 3);
        assert!(types.contains(&StrategyType::Preventive));
        assert!(types.contains(&StrategyType::RiskMitigation));
        assert_eq!(proposal.mission_id.as_deref(), Some("mission-7"));
    }

    #[test]
    fn test_ranking_is_descending() {
        let gen = generator();
        gen.receive_signal(Signal::new("a", SignalSource::Analytics, "load", 85));
        gen.receive_signal(Signal::new("b", SignalSource::Manual, "drift_risk", 55));
        gen.receive_signal(Signal::new("c", SignalSource::Sensor, "minor", 20));

        let proposal = gen.generate_strategies(None).unwrap();
        assert!(proposal.strategies.len() <= 5);
        for pair in proposal.strategies.windows(2) {
            assert!(pair[0].ranking_score() >= pair[1].ranking_score());
        }
        assert_eq!(proposal.top().unwrap().id, proposal.strategies[0].id);
    }

    #[test]
    fn test_learning_nudges_and_clamps() {
        let gen = generator();
        gen.receive_signal(Signal::new("s", SignalSource::Sensor, "engine_alert", 85));
        let proposal = gen.generate_strategies(None).unwrap();
        let strategy = proposal.top().unwrap().clone();
        let base = gen.learned_rate(strategy.strategy_type);

        gen.validate_with_learning(strategy.id, FeedbackOutcome::Success);
        assert!((gen.learned_rate(strategy.strategy_type) - (base + 0.05)).abs() < 1e-9);

        gen.validate_with_learning(strategy.id, FeedbackOutcome::Pending);
        assert!((gen.learned_rate(strategy.strategy_type) - (base + 0.05)).abs() < 1e-9);

        // Repeated success feedback saturates at the ceiling
        for _ in 0..20 {
            gen.validate_with_learning(strategy.id, FeedbackOutcome::Success);
        }
        assert!((gen.learned_rate(strategy.strategy_type) - 0.95).abs() < 1e-9);

        // Repeated failure feedback saturates at the floor
        for _ in 0..40 {
            gen.validate_with_learning(strategy.id, FeedbackOutcome::Failed);
        }
        assert!((gen.learned_rate(strategy.strategy_type) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_strategy_feedback_is_noop() {
        let gen = generator();
        let before = gen.learned_rate(StrategyType::Preventive);
        gen.validate_with_learning(Uuid::new_v4(), FeedbackOutcome::Success);
        assert_eq!(gen.learned_rate(StrategyType::Preventive), before);
    }

    proptest::proptest! {
        #[test]
        fn prop_learned_rate_clamped_and_monotonic(
            feedbacks in proptest::collection::vec(0usize..4, 1..60),
        ) {
            let gen = generator();
            gen.receive_signal(Signal::new("s", SignalSource::Sensor, "engine_alert", 85));
            let proposal = gen.generate_strategies(None).unwrap();
            let strategy = proposal.top().unwrap().clone();

            for choice in feedbacks {
                let feedback = match choice {
                    0 => FeedbackOutcome::Success,
                    1 => FeedbackOutcome::Partial,
                    2 => FeedbackOutcome::Failed,
                    _ => FeedbackOutcome::Pending,
                };
                let before = gen.learned_rate(strategy.strategy_type);
                gen.validate_with_learning(strategy.id, feedback);
                let after = gen.learned_rate(strategy.strategy_type);

                proptest::prop_assert!((0.1..=0.95).contains(&after));
                match feedback {
                    FeedbackOutcome::Success | FeedbackOutcome::Partial => {
                        proptest::prop_assert!(after >= before)
                    }
                    FeedbackOutcome::Failed => proptest::prop_assert!(after <= before),
                    FeedbackOutcome::Pending => {
                        proptest::prop_assert!((after - before).abs() < 1e-12)
                    }
                }
            }
        }
    }

    #[test]
    fn test_clear_active_signals_keeps_strategies() {
        let gen = generator();
        gen.receive_signal(Signal::new("s", SignalSource::Sensor, "engine_alert", 85));
        let proposal = gen.generate_strategies(None).unwrap();
        let id = proposal.top().unwrap().id;

        gen.clear_active_signals();
        assert_eq!(gen.active_signal_count(), 0);

        let strategy = gen.get_strategy(id).unwrap();
        assert_eq!(strategy.signal_ids, vec!["s".to_string()]);
    }
}
