use chainor_core::ChainorResult;
use chainor_routing::ComboInsight;
use chainor_store::BlobStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const LEARN_NAMESPACE: &str = "learn";

/// Running score list for one combination or task type.
///
/// Invariant: `total == scores.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreStat {
    pub total: u64,
    pub scores: Vec<f64>,
}

impl ScoreStat {
    fn push(&mut self, score: f64) {
        self.total += 1;
        self.scores.push(score);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
        }
    }
}

/// Persisted per-workflow statistics blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizerStats {
    pub agent_combinations: HashMap<String, ScoreStat>,
    pub task_types: HashMap<String, ScoreStat>,
    /// Combination stats broken out per task type, feeding the router's
    /// best-combination override.
    #[serde(default)]
    pub task_type_combinations: HashMap<String, HashMap<String, ScoreStat>>,
}

/// Underperformance thresholds for advisories.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub min_samples: usize,
    pub combination_bar: f64,
    pub task_type_bar: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            combination_bar: 60.0,
            task_type_bar: 70.0,
        }
    }
}

/// Records execution scores and surfaces the best-performing combinations.
pub struct Optimizer {
    store: Arc<dyn BlobStore>,
    workflow: String,
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(store: Arc<dyn BlobStore>, workflow: impl Into<String>) -> Self {
        Self {
            store,
            workflow: workflow.into(),
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    fn id(&self) -> String {
        format!("{}_stats", self.workflow)
    }

    /// Load the stats blob, degrading to empty stats when the store is
    /// unavailable or the blob unreadable.
    pub async fn snapshot(&self) -> OptimizerStats {
        match self.store.load(LEARN_NAMESPACE, &self.id()).await {
            Ok(Some(blob)) => serde_json::from_value(blob).unwrap_or_else(|e| {
                warn!(workflow = %self.workflow, error = %e, "Unreadable optimizer stats, starting fresh");
                OptimizerStats::default()
            }),
            Ok(None) => OptimizerStats::default(),
            Err(e) => {
                warn!(workflow = %self.workflow, error = %e, "Optimizer store unavailable, starting fresh");
                OptimizerStats::default()
            }
        }
    }

    /// Record one execution score for a combination and task type.
    ///
    /// Score lists grow without bound; nothing prunes them.
    pub async fn record(
        &self,
        agents: &[String],
        task_type: &str,
        score: f64,
    ) -> ChainorResult<()> {
        let combo = agents.join("+");
        let mut stats = self.snapshot().await;

        stats.agent_combinations.entry(combo.clone()).or_default().push(score);
        stats.task_types.entry(task_type.to_string()).or_default().push(score);
        stats
            .task_type_combinations
            .entry(task_type.to_string())
            .or_default()
            .entry(combo)
            .or_default()
            .push(score);

        self.store
            .save(LEARN_NAMESPACE, &self.id(), &serde_json::to_value(&stats)?)
            .await
    }

    /// The combination with the highest mean score across all task types,
    /// or `None` when no data exists. Ties resolve to the lexicographically
    /// smaller key so the answer is stable.
    pub async fn best_combination(&self) -> Option<(String, f64)> {
        let stats = self.snapshot().await;
        best_of(&stats.agent_combinations)
    }

    /// Historical best combination for one task type, for the router's
    /// override hook. The router applies its own confidence thresholds.
    pub async fn best_for(&self, task_type: &str) -> Option<ComboInsight> {
        let stats = self.snapshot().await;
        let combos = stats.task_type_combinations.get(task_type)?;
        let (combo, mean) = best_of(combos)?;
        let stat = combos.get(&combo)?;
        Some(ComboInsight {
            agents: combo.split('+').map(str::to_string).collect(),
            samples: stat.scores.len(),
            mean,
        })
    }

    /// Human-readable advisories for underperforming combinations and task
    /// types. Advisory text only; the router decides what to do with plans.
    pub async fn suggest_improvements(&self) -> Vec<String> {
        let stats = self.snapshot().await;
        let mut suggestions = Vec::new();

        let mut combos: Vec<_> = stats.agent_combinations.iter().collect();
        combos.sort_by_key(|(combo, _)| combo.clone());
        for (combo, stat) in combos {
            if stat.scores.len() >= self.config.min_samples {
                if let Some(mean) = stat.mean() {
                    if mean < self.config.combination_bar {
                        suggestions.push(format!(
                            "Combination {combo} is underperforming (mean {mean:.0}), consider replacing it"
                        ));
                    }
                }
            }
        }

        let mut types: Vec<_> = stats.task_types.iter().collect();
        types.sort_by_key(|(task_type, _)| task_type.clone());
        for (task_type, stat) in types {
            if stat.scores.len() >= self.config.min_samples {
                if let Some(mean) = stat.mean() {
                    if mean < self.config.task_type_bar {
                        suggestions.push(format!(
                            "Task type {task_type} is underperforming (mean {mean:.0}), consider reworking its pipeline"
                        ));
                    }
                }
            }
        }

        suggestions
    }
}

fn best_of(stats: &HashMap<String, ScoreStat>) -> Option<(String, f64)> {
    let mut best: Option<(&str, f64)> = None;
    let mut keys: Vec<_> = stats.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(mean) = stats[key].mean() {
            let better = match best {
                Some((_, best_mean)) => mean > best_mean,
                None => true,
            };
            if better {
                best = Some((key, mean));
            }
        }
    }
    best.map(|(key, mean)| (key.to_string(), mean))
}
