use chainor_core::{truncate_chars, ChainorResult};
use chainor_store::BlobStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const FEEDBACK_NAMESPACE: &str = "feedback";
const TASK_EXCERPT_CHARS: usize = 100;
const DEFAULT_SCORE: f64 = 3.0;

/// One user rating for an agent's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub task: String,
    pub agent: String,
    pub score: u8,
    #[serde(default)]
    pub comment: String,
    pub time: chrono::DateTime<chrono::Utc>,
}

/// Running sum for one agent, kept alongside the entry list so that
/// averages never require a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentScore {
    pub total: u64,
    pub sum: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FeedbackData {
    feedbacks: Vec<FeedbackEntry>,
    scores: HashMap<String, AgentScore>,
}

/// Aggregate view over all recorded feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: usize,
    pub agent_scores: HashMap<String, f64>,
    pub best_agent: Option<String>,
}

/// Per-workflow user rating log with running per-agent averages.
pub struct FeedbackLog {
    store: Arc<dyn BlobStore>,
    workflow: String,
}

impl FeedbackLog {
    pub fn new(store: Arc<dyn BlobStore>, workflow: impl Into<String>) -> Self {
        Self {
            store,
            workflow: workflow.into(),
        }
    }

    fn id(&self) -> String {
        format!("{}_feedback", self.workflow)
    }

    async fn load(&self) -> FeedbackData {
        match self.store.load(FEEDBACK_NAMESPACE, &self.id()).await {
            Ok(Some(blob)) => serde_json::from_value(blob).unwrap_or_else(|e| {
                warn!(workflow = %self.workflow, error = %e, "Unreadable feedback log, starting fresh");
                FeedbackData::default()
            }),
            Ok(None) => FeedbackData::default(),
            Err(e) => {
                warn!(workflow = %self.workflow, error = %e, "Feedback store unavailable, starting fresh");
                FeedbackData::default()
            }
        }
    }

    async fn persist(&self, data: &FeedbackData) -> ChainorResult<()> {
        self.store
            .save(FEEDBACK_NAMESPACE, &self.id(), &serde_json::to_value(data)?)
            .await
    }

    /// Record a rating. Scores clamp into 1..=5; the task is stored as a
    /// 100-character excerpt.
    pub async fn add(
        &self,
        task: &str,
        agent: impl Into<String>,
        score: u8,
        comment: impl Into<String>,
    ) -> ChainorResult<()> {
        let agent = agent.into();
        let score = score.clamp(1, 5);
        let mut data = self.load().await;

        data.feedbacks.push(FeedbackEntry {
            task: truncate_chars(task, TASK_EXCERPT_CHARS).to_string(),
            agent: agent.clone(),
            score,
            comment: comment.into(),
            time: chrono::Utc::now(),
        });
        let stat = data.scores.entry(agent.clone()).or_default();
        stat.total += 1;
        stat.sum += u64::from(score);

        self.persist(&data).await?;
        info!(workflow = %self.workflow, agent = %agent, score, "Feedback recorded");
        Ok(())
    }

    /// Average rating for an agent, or 3.0 when it has none.
    pub async fn agent_score(&self, agent: &str) -> f64 {
        let data = self.load().await;
        average(data.scores.get(agent))
    }

    /// The agent with the highest average rating. Ties resolve to the
    /// lexicographically smaller name so the answer is stable.
    pub async fn best_agent(&self) -> Option<String> {
        let data = self.load().await;
        best_rated(&data.scores)
    }

    pub async fn stats(&self) -> FeedbackStats {
        let data = self.load().await;
        let agent_scores = data
            .scores
            .iter()
            .map(|(agent, stat)| {
                let avg = (average(Some(stat)) * 100.0).round() / 100.0;
                (agent.clone(), avg)
            })
            .collect();
        FeedbackStats {
            total: data.feedbacks.len(),
            agent_scores,
            best_agent: best_rated(&data.scores),
        }
    }
}

fn average(stat: Option<&AgentScore>) -> f64 {
    match stat {
        Some(stat) if stat.total > 0 => stat.sum as f64 / stat.total as f64,
        _ => DEFAULT_SCORE,
    }
}

fn best_rated(scores: &HashMap<String, AgentScore>) -> Option<String> {
    let mut agents: Vec<_> = scores.keys().collect();
    agents.sort();
    let mut best: Option<(&str, f64)> = None;
    for agent in agents {
        let avg = average(scores.get(agent.as_str()));
        let better = match best {
            Some((_, best_avg)) => avg > best_avg,
            None => true,
        };
        if better {
            best = Some((agent, avg));
        }
    }
    best.map(|(agent, _)| agent.to_string())
}
