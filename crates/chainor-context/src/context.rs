use chainor_core::truncate_chars;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Stored step results are capped to bound storage and prompt growth.
pub const STEP_RESULT_CHARS: usize = 500;
/// History lines in prompts carry a shorter summary.
pub const SUMMARY_CHARS: usize = 200;

/// One completed step of a chain. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub agent: String,
    /// Result text, truncated to [`STEP_RESULT_CHARS`].
    pub result: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub time: DateTime<Utc>,
}

/// Accumulated state of one chain run.
///
/// The step log is append-only and preserves execution order; the shared
/// map is the explicit channel for data later agents should see without
/// re-reading the full history. Field names are part of the persisted
/// blob schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Blob id (`{workflow}_{uuid}`), not part of the persisted schema.
    #[serde(skip)]
    pub id: String,
    pub task: String,
    pub steps: Vec<Step>,
    pub shared: BTreeMap<String, String>,
    pub created: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            steps: Vec::new(),
            shared: BTreeMap::new(),
            created: Utc::now(),
        }
    }

    /// Append a step, truncating the result to the storage bound.
    pub fn add_step(
        &mut self,
        agent: impl Into<String>,
        result: &str,
        metadata: HashMap<String, String>,
    ) -> Step {
        let step = Step {
            agent: agent.into(),
            result: truncate_chars(result, STEP_RESULT_CHARS).to_string(),
            metadata,
            time: Utc::now(),
        };
        self.steps.push(step.clone());
        step
    }

    /// Upsert a shared value for later agents.
    pub fn share(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.insert(key.into(), value.into());
    }

    pub fn get_shared(&self, key: &str) -> Option<&str> {
        self.shared.get(key).map(String::as_str)
    }

    /// Build the prompt for the next agent.
    ///
    /// With no accumulated history and no shared data this is exactly the
    /// raw sub-task text. Otherwise the prompt folds in the original task,
    /// one summary line per prior step in execution order, and the shared
    /// map, before restating the current sub-task.
    pub fn build_prompt(&self, subtask: &str) -> String {
        if self.steps.is_empty() && self.shared.is_empty() {
            return subtask.to_string();
        }

        let mut prompt = format!("Task: {}\n\n", self.task);

        if !self.steps.is_empty() {
            prompt.push_str("Execution history:\n");
            for step in &self.steps {
                let summary = truncate_chars(&step.result, SUMMARY_CHARS);
                prompt.push_str(&format!("- {}: {summary}...\n", step.agent));
            }
            prompt.push('\n');
        }

        if !self.shared.is_empty() {
            prompt.push_str("Shared data:\n");
            for (key, value) in &self.shared {
                prompt.push_str(&format!("- {key}: {value}\n"));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("Current task: {subtask}"));
        prompt
    }
}
