use crate::classifier::{Classification, Complexity, TaskType};
use chainor_core::{ChainorError, ChainorResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The ordered agent sequence plus execution parameters chosen for one task.
///
/// Immutable once execution starts; the agent sequence is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub agents: Vec<String>,
    pub iterations: u32,
    pub need_review: bool,
    pub need_parallel: bool,
}

impl Plan {
    /// Combination key for historical statistics: agent ids joined by `+`.
    pub fn combination_key(&self) -> String {
        self.agents.join("+")
    }
}

/// Historical best-combination data for one task type, produced by the
/// optimizer. The router is the only component permitted to act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboInsight {
    pub agents: Vec<String>,
    pub samples: usize,
    pub mean: f64,
}

/// Canonical agent sequences per `(complexity, task type)` cell.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Minimal two-agent sequence for simple tasks.
    pub simple_sequence: Vec<String>,
    /// Standard writing pipeline; also the universal fallback.
    pub medium_write: Vec<String>,
    pub medium_develop: Vec<String>,
    /// Two passes through the writing agent for complex write/analyze work.
    pub complex_write: Vec<String>,
    pub complex_develop: Vec<String>,
    /// Minimum samples before historical data may override a canonical plan.
    pub min_samples: usize,
    /// Minimum mean score before historical data may override.
    pub confidence_bar: f64,
}

fn agents(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            simple_sequence: agents(&["m25", "dsr"]),
            medium_write: agents(&["m25", "gpt53", "dsr"]),
            medium_develop: agents(&["m25plan", "gpt53review", "g53dev"]),
            complex_write: agents(&["m25", "gpt53", "m25", "dsr"]),
            complex_develop: agents(&["m25plan", "gpt53review", "g53dev", "dsrtdd"]),
            min_samples: 3,
            confidence_bar: 80.0,
        }
    }
}

/// Deterministic plan router. Never fails at routing time: every
/// classification maps to a plan, unknown cells fall back to the
/// medium/write sequence.
pub struct Router {
    config: RouteConfig,
}

impl Router {
    /// Create a router, rejecting configurations with empty sequences
    /// (a plan's agent sequence must never be empty).
    pub fn new(config: RouteConfig) -> ChainorResult<Self> {
        let sequences = [
            &config.simple_sequence,
            &config.medium_write,
            &config.medium_develop,
            &config.complex_write,
            &config.complex_develop,
        ];
        if sequences.iter().any(|seq| seq.is_empty()) {
            return Err(ChainorError::Config(
                "Route config contains an empty agent sequence".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Choose a plan for a classification, optionally biased by historical
    /// performance. The insight overrides the canonical sequence only when
    /// its sample count and mean score clear the configured thresholds.
    pub fn route(&self, classification: &Classification, insight: Option<&ComboInsight>) -> Plan {
        let mut plan = self.canonical(classification);

        if let Some(insight) = insight {
            if insight.samples >= self.config.min_samples
                && insight.mean >= self.config.confidence_bar
                && !insight.agents.is_empty()
            {
                info!(
                    task_type = %classification.task_type,
                    combination = %insight.agents.join("+"),
                    mean = insight.mean,
                    samples = insight.samples,
                    "Routing with historical best combination"
                );
                plan.agents = insight.agents.clone();
            }
        }

        plan
    }

    fn canonical(&self, c: &Classification) -> Plan {
        let need_parallel = c.need_parallel;
        match (c.complexity, c.task_type) {
            (Complexity::Simple, _) => Plan {
                agents: self.config.simple_sequence.clone(),
                iterations: 1,
                need_review: false,
                need_parallel,
            },
            (Complexity::Medium, TaskType::Write | TaskType::Rewrite) => Plan {
                agents: self.config.medium_write.clone(),
                iterations: 1,
                need_review: true,
                need_parallel,
            },
            (Complexity::Medium, TaskType::Develop | TaskType::Design) => Plan {
                agents: self.config.medium_develop.clone(),
                iterations: 1,
                need_review: true,
                need_parallel,
            },
            (Complexity::Complex, TaskType::Write | TaskType::Analyze) => Plan {
                agents: self.config.complex_write.clone(),
                iterations: 2,
                need_review: true,
                need_parallel,
            },
            (Complexity::Complex, TaskType::Develop) => Plan {
                agents: self.config.complex_develop.clone(),
                iterations: 1,
                need_review: true,
                need_parallel,
            },
            // Uncovered cells route through the standard writing pipeline.
            _ => Plan {
                agents: self.config.medium_write.clone(),
                iterations: 1,
                need_review: true,
                need_parallel,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierConfig};

    fn route(task: &str, insight: Option<&ComboInsight>) -> Plan {
        let classifier = Classifier::new(ClassifierConfig::default()).unwrap();
        let router = Router::new(RouteConfig::default()).unwrap();
        router.route(&classifier.classify(task), insight)
    }

    #[test]
    fn test_simple_task_gets_minimal_sequence() {
        let plan = route("写一句话介绍AI", None);
        assert_eq!(plan.agents, vec!["m25", "dsr"]);
        assert_eq!(plan.iterations, 1);
        assert!(!plan.need_review);
    }

    #[test]
    fn test_complex_develop_gets_four_agent_sequence() {
        let task = "开发一个完整的用户管理系统，要求支持注册登录和权限控制，\
                    整体架构需要专业水准，采用微服务平台，数据库与缓存分离，\
                    并且要有全面的监控，以及深入的日志审计，还有详细的部署文档，\
                    同时兼顾国际化与可维护性，保证上线后平稳运行";
        let plan = route(task, None);
        assert_eq!(plan.agents, vec!["m25plan", "gpt53review", "g53dev", "dsrtdd"]);
        assert!(plan.need_review);
    }

    #[test]
    fn test_complex_write_doubles_iterations() {
        // Complex keywords dominate, task type is write.
        let plan = route("写一份完整全面深入详细的系统专业报告", None);
        assert_eq!(plan.agents, vec!["m25", "gpt53", "m25", "dsr"]);
        assert_eq!(plan.iterations, 2);
        assert!(plan.need_review);
    }

    #[test]
    fn test_uncovered_cell_falls_back_to_medium_write() {
        // Medium + review has no dedicated row.
        let plan = route("审查并总结这份季度合规文档材料，重点检查数据引用是否可靠", None);
        assert_eq!(plan.agents, vec!["m25", "gpt53", "dsr"]);
        assert!(!plan.agents.is_empty());
    }

    #[test]
    fn test_routing_is_deterministic() {
        let a = route("写一篇关于AI的文章", None);
        let b = route("写一篇关于AI的文章", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_insight_override_when_confident() {
        let insight = ComboInsight {
            agents: vec!["dsr".to_string(), "gpt53".to_string()],
            samples: 5,
            mean: 92.0,
        };
        let plan = route("写一篇关于AI的文章", Some(&insight));
        assert_eq!(plan.agents, vec!["dsr", "gpt53"]);
    }

    #[test]
    fn test_insight_ignored_below_sample_threshold() {
        let insight = ComboInsight {
            agents: vec!["dsr".to_string()],
            samples: 2,
            mean: 99.0,
        };
        let plan = route("写一篇关于AI的文章", Some(&insight));
        assert_eq!(plan.agents, vec!["m25", "gpt53", "dsr"]);
    }

    #[test]
    fn test_insight_ignored_below_confidence_bar() {
        let insight = ComboInsight {
            agents: vec!["dsr".to_string()],
            samples: 10,
            mean: 55.0,
        };
        let plan = route("写一篇关于AI的文章", Some(&insight));
        assert_eq!(plan.agents, vec!["m25", "gpt53", "dsr"]);
    }

    #[test]
    fn test_parallel_hint_propagates_to_plan() {
        let plan = route("同时写三段介绍", None);
        assert!(plan.need_parallel);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let config = RouteConfig {
            simple_sequence: Vec::new(),
            ..RouteConfig::default()
        };
        assert!(Router::new(config).is_err());
    }

    #[test]
    fn test_combination_key() {
        let plan = route("写一句话介绍AI", None);
        assert_eq!(plan.combination_key(), "m25+dsr");
    }
}
