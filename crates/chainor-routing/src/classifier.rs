use chainor_core::{ChainorError, ChainorResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Complexity tier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// Closed set of recognized task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Write,
    Rewrite,
    Analyze,
    Develop,
    Design,
    Review,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Write => write!(f, "write"),
            TaskType::Rewrite => write!(f, "rewrite"),
            TaskType::Analyze => write!(f, "analyze"),
            TaskType::Develop => write!(f, "develop"),
            TaskType::Design => write!(f, "design"),
            TaskType::Review => write!(f, "review"),
        }
    }
}

/// Content domain of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Tech,
    Finance,
    Psychology,
    Health,
    General,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Tech => write!(f, "tech"),
            Domain::Finance => write!(f, "finance"),
            Domain::Psychology => write!(f, "psychology"),
            Domain::Health => write!(f, "health"),
            Domain::General => write!(f, "general"),
        }
    }
}

/// Which workflow family a task leans toward (writing vs. development).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowGroup {
    Art,
    Dev,
}

impl std::fmt::Display for WorkflowGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowGroup::Art => write!(f, "artgroup"),
            WorkflowGroup::Dev => write!(f, "devgroup"),
        }
    }
}

/// Structured parameters extracted from the task text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    /// Requested target length, when the text names one (e.g. "800字").
    pub length: Option<u32>,
    /// Requested narrative style, when a style trigger word is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Raw keyword-bag scores behind a complexity decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScores {
    pub simple: u32,
    pub medium: u32,
    pub complex: u32,
}

/// The decision object produced for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub complexity: Complexity,
    pub task_type: TaskType,
    pub domain: Domain,
    pub workflow_group: WorkflowGroup,
    pub params: TaskParams,
    /// Set when the raw text contains a parallel-execution trigger word.
    pub need_parallel: bool,
    pub scores: ComplexityScores,
}

/// Keyword tables driving classification.
///
/// Immutable configuration injected at construction; tests may supply
/// alternate tables. Ordered rule lists are evaluated in declared order,
/// first match wins.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub simple_keywords: Vec<String>,
    pub medium_keywords: Vec<String>,
    pub complex_keywords: Vec<String>,
    /// Ordered `(type, keywords)` rules; earlier rules take precedence.
    /// Matched on the normalized (lowercased) text, so short ASCII keywords
    /// also hit inside longer English words.
    pub task_type_rules: Vec<(TaskType, Vec<String>)>,
    /// Ordered `(domain, keywords)` rules, matched case-sensitively on the
    /// raw text ("AI" does not fire inside "air").
    pub domain_rules: Vec<(Domain, Vec<String>)>,
    pub art_keywords: Vec<String>,
    pub dev_keywords: Vec<String>,
    /// Clause-separator glyphs for the multi-clause heuristic.
    pub separators: Vec<String>,
    /// Trigger words (matched on the raw, un-normalized text) that set the
    /// parallel-execution hint.
    pub parallel_triggers: Vec<String>,
    /// Pattern extracting a requested length, first capture group numeric.
    pub length_pattern: String,
    /// `(trigger, style)` rules filling the style parameter, first match wins.
    pub style_rules: Vec<(String, String)>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_keywords: words(&[
                "一句", "一句话", "短", "简单", "简洁", "什么", "什么是", "解释", "介绍",
            ]),
            medium_keywords: words(&["写", "文章", "分析", "总结", "开发", "设计", "实现"]),
            complex_keywords: words(&[
                "系统", "完整", "全面", "深入", "架构", "平台", "详细", "专业",
            ]),
            task_type_rules: vec![
                (TaskType::Rewrite, words(&["改写", "重写", "润色"])),
                (TaskType::Write, words(&["写", "创作", "科普"])),
                (TaskType::Analyze, words(&["分析", "研究", "探讨"])),
                (TaskType::Develop, words(&["开发", "实现", "写代码"])),
                (TaskType::Design, words(&["设计", "方案", "架构"])),
                (TaskType::Review, words(&["审核", "审查", "检查"])),
            ],
            domain_rules: vec![
                (Domain::Tech, words(&["AI", "代码", "编程", "技术"])),
                (Domain::Finance, words(&["投资", "股票", "理财", "金融"])),
                (Domain::Psychology, words(&["心理", "情绪", "意识", "荣格"])),
                (Domain::Health, words(&["健康", "养生", "身体"])),
            ],
            art_keywords: words(&[
                "写", "文章", "博客", "文案", "内容", "科普", "观点", "评论", "分析", "解读",
                "总结", "报告", "小说", "故事", "脚本", "台词", "改写", "重写", "精简", "扩展",
                "润色",
            ]),
            dev_keywords: words(&[
                "开发", "代码", "功能", "接口", "api", "设计", "架构", "模块", "修复", "bug",
                "优化", "重构", "测试", "部署", "配置", "安装",
            ]),
            separators: words(&["，", "和", "以及", "还有"]),
            parallel_triggers: words(&["并发", "同时", "并行"]),
            length_pattern: r"(\d+)[字篇段]".to_string(),
            style_rules: vec![("荣格".to_string(), "荣格式叙事".to_string())],
        }
    }
}

/// Keyword-scoring task classifier. Pure: same text, same classification.
pub struct Classifier {
    config: ClassifierConfig,
    length_re: Regex,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> ChainorResult<Self> {
        let length_re = Regex::new(&config.length_pattern)
            .map_err(|e| ChainorError::Config(format!("Invalid length pattern: {e}")))?;
        Ok(Self { config, length_re })
    }

    /// Classify a task description.
    pub fn classify(&self, task: &str) -> Classification {
        let lower = task.to_lowercase();

        let scores = self.complexity_scores(task, &lower);
        let complexity = resolve_complexity(scores);
        let task_type = self.task_type(&lower);
        let domain = self.domain(task);
        let workflow_group = self.workflow_group(&lower);
        let params = self.extract_params(task);
        let need_parallel = self
            .config
            .parallel_triggers
            .iter()
            .any(|t| task.contains(t.as_str()));

        Classification {
            complexity,
            task_type,
            domain,
            workflow_group,
            params,
            need_parallel,
            scores,
        }
    }

    fn complexity_scores(&self, task: &str, lower: &str) -> ComplexityScores {
        let bag = |keywords: &[String]| -> u32 {
            keywords.iter().filter(|kw| lower.contains(kw.as_str())).count() as u32
        };
        let mut scores = ComplexityScores {
            simple: bag(&self.config.simple_keywords),
            medium: bag(&self.config.medium_keywords),
            complex: bag(&self.config.complex_keywords),
        };

        let length = task.chars().count();
        if length < 20 {
            scores.simple += 2;
        } else if length > 100 {
            scores.complex += 1;
        }

        // Multi-clause heuristic: many separator glyphs suggest a compound task.
        let occurrences: usize = self
            .config
            .separators
            .iter()
            .map(|sep| task.matches(sep.as_str()).count())
            .sum();
        if occurrences + 1 > 3 {
            scores.complex += 2;
        }

        scores
    }

    fn task_type(&self, lower: &str) -> TaskType {
        for (task_type, keywords) in &self.config.task_type_rules {
            if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
                return *task_type;
            }
        }
        TaskType::Write
    }

    // Domain keywords match the raw text, keeping "AI" case-sensitive.
    fn domain(&self, task: &str) -> Domain {
        for (domain, keywords) in &self.config.domain_rules {
            if keywords.iter().any(|kw| task.contains(kw.as_str())) {
                return *domain;
            }
        }
        Domain::General
    }

    fn workflow_group(&self, lower: &str) -> WorkflowGroup {
        let count = |keywords: &[String]| -> usize {
            keywords.iter().filter(|kw| lower.contains(kw.as_str())).count()
        };
        let art = count(&self.config.art_keywords);
        let dev = count(&self.config.dev_keywords);
        // Ties go to the writing family.
        if dev > art {
            WorkflowGroup::Dev
        } else {
            WorkflowGroup::Art
        }
    }

    fn extract_params(&self, task: &str) -> TaskParams {
        let length = self
            .length_re
            .captures(task)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        let style = self
            .config
            .style_rules
            .iter()
            .find(|(trigger, _)| task.contains(trigger.as_str()))
            .map(|(_, style)| style.clone());
        TaskParams { length, style }
    }
}

/// Asymmetric tie-break: COMPLEX only on a strict double win, SIMPLE on a
/// strict win over medium, otherwise MEDIUM. Preserved exactly for
/// compatibility with recorded routing history.
fn resolve_complexity(scores: ComplexityScores) -> Complexity {
    if scores.complex > scores.medium && scores.complex > scores.simple {
        Complexity::Complex
    } else if scores.simple > scores.medium {
        Complexity::Simple
    } else {
        Complexity::Medium
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_short_neutral_text_is_simple() {
        // Under 20 chars with no medium/complex keywords: the length bonus
        // alone decides.
        let c = classifier().classify("hello there");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.scores.simple, 2);
        assert_eq!(c.scores.medium, 0);
    }

    #[test]
    fn test_simple_scenario_chinese() {
        let c = classifier().classify("写一句话介绍AI");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.task_type, TaskType::Write);
        assert_eq!(c.domain, Domain::Tech);
    }

    #[test]
    fn test_medium_is_the_default_tie_break() {
        // "写文章" scores medium 2 (写, 文章) vs simple 2 (length bonus):
        // not strictly greater, so MEDIUM wins the tie.
        let c = classifier().classify("写文章");
        assert_eq!(c.complexity, Complexity::Medium);
    }

    #[test]
    fn test_separator_heuristic_boosts_complex_by_two() {
        let plain = classifier().classify("做这个任务");
        let clausy = classifier().classify("做这个，那个，还有这个，以及那个");
        assert_eq!(clausy.scores.complex, plain.scores.complex + 2);
    }

    #[test]
    fn test_separator_at_threshold_does_not_boost() {
        // Two occurrences → inferred clause count 3, not strictly above 3.
        let c = classifier().classify("做这个，那个，这个");
        assert_eq!(c.scores.complex, 0);
    }

    #[test]
    fn test_complex_develop_scenario() {
        let task = "开发一个完整的用户管理系统，要求支持注册登录和权限控制，\
                    整体架构需要专业水准，采用微服务平台，数据库与缓存分离，\
                    并且要有全面的监控，以及深入的日志审计，还有详细的部署文档，\
                    同时兼顾国际化与可维护性，保证上线后平稳运行";
        assert!(task.chars().count() > 100);

        let c = classifier().classify(task);
        assert_eq!(c.complexity, Complexity::Complex);
        assert_eq!(c.task_type, TaskType::Develop);
        assert_eq!(c.workflow_group, WorkflowGroup::Dev);
    }

    #[test]
    fn test_task_type_first_match_precedence() {
        // Contains both 改写 (rewrite) and 分析 (analyze); rewrite is declared
        // first and wins.
        let c = classifier().classify("改写并分析这段内容");
        assert_eq!(c.task_type, TaskType::Rewrite);
    }

    #[test]
    fn test_keyword_matches_inside_words() {
        // Substring containment, not tokenization: "api" matches inside
        // "rapid" on the normalized text.
        let config = ClassifierConfig::default();
        let c = Classifier::new(config).unwrap().classify("Rapid prototype needed");
        assert_eq!(c.workflow_group, WorkflowGroup::Dev);
    }

    #[test]
    fn test_default_task_type_is_write() {
        let c = classifier().classify("随便做点什么");
        assert_eq!(c.task_type, TaskType::Write);
    }

    #[test]
    fn test_parallel_trigger_on_raw_text() {
        let c = classifier().classify("同时处理三份数据");
        assert!(c.need_parallel);
        let c = classifier().classify("处理三份数据");
        assert!(!c.need_parallel);
    }

    #[test]
    fn test_length_param_extraction() {
        let c = classifier().classify("写一篇800字的文章");
        assert_eq!(c.params.length, Some(800));
        let c = classifier().classify("写一篇文章");
        assert_eq!(c.params.length, None);
    }

    #[test]
    fn test_style_trigger_sets_param_and_domain() {
        let c = classifier().classify("用荣格的视角写一段内心独白");
        assert_eq!(c.params.style.as_deref(), Some("荣格式叙事"));
        assert_eq!(c.domain, Domain::Psychology);

        let c = classifier().classify("写一段内心独白");
        assert_eq!(c.params.style, None);
    }

    #[test]
    fn test_domain_match_is_case_sensitive() {
        // "air" must not fire the uppercase "AI" keyword.
        let c = classifier().classify("Summarize the air quality report");
        assert_eq!(c.domain, Domain::General);
        let c = classifier().classify("Summarize the AI report");
        assert_eq!(c.domain, Domain::Tech);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classifier().classify("分析一下最近的股票走势");
        let b = classifier().classify("分析一下最近的股票走势");
        assert_eq!(a.complexity, b.complexity);
        assert_eq!(a.task_type, b.task_type);
        assert_eq!(a.domain, b.domain);
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.domain, Domain::Finance);
    }

    #[test]
    fn test_invalid_length_pattern_rejected() {
        let config = ClassifierConfig {
            length_pattern: "([unclosed".to_string(),
            ..ClassifierConfig::default()
        };
        assert!(Classifier::new(config).is_err());
    }
}
