use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Failure taxonomy for agent execution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    ApiError,
    QualityLow,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::RateLimit => write!(f, "rate_limit"),
            ErrorKind::ApiError => write!(f, "api_error"),
            ErrorKind::QualityLow => write!(f, "quality_low"),
            ErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify an error message by case-insensitive substring inspection.
///
/// Markers are checked in fixed precedence order; the first matching
/// category wins.
pub fn classify_error(error: &str) -> ErrorKind {
    let lower = error.to_lowercase();
    if lower.contains("timeout") || error.contains("超时") {
        ErrorKind::Timeout
    } else if lower.contains("rate limit") || error.contains("限流") {
        ErrorKind::RateLimit
    } else if lower.contains("api") || error.contains("错误") {
        ErrorKind::ApiError
    } else if lower.contains("quality") || error.contains("质量") || error.contains("不好") || error.contains("差")
    {
        ErrorKind::QualityLow
    } else {
        ErrorKind::Unknown
    }
}

/// Static substitution tables and remediation advice.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// One alternate per agent.
    alternates: HashMap<String, String>,
    /// Ordered `(family substring, stricter variant)` rules applied on
    /// quality failures, overriding the generic alternate.
    quality_families: Vec<(String, String)>,
    /// Remediation strategies per error kind, for exhaustion reports.
    strategies: HashMap<ErrorKind, Vec<String>>,
    default_strategy: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let pair = |a: &str, b: &str| (a.to_string(), b.to_string());
        let advice = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

        Self {
            alternates: HashMap::from([
                pair("m25", "dsr"),
                pair("gpt53", "dsr"),
                pair("dsr", "gpt53"),
                pair("m25plan", "dsr"),
                pair("gpt53review", "dsrtdd"),
                pair("g53dev", "dsr"),
                pair("dsrtdd", "g53dev"),
            ]),
            quality_families: vec![pair("gpt53", "gpt53review"), pair("dsr", "dsrtdd")],
            strategies: HashMap::from([
                (
                    ErrorKind::Timeout,
                    advice(&["Switch to a faster agent", "Reduce content length"]),
                ),
                (
                    ErrorKind::QualityLow,
                    advice(&["Switch to a review agent", "Increase iterations"]),
                ),
                (
                    ErrorKind::ApiError,
                    advice(&["Switch to another API", "Wait and retry"]),
                ),
                (ErrorKind::RateLimit, advice(&["Wait", "Switch agent"])),
            ]),
            default_strategy: advice(&["Retry with a substitute agent"]),
        }
    }
}

impl FallbackConfig {
    /// Pick the substitute for an agent given a classified error.
    ///
    /// On quality failures the family override wins; otherwise the static
    /// alternate table applies. Agents without an alternate keep themselves.
    pub fn alternate_for(&self, agent: &str, kind: ErrorKind) -> String {
        if kind == ErrorKind::QualityLow {
            for (family, variant) in &self.quality_families {
                if agent.contains(family.as_str()) {
                    return variant.clone();
                }
            }
        }
        self.alternates
            .get(agent)
            .cloned()
            .unwrap_or_else(|| agent.to_string())
    }

    /// Remediation strategies for an error kind.
    pub fn strategies_for(&self, kind: ErrorKind) -> Vec<String> {
        self.strategies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.default_strategy.clone())
    }
}
