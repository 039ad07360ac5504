use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::inputs::InputError;

/// Validated grading configuration, built once per invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GradingConfig {
    pub test_name: String,
    pub setup_command: Option<String>,
    pub command: String,
    pub input: String,
    pub expected_output: Option<String>,
    pub comparison_method: Option<ComparisonMethod>,
    pub timeout_ms: u64,
    pub pass_score: f64,
    pub max_score: f64,
}

impl GradingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Invocation string reported back as `test_code`
    pub fn test_code(&self) -> String {
        test_code(&self.command, &self.input)
    }
}

pub fn test_code(command: &str, input: &str) -> String {
    format!("{} <stdin>{}", command, input)
}

/// How raw stdout is matched against the expected output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMethod {
    Exact,
    Contains,
    Regex,
}

impl fmt::Display for ComparisonMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComparisonMethod::Exact => write!(f, "exact"),
            ComparisonMethod::Contains => write!(f, "contains"),
            ComparisonMethod::Regex => write!(f, "regex"),
        }
    }
}

impl FromStr for ComparisonMethod {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(ComparisonMethod::Exact),
            "contains" => Ok(ComparisonMethod::Contains),
            "regex" => Ok(ComparisonMethod::Regex),
            other => Err(InputError::InvalidComparisonMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeStatus {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GradeStatus::Pass => write!(f, "pass"),
            GradeStatus::Fail => write!(f, "fail"),
            GradeStatus::Error => write!(f, "error"),
        }
    }
}

/// Captured output of one command run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Trimmed stdout, kept even when the command failed
    pub output: String,
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Final grading decision for the single test
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub status: GradeStatus,
    pub score: f64,
    pub max_score: f64,
    pub message: Option<String>,
}
