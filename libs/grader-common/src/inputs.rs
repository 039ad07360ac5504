// Host input reading and validation
//
// Inputs arrive as `INPUT_<NAME>` environment variables, the way CI runners hand
// action inputs to a step. Raw values are kept separately from the validated
// config so a failed validation can still report the test name and command.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{ComparisonMethod, GradingConfig};

pub const TEST_NAME: &str = "test-name";
pub const SETUP_COMMAND: &str = "setup-command";
pub const COMMAND: &str = "command";
pub const INPUT: &str = "input";
pub const EXPECTED_OUTPUT: &str = "expected-output";
pub const COMPARISON_METHOD: &str = "comparison-method";
pub const TIMEOUT: &str = "timeout";
pub const PASS_SCORE: &str = "pass-score";
pub const MAX_SCORE: &str = "max-score";

pub const DEFAULT_TIMEOUT_MINUTES: f64 = 10.0;
/// Fraction of the maximum score needed to pass when no pass-score is given
pub const DEFAULT_PASS_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Input required and not supplied: {0}")]
    Missing(&'static str),

    #[error("Invalid comparison method: '{0}' (expected one of: exact, contains, regex)")]
    InvalidComparisonMethod(String),

    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidNumber {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Where named inputs come from
pub trait InputSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads inputs from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvInputs;

impl InputSource for EnvInputs {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(env_key(name)).ok()
    }
}

impl InputSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Environment variable carrying the input `name`
pub fn env_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Inputs exactly as read from the host, trimmed, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    pub test_name: Option<String>,
    pub setup_command: Option<String>,
    pub command: Option<String>,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub comparison_method: Option<String>,
    pub timeout: Option<String>,
    pub pass_score: Option<String>,
    pub max_score: Option<String>,
}

impl RawInputs {
    pub fn read(source: &impl InputSource) -> Self {
        let get = |name: &str| {
            source
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            test_name: get(TEST_NAME),
            setup_command: get(SETUP_COMMAND),
            command: get(COMMAND),
            input: get(INPUT),
            // An explicitly empty expectation is still an expectation
            expected_output: source.get(EXPECTED_OUTPUT).map(|v| v.trim().to_string()),
            comparison_method: get(COMPARISON_METHOD),
            timeout: get(TIMEOUT),
            pass_score: get(PASS_SCORE),
            max_score: get(MAX_SCORE),
        }
    }

    pub fn validate(&self) -> Result<GradingConfig, InputError> {
        let test_name = self
            .test_name
            .clone()
            .ok_or(InputError::Missing(TEST_NAME))?;
        let command = self.command.clone().ok_or(InputError::Missing(COMMAND))?;

        let comparison_method = self
            .comparison_method
            .as_deref()
            .map(str::parse::<ComparisonMethod>)
            .transpose()?;

        let timeout_minutes = match &self.timeout {
            Some(value) => {
                let minutes = parse_number(TIMEOUT, value)?;
                if minutes <= 0.0 {
                    return Err(InputError::InvalidNumber {
                        name: TIMEOUT,
                        value: value.clone(),
                        reason: "must be greater than zero",
                    });
                }
                minutes
            }
            None => DEFAULT_TIMEOUT_MINUTES,
        };

        let max_score = self
            .max_score
            .as_deref()
            .map(|v| parse_score(MAX_SCORE, v))
            .transpose()?
            .unwrap_or(0.0);

        let pass_score = match self
            .pass_score
            .as_deref()
            .map(|v| parse_score(PASS_SCORE, v))
            .transpose()?
        {
            Some(score) if score > 0.0 => score,
            _ => max_score * DEFAULT_PASS_RATIO,
        };

        Ok(GradingConfig {
            test_name,
            setup_command: self.setup_command.clone(),
            command,
            input: self.input.clone().unwrap_or_default(),
            expected_output: self.expected_output.clone(),
            comparison_method,
            timeout_ms: (timeout_minutes * 60_000.0).round() as u64,
            pass_score,
            max_score,
        })
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<f64, InputError> {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(InputError::InvalidNumber {
            name,
            value: value.to_string(),
            reason: "not a number",
        }),
    }
}

fn parse_score(name: &'static str, value: &str) -> Result<f64, InputError> {
    let score = parse_number(name, value)?;
    if score < 0.0 {
        return Err(InputError::InvalidNumber {
            name,
            value: value.to_string(),
            reason: "must not be negative",
        });
    }
    Ok(score)
}
