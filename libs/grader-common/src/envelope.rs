use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{GradeStatus, ScoreOutcome};

/// Wire format version understood by the reporting layer
pub const ENVELOPE_VERSION: u32 = 1;

/// Message used when an error carries no text of its own
const UNKNOWN_ERROR: &str = "Unknown error";

/// The single result record emitted per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub version: u32,
    pub status: GradeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    pub tests: Vec<TestReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub name: String,
    pub status: GradeStatus,
    pub message: Option<String>,
    pub test_code: String,
    pub filename: String,
    pub line_no: u32,
    pub execution_time: ExecutionTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// `"1.234s"` for a measured run, the number `0` when nothing was measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionTime {
    Measured(String),
    Unmeasured(u64),
}

impl ExecutionTime {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        ExecutionTime::Measured(format_elapsed(elapsed))
    }
}

/// Seconds with millisecond precision, shortest form ("0.25s", "2s")
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}s", elapsed.as_millis() as f64 / 1000.0)
}

impl ResultEnvelope {
    /// Envelope for a run that was graded
    pub fn graded(
        test_name: &str,
        test_code: String,
        outcome: &ScoreOutcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            status: outcome.status,
            max_score: Some(outcome.max_score),
            tests: vec![TestReport {
                name: test_name.to_string(),
                status: outcome.status,
                message: outcome.message.clone(),
                test_code,
                filename: String::new(),
                line_no: 0,
                execution_time: ExecutionTime::from_elapsed(elapsed),
                score: Some(outcome.score),
            }],
        }
    }

    /// Minimal envelope for a run that could not be graded at all
    pub fn error(test_name: &str, test_code: String, message: &str) -> Self {
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message.to_string()
        };

        Self {
            version: ENVELOPE_VERSION,
            status: GradeStatus::Error,
            max_score: None,
            tests: vec![TestReport {
                name: test_name.to_string(),
                status: GradeStatus::Error,
                message: Some(message),
                test_code,
                filename: String::new(),
                line_no: 0,
                execution_time: ExecutionTime::Unmeasured(0),
                score: None,
            }],
        }
    }

    /// base64(JSON), the value handed to the host
    pub fn encode(&self) -> serde_json::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    pub fn decode(value: &str) -> Result<Self, DecodeError> {
        let bytes = general_purpose::STANDARD.decode(value.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("result is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("result is not a valid envelope: {0}")]
    Json(#[from] serde_json::Error),
}
