//! Grading Orchestrator - High-Level Sequencing
//!
//! **Responsibility:**
//! Validate inputs, run the optional setup and the graded command, pick a
//! scoring strategy and build the result envelope.
//!
//! **Flow:**
//! 1. Validate raw inputs into a `GradingConfig`
//! 2. Run the setup command (any failure aborts the run)
//! 3. Run the graded command under the timeout
//! 4. Score by parsed test results, or by output comparison when none exist
//! 5. Build the envelope
//!
//! Every failure converges on one envelope: `run` turns any error from the
//! steps above into an `error` envelope built from whatever inputs were read.

use crate::comparator;
use crate::config::ChildEnvironment;
use crate::evaluator;
use crate::parser;
use crate::runner::ProcessRunner;
use anyhow::{Context, Result};
use grader_common::envelope::ResultEnvelope;
use grader_common::inputs::{InputError, RawInputs, COMPARISON_METHOD, EXPECTED_OUTPUT};
use grader_common::types::{test_code, ExecutionResult, GradeStatus, GradingConfig, ScoreOutcome};
use tracing::{debug, error, info, instrument, warn};

/// Name reported when the test-name input itself could not be read
pub const UNKNOWN_TEST_NAME: &str = "Unknown test";

pub struct Grader {
    runner: ProcessRunner,
}

impl Grader {
    pub fn new(env: ChildEnvironment) -> Self {
        Self {
            runner: ProcessRunner::new(env),
        }
    }

    /// Grade one invocation; always yields an envelope
    pub async fn run(&self, raw: &RawInputs) -> ResultEnvelope {
        match self.grade(raw).await {
            Ok(envelope) => envelope,
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, "Grading aborted");
                ResultEnvelope::error(
                    raw.test_name.as_deref().unwrap_or(UNKNOWN_TEST_NAME),
                    test_code(
                        raw.command.as_deref().unwrap_or_default(),
                        raw.input.as_deref().unwrap_or_default(),
                    ),
                    &message,
                )
            }
        }
    }

    #[instrument(skip_all, fields(test_name = raw.test_name.as_deref().unwrap_or(UNKNOWN_TEST_NAME)))]
    async fn grade(&self, raw: &RawInputs) -> Result<ResultEnvelope> {
        let config = raw.validate()?;

        info!(
            timeout_ms = config.timeout_ms,
            max_score = config.max_score,
            pass_score = config.pass_score,
            comparison_method = ?config.comparison_method,
            has_setup = config.setup_command.is_some(),
            "Configuration loaded"
        );

        if let Some(setup) = &config.setup_command {
            info!(command = %setup, "Running setup command");
            self.runner.execute_setup(setup, config.timeout()).await?;
        }

        info!(command = %config.command, input_bytes = config.input.len(), "Running test command");
        let execution = self
            .runner
            .execute(&config.command, &config.input, config.timeout())
            .await;

        if let Some(err) = &execution.error {
            warn!(error = %err, output_bytes = execution.output.len(), "Test command failed");
        }

        let outcome = evaluate(&config, &execution)?;

        info!(
            status = %outcome.status,
            score = outcome.score,
            max_score = outcome.max_score,
            execution_ms = execution.elapsed.as_millis() as u64,
            "Grading complete"
        );

        Ok(ResultEnvelope::graded(
            &config.test_name,
            config.test_code(),
            &outcome,
            execution.elapsed,
        ))
    }
}

/// Decide the outcome for one command run
///
/// Structured results take priority. Without them, an execution error is
/// reported as is, and only a clean run is compared against the expected
/// output.
pub fn evaluate(config: &GradingConfig, execution: &ExecutionResult) -> Result<ScoreOutcome> {
    let tree = parser::parse(&execution.output);
    debug!(
        tree = %serde_json::to_string(&tree).unwrap_or_default(),
        "Parsed test results"
    );

    if let Some(scored) = evaluator::score(&tree, config.max_score, config.pass_score) {
        info!(
            task_count = scored.task_count,
            task_passed = scored.task_passed,
            pass_score = scored.pass_score,
            lazy = config.max_score <= 0.0,
            "Scored by test results"
        );
        return Ok(scored.into_outcome());
    }

    if let Some(err) = &execution.error {
        return Ok(ScoreOutcome {
            status: GradeStatus::Error,
            score: 0.0,
            max_score: config.max_score,
            message: Some(err.clone()),
        });
    }

    let method = config
        .comparison_method
        .ok_or(InputError::Missing(COMPARISON_METHOD))
        .context("No test results found in output")?;
    let expected = config
        .expected_output
        .as_deref()
        .ok_or(InputError::Missing(EXPECTED_OUTPUT))
        .context("No test results found in output")?;

    let matched = comparator::compare(&execution.output, expected, method)?;
    info!(method = %method, matched, "Scored by output comparison");

    Ok(if matched {
        ScoreOutcome {
            status: GradeStatus::Pass,
            score: config.max_score,
            max_score: config.max_score,
            message: None,
        }
    } else {
        ScoreOutcome {
            status: GradeStatus::Fail,
            score: 0.0,
            max_score: config.max_score,
            message: Some(comparator::mismatch_message(&execution.output, expected)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TIMEOUT_MESSAGE;
    use grader_common::envelope::ExecutionTime;
    use grader_common::inputs::{
        COMMAND, INPUT, MAX_SCORE, SETUP_COMMAND, TEST_NAME, TIMEOUT,
    };
    use grader_common::types::ComparisonMethod;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Helper to build raw inputs from name/value pairs
    fn inputs(pairs: &[(&str, &str)]) -> RawInputs {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawInputs::read(&source)
    }

    fn make_config(method: Option<ComparisonMethod>, expected: Option<&str>) -> GradingConfig {
        GradingConfig {
            test_name: "test".to_string(),
            setup_command: None,
            command: "true".to_string(),
            input: String::new(),
            expected_output: expected.map(str::to_string),
            comparison_method: method,
            timeout_ms: 1000,
            pass_score: 8.0,
            max_score: 10.0,
        }
    }

    fn make_execution(output: &str, error: Option<&str>) -> ExecutionResult {
        ExecutionResult {
            output: output.to_string(),
            error: error.map(str::to_string),
            elapsed: Duration::from_millis(5),
        }
    }

    fn grader() -> Grader {
        Grader::new(ChildEnvironment::from_host())
    }

    #[test]
    fn test_evaluate_prefers_test_results() {
        let config = make_config(None, None);
        let execution = make_execution("Suite > A PASSED\nSuite > B FAILED", None);

        let outcome = evaluate(&config, &execution).unwrap();

        assert_eq!(outcome.status, GradeStatus::Fail);
        assert_eq!(outcome.score, 5.0);
        assert_eq!(outcome.max_score, 10.0);
    }

    #[test]
    fn test_evaluate_results_win_over_execution_error() {
        let config = make_config(None, None);
        let execution = make_execution("A PASSED", Some("Command failed: x\nexit status: 1"));

        let outcome = evaluate(&config, &execution).unwrap();

        assert_eq!(outcome.status, GradeStatus::Pass);
        assert_eq!(outcome.score, 10.0);
    }

    #[test]
    fn test_evaluate_execution_error_without_results() {
        let config = make_config(Some(ComparisonMethod::Exact), Some("partial"));
        let execution = make_execution("partial", Some(TIMEOUT_MESSAGE));

        let outcome = evaluate(&config, &execution).unwrap();

        // Matching output does not rescue a failed run
        assert_eq!(outcome.status, GradeStatus::Error);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.message.as_deref(), Some(TIMEOUT_MESSAGE));
    }

    #[test]
    fn test_evaluate_comparison_match() {
        let config = make_config(Some(ComparisonMethod::Contains), Some("42"));
        let outcome = evaluate(&config, &make_execution("answer: 42", None)).unwrap();

        assert_eq!(outcome.status, GradeStatus::Pass);
        assert_eq!(outcome.score, 10.0);
        assert_eq!(outcome.message, None);
    }

    #[test]
    fn test_evaluate_comparison_mismatch() {
        let config = make_config(Some(ComparisonMethod::Exact), Some("42"));
        let outcome = evaluate(&config, &make_execution("41", None)).unwrap();

        assert_eq!(outcome.status, GradeStatus::Fail);
        assert_eq!(outcome.score, 0.0);
        let message = outcome.message.unwrap();
        assert!(message.contains("42"));
        assert!(message.contains("41"));
    }

    #[test]
    fn test_evaluate_requires_comparison_inputs_without_results() {
        let missing_method = make_config(None, Some("x"));
        let err = evaluate(&missing_method, &make_execution("x", None)).unwrap_err();
        assert!(format!("{:#}", err).contains("comparison-method"));

        let missing_expected = make_config(Some(ComparisonMethod::Exact), None);
        let err = evaluate(&missing_expected, &make_execution("x", None)).unwrap_err();
        assert!(format!("{:#}", err).contains("expected-output"));
    }

    #[tokio::test]
    async fn test_run_structured_output_lazy_mode() {
        let raw = inputs(&[
            (TEST_NAME, "Calculator"),
            (COMMAND, r"printf 'Calc > add PASSED\nCalc > sub PASSED\nCalc > div FAILED\n'"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Fail);
        assert_eq!(envelope.max_score, Some(3.0));
        let test = &envelope.tests[0];
        assert_eq!(test.name, "Calculator");
        assert_eq!(test.score, Some(2.0));
        assert!(matches!(test.execution_time, ExecutionTime::Measured(ref t) if t.ends_with('s')));
    }

    #[tokio::test]
    async fn test_run_comparison_with_stdin() {
        let raw = inputs(&[
            (TEST_NAME, "Echo"),
            (COMMAND, "cat"),
            (INPUT, "hello grader"),
            (EXPECTED_OUTPUT, "hello grader"),
            (COMPARISON_METHOD, "exact"),
            (MAX_SCORE, "10"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Pass);
        assert_eq!(envelope.max_score, Some(10.0));
        assert_eq!(envelope.tests[0].score, Some(10.0));
        assert_eq!(envelope.tests[0].test_code, "cat <stdin>hello grader");
    }

    #[tokio::test]
    async fn test_run_regex_comparison_mismatch() {
        let raw = inputs(&[
            (TEST_NAME, "Digits"),
            (COMMAND, "echo no digits here"),
            (EXPECTED_OUTPUT, r"\d+"),
            (COMPARISON_METHOD, "regex"),
            (MAX_SCORE, "5"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Fail);
        assert_eq!(envelope.tests[0].score, Some(0.0));
        assert!(envelope.tests[0]
            .message
            .as_deref()
            .unwrap()
            .contains("no digits here"));
    }

    #[tokio::test]
    async fn test_run_setup_runs_first() {
        let dir = std::env::temp_dir().join(format!("grader-setup-{}", std::process::id()));
        let marker = dir.join("ready");
        let setup = format!("mkdir -p '{}' && touch '{}'", dir.display(), marker.display());
        let command = format!("cat '{}' && echo ready", marker.display());

        let raw = inputs(&[
            (TEST_NAME, "Setup"),
            (SETUP_COMMAND, setup.as_str()),
            (COMMAND, command.as_str()),
            (EXPECTED_OUTPUT, "ready"),
            (COMPARISON_METHOD, "exact"),
        ]);

        let envelope = grader().run(&raw).await;
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(envelope.status, GradeStatus::Pass);
    }

    #[tokio::test]
    async fn test_run_setup_failure_is_fatal() {
        let raw = inputs(&[
            (TEST_NAME, "Setup"),
            (SETUP_COMMAND, "exit 3"),
            (COMMAND, "echo never"),
            (EXPECTED_OUTPUT, "never"),
            (COMPARISON_METHOD, "exact"),
            (MAX_SCORE, "10"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert_eq!(envelope.max_score, None);
        let test = &envelope.tests[0];
        assert_eq!(test.score, None);
        assert_eq!(test.execution_time, ExecutionTime::Unmeasured(0));
        assert!(test.message.as_deref().unwrap().contains("Setup command failed"));
    }

    #[tokio::test]
    async fn test_run_execution_error_without_results() {
        let raw = inputs(&[
            (TEST_NAME, "Crash"),
            (COMMAND, "echo oops; exit 1"),
            (EXPECTED_OUTPUT, "oops"),
            (COMPARISON_METHOD, "exact"),
            (MAX_SCORE, "10"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert_eq!(envelope.tests[0].score, Some(0.0));
        assert!(envelope.tests[0]
            .message
            .as_deref()
            .unwrap()
            .starts_with("Command failed: echo oops; exit 1"));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let raw = inputs(&[
            (TEST_NAME, "Slow"),
            (COMMAND, "sleep 5"),
            (EXPECTED_OUTPUT, ""),
            (COMPARISON_METHOD, "contains"),
            // 0.005 minutes = 300ms
            (TIMEOUT, "0.005"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert_eq!(envelope.tests[0].message.as_deref(), Some(TIMEOUT_MESSAGE));
    }

    #[tokio::test]
    async fn test_run_missing_command() {
        let raw = inputs(&[(TEST_NAME, "Broken")]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert_eq!(envelope.tests[0].name, "Broken");
        assert_eq!(
            envelope.tests[0].message.as_deref(),
            Some("Input required and not supplied: command")
        );
    }

    #[tokio::test]
    async fn test_run_missing_test_name_uses_placeholder() {
        let raw = inputs(&[(COMMAND, "echo hi"), (INPUT, "x")]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert_eq!(envelope.tests[0].name, UNKNOWN_TEST_NAME);
        assert_eq!(envelope.tests[0].test_code, "echo hi <stdin>x");
    }

    #[tokio::test]
    async fn test_run_invalid_comparison_method() {
        let raw = inputs(&[
            (TEST_NAME, "Fuzzy"),
            (COMMAND, "echo hi"),
            (EXPECTED_OUTPUT, "hi"),
            (COMPARISON_METHOD, "fuzzy"),
        ]);

        let envelope = grader().run(&raw).await;

        assert_eq!(envelope.status, GradeStatus::Error);
        assert!(envelope.tests[0].message.as_deref().unwrap().contains("fuzzy"));
    }

    #[tokio::test]
    async fn test_run_envelope_round_trips() {
        let raw = inputs(&[
            (TEST_NAME, "Round trip"),
            (COMMAND, "echo 'Suite > A PASSED'"),
            (MAX_SCORE, "20"),
        ]);

        let envelope = grader().run(&raw).await;
        let decoded = ResultEnvelope::decode(&envelope.encode().unwrap()).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.status, GradeStatus::Pass);
        assert_eq!(decoded.tests[0].score, Some(20.0));
    }
}
