// Output comparison used when a command prints no structured results
use anyhow::{Context, Result};
use grader_common::types::ComparisonMethod;
use regex::Regex;

/// Match trimmed stdout against the expected output
///
/// `regex` patterns are unanchored; an invalid pattern is an error rather
/// than a mismatch.
pub fn compare(output: &str, expected: &str, method: ComparisonMethod) -> Result<bool> {
    match method {
        ComparisonMethod::Exact => Ok(output == expected),
        ComparisonMethod::Contains => Ok(output.contains(expected)),
        ComparisonMethod::Regex => {
            let pattern = Regex::new(expected)
                .with_context(|| format!("Invalid expected-output regex '{}'", expected))?;
            Ok(pattern.is_match(output))
        }
    }
}

pub fn mismatch_message(output: &str, expected: &str) -> String {
    format!(
        "Output does not match expected.\nExpected: {}\nActual: {}",
        expected, output
    )
}
