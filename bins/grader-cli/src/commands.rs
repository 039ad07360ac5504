// CLI commands for inspecting grader output
use anyhow::{Context, Result};
use grader_common::envelope::ResultEnvelope;
use std::io::{self, Read};

/// Decode an envelope from `value` or stdin and print it
pub fn decode(value: Option<&str>, summary: bool) -> Result<()> {
    let encoded = match value {
        Some(v) => v.to_string(),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read envelope from stdin")?;
            buf
        }
    };

    let envelope = ResultEnvelope::decode(&encoded)?;

    if summary {
        println!("{}", summarize(&envelope));
    } else {
        let json = serde_json::to_string_pretty(&envelope)
            .context("Failed to serialize envelope")?;
        println!("{}", json);
    }

    Ok(())
}

/// `status score/max name` for every reported test
fn summarize(envelope: &ResultEnvelope) -> String {
    envelope
        .tests
        .iter()
        .map(|test| {
            let score = match (test.score, envelope.max_score) {
                (Some(score), Some(max)) => format!("{}/{}", score, max),
                _ => "-".to_string(),
            };
            let mut line = format!("{} {} {}", test.status, score, test.name);
            if let Some(message) = &test.message {
                if let Some(first) = message.lines().next() {
                    line.push_str(&format!(" ({})", first));
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
