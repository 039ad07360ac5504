use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Output name the reporting layer reads the envelope from
pub const RESULT_OUTPUT: &str = "result";

/// File the host collects step outputs from
pub const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";

/// Hand a named output value back to the host
///
/// Appends to the host's output file when one is configured, otherwise falls
/// back to the legacy `::set-output` workflow command on stdout.
pub fn set_output(name: &str, value: &str) -> io::Result<()> {
    match std::env::var_os(OUTPUT_FILE_VAR) {
        Some(path) if !path.is_empty() => append_output(Path::new(&path), name, value),
        _ => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "::set-output name={}::{}", name, value)?;
            stdout.flush()
        }
    }
}

/// Append `name<<DELIM\nvalue\nDELIM\n` to an output file
pub fn append_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output value contains the generated delimiter",
        ));
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)?;

    tracing::debug!(output = name, file = %path.display(), "Output written");
    Ok(())
}
