//! Worker-process counting.
//!
//! Runs `pgrep -f -c <pattern>` and reads the count from stdout. A pattern
//! that matches nothing makes pgrep exit with status 1 and print `0`; that
//! is a valid reading, not a failure.

use tokio::process::Command;

/// Longest accepted pattern.
const MAX_PATTERN_LEN: usize = 128;

/// Allowed patterns: non-empty, bounded length, no leading `-` (would be
/// read as a pgrep option) and no control characters.
pub fn is_safe_pattern(pattern: &str) -> bool {
    !pattern.is_empty()
        && pattern.len() <= MAX_PATTERN_LEN
        && !pattern.starts_with('-')
        && !pattern.chars().any(char::is_control)
}

/// Why a process count could not be taken.
#[derive(Debug, thiserror::Error)]
pub enum ProcessCountError {
    #[error("invalid process pattern `{0}`")]
    InvalidPattern(String),

    #[error("failed to execute pgrep: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pgrep exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("unexpected pgrep output `{0}`")]
    Output(String),
}

/// Count processes whose full command line matches `pattern`.
pub async fn count_processes(pattern: &str) -> Result<u32, ProcessCountError> {
    if !is_safe_pattern(pattern) {
        return Err(ProcessCountError::InvalidPattern(pattern.to_string()));
    }

    let output = Command::new("pgrep")
        .args(["-f", "-c", "--", pattern])
        .output()
        .await?;

    classify(
        output.status.code(),
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
    )
}

/// Interpret a finished pgrep run.
///
/// Exit 0 (matches) and exit 1 (no matches, stdout `0`) both carry a count.
/// Any other status, including termination by signal (`None`), is a failure.
fn classify(code: Option<i32>, stdout: &str, stderr: &str) -> Result<u32, ProcessCountError> {
    match code {
        Some(0 | 1) => {}
        other => {
            return Err(ProcessCountError::Failed {
                code: other.unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            })
        }
    }

    let trimmed = stdout.trim();
    trimmed
        .parse()
        .map_err(|_| ProcessCountError::Output(trimmed.to_string()))
}
