//! Error types for the consistency checker.

use thiserror::Error;

/// Main error type for check operations.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Configuration error (invalid YAML, missing fields, unresolvable driver locator).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error.
    #[error("Source database error: {0}")]
    Source(#[from] oracle::Error),

    /// Target database connection or query error.
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Planning error (catalog query failed). Recoverable: the planner logs
    /// and falls back to the explicit table list in declaration order.
    #[error("Planning error: {0}")]
    Plan(String),

    /// Checksum-query synthesis failed for one task.
    #[error("Synthesis failed for {key}: {source}")]
    Synthesis {
        key: String,
        #[source]
        source: SynthesisError,
    },

    /// Checksum execution failed for one side of one task.
    #[error("Execution failed for {key} on {side}: {message}")]
    Execution {
        key: String,
        side: String,
        message: String,
    },

    /// IO error (report files, config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Check run was cancelled (SIGINT/SIGTERM).
    #[error("Check run interrupted")]
    Interrupted,
}

impl CheckError {
    /// Create an Execution error attributed to one side of one task.
    pub fn execution(
        key: impl Into<String>,
        side: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CheckError::Execution {
            key: key.into(),
            side: side.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI. Per-task errors never reach this path;
    /// only fatal initialization failures and interrupts do.
    pub fn exit_code(&self) -> u8 {
        match self {
            CheckError::Config(_) | CheckError::Yaml(_) => 2,
            CheckError::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Why synthesis failed for a task. Recorded per-task and surfaced in the
/// reports; never aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Every projected column was of an excluded type.
    EmptyProjection,
    /// An emitted query was empty or whitespace-only.
    EmptyEmission,
    /// The source engine could not describe the base query's columns.
    DescribeFailed,
}

impl std::fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisErrorKind::EmptyProjection => write!(f, "empty projection"),
            SynthesisErrorKind::EmptyEmission => write!(f, "empty emission"),
            SynthesisErrorKind::DescribeFailed => write!(f, "describe failed"),
        }
    }
}

/// Per-task synthesis failure.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct SynthesisError {
    pub kind: SynthesisErrorKind,
    pub message: String,
}

impl SynthesisError {
    pub fn empty_projection() -> Self {
        Self {
            kind: SynthesisErrorKind::EmptyProjection,
            message: "all columns of the base query are of excluded types".to_string(),
        }
    }

    pub fn empty_emission(dialect: &str) -> Self {
        Self {
            kind: SynthesisErrorKind::EmptyEmission,
            message: format!("emitted {} query is empty", dialect),
        }
    }

    pub fn describe_failed(err: impl std::fmt::Display) -> Self {
        Self {
            kind: SynthesisErrorKind::DescribeFailed,
            message: err.to_string(),
        }
    }
}

/// Result type alias for check operations.
pub type Result<T> = std::result::Result<T, CheckError>;
