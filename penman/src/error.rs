//! Error types for the penman generation pipeline.
//!
//! One enum per stage, converted upward with `#[from]` so `?` works
//! across stage boundaries:
//!
//! - [`ConfigError`] - reading and splitting configuration files
//! - [`GroupError`] - turning rows into parameter records
//! - [`NamingError`] - generated table names
//! - [`EmitError`] - the emission state machine
//! - [`PipelineError`] - top-level orchestration
//!
//! Every row-level error carries the file (`origin`) and the 0-based row
//! index so the offending configuration line can be found.

use thiserror::Error;

// =============================================================================
// Configuration Reader Errors
// =============================================================================

/// Errors while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("{origin}: cannot read file: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// The delimited text itself is broken.
    #[error("{origin}: invalid delimited text: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    /// A row does not follow the `<count>;<label>;<values>...` layout.
    #[error("{origin}, row {row}: malformed row: {message}")]
    MalformedRow {
        origin: String,
        row: usize,
        message: String,
    },

    /// The general file has no `#cfg_end` row closing its header block.
    #[error("{origin}: header block is not closed by '#cfg_end'")]
    MissingSentinel { origin: String },
}

// =============================================================================
// Record Grouper Errors
// =============================================================================

/// Errors while grouping rows into parameter records.
#[derive(Debug, Error)]
pub enum GroupError {
    /// No header template is registered for the row discriminator.
    #[error("{origin}, row {row}: no header template registered for mode '{mode}'")]
    UnknownMode {
        origin: String,
        row: usize,
        mode: String,
    },

    /// The row has fewer values than its header template names.
    #[error("{origin}, row {row} ({mode}): malformed row: {message}")]
    MalformedRow {
        origin: String,
        row: usize,
        mode: String,
        message: String,
    },

    /// A required field is absent from the header template.
    #[error("{origin}, row {row} ({mode}): required field '{field}' is missing")]
    MissingField {
        origin: String,
        row: usize,
        mode: String,
        field: String,
    },

    /// The general file must select exactly one environment.
    #[error("{origin}: expected exactly one 'env' record, found {found}")]
    EnvironmentCount { origin: String, found: usize },
}

// =============================================================================
// Naming Errors
// =============================================================================

/// Errors while deriving generated table names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// The schema is not one of the serving layers.
    #[error("unknown serving schema '{schema}' (expected dds, dds_lgc or dds_lnk)")]
    UnknownSchema { schema: String },
}

// =============================================================================
// Emitter Errors
// =============================================================================

/// Errors raised while walking the record sequence.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A record's generated name could not be derived.
    #[error("record {row}: {source}")]
    Naming {
        row: usize,
        #[source]
        source: NamingError,
    },

    /// An outer loop exceeded its iteration ceiling.
    #[error("{phase}: no end after {iterations} iterations (cursor at {cursor})")]
    RunawayLoop {
        phase: &'static str,
        iterations: usize,
        cursor: usize,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline error returned by [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration reading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Grouping error.
    #[error("Grouping error: {0}")]
    Group(#[from] GroupError),

    /// Emission error.
    #[error("Emission error: {0}")]
    Emit(#[from] EmitError),

    /// Options file could not be used.
    #[error("Invalid options: {0}")]
    Options(String),

    /// Records were left unconsumed after the last phase.
    #[error("Generation stopped at record {cursor} of {total}")]
    Incomplete { cursor: usize, total: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration reading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for grouping.
pub type GroupResult<T> = Result<T, GroupError>;

/// Result type for name derivation.
pub type NamingResult<T> = Result<T, NamingError>;

/// Result type for emission.
pub type EmitResult<T> = Result<T, EmitError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let config_err = ConfigError::MissingSentinel {
            origin: "general.csv".into(),
        };
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("#cfg_end"));

        let emit_err = EmitError::Naming {
            row: 4,
            source: NamingError::UnknownSchema {
                schema: "weird_schema".into(),
            },
        };
        let pipeline_err: PipelineError = emit_err.into();
        let msg = pipeline_err.to_string();
        assert!(msg.contains("record 4"));
        assert!(msg.contains("weird_schema"));
    }

    #[test]
    fn test_row_context_in_message() {
        let err = GroupError::UnknownMode {
            origin: "tables.csv".into(),
            row: 7,
            mode: "src_view".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tables.csv"));
        assert!(msg.contains("row 7"));
        assert!(msg.contains("src_view"));
    }
}
