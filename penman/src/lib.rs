//! # Penman - metaload script generator
//!
//! Penman reads a project's CSV configuration (a general file and a table
//! file) and writes the ordered `select f_...;` statements that register
//! source systems, source tables and columns, and serving-layer tables and
//! columns in the metaload control schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV files  │────▶│   Parser    │────▶│  Transform  │────▶│   Emitter   │
//! │  (any enc.) │     │ (count+lbl) │     │ (group+type)│     │ (SQL script)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use penman::{generate_from_files, GenerateOptions};
//!
//! let generation = generate_from_files("general.csv", "tables.csv", &GenerateOptions::default())?;
//! print!("{}", generation.script);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Roles, literals and typed records
//! - [`parser`] - Configuration file reading
//! - [`transform`] - Transcription, grouping and pipeline
//! - [`metaload`] - Statement builders and derived names
//! - [`emitter`] - Emission state machine and script sink
//! - [`logging`] - Tracing subscriber setup

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Statements
pub mod metaload;

// Emission
pub mod emitter;

pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    GroupError,
    NamingError,
    EmitError,
    PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Mode,
    Literal,
    FieldValue,
    ParameterRecord,
    HeaderMap,
    ServingLayer,
    Record,
    Environment,
    SourceSystem,
    SourceTable,
    SourceColumn,
    ServingTable,
    ServingColumn,
};

// =============================================================================
// Re-exports - Configuration parsing
// =============================================================================

pub use parser::{
    parse_config_str,
    read_config_file,
    detect_encoding,
    decode_content,
    ConfigRow,
    ConfigTable,
};

// =============================================================================
// Re-exports - Statements
// =============================================================================

pub use metaload::{
    commands_description,
    decorate,
    naming::{serving_table_name, source_table_name},
};

// =============================================================================
// Re-exports - Emission
// =============================================================================

pub use emitter::{
    emit_script,
    banner,
    BoundaryPolicy,
    EmitOptions,
    Emission,
    Emitter,
    Script,
    ScriptLine,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    generate,
    generate_from_files,
    load_records,
    prepare_general,
    prepare_tables,
    transcribe,
    transcribe_value,
    GeneralConfig,
    GenerateOptions,
    Generation,
};
