//! Transformation module.
//!
//! This module turns parsed configuration into typed records:
//! - Transcriber: raw text to command literals
//! - Grouper: rows to role-tagged records
//! - Pipeline: read, group and emit in one call

pub mod grouper;
pub mod pipeline;
pub mod transcriber;

pub use grouper::{prepare_general, prepare_tables, GeneralConfig};
pub use pipeline::*;
pub use transcriber::{transcribe, transcribe_all, transcribe_value};
