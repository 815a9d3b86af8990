//! High-level pipeline API: configuration files in, metaload script out.
//!
//! Steps, strictly in sequence:
//! 1. Read both configuration files
//! 2. Take header templates, environment and source systems from the general file
//! 3. Group, transcribe and type the table file rows
//! 4. Emit the script
//!
//! # Example
//!
//! ```rust,ignore
//! use penman::{generate_from_files, GenerateOptions};
//!
//! let generation = generate_from_files("general.csv", "tables.csv", &GenerateOptions::default())?;
//! print!("{}", generation.script);
//! assert!(generation.is_complete());
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::emitter::{emit_script, EmitOptions, Script};
use crate::error::{PipelineError, PipelineResult};
use crate::models::Record;
use crate::parser::{read_config_file, ConfigTable};
use crate::transform::grouper::{prepare_general, prepare_tables, GeneralConfig};

/// Grouped general records shown in debug output.
const PREVIEW_LIMIT: usize = 4;

/// Options for a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Field separator of both configuration files.
    pub delimiter: char,

    #[serde(flatten)]
    pub emit: EmitOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            delimiter: ';',
            emit: EmitOptions::default(),
        }
    }
}

impl GenerateOptions {
    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Options(format!("cannot read '{}': {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Options(e.to_string()))
    }

    /// The delimiter as a byte; only ASCII separators are supported.
    pub fn delimiter_byte(&self) -> PipelineResult<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                PipelineError::Options(format!("delimiter '{}' is not ASCII", self.delimiter))
            })
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub general: GeneralConfig,
    pub records: Vec<Record>,
    pub script: Script,
    /// Index of the first record the emitter did not consume.
    pub cursor: usize,
    pub total: usize,
}

impl Generation {
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total
    }

    /// Fail when records were left unconsumed.
    pub fn ensure_complete(self) -> PipelineResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(PipelineError::Incomplete {
                cursor: self.cursor,
                total: self.total,
            })
        }
    }
}

/// Read both configuration files and generate the script.
pub fn generate_from_files<P: AsRef<Path>, Q: AsRef<Path>>(
    general_path: P,
    tables_path: Q,
    options: &GenerateOptions,
) -> PipelineResult<Generation> {
    let delimiter = options.delimiter_byte()?;
    let general = read_config_file(general_path, delimiter)?;
    let tables = read_config_file(tables_path, delimiter)?;
    generate(&general, &tables, options)
}

/// Group both parsed files without emitting anything.
pub fn load_records(
    general: &ConfigTable,
    tables: &ConfigTable,
) -> PipelineResult<(GeneralConfig, Vec<Record>)> {
    debug!(origin = %general.origin, encoding = %general.encoding, rows = general.len(), "general configuration read");
    let general_config = prepare_general(general)?;

    debug!(row = general_config.environment.row, env_id = %general_config.environment.env_id, "environment");
    for system in general_config.source_systems.iter().take(PREVIEW_LIMIT - 1) {
        debug!(row = system.row, src_name = %system.src_name, "source system");
    }

    debug!(origin = %tables.origin, encoding = %tables.encoding, rows = tables.len(), "table configuration read");
    let records = prepare_tables(tables, &general_config.table_headers)?;
    info!(
        environment = %general_config.environment.env_id,
        systems = general_config.source_systems.len(),
        records = records.len(),
        "configuration grouped"
    );

    Ok((general_config, records))
}

/// Generate the script from already-parsed configuration tables.
pub fn generate(
    general: &ConfigTable,
    tables: &ConfigTable,
    options: &GenerateOptions,
) -> PipelineResult<Generation> {
    let (general_config, records) = load_records(general, tables)?;

    let emission = emit_script(
        &general_config.environment,
        &general_config.source_systems,
        &records,
        &options.emit,
    )?;

    let generation = Generation {
        general: general_config,
        records,
        script: emission.script,
        cursor: emission.cursor,
        total: emission.total,
    };

    if generation.is_complete() {
        info!(statements = generation.script.statements().count(), "script generated");
    } else {
        warn!(
            cursor = generation.cursor,
            total = generation.total,
            "records left after the serving layers; check the order of the table file"
        );
    }

    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::BoundaryPolicy;

    #[test]
    fn test_default_options() {
        let options = GenerateOptions::default();
        assert_eq!(options.delimiter, ';');
        assert_eq!(options.emit.banner_width, 100);
        assert_eq!(options.emit.iteration_limit, 5000);
        assert_eq!(options.emit.system_boundary, BoundaryPolicy::Split);
        assert_eq!(options.delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn test_options_from_partial_json() {
        let options = GenerateOptions::from_json(
            r#"{"delimiter": ",", "banner_width": 60, "system_boundary": "merge"}"#,
        )
        .unwrap();
        assert_eq!(options.delimiter, ',');
        assert_eq!(options.emit.banner_width, 60);
        assert_eq!(options.emit.system_boundary, BoundaryPolicy::Merge);
        assert_eq!(options.emit.statement_prefix, "select ");
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            GenerateOptions::from_json(r#"{"banner_width": "wide"}"#),
            Err(PipelineError::Options(_))
        ));
        let options = GenerateOptions {
            delimiter: '§',
            ..Default::default()
        };
        assert!(options.delimiter_byte().is_err());
    }

    #[test]
    fn test_ensure_complete() {
        let general = crate::parser::parse_config_str(
            "2;cfg_files;2\n1;#\n1;#\n2;env;env_id\n3;src_sys;env_id;src_name\n1;#\n1;#\n\
             3;src_table;src_name;tablename\n5;src_col;src_name;tablename;column_name;data_type\n\
             3;serv_table;schema_name;tablename\n5;serv_col;schema_name;tablename;column_name;data_type\n\
             1;#cfg_end\n2;env;E1\n",
            b';',
        )
        .unwrap();
        let tables =
            crate::parser::parse_config_str("3;serv_table;dds;orders\n3;src_table;S1;orders\n", b';')
                .unwrap();

        let generation = generate(&general, &tables, &GenerateOptions::default()).unwrap();
        assert!(!generation.is_complete());
        assert!(matches!(
            generation.ensure_complete(),
            Err(PipelineError::Incomplete { cursor: 1, total: 2 })
        ));
    }
}
