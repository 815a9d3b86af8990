//! Group configuration rows into role-tagged parameter records.
//!
//! # Architecture
//!
//! ```text
//! ConfigTable (labels + values)        →  ParameterRecords          →  Records
//! ┌──────────────────────────────┐       ┌──────────────────────┐     ┌────────────────┐
//! │ src_table | S1, orders, erp  │  →    │ mode: src_table      │  →  │ SourceTable {  │
//! │ # comment                    │       │ src_name: S1, ...    │     │   src_name, ...│
//! │ src_col   | S1, orders, id   │       │ mode: src_col ...    │     │ SourceColumn ..│
//! └──────────────────────────────┘       └──────────────────────┘     └────────────────┘
//! ```
//!
//! Header templates come from fixed rows of the general file; every value
//! row is keyed by the template registered for its label. Row order is
//! preserved throughout: it encodes the system → table → column nesting.

use serde::Serialize;

use crate::error::{ConfigError, GroupError, GroupResult, PipelineResult};
use crate::models::{
    Environment, FieldValue, HeaderMap, Literal, Mode, ParameterRecord, Record, ServingColumn,
    ServingTable, SourceColumn, SourceSystem, SourceTable,
};
use crate::parser::{ConfigRow, ConfigTable};
use crate::transform::transcriber::{transcribe_all, transcribe_value};

// Fixed rows of the general configuration file.
const CFG_FILES_COUNT_ROW: usize = 0;
const GENERAL_HEADER_ROWS: [(usize, Mode); 2] = [(3, Mode::Env), (4, Mode::SrcSystem)];
const TABLE_HEADER_ROWS: [(usize, Mode); 4] = [
    (7, Mode::SrcTable),
    (8, Mode::SrcColumn),
    (9, Mode::ServTable),
    (10, Mode::ServColumn),
];
const RESERVED_HEADER_ROWS: [usize; 3] = [13, 14, 15];
const SENTINEL_SEARCH_START: usize = 11;

/// Label closing the header block of the general file.
pub const CFG_END: &str = "#cfg_end";

/// Everything taken from the general configuration file.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralConfig {
    pub origin: String,
    /// Total number of configuration files declared by the project.
    pub cfg_files_count: u64,
    /// Templates for the rows of the table file.
    #[serde(skip)]
    pub table_headers: HeaderMap,
    /// DAG name/step/dependency header rows, not used for generation.
    pub reserved_headers: Vec<ConfigRow>,
    pub environment: Environment,
    pub source_systems: Vec<SourceSystem>,
}

/// Build one record from a header template and the row's values.
///
/// Values beyond the template are ignored; fewer values than template
/// fields is an error.
pub fn build_record(
    origin: &str,
    row: usize,
    mode: Mode,
    header: &[String],
    values: &[String],
) -> GroupResult<ParameterRecord> {
    if values.len() < header.len() {
        return Err(GroupError::MalformedRow {
            origin: origin.to_string(),
            row,
            mode: mode.to_string(),
            message: format!(
                "template names {} fields but the row has {} values",
                header.len(),
                values.len()
            ),
        });
    }

    let fields = header
        .iter()
        .zip(values)
        .map(|(key, value)| (key.clone(), FieldValue::Raw(value.clone())))
        .collect();

    Ok(ParameterRecord { mode, row, fields })
}

fn row_mode(table: &ConfigTable, row: usize, label: &str) -> GroupResult<Mode> {
    Mode::from_label(label).ok_or_else(|| GroupError::UnknownMode {
        origin: table.origin.clone(),
        row,
        mode: label.to_string(),
    })
}

fn template<'h>(
    headers: &'h HeaderMap,
    table: &ConfigTable,
    row: usize,
    mode: Mode,
) -> GroupResult<&'h [String]> {
    headers.template(mode).ok_or_else(|| GroupError::UnknownMode {
        origin: table.origin.clone(),
        row,
        mode: mode.to_string(),
    })
}

/// Group the value rows of the general file, starting at `start`.
///
/// Environment records come first, then source systems, each in file order.
pub fn group_general(
    table: &ConfigTable,
    headers: &HeaderMap,
    start: usize,
) -> GroupResult<Vec<ParameterRecord>> {
    let mut environments = Vec::new();
    let mut systems = Vec::new();

    for (row, config_row) in table.rows.iter().enumerate().skip(start) {
        let mode = row_mode(table, row, &config_row.label)?;
        if mode == Mode::Comment {
            continue;
        }
        let header = template(headers, table, row, mode)?;
        let record = build_record(&table.origin, row, mode, header, &config_row.values)?;
        match mode {
            Mode::Env => environments.push(record),
            _ => systems.push(record),
        }
    }

    environments.extend(systems);
    Ok(environments)
}

/// Group every non-comment row of the table file, in file order.
pub fn group_tables(table: &ConfigTable, headers: &HeaderMap) -> GroupResult<Vec<ParameterRecord>> {
    let mut records = Vec::with_capacity(table.len());

    for (row, config_row) in table.rows.iter().enumerate() {
        let mode = row_mode(table, row, &config_row.label)?;
        if mode == Mode::Comment {
            continue;
        }
        let header = template(headers, table, row, mode)?;
        records.push(build_record(&table.origin, row, mode, header, &config_row.values)?);
    }

    Ok(records)
}

/// Read the header block of the general file and group its value rows.
pub fn prepare_general(table: &ConfigTable) -> PipelineResult<GeneralConfig> {
    let cfg_files_count = table
        .rows
        .get(CFG_FILES_COUNT_ROW)
        .and_then(|r| r.values.first())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| table.malformed(CFG_FILES_COUNT_ROW, "expected the configuration file count"))?;

    let general_headers = header_rows(table, &GENERAL_HEADER_ROWS)?;
    let table_headers = header_rows(table, &TABLE_HEADER_ROWS)?;

    let sentinel = (SENTINEL_SEARCH_START..table.len())
        .find(|&row| table.label(row) == Some(CFG_END))
        .ok_or_else(|| ConfigError::MissingSentinel {
            origin: table.origin.clone(),
        })?;

    let reserved_headers = RESERVED_HEADER_ROWS
        .iter()
        .filter(|&&row| row < sentinel)
        .map(|&row| table.rows[row].clone())
        .collect();

    let mut records = group_general(table, &general_headers, sentinel + 1)?;
    transcribe_all(&mut records);

    let mut environment = None;
    let mut source_systems = Vec::new();
    let mut env_count = 0;
    for params in &records {
        match to_record(&table.origin, params)? {
            Record::Environment(env) => {
                env_count += 1;
                environment.get_or_insert(env);
            }
            Record::SourceSystem(system) => source_systems.push(system),
            other => {
                return Err(GroupError::UnknownMode {
                    origin: table.origin.clone(),
                    row: other.row(),
                    mode: other.mode().to_string(),
                }
                .into())
            }
        }
    }

    let environment = match environment {
        Some(env) if env_count == 1 => env,
        _ => {
            return Err(GroupError::EnvironmentCount {
                origin: table.origin.clone(),
                found: env_count,
            }
            .into())
        }
    };

    Ok(GeneralConfig {
        origin: table.origin.clone(),
        cfg_files_count,
        table_headers,
        reserved_headers,
        environment,
        source_systems,
    })
}

/// Each fixed header row must carry the template of its expected role.
fn header_rows(table: &ConfigTable, rows: &[(usize, Mode)]) -> Result<HeaderMap, ConfigError> {
    rows.iter()
        .map(|&(row, expected)| {
            let config_row = table
                .rows
                .get(row)
                .ok_or_else(|| table.malformed(row, "missing header template row"))?;
            match Mode::from_label(&config_row.label) {
                Some(mode) if mode == expected => Ok((mode, config_row.values.clone())),
                _ => Err(table.malformed(
                    row,
                    format!(
                        "expected the '{}' header template, found '{}'",
                        expected, config_row.label
                    ),
                )),
            }
        })
        .collect()
}

/// Group, transcribe and type the rows of the table file.
pub fn prepare_tables(table: &ConfigTable, headers: &HeaderMap) -> GroupResult<Vec<Record>> {
    let mut records = group_tables(table, headers)?;
    transcribe_all(&mut records);
    records
        .iter()
        .map(|params| to_record(&table.origin, params))
        .collect()
}

// =============================================================================
// Typed records
// =============================================================================

struct Fields<'a> {
    origin: &'a str,
    params: &'a ParameterRecord,
}

impl Fields<'_> {
    fn value(&self, name: &str) -> Option<Literal> {
        self.params.get(name).map(|value| match value {
            FieldValue::Literal(literal) => literal.clone(),
            FieldValue::Raw(raw) => transcribe_value(raw),
        })
    }

    fn required(&self, name: &str) -> GroupResult<Literal> {
        self.value(name).ok_or_else(|| GroupError::MissingField {
            origin: self.origin.to_string(),
            row: self.params.row,
            mode: self.params.mode.to_string(),
            field: name.to_string(),
        })
    }

    fn optional(&self, name: &str, default: Literal) -> Literal {
        self.value(name).unwrap_or(default)
    }
}

/// Convert a parameter record into its typed form, applying field defaults.
pub fn to_record(origin: &str, params: &ParameterRecord) -> GroupResult<Record> {
    let f = Fields { origin, params };
    let row = params.row;
    let no = || Literal::text("n");

    let record = match params.mode {
        Mode::Env => Record::Environment(Environment {
            row,
            env_id: f.required("env_id")?,
        }),
        Mode::SrcSystem => Record::SourceSystem(SourceSystem {
            row,
            env_id: f.required("env_id")?,
            src_name: f.required("src_name")?,
            description: f.optional("descript", Literal::Null),
        }),
        Mode::SrcTable => Record::SourceTable(SourceTable {
            row,
            src_name: f.required("src_name")?,
            tablename: f.required("tablename")?,
            subsystem: f.optional("subsystem", Literal::text("sys")),
            src_schema: f.optional("src_schema", Literal::text("public")),
        }),
        Mode::SrcColumn => Record::SourceColumn(SourceColumn {
            row,
            src_name: f.required("src_name")?,
            tablename: f.required("tablename")?,
            src_schema: f.optional("src_schema", Literal::text("public")),
            column_name: f.required("column_name")?,
            data_type: f.required("data_type")?,
            precision: f.optional("precision", Literal::Null),
            scale: f.optional("scale", Literal::Null),
            key_flg: f.optional("key_flg", no()),
            batch_flg: f.optional("batch_flg", no()),
            date_prc_flg: f.optional("date_prc_flg", no()),
        }),
        Mode::ServTable => Record::ServingTable(ServingTable {
            row,
            schema_name: f.required("schema_name")?,
            tablename: f.required("tablename")?,
            key_shifting_type: f.optional("key_shifting_type", Literal::text("LOCAL")),
        }),
        Mode::ServColumn => Record::ServingColumn(ServingColumn {
            row,
            schema_name: f.required("schema_name")?,
            tablename: f.required("tablename")?,
            column_name: f.required("column_name")?,
            data_type: f.required("data_type")?,
            precision: f.optional("precision", Literal::Null),
            scale: f.optional("scale", Literal::Null),
            key_flg: f.optional("key_flg", no()),
        }),
        Mode::Comment => {
            return Err(GroupError::UnknownMode {
                origin: origin.to_string(),
                row,
                mode: Mode::Comment.to_string(),
            })
        }
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::parser::parse_config_str;

    const GENERAL: &str = "\
2;cfg_files;2
1;# headers
1;# general
2;env;env_id
4;src_sys;env_id;src_name;descript
1;# tables
1;# table roles
5;src_table;src_name;tablename;subsystem;src_schema
11;src_col;src_name;tablename;src_schema;column_name;data_type;precision;scale;key_flg;batch_flg;date_prc_flg
4;serv_table;schema_name;tablename;key_shifting_type
8;serv_col;schema_name;tablename;column_name;data_type;precision;scale;key_flg
1;# dags
1;# dag headers
2;dag_name;name
3;dag_step;dag;step
3;dag_dep;step;depends_on
1;#cfg_end
2;env;E1
4;src_sys;E1;S1;null
4;src_sys;E1;S2;Billing
";

    fn general_table() -> ConfigTable {
        parse_config_str(GENERAL, b';').unwrap()
    }

    #[test]
    fn test_build_record_keys_match_template() {
        let header = vec!["env_id".to_string(), "src_name".to_string()];
        let values = vec!["E1".to_string(), "S1".to_string(), "extra".to_string()];
        let record = build_record("<memory>", 3, Mode::SrcSystem, &header, &values).unwrap();

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["env_id", "src_name"]);
        assert_eq!(record.get("src_name"), Some(&FieldValue::Raw("S1".into())));
        assert_eq!(record.row, 3);
    }

    #[test]
    fn test_build_record_too_few_values() {
        let header = vec!["env_id".to_string(), "src_name".to_string()];
        let err = build_record("g.csv", 5, Mode::SrcSystem, &header, &["E1".to_string()]).unwrap_err();
        assert!(matches!(err, GroupError::MalformedRow { row: 5, .. }));
    }

    #[test]
    fn test_prepare_general() {
        let general = prepare_general(&general_table()).unwrap();

        assert_eq!(general.cfg_files_count, 2);
        assert_eq!(general.environment.env_id, Literal::text("E1"));
        assert_eq!(general.environment.row, 17);
        assert_eq!(general.source_systems.len(), 2);
        assert_eq!(general.source_systems[0].description, Literal::Null);
        assert_eq!(general.source_systems[1].description, Literal::text("Billing"));
        assert_eq!(general.table_headers.len(), 4);
        assert_eq!(general.reserved_headers.len(), 3);
        assert_eq!(general.reserved_headers[0].label, "dag_name");
    }

    #[test]
    fn test_group_general_puts_environment_first() {
        let content = GENERAL.replace("2;env;E1\n", "") + "2;env;E1\n";
        let table = parse_config_str(&content, b';').unwrap();
        let headers = header_rows(&table, &GENERAL_HEADER_ROWS).unwrap();

        let records = group_general(&table, &headers, 17).unwrap();
        let modes: Vec<Mode> = records.iter().map(|r| r.mode).collect();
        assert_eq!(modes, vec![Mode::Env, Mode::SrcSystem, Mode::SrcSystem]);
        assert_eq!(records[1].get("src_name"), Some(&FieldValue::Raw("S1".into())));
    }

    #[test]
    fn test_missing_sentinel() {
        let content = GENERAL.replace("1;#cfg_end\n", "");
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingSentinel { .. })
        ));
    }

    #[test]
    fn test_two_environments_rejected() {
        let content = format!("{}2;env;E2\n", GENERAL);
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Group(GroupError::EnvironmentCount { found: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_mode_in_general_values() {
        let content = format!("{}2;dag_name;load\n", GENERAL);
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        match err {
            PipelineError::Group(GroupError::UnknownMode { row, mode, .. }) => {
                assert_eq!(row, 20);
                assert_eq!(mode, "dag_name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mislabelled_general_header_row() {
        let content = GENERAL.replacen("2;env;env_id", "2;src_table;env_id", 1);
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        match err {
            PipelineError::Config(ConfigError::MalformedRow { row, message, .. }) => {
                assert_eq!(row, 3);
                assert!(message.contains("'env'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_swapped_table_header_rows() {
        let content = GENERAL.replacen(
            "4;serv_table;schema_name;tablename;key_shifting_type",
            "4;src_sys;schema_name;tablename;key_shifting_type",
            1,
        );
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MalformedRow { row: 9, .. })
        ));
    }

    #[test]
    fn test_bad_file_count() {
        let content = GENERAL.replacen("2;cfg_files;2", "2;cfg_files;two", 1);
        let table = parse_config_str(&content, b';').unwrap();
        let err = prepare_general(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MalformedRow { row: 0, .. })
        ));
    }

    #[test]
    fn test_group_tables_skips_comments_and_keeps_order() {
        let headers = prepare_general(&general_table()).unwrap().table_headers;
        let tables = parse_config_str(
            "1;# S1\n\
             5;src_table;S1;orders;erp;public\n\
             1;#\n\
             11;src_col;S1;orders;public;id;int;null;null;y;n;n\n\
             4;serv_table;dds;orders;LOCAL\n",
            b';',
        )
        .unwrap();

        let records = group_tables(&tables, &headers).unwrap();
        let non_comment = tables.labels().filter(|l| !l.starts_with('#')).count();
        assert_eq!(records.len(), non_comment);
        let modes: Vec<Mode> = records.iter().map(|r| r.mode).collect();
        assert_eq!(modes, vec![Mode::SrcTable, Mode::SrcColumn, Mode::ServTable]);
        assert_eq!(records[0].row, 1);
    }

    #[test]
    fn test_group_tables_unknown_mode() {
        let headers = prepare_general(&general_table()).unwrap().table_headers;
        let tables = parse_config_str("2;env;E1\n", b';').unwrap();
        let err = group_tables(&tables, &headers).unwrap_err();
        assert!(matches!(err, GroupError::UnknownMode { row: 0, .. }));
    }

    #[test]
    fn test_prepare_tables_types_and_transcribes() {
        let headers = prepare_general(&general_table()).unwrap().table_headers;
        let tables = parse_config_str(
            "11;src_col;S1;orders;public;amount;numeric;18;2;n;n;y\n",
            b';',
        )
        .unwrap();

        let records = prepare_tables(&tables, &headers).unwrap();
        match &records[0] {
            Record::SourceColumn(col) => {
                assert_eq!(col.precision, Literal::Integer(18));
                assert_eq!(col.column_name, Literal::text("amount"));
                assert_eq!(col.date_prc_flg, Literal::text("y"));
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let headers = HeaderMap::new()
            .with_template(Mode::SrcTable, vec!["src_name".into(), "tablename".into()])
            .with_template(Mode::ServTable, vec!["schema_name".into(), "tablename".into()]);
        let tables = parse_config_str("3;src_table;S1;orders\n3;serv_table;dds;orders\n", b';').unwrap();

        let records = prepare_tables(&tables, &headers).unwrap();
        match (&records[0], &records[1]) {
            (Record::SourceTable(src), Record::ServingTable(serv)) => {
                assert_eq!(src.subsystem, Literal::text("sys"));
                assert_eq!(src.src_schema, Literal::text("public"));
                assert_eq!(serv.key_shifting_type, Literal::text("LOCAL"));
            }
            other => panic!("unexpected records: {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let headers = HeaderMap::new().with_template(Mode::SrcTable, vec!["src_name".into()]);
        let tables = parse_config_str("2;src_table;S1\n", b';').unwrap();
        let err = prepare_tables(&tables, &headers).unwrap_err();
        match err {
            GroupError::MissingField { field, mode, .. } => {
                assert_eq!(field, "tablename");
                assert_eq!(mode, "src_table");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
