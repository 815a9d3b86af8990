//! Command text for the metaload function vocabulary.
//!
//! Every builder takes values already in literal form and returns one
//! call expression. Parameter order is part of the external contract:
//!
//! | Command | Parameters |
//! |---------|------------|
//! | `mtl_prj_ctl.f_set_version_schema` | env_id |
//! | `f_add_source_system` | env_id, src_name, descript |
//! | `f_add_source_table` | env_id, src_name, tablename, subsystem, src_schema, generated name |
//! | `f_add_source_column` | `f_get_tab_id(..)`, column_name, data_type, precision, scale, key_flg, batch_flg, date_prc_flg |
//! | `f_add_serving_table` | env_id, schema_name, generated name, key_shifting_type |
//! | `f_add_serving_column` | `f_get_serving_tab_id(..)`, column_name, data_type, precision, scale, key_flg |
//! | `f_get_tab_id` | env_id, src_schema, tablename, src_name |
//! | `f_get_serving_tab_id` | env_id, schema_name, generated name |
//!
//! Table identifiers are never resolved here: column builders embed the
//! lookup call itself and leave resolution to the engine running the script.

pub mod naming;

use std::fmt::Display;

use crate::error::NamingResult;
use crate::models::{
    Literal, ServingColumn, ServingTable, SourceColumn, SourceSystem, SourceTable,
};

pub const SET_VERSION_SCHEMA: &str = "mtl_prj_ctl.f_set_version_schema";
pub const ADD_SOURCE_SYSTEM: &str = "f_add_source_system";
pub const ADD_SOURCE_TABLE: &str = "f_add_source_table";
pub const ADD_SOURCE_COLUMN: &str = "f_add_source_column";
pub const ADD_SERVING_TABLE: &str = "f_add_serving_table";
pub const ADD_SERVING_COLUMN: &str = "f_add_serving_column";
pub const GET_SOURCE_TABLE_ID: &str = "f_get_tab_id";
pub const GET_SERVING_TABLE_ID: &str = "f_get_serving_tab_id";

/// Default statement prefix.
pub const STATEMENT_PREFIX: &str = "select ";

/// Default statement terminator.
pub const STATEMENT_SUFFIX: &str = ";";

fn call(function: &str, params: &[&dyn Display]) -> String {
    let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("{}({})", function, params.join(", "))
}

/// Select the environment scheme version.
pub fn set_env(env_id: &Literal) -> String {
    call(SET_VERSION_SCHEMA, &[env_id])
}

pub fn add_source_system(system: &SourceSystem) -> String {
    call(
        ADD_SOURCE_SYSTEM,
        &[&system.env_id, &system.src_name, &system.description],
    )
}

/// Register a source table together with its generated raw table name.
pub fn add_source_table(env_id: &Literal, table: &SourceTable) -> String {
    let generated = naming::source_table_name(
        &table.subsystem,
        env_id,
        &table.src_name,
        &table.tablename,
    );
    call(
        ADD_SOURCE_TABLE,
        &[
            env_id,
            &table.src_name,
            &table.tablename,
            &table.subsystem,
            &table.src_schema,
            &generated,
        ],
    )
}

pub fn add_source_column(env_id: &Literal, column: &SourceColumn) -> String {
    let tab_id = get_source_table_id(
        env_id,
        &column.src_schema,
        &column.tablename,
        &column.src_name,
    );
    call(
        ADD_SOURCE_COLUMN,
        &[
            &tab_id,
            &column.column_name,
            &column.data_type,
            &column.precision,
            &column.scale,
            &column.key_flg,
            &column.batch_flg,
            &column.date_prc_flg,
        ],
    )
}

/// Register a serving table under its layer-suffixed name.
///
/// Fails with [`crate::error::NamingError::UnknownSchema`] before any
/// text is produced.
pub fn add_serving_table(env_id: &Literal, table: &ServingTable) -> NamingResult<String> {
    let generated = naming::serving_table_name(&table.tablename, &table.schema_name)?;
    Ok(call(
        ADD_SERVING_TABLE,
        &[
            env_id,
            &table.schema_name,
            &generated,
            &table.key_shifting_type,
        ],
    ))
}

/// The lookup refers to the generated name, the one `f_add_serving_table` created.
pub fn add_serving_column(env_id: &Literal, column: &ServingColumn) -> NamingResult<String> {
    let generated = naming::serving_table_name(&column.tablename, &column.schema_name)?;
    let tab_id = get_serving_table_id(env_id, &column.schema_name, &generated);
    Ok(call(
        ADD_SERVING_COLUMN,
        &[
            &tab_id,
            &column.column_name,
            &column.data_type,
            &column.precision,
            &column.scale,
            &column.key_flg,
        ],
    ))
}

pub fn get_source_table_id(
    env_id: &Literal,
    src_schema: &Literal,
    tablename: &Literal,
    src_name: &Literal,
) -> String {
    call(GET_SOURCE_TABLE_ID, &[env_id, src_schema, tablename, src_name])
}

pub fn get_serving_table_id(env_id: &Literal, schema_name: &Literal, tablename: &Literal) -> String {
    call(GET_SERVING_TABLE_ID, &[env_id, schema_name, tablename])
}

/// Wrap a statement in `prefix`/`suffix`. Absent or empty statements yield `""`.
pub fn decorate(statement: Option<&str>, prefix: &str, suffix: &str) -> String {
    match statement {
        Some(s) if !s.is_empty() => format!("{}{}{}", prefix, s, suffix),
        _ => String::new(),
    }
}

/// Human-readable list of the command vocabulary.
pub fn commands_description() -> String {
    r#"Metaload commands emitted by penman (parameters are positional):

| Command | Parameters |
|---------|------------|
| mtl_prj_ctl.f_set_version_schema | env_id |
| f_add_source_system | env_id, src_name, descript |
| f_add_source_table | env_id, src_name, tablename, subsystem, src_schema, <subsystem>__<env_id>__<src_name>__<tablename>__data |
| f_add_source_column | f_get_tab_id(...), column_name, data_type, precision, scale, key_flg, batch_flg, date_prc_flg |
| f_add_serving_table | env_id, schema_name, <tablename>_v|_t, key_shifting_type |
| f_add_serving_column | f_get_serving_tab_id(...), column_name, data_type, precision, scale, key_flg |
| f_get_tab_id | env_id, src_schema, tablename, src_name |
| f_get_serving_tab_id | env_id, schema_name, <tablename>_v|_t |

Serving schemas: dds_lnk -> _v, dds_lgc and dds -> _t.
Every statement is written as: select <command>;"#
        .to_string()
}
