//! Naming rules for generated tables.
//!
//! Source tables land in a raw table named
//! `<subsystem>__<env>__<source>__<table>__data`; serving tables get a
//! layer suffix (`_v` for link views, `_t` for logical and raw tables).
//! The same rules feed both the creating command and every later lookup,
//! so they must stay the only place names are built.

use crate::error::NamingResult;
use crate::models::{Literal, ServingLayer};

/// Separator between the parts of a generated source table name.
pub const NAME_SEPARATOR: &str = "__";

/// Suffix of every generated source table name.
pub const SOURCE_TABLE_SUFFIX: &str = "__data";

/// Generated raw table name for a source table.
pub fn source_table_name(
    subsystem: &Literal,
    env_id: &Literal,
    src_name: &Literal,
    tablename: &Literal,
) -> Literal {
    let parts: Vec<String> = [subsystem, env_id, src_name, tablename]
        .iter()
        .map(|part| part.bare().replace('\'', ""))
        .collect();
    Literal::Text(format!("{}{}", parts.join(NAME_SEPARATOR), SOURCE_TABLE_SUFFIX))
}

/// Generated table or view name for a serving table in `schema_name`.
pub fn serving_table_name(tablename: &Literal, schema_name: &Literal) -> NamingResult<Literal> {
    let layer = ServingLayer::from_schema(&schema_name.bare())?;
    Ok(Literal::Text(format!("{}{}", tablename.bare(), layer.suffix())))
}
