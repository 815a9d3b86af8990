//! Domain models for the generation pipeline.
//!
//! - [`Mode`] - the row discriminator (which role a configuration row plays)
//! - [`FieldValue`] / [`Literal`] - raw configuration text and its literal form
//! - [`ParameterRecord`] - one grouped row: mode plus template-keyed fields
//! - [`HeaderMap`] - header templates registered per mode
//! - [`ServingLayer`] - the three serving schema tiers
//! - [`Record`] - the closed, typed form consumed by the emitter

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::error::{NamingError, NamingResult};

// =============================================================================
// Mode (row discriminator)
// =============================================================================

/// Role of a configuration row, taken from its label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Selected environment scheme version.
    Env,
    /// Source system.
    #[serde(rename = "src_sys")]
    SrcSystem,
    /// Table on a source system.
    SrcTable,
    /// Column of a source table.
    #[serde(rename = "src_col")]
    SrcColumn,
    /// Table in a serving layer.
    #[serde(rename = "serv_table")]
    ServTable,
    /// Column of a serving table.
    #[serde(rename = "serv_col")]
    ServColumn,
    /// Separator or comment row (label starts with `#`).
    Comment,
}

impl Mode {
    /// Prefix marking comment rows.
    pub const COMMENT_MARKER: char = '#';

    /// Parse a row label. Returns `None` for labels that name no role.
    pub fn from_label(label: &str) -> Option<Self> {
        if label.starts_with(Self::COMMENT_MARKER) {
            return Some(Self::Comment);
        }
        match label {
            "env" => Some(Self::Env),
            "src_sys" => Some(Self::SrcSystem),
            "src_table" => Some(Self::SrcTable),
            "src_col" => Some(Self::SrcColumn),
            "serv_table" => Some(Self::ServTable),
            "serv_col" => Some(Self::ServColumn),
            _ => None,
        }
    }

    /// Label used for this mode in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::SrcSystem => "src_sys",
            Self::SrcTable => "src_table",
            Self::SrcColumn => "src_col",
            Self::ServTable => "serv_table",
            Self::ServColumn => "serv_col",
            Self::Comment => "#",
        }
    }

    pub fn is_source_table_role(&self) -> bool {
        matches!(self, Self::SrcTable | Self::SrcColumn)
    }

    pub fn is_serving_role(&self) -> bool {
        matches!(self, Self::ServTable | Self::ServColumn)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Literal values
// =============================================================================

/// A value in the form the command language accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// The symbolic `null`.
    Null,
    /// Unsigned integer literal.
    Integer(u64),
    /// String literal, stored unquoted.
    Text(String),
}

impl Literal {
    /// The symbolic null marker as it appears in configuration text.
    pub const NULL_MARKER: &'static str = "null";

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Value without literal decoration (no quotes).
    pub fn bare(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(Self::NULL_MARKER),
            Self::Integer(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(Self::NULL_MARKER),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// A record field before or after transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Text exactly as read from the configuration file.
    Raw(String),
    /// Transcribed literal.
    Literal(Literal),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<Literal> for FieldValue {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

// =============================================================================
// Parameter records and header templates
// =============================================================================

/// One configuration row keyed by the header template of its mode.
///
/// The key set always equals the template registered for `mode`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRecord {
    pub mode: Mode,
    /// 0-based row index in the originating file.
    pub row: usize,
    pub fields: IndexMap<String, FieldValue>,
}

impl ParameterRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Ordered field names per mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    templates: HashMap<Mode, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, mode: Mode, fields: Vec<String>) -> Self {
        self.templates.insert(mode, fields);
        self
    }

    pub fn template(&self, mode: Mode) -> Option<&[String]> {
        self.templates.get(&mode).map(Vec::as_slice)
    }

    pub fn contains(&self, mode: Mode) -> bool {
        self.templates.contains_key(&mode)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<(Mode, Vec<String>)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (Mode, Vec<String>)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Serving layers
// =============================================================================

/// Target schema tier of a serving table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingLayer {
    /// `dds`
    Raw,
    /// `dds_lgc`
    Logical,
    /// `dds_lnk`
    Link,
}

impl ServingLayer {
    /// Resolve a bare schema name.
    pub fn from_schema(schema: &str) -> NamingResult<Self> {
        match schema {
            "dds" => Ok(Self::Raw),
            "dds_lgc" => Ok(Self::Logical),
            "dds_lnk" => Ok(Self::Link),
            other => Err(NamingError::UnknownSchema {
                schema: other.to_string(),
            }),
        }
    }

    pub fn schema(&self) -> &'static str {
        match self {
            Self::Raw => "dds",
            Self::Logical => "dds_lgc",
            Self::Link => "dds_lnk",
        }
    }

    /// Suffix appended to generated table names: views for links, tables otherwise.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Link => "_v",
            Self::Raw | Self::Logical => "_t",
        }
    }
}

// =============================================================================
// Typed records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub row: usize,
    pub env_id: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSystem {
    pub row: usize,
    pub env_id: Literal,
    pub src_name: Literal,
    pub description: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTable {
    pub row: usize,
    pub src_name: Literal,
    pub tablename: Literal,
    pub subsystem: Literal,
    pub src_schema: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceColumn {
    pub row: usize,
    pub src_name: Literal,
    pub tablename: Literal,
    pub src_schema: Literal,
    pub column_name: Literal,
    pub data_type: Literal,
    pub precision: Literal,
    pub scale: Literal,
    pub key_flg: Literal,
    pub batch_flg: Literal,
    pub date_prc_flg: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServingTable {
    pub row: usize,
    pub schema_name: Literal,
    pub tablename: Literal,
    pub key_shifting_type: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServingColumn {
    pub row: usize,
    pub schema_name: Literal,
    pub tablename: Literal,
    pub column_name: Literal,
    pub data_type: Literal,
    pub precision: Literal,
    pub scale: Literal,
    pub key_flg: Literal,
}

/// A grouped, transcribed configuration row, one variant per role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode")]
pub enum Record {
    #[serde(rename = "env")]
    Environment(Environment),
    #[serde(rename = "src_sys")]
    SourceSystem(SourceSystem),
    #[serde(rename = "src_table")]
    SourceTable(SourceTable),
    #[serde(rename = "src_col")]
    SourceColumn(SourceColumn),
    #[serde(rename = "serv_table")]
    ServingTable(ServingTable),
    #[serde(rename = "serv_col")]
    ServingColumn(ServingColumn),
}

impl Record {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Environment(_) => Mode::Env,
            Self::SourceSystem(_) => Mode::SrcSystem,
            Self::SourceTable(_) => Mode::SrcTable,
            Self::SourceColumn(_) => Mode::SrcColumn,
            Self::ServingTable(_) => Mode::ServTable,
            Self::ServingColumn(_) => Mode::ServColumn,
        }
    }

    /// 0-based row index in the originating file.
    pub fn row(&self) -> usize {
        match self {
            Self::Environment(r) => r.row,
            Self::SourceSystem(r) => r.row,
            Self::SourceTable(r) => r.row,
            Self::SourceColumn(r) => r.row,
            Self::ServingTable(r) => r.row,
            Self::ServingColumn(r) => r.row,
        }
    }

    /// Source system a source table or column belongs to.
    pub fn source_name(&self) -> Option<&Literal> {
        match self {
            Self::SourceSystem(r) => Some(&r.src_name),
            Self::SourceTable(r) => Some(&r.src_name),
            Self::SourceColumn(r) => Some(&r.src_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_labels() {
        assert_eq!(Mode::from_label("src_col"), Some(Mode::SrcColumn));
        assert_eq!(Mode::from_label("#cfg_end"), Some(Mode::Comment));
        assert_eq!(Mode::from_label("# tables of S1"), Some(Mode::Comment));
        assert_eq!(Mode::from_label("dag"), None);
        assert_eq!(Mode::from_label("SRC_TABLE"), None);
        assert_eq!(Mode::ServTable.to_string(), "serv_table");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Literal::Null.to_string(), "null");
        assert_eq!(Literal::Integer(38).to_string(), "38");
        assert_eq!(Literal::text("orders").to_string(), "'orders'");
        assert_eq!(Literal::text("o'brien").to_string(), "'o''brien'");
        assert_eq!(Literal::text("o'brien").bare(), "o'brien");
    }

    #[test]
    fn test_serving_layer_suffixes() {
        assert_eq!(ServingLayer::from_schema("dds_lnk").unwrap().suffix(), "_v");
        assert_eq!(ServingLayer::from_schema("dds_lgc").unwrap().suffix(), "_t");
        assert_eq!(ServingLayer::from_schema("dds").unwrap().suffix(), "_t");
        assert_eq!(
            ServingLayer::from_schema("stage"),
            Err(NamingError::UnknownSchema {
                schema: "stage".into()
            })
        );
    }

    #[test]
    fn test_record_serializes_with_mode_tag() {
        let record = Record::Environment(Environment {
            row: 12,
            env_id: Literal::text("E1"),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "env");
        assert_eq!(json["env_id"], "E1");
        assert_eq!(record.mode(), Mode::Env);
        assert_eq!(record.row(), 12);
    }
}
