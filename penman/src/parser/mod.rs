//! Configuration file reader with encoding auto-detection.
//!
//! Configuration files are self-describing delimited rows:
//!
//! ```text
//! <count>;<label>;<value 1>;...;<value count-1>[;ignored...]
//! ```
//!
//! `count` is the number of fields after itself, the label included.
//! Fields past `count` are ignored, so rows can be padded to equal width
//! by spreadsheet exports. No role-specific logic lives here.

use serde::Serialize;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Origin used for input that did not come from a file.
pub const MEMORY_ORIGIN: &str = "<memory>";

/// Default field separator.
pub const DEFAULT_DELIMITER: u8 = b';';

/// One configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRow {
    pub label: String,
    pub values: Vec<String>,
}

/// A parsed configuration file: labels and value lists in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigTable {
    /// File path, or [`MEMORY_ORIGIN`].
    pub origin: String,
    /// Detected or assumed encoding.
    pub encoding: String,
    pub rows: Vec<ConfigRow>,
}

impl ConfigTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.values.as_slice())
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|r| r.label.as_str())
    }

    /// Build a [`ConfigError::MalformedRow`] pointing into this table.
    pub fn malformed(&self, row: usize, message: impl Into<String>) -> ConfigError {
        ConfigError::MalformedRow {
            origin: self.origin.clone(),
            row,
            message: message.into(),
        }
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "windows-1251" | "cp1251" => "windows-1251".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the given encoding label.
///
/// Labels unknown to `encoding_rs` fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
        Some(enc) if enc != encoding_rs::UTF_8 => enc.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Parse configuration text held in memory.
pub fn parse_config_str(content: &str, delimiter: u8) -> ConfigResult<ConfigTable> {
    parse_content(content, delimiter, MEMORY_ORIGIN, "utf-8".to_string())
}

/// Read and parse a configuration file.
///
/// Valid UTF-8 is taken as is; other bytes go through encoding detection.
pub fn read_config_file<P: AsRef<Path>>(path: P, delimiter: u8) -> ConfigResult<ConfigTable> {
    let origin = path.as_ref().display().to_string();
    let bytes = std::fs::read(path.as_ref()).map_err(|source| ConfigError::Io {
        origin: origin.clone(),
        source,
    })?;

    match std::str::from_utf8(&bytes) {
        Ok(content) => parse_content(content, delimiter, &origin, "utf-8".to_string()),
        Err(_) => {
            let encoding = detect_encoding(&bytes);
            let content = decode_content(&bytes, &encoding);
            parse_content(&content, delimiter, &origin, encoding)
        }
    }
}

fn parse_content(
    content: &str,
    delimiter: u8,
    origin: &str,
    encoding: String,
) -> ConfigResult<ConfigTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut table = ConfigTable {
        origin: origin.to_string(),
        encoding,
        rows: Vec::new(),
    };

    for result in reader.records() {
        let record = result.map_err(|source| ConfigError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        let row = table.rows.len();
        let parsed = parse_row(&record).map_err(|message| table.malformed(row, message))?;
        table.rows.push(parsed);
    }

    Ok(table)
}

fn parse_row(record: &csv::StringRecord) -> Result<ConfigRow, String> {
    let count_field = record.get(0).unwrap_or("");
    let count: usize = count_field
        .parse()
        .map_err(|_| format!("field count '{}' is not an integer", count_field))?;

    let label = record
        .get(1)
        .ok_or_else(|| "row has no label".to_string())?;

    let available = record.len().saturating_sub(1);
    if available < count {
        return Err(format!(
            "declares {} fields but only {} follow the count",
            count, available
        ));
    }

    let values = (2..=count)
        .filter_map(|i| record.get(i))
        .map(str::to_string)
        .collect();

    Ok(ConfigRow {
        label: label.to_string(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_values() {
        let cfg = "3;src_sys;E1;S1\n1;#cfg_end\n4;src_table;S1;orders;erp";
        let table = parse_config_str(cfg, b';').unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.labels().collect::<Vec<_>>(), vec!["src_sys", "#cfg_end", "src_table"]);
        assert_eq!(table.rows[0].values, vec!["E1", "S1"]);
        assert!(table.rows[1].values.is_empty());
        assert_eq!(table.rows[2].values, vec!["S1", "orders", "erp"]);
    }

    #[test]
    fn test_fields_beyond_count_ignored() {
        let table = parse_config_str("2;env;E1;;;;\n", b';').unwrap();
        assert_eq!(table.rows[0].values, vec!["E1"]);
    }

    #[test]
    fn test_short_row_is_malformed() {
        let cfg = "2;env;E1\n3;src_sys;E1";
        let err = parse_config_str(cfg, b';').unwrap_err();
        match err {
            ConfigError::MalformedRow { row, message, .. } => {
                assert_eq!(row, 1);
                assert!(message.contains("declares 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_integer_count_is_malformed() {
        let err = parse_config_str("x;env;E1", b';').unwrap_err();
        assert!(matches!(err, ConfigError::MalformedRow { row: 0, .. }));
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn test_missing_label_is_malformed() {
        let err = parse_config_str("0", b';').unwrap_err();
        assert!(err.to_string().contains("no label"));
    }

    #[test]
    fn test_quoted_fields_and_trimming() {
        let cfg = "3; src_sys ;\"E1\";\"Billing; legacy\"";
        let table = parse_config_str(cfg, b';').unwrap();
        assert_eq!(table.rows[0].label, "src_sys");
        assert_eq!(table.rows[0].values, vec!["E1", "Billing; legacy"]);
    }

    #[test]
    fn test_comma_delimiter() {
        let table = parse_config_str("2,env,E1", b',').unwrap();
        assert_eq!(table.rows[0].values, vec!["E1"]);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_config_str("2;env;E1\n\n2;env;E2\n", b';').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_read_file_reports_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("general.csv");
        std::fs::write(&path, "2;env;E1\n").unwrap();

        let table = read_config_file(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(table.origin, path.display().to_string());
        assert_eq!(table.rows[0].values, vec!["E1"]);

        let missing = read_config_file(dir.path().join("nope.csv"), DEFAULT_DELIMITER);
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_utf8_file_keeps_accents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("general.csv");
        std::fs::write(&path, "4;src_sys;E1;S1;Zürich\n").unwrap();

        let table = read_config_file(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(table.encoding, "utf-8");
        assert_eq!(table.rows[0].values, vec!["E1", "S1", "Zürich"]);
    }

    #[test]
    fn test_windows_1252_decoding() {
        // "Soci\xe9t\xe9" in windows-1252
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "windows-1252");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(decode_content("Привет".as_bytes(), "utf-8"), "Привет");
    }
}
