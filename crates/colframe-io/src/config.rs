//! CSV ingest configuration that callers can serialize/deserialize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colframe_core::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvConfig {
    /// Field delimiter byte.
    pub delimiter: u8,

    /// Treat empty fields as null. When off, an empty field is an empty
    /// string, which also stops a column from inferring as numeric or bool.
    pub empty_as_null: bool,

    /// Explicit column types; skips inference for the named columns.
    pub types: BTreeMap<String, DataType>,

    /// Declared dictionaries for enum columns, in value order. Naming a column
    /// here implies `DataType::Enum`.
    pub enum_values: BTreeMap<String, Vec<String>>,

    /// Upper bound on distinct values for an enum column read without a
    /// declared dictionary.
    pub max_enum_cardinality: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            empty_as_null: true,
            types: BTreeMap::new(),
            enum_values: BTreeMap::new(),
            max_enum_cardinality: 1 << 16,
        }
    }
}

impl CsvConfig {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn empty_as_null(mut self, on: bool) -> Self {
        self.empty_as_null = on;
        self
    }

    pub fn column_type(mut self, column: impl Into<String>, data_type: DataType) -> Self {
        self.types.insert(column.into(), data_type);
        self
    }

    /// Read `column` as an enum whose dictionary is its sorted distinct values.
    pub fn enum_column(self, column: impl Into<String>) -> Self {
        self.column_type(column, DataType::Enum)
    }

    /// Read `column` as an enum with exactly `values`, in that order.
    pub fn enum_values<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_enum_cardinality(mut self, limit: usize) -> Self {
        self.max_enum_cardinality = limit;
        self
    }

    /// Defaults overridden by `COLFRAME_CSV_*` environment variables.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("COLFRAME_CSV_DELIMITER") {
            match s.as_str() {
                "\\t" | "tab" => cfg.delimiter = b'\t',
                _ => {
                    if let [b] = s.as_bytes() {
                        cfg.delimiter = *b;
                    }
                }
            }
        }

        if let Ok(s) = std::env::var("COLFRAME_CSV_EMPTY_NULL") {
            match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => cfg.empty_as_null = true,
                "0" | "false" | "no" => cfg.empty_as_null = false,
                _ => {}
            }
        }

        if let Ok(s) = std::env::var("COLFRAME_CSV_ENUM_MAX_CARDINALITY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_enum_cardinality = v;
            }
        }

        cfg
    }

    /// Requested type for `column`, if any.
    pub fn type_of(&self, column: &str) -> Option<DataType> {
        if self.enum_values.contains_key(column) {
            return Some(DataType::Enum);
        }
        self.types.get(column).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_enum_implies_enum_type() {
        let cfg = CsvConfig::default()
            .column_type("level", DataType::Utf8)
            .enum_values("level", ["low", "mid", "high"]);
        assert_eq!(cfg.type_of("level"), Some(DataType::Enum));
        assert_eq!(cfg.type_of("other"), None);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = CsvConfig::default().delimiter(b';').enum_column("k");
        let s = serde_json::to_string(&cfg).unwrap();
        let back: CsvConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }
}
