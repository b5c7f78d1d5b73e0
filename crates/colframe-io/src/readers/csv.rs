//! CSV reader.
//!
//! The whole input is read before any column is built, so a bad row anywhere
//! fails the read and no partial frame escapes. Columns without an explicit
//! type are inferred from their non-null values, trying Int64, then Float64,
//! then Boolean, and falling back to Utf8.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use colframe_core::{Column, DataType, Frame};

use crate::config::CsvConfig;
use crate::error::{Error, Result};

pub struct CsvReader<R: Read> {
    inner: csv::Reader<R>,
    config: CsvConfig,
}

impl CsvReader<File> {
    pub fn from_path(path: impl AsRef<Path>, config: CsvConfig) -> Result<Self> {
        let f = File::open(path)?;
        Ok(Self::from_reader(f, config))
    }
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R, config: CsvConfig) -> Self {
        let inner = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            // Ragged rows are reported by us, with row numbers.
            .flexible(true)
            .from_reader(reader);
        Self { inner, config }
    }

    /// Consume the input and build a frame.
    pub fn read_frame(mut self) -> Result<Frame> {
        let header = self.inner.byte_headers()?.clone();
        let mut names = Vec::with_capacity(header.len());
        let mut seen = HashSet::new();
        for (field, raw) in header.iter().enumerate() {
            let name = std::str::from_utf8(raw)
                .map_err(|_| Error::InvalidUtf8 { row: 0, field })?
                .to_string();
            if !seen.insert(name.clone()) {
                return Err(colframe_core::Error::DuplicateColumn(name).into());
            }
            names.push(name);
        }
        for column in self.config.types.keys().chain(self.config.enum_values.keys()) {
            if !seen.contains(column) {
                return Err(colframe_core::Error::UnknownColumn(column.clone()).into());
            }
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        let mut record = csv::ByteRecord::new();
        let mut row = 0usize;
        while self.inner.read_byte_record(&mut record)? {
            if record.len() != names.len() {
                return Err(Error::RaggedRow {
                    row,
                    expected: names.len(),
                    found: record.len(),
                });
            }
            for (field, raw) in record.iter().enumerate() {
                let s = std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8 { row, field })?;
                let cell = if s.is_empty() && self.config.empty_as_null {
                    None
                } else {
                    Some(s.to_string())
                };
                cells[field].push(cell);
            }
            row += 1;
        }

        let mut columns = Vec::with_capacity(names.len());
        for (name, values) in names.into_iter().zip(cells) {
            let column = match self.config.type_of(&name) {
                Some(dt) => build(&name, &values, dt, &self.config)?,
                None => infer(&values),
            };
            columns.push((name, column));
        }
        Ok(Frame::new(columns)?)
    }
}

/// Read a whole CSV stream.
pub fn read_csv<R: Read>(reader: R, config: CsvConfig) -> Result<Frame> {
    CsvReader::from_reader(reader, config).read_frame()
}

pub fn read_csv_path(path: impl AsRef<Path>, config: CsvConfig) -> Result<Frame> {
    CsvReader::from_path(path, config)?.read_frame()
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn infer(values: &[Option<String>]) -> Column {
    let present = || values.iter().flatten();
    if present().next().is_none() {
        return Column::from_opt_strs(values.iter().map(|v| v.as_deref()));
    }
    if present().all(|s| s.parse::<i64>().is_ok()) {
        return Column::from_opt_i64(parse_present(values, |s| s.parse().ok()));
    }
    if present().all(|s| s.parse::<f64>().is_ok()) {
        return Column::from_opt_f64(parse_present(values, |s| s.parse().ok()));
    }
    if present().all(|s| parse_bool(s).is_some()) {
        return Column::from_opt_bool(parse_present(values, parse_bool));
    }
    Column::from_opt_strs(values.iter().map(|v| v.as_deref()))
}

fn parse_present<T>(
    values: &[Option<String>],
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<Option<T>> {
    values.iter().map(|v| v.as_deref().and_then(&parse)).collect()
}

/// Parse every present cell with `parse`, failing on the first miss.
fn parse_all<T>(
    column: &str,
    values: &[Option<String>],
    expected: DataType,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v.as_deref() {
            None => Ok(None),
            Some(s) => parse(s).map(Some).ok_or_else(|| Error::Parse {
                row,
                column: column.to_string(),
                reason: format!("'{s}' is not a valid {expected} value"),
            }),
        })
        .collect()
}

fn build(
    column: &str,
    values: &[Option<String>],
    dt: DataType,
    config: &CsvConfig,
) -> Result<Column> {
    Ok(match dt {
        DataType::Int64 => Column::from_opt_i64(parse_all(column, values, dt, |s| s.parse().ok())?),
        DataType::Float64 => {
            Column::from_opt_f64(parse_all(column, values, dt, |s| s.parse().ok())?)
        }
        DataType::Boolean => Column::from_opt_bool(parse_all(column, values, dt, parse_bool)?),
        DataType::Utf8 => Column::from_opt_strs(values.iter().map(|v| v.as_deref())),
        DataType::Enum => build_enum(column, values, config)?,
    })
}

fn build_enum(column: &str, values: &[Option<String>], config: &CsvConfig) -> Result<Column> {
    let present = values.iter().map(|v| v.as_deref());
    match config.enum_values.get(column) {
        Some(declared) => {
            let members: HashSet<&str> = declared.iter().map(String::as_str).collect();
            if members.len() != declared.len() {
                return Err(Error::Config {
                    column: column.to_string(),
                    reason: "declared enum values contain duplicates".to_string(),
                });
            }
            if let Some((row, s)) = values
                .iter()
                .enumerate()
                .filter_map(|(row, v)| Some((row, v.as_deref()?)))
                .find(|(_, s)| !members.contains(s))
            {
                return Err(Error::Parse {
                    row,
                    column: column.to_string(),
                    reason: format!("'{s}' is not one of the declared enum values"),
                });
            }
            Ok(Column::enum_from_strs(present, Some(declared.as_slice()))?)
        }
        None => {
            let distinct: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
            if distinct.len() > config.max_enum_cardinality {
                return Err(Error::Config {
                    column: column.to_string(),
                    reason: format!(
                        "{} distinct values exceed the enum cardinality limit of {}",
                        distinct.len(),
                        config.max_enum_cardinality
                    ),
                });
            }
            Ok(Column::enum_from_strs(present, None)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colframe_core::Scalar;

    fn read(src: &str, config: CsvConfig) -> Result<Frame> {
        read_csv(src.as_bytes(), config)
    }

    #[test]
    fn inference_ladder() {
        let f = read("i,f,b,s\n1,1.5,true,x\n2,2,FALSE,3\n", CsvConfig::default()).unwrap();
        let types: Vec<DataType> = f.iter().map(|(_, c)| c.data_type()).collect();
        assert_eq!(
            types,
            vec![DataType::Int64, DataType::Float64, DataType::Boolean, DataType::Utf8]
        );
    }

    #[test]
    fn empty_fields_are_null_unless_disabled() {
        let f = read("a,b\n1,\n,x\n", CsvConfig::default()).unwrap();
        assert_eq!(f.column("a").unwrap().data_type(), DataType::Int64);
        assert_eq!(f.column("a").unwrap().get(1), Scalar::Null);
        assert_eq!(f.column("b").unwrap().get(0), Scalar::Null);

        let f = read("a,b\n1,\n2,x\n", CsvConfig::default().empty_as_null(false)).unwrap();
        assert_eq!(f.column("b").unwrap().get(0), Scalar::Str(String::new()));
    }

    #[test]
    fn ragged_row_fails() {
        let err = read("a,b\n1,2\n3\n", CsvConfig::default()).unwrap_err();
        assert!(matches!(err, Error::RaggedRow { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn duplicate_header_fails() {
        let err = read("a,a\n1,2\n", CsvConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Core(colframe_core::Error::DuplicateColumn(_))));
    }

    #[test]
    fn invalid_utf8_fails() {
        let err = read_csv(&b"a\n\xff\n"[..], CsvConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { row: 0, field: 0 }));
    }

    #[test]
    fn explicit_type_rejects_bad_value() {
        let cfg = CsvConfig::default().column_type("a", DataType::Int64);
        let err = read("a\n1\nx\n", cfg).unwrap_err();
        assert!(matches!(err, Error::Parse { row: 1, .. }));
    }

    #[test]
    fn declared_enum_keeps_declared_order() {
        let cfg = CsvConfig::default().enum_values("lvl", ["low", "mid", "high"]);
        let f = read("lvl\nhigh\nlow\n", cfg).unwrap();
        let e = f.column("lvl").unwrap().as_enum().unwrap();
        assert_eq!(e.dictionary(), &["low".to_string(), "mid".into(), "high".into()]);
        assert_eq!(e.codes(), &[2, 0]);

        let cfg = CsvConfig::default().enum_values("lvl", ["low"]);
        assert!(matches!(read("lvl\nhigh\n", cfg), Err(Error::Parse { row: 0, .. })));
    }

    #[test]
    fn enum_cardinality_limit() {
        let cfg = CsvConfig::default().enum_column("k").max_enum_cardinality(1);
        assert!(matches!(read("k\na\nb\n", cfg), Err(Error::Config { .. })));
    }

    #[test]
    fn unknown_configured_column_fails() {
        let cfg = CsvConfig::default().enum_column("missing");
        let err = read("a\n1\n", cfg).unwrap_err();
        assert!(matches!(err, Error::Core(colframe_core::Error::UnknownColumn(_))));
    }
}
