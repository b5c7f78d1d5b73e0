#![forbid(unsafe_code)]
//! colframe-io: getting frames in and out.
//!
//! Reading is CSV only (`readers::csv`). Writers cover JSON (records and
//! column layouts), NDJSON and CSV. Nothing here knows about the engines.

pub mod config;
pub mod error;
pub mod readers;
pub mod writers;

pub use config::CsvConfig;
pub use error::{Error, Result};
pub use readers::csv::{read_csv, read_csv_path, CsvReader};
pub use writers::csv::{write_csv, CsvWriter};
pub use writers::json::{to_json_records, write_json_columns, write_json_records};
pub use writers::jsonl::JsonlWriter;
