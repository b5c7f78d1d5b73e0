//! CSV writer.
//!
//! Nulls are written as empty fields. Floats use the shortest form that
//! reads back as a float (`5.0`, not `5`). Text carries no type marker, so a
//! Utf8 column of digits re-infers as Int64 and an empty string reads back as
//! null; pin such columns with `CsvConfig::column_type` when reading.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use colframe_core::{Column, ColumnData, Frame};

use crate::error::Result;

pub struct CsvWriter<W: Write> {
    inner: csv::Writer<W>,
    wrote_header: bool,
}

impl CsvWriter<File> {
    pub fn to_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self::with_delimiter(writer, b',')
    }

    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        let inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        Self {
            inner,
            wrote_header: false,
        }
    }

    /// Write `frame`'s rows; the header goes out with the first frame only.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.wrote_header {
            self.inner.write_record(frame.column_names())?;
            self.wrote_header = true;
        }
        let columns: Vec<&Column> = frame.iter().map(|(_, c)| c).collect();
        let mut record: Vec<String> = Vec::with_capacity(columns.len());
        for row in 0..frame.len() {
            record.clear();
            record.extend(columns.iter().map(|c| field(c, row)));
            self.inner.write_record(&record)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

fn field(col: &Column, i: usize) -> String {
    if col.is_null(i) {
        return String::new();
    }
    match col.data() {
        ColumnData::Boolean(v) => v[i].to_string(),
        ColumnData::Int64(v) => v[i].to_string(),
        ColumnData::Float64(v) => format!("{:?}", v[i]),
        ColumnData::Utf8(v) => v.value(i).to_string(),
        ColumnData::Enum(e) => e.value(i).to_string(),
    }
}

/// Header plus every row of `frame`.
pub fn write_csv<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    let mut w = CsvWriter::to_writer(writer);
    w.write_frame(frame)?;
    Ok(())
}
