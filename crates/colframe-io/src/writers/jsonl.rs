//! NDJSON writer: one JSON object per row, one row per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use colframe_core::{Column, Frame};

use super::RowObject;
use crate::error::Result;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    // Projection/order for every frame written; empty means all columns.
    columns: Vec<String>,
}

impl JsonlWriter<File> {
    pub fn to_path(path: impl AsRef<Path>, columns: Option<Vec<String>>) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f, columns))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W, columns: Option<Vec<String>>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            columns: columns.unwrap_or_default(),
        }
    }

    /// Append every row of `frame`. Frames written later must carry the same
    /// columns when a projection was given.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let columns: Vec<(&str, &Column)> = if self.columns.is_empty() {
            frame.iter().collect()
        } else {
            self.columns
                .iter()
                .map(|name| Ok((name.as_str(), frame.column(name)?)))
                .collect::<std::result::Result<_, colframe_core::Error>>()?
        };
        for row in 0..frame.len() {
            serde_json::to_writer(&mut self.writer, &RowObject { columns: &columns, row })?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_orders_keys() {
        let frame = Frame::new([
            ("a", Column::from_i64(vec![1, 2])),
            ("b", Column::from_bool(vec![true, false])),
        ])
        .unwrap();
        let mut w = JsonlWriter::to_writer(Vec::new(), Some(vec!["b".into(), "a".into()]));
        w.write_frame(&frame).unwrap();
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(out, "{\"b\":true,\"a\":1}\n{\"b\":false,\"a\":2}\n");
    }

    #[test]
    fn unknown_projection_column_fails() {
        let frame = Frame::new([("a", Column::from_i64(vec![1]))]).unwrap();
        let mut w = JsonlWriter::to_writer(Vec::new(), Some(vec!["nope".into()]));
        assert!(w.write_frame(&frame).is_err());
    }
}
