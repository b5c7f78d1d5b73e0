//! Whole-frame JSON output.
//!
//! `records`: `[{"a":1,"b":"x"}, ...]`, one object per row.
//! `columns`: `{"a":[1,...],"b":["x",...]}`, one array per column.

use std::io::Write;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use colframe_core::{Column, Frame};

use super::{columns_of, Cell, RowObject};
use crate::error::Result;

struct Records<'a>(&'a Frame);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let columns = columns_of(self.0);
        let mut seq = s.serialize_seq(Some(self.0.len()))?;
        for row in 0..self.0.len() {
            seq.serialize_element(&RowObject {
                columns: &columns,
                row,
            })?;
        }
        seq.end()
    }
}

struct Values<'a>(&'a Column);

impl Serialize for Values<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(self.0.len()))?;
        for i in 0..self.0.len() {
            seq.serialize_element(&Cell(self.0, i))?;
        }
        seq.end()
    }
}

struct Columns<'a>(&'a Frame);

impl Serialize for Columns<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.num_columns()))?;
        for (name, col) in self.0.iter() {
            map.serialize_entry(name, &Values(col))?;
        }
        map.end()
    }
}

pub fn write_json_records<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &Records(frame))?;
    Ok(())
}

pub fn write_json_columns<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &Columns(frame))?;
    Ok(())
}

/// Records layout as a `String`.
pub fn to_json_records(frame: &Frame) -> Result<String> {
    Ok(serde_json::to_string(&Records(frame))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_column_order_and_null_out_non_finite() {
        let frame = Frame::new([
            ("z", Column::from_opt_f64(vec![Some(1.5), Some(f64::NAN)])),
            ("a", Column::from_opt_strs([Some("x"), None])),
        ])
        .unwrap();
        let out = to_json_records(&frame).unwrap();
        assert_eq!(out, r#"[{"z":1.5,"a":"x"},{"z":null,"a":null}]"#);

        let mut buf = Vec::new();
        write_json_columns(&frame, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"z":[1.5,null],"a":["x",null]}"#);
    }
}
