//! Writers. Column order and row order always follow the frame.

pub mod csv;
pub mod json;
pub mod jsonl;

use serde::ser::{Serialize, SerializeMap, Serializer};

use colframe_core::{Column, ColumnData, Frame};

/// One cell as a JSON-ready value. Nulls and non-finite floats serialise as
/// `null`; enum cells as their string.
pub(crate) struct Cell<'a>(pub &'a Column, pub usize);

impl Serialize for Cell<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let Cell(col, i) = *self;
        if col.is_null(i) {
            return s.serialize_none();
        }
        match col.data() {
            ColumnData::Boolean(v) => s.serialize_bool(v[i]),
            ColumnData::Int64(v) => s.serialize_i64(v[i]),
            ColumnData::Float64(v) if v[i].is_finite() => s.serialize_f64(v[i]),
            ColumnData::Float64(_) => s.serialize_none(),
            ColumnData::Utf8(v) => s.serialize_str(v.value(i)),
            ColumnData::Enum(e) => s.serialize_str(e.value(i)),
        }
    }
}

/// Row `i` of a frame as an object, keys in `columns` order.
pub(crate) struct RowObject<'a> {
    pub columns: &'a [(&'a str, &'a Column)],
    pub row: usize,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.columns.len()))?;
        for (name, col) in self.columns {
            map.serialize_entry(name, &Cell(col, self.row))?;
        }
        map.end()
    }
}

pub(crate) fn columns_of(frame: &Frame) -> Vec<(&str, &Column)> {
    frame.iter().collect()
}
