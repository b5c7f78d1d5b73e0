//! `Frame`: an ordered set of named, equal-length columns.
//!
//! Frames are immutable. Every operation returns a new frame; columns that an
//! operation does not touch are carried over by handle, not copied.

use std::collections::HashSet;
use std::fmt;

use crate::bitmap::Bitmap;
use crate::column::Column;
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::types::Scalar;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
    len: usize,
}

impl Frame {
    /// Build a frame, checking that names are unique and lengths agree.
    pub fn new<S, I>(columns: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Column)>,
    {
        let mut names = Vec::new();
        let mut cols = Vec::new();
        let mut seen = HashSet::new();
        for (name, col) in columns {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateColumn(name));
            }
            names.push(name);
            cols.push(col);
        }

        let len = cols.first().map(|c| c.len()).unwrap_or(0);
        for (name, col) in names.iter().zip(&cols) {
            if col.len() != len {
                return Err(Error::InternalInvariantViolation(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    col.len(),
                    len
                )));
            }
        }

        Ok(Self {
            names,
            columns: cols,
            len,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame of `len` rows and no columns.
    pub fn with_rows(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.names
                .iter()
                .zip(&self.columns)
                .map(|(n, c)| Field::new(n.clone(), c.data_type(), c.null_count() > 0))
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index_of(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// `(name, column)` pairs in frame order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Keep only `names`, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Frame> {
        let mut picked = Vec::with_capacity(names.len());
        for name in names {
            picked.push((*name, self.column(name)?.clone()));
        }
        let mut out = Frame::new(picked)?;
        out.len = self.len;
        Ok(out)
    }

    pub fn drop(&self, names: &[&str]) -> Result<Frame> {
        for name in names {
            self.column(name)?;
        }
        let kept = self
            .iter()
            .filter(|(n, _)| !names.contains(n))
            .map(|(n, c)| (n, c.clone()));
        let mut out = Frame::new(kept)?;
        out.len = self.len;
        Ok(out)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<Frame> {
        let idx = self
            .index_of(from)
            .ok_or_else(|| Error::UnknownColumn(from.to_string()))?;
        if from != to && self.contains(to) {
            return Err(Error::DuplicateColumn(to.to_string()));
        }
        let mut out = self.clone();
        out.names[idx] = to.to_string();
        Ok(out)
    }

    /// Append `column` under `name`, or replace the column already there
    /// (keeping its position). Only the empty frame takes its row count from
    /// the new column.
    pub fn with_column(&self, name: &str, column: Column) -> Result<Frame> {
        let unsized_frame = self.columns.is_empty() && self.len == 0;
        if !unsized_frame && column.len() != self.len {
            return Err(Error::InternalInvariantViolation(format!(
                "column '{}' has {} rows, frame has {}",
                name,
                column.len(),
                self.len
            )));
        }
        let mut out = self.clone();
        out.len = column.len();
        match self.index_of(name) {
            Some(i) => out.columns[i] = column,
            None => {
                out.names.push(name.to_string());
                out.columns.push(column);
            }
        }
        Ok(out)
    }

    /// Gather rows by index. Indices may repeat or reorder rows.
    pub fn take(&self, indices: &[usize]) -> Result<Frame> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len) {
            return Err(Error::OutOfBounds {
                index: bad,
                len: self.len,
            });
        }
        Ok(self.map_columns(indices.len(), |c| c.take(indices)))
    }

    /// Keep rows whose mask bit is set, preserving order.
    pub fn filter_mask(&self, mask: &Bitmap) -> Result<Frame> {
        if mask.len() != self.len {
            return Err(Error::InternalInvariantViolation(format!(
                "mask has {} bits, frame has {} rows",
                mask.len(),
                self.len
            )));
        }
        if mask.all_set() {
            return Ok(self.clone());
        }
        let indices = mask.to_indices();
        Ok(self.map_columns(indices.len(), |c| c.take(&indices)))
    }

    /// Rows `start..end`, clamped to the frame.
    pub fn slice(&self, start: usize, end: usize) -> Frame {
        let end = end.min(self.len);
        let start = start.min(end);
        self.map_columns(end - start, |c| c.slice(start, end))
    }

    pub fn head(&self, n: usize) -> Frame {
        self.slice(0, n)
    }

    pub fn row(&self, i: usize) -> Result<Vec<Scalar>> {
        if i >= self.len {
            return Err(Error::OutOfBounds {
                index: i,
                len: self.len,
            });
        }
        Ok(self.columns.iter().map(|c| c.get(i)).collect())
    }

    fn map_columns(&self, len: usize, f: impl Fn(&Column) -> Column) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(f).collect(),
            len,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.names.join("\t"))?;
        for r in 0..self.len {
            let cells: Vec<String> = self.columns.iter().map(|c| c.get(r).to_string()).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        write!(f, "[{} rows x {} columns]", self.len, self.columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(vec![
            ("id", Column::from_i64(vec![1, 2, 3])),
            ("x", Column::from_f64(vec![5.0, 30.0, 5.0])),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Frame::new(vec![
            ("a", Column::from_i64(vec![1, 2])),
            ("b", Column::from_i64(vec![1])),
        ])
        .unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Frame::new(vec![
            ("a", Column::from_i64(vec![1])),
            ("a", Column::from_i64(vec![2])),
        ])
        .unwrap_err();
        assert_eq!(err, Error::DuplicateColumn("a".into()));
    }

    #[test]
    fn with_column_replaces_in_place() {
        let f = sample()
            .with_column("id", Column::from_strs(["a", "b", "c"]))
            .unwrap();
        assert_eq!(f.column_names(), vec!["id", "x"]);
        assert_eq!(f.row(0).unwrap(), vec![Scalar::from("a"), Scalar::F64(5.0)]);
    }

    #[test]
    fn select_keeps_row_count_with_no_columns() {
        let f = sample().select(&[]).unwrap();
        assert_eq!(f.len(), 3);
        assert_eq!(f.num_columns(), 0);
    }

    #[test]
    fn with_column_checks_rows_of_column_less_frame() {
        let f = sample().select(&[]).unwrap();
        let err = f.with_column("y", Column::from_i64(vec![1])).unwrap_err();
        assert!(err.is_invariant_violation());
        let f = f.with_column("y", Column::from_i64(vec![1, 2, 3])).unwrap();
        assert_eq!(f.len(), 3);

        let f = Frame::empty().with_column("y", Column::from_i64(vec![1, 2])).unwrap();
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn take_checks_bounds() {
        assert_eq!(
            sample().take(&[0, 3]).unwrap_err(),
            Error::OutOfBounds { index: 3, len: 3 }
        );
    }
}
