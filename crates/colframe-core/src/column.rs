//! Typed, immutable column storage.
//!
//! Every buffer is reference counted, so cloning a `Column` or carrying an
//! untouched column into a derived frame never copies values. Nulls live in an
//! optional validity `Bitmap` (absent = no nulls); the slot under a null holds
//! the kind's default value and must not be interpreted.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::schema::DataType;
use crate::types::Scalar;

/// UTF-8 strings packed into one byte buffer plus `len + 1` offsets.
#[derive(Debug, Clone)]
pub struct Utf8Data {
    offsets: Arc<[usize]>,
    bytes: Arc<str>,
}

impl Utf8Data {
    pub fn from_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut offsets = vec![0];
        let mut bytes = String::new();
        for v in values {
            bytes.push_str(v.as_ref());
            offsets.push(bytes.len());
        }
        Self {
            offsets: offsets.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn value(&self, i: usize) -> &str {
        &self.bytes[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).map(move |i| self.value(i))
    }

    fn gather(&self, indices: impl Iterator<Item = Option<usize>>) -> Self {
        Self::from_strs(indices.map(|i| i.map_or("", |i| self.value(i))))
    }
}

/// Dictionary-encoded strings. Codes index into `dict`; the dictionary order
/// defines the value order used by comparisons and sorting.
#[derive(Debug, Clone)]
pub struct EnumData {
    codes: Arc<[u32]>,
    dict: Arc<[String]>,
}

impl EnumData {
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn dictionary(&self) -> &[String] {
        &self.dict
    }

    #[inline]
    pub fn value(&self, i: usize) -> &str {
        &self.dict[self.codes[i] as usize]
    }

    pub fn code_of(&self, value: &str) -> Option<u32> {
        self.dict.iter().position(|d| d == value).map(|p| p as u32)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum ColumnData {
    Boolean(Arc<[bool]>),
    Int64(Arc<[i64]>),
    Float64(Arc<[f64]>),
    Utf8(Utf8Data),
    Enum(EnumData),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Enum(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    data: ColumnData,
    validity: Option<Arc<Bitmap>>,
}

impl Column {
    /// Wrap typed data with an optional validity mask.
    pub fn new(data: ColumnData, validity: Option<Bitmap>) -> Result<Self> {
        if let Some(bm) = &validity {
            if bm.len() != data.len() {
                return Err(Error::InternalInvariantViolation(format!(
                    "validity mask has {} bits for {} values",
                    bm.len(),
                    data.len()
                )));
            }
        }
        Ok(Self::normalized(data, validity))
    }

    fn normalized(data: ColumnData, validity: Option<Bitmap>) -> Self {
        let validity = validity.filter(|bm| !bm.all_set()).map(Arc::new);
        Self { data, validity }
    }

    pub fn from_i64(values: Vec<i64>) -> Self {
        Self::normalized(ColumnData::Int64(values.into()), None)
    }

    pub fn from_f64(values: Vec<f64>) -> Self {
        Self::normalized(ColumnData::Float64(values.into()), None)
    }

    pub fn from_bool(values: Vec<bool>) -> Self {
        Self::normalized(ColumnData::Boolean(values.into()), None)
    }

    pub fn from_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::normalized(ColumnData::Utf8(Utf8Data::from_strs(values)), None)
    }

    pub fn from_opt_i64(values: Vec<Option<i64>>) -> Self {
        let validity = Bitmap::from_fn(values.len(), |i| values[i].is_some());
        let data = values.iter().map(|v| v.unwrap_or_default()).collect();
        Self::normalized(ColumnData::Int64(data), Some(validity))
    }

    pub fn from_opt_f64(values: Vec<Option<f64>>) -> Self {
        let validity = Bitmap::from_fn(values.len(), |i| values[i].is_some());
        let data = values.iter().map(|v| v.unwrap_or_default()).collect();
        Self::normalized(ColumnData::Float64(data), Some(validity))
    }

    pub fn from_opt_bool(values: Vec<Option<bool>>) -> Self {
        let validity = Bitmap::from_fn(values.len(), |i| values[i].is_some());
        let data = values.iter().map(|v| v.unwrap_or_default()).collect();
        Self::normalized(ColumnData::Boolean(data), Some(validity))
    }

    pub fn from_opt_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut present = Vec::new();
        let mut offsets = vec![0];
        let mut bytes = String::new();
        for v in values {
            present.push(v.is_some());
            if let Some(s) = v {
                bytes.push_str(s.as_ref());
            }
            offsets.push(bytes.len());
        }
        let data = Utf8Data {
            offsets: offsets.into(),
            bytes: bytes.into(),
        };
        Self::normalized(ColumnData::Utf8(data), Some(Bitmap::from_bools(&present)))
    }

    /// Dictionary-encode string values.
    ///
    /// With `declared`, the dictionary (and therefore the value order) is
    /// exactly that list and every value must be a member of it. Without it,
    /// the dictionary is the sorted set of distinct values.
    pub fn enum_from_strs<I, S>(values: I, declared: Option<&[String]>) -> Result<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let values: Vec<Option<S>> = values.into_iter().collect();
        let dict: Vec<String> = match declared {
            Some(d) => d.to_vec(),
            None => {
                let mut d: Vec<String> = values
                    .iter()
                    .flatten()
                    .map(|s| s.as_ref().to_string())
                    .collect();
                d.sort();
                d.dedup();
                d
            }
        };
        if dict.len() > u32::MAX as usize {
            return Err(Error::mismatch("enum dictionary exceeds u32 codes"));
        }
        let lookup: HashMap<&str, u32> = dict
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i as u32))
            .collect();
        if lookup.len() != dict.len() {
            return Err(Error::mismatch("enum dictionary contains duplicates"));
        }

        let mut codes = Vec::with_capacity(values.len());
        for v in &values {
            match v {
                Some(s) => {
                    let code = lookup.get(s.as_ref()).copied().ok_or_else(|| {
                        Error::mismatch(format!(
                            "value '{}' is not a member of the enum dictionary",
                            s.as_ref()
                        ))
                    })?;
                    codes.push(code);
                }
                None => codes.push(0),
            }
        }
        let validity = Bitmap::from_fn(values.len(), |i| values[i].is_some());
        let data = EnumData {
            codes: codes.into(),
            dict: dict.into(),
        };
        Ok(Self::normalized(ColumnData::Enum(data), Some(validity)))
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn data_type(&self) -> DataType {
        match &self.data {
            ColumnData::Boolean(_) => DataType::Boolean,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Utf8(_) => DataType::Utf8,
            ColumnData::Enum(_) => DataType::Enum,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_deref()
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().map_or(true, |bm| bm.get(i))
    }

    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        !self.is_valid(i)
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |bm| bm.len() - bm.count_ones())
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            ColumnData::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match &self.data {
            ColumnData::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_utf8(&self) -> Option<&Utf8Data> {
        match &self.data {
            ColumnData::Utf8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumData> {
        match &self.data {
            ColumnData::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// String value of a `Utf8` or `Enum` cell, ignoring validity.
    #[inline]
    pub fn str_value(&self, i: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Utf8(v) => Some(v.value(i)),
            ColumnData::Enum(v) => Some(v.value(i)),
            _ => None,
        }
    }

    /// Cell as a `Scalar`. Enum cells come back as `Scalar::Str`.
    pub fn get(&self, i: usize) -> Scalar {
        if self.is_null(i) {
            return Scalar::Null;
        }
        match &self.data {
            ColumnData::Boolean(v) => Scalar::Bool(v[i]),
            ColumnData::Int64(v) => Scalar::I64(v[i]),
            ColumnData::Float64(v) => Scalar::F64(v[i]),
            ColumnData::Utf8(v) => Scalar::Str(v.value(i).to_string()),
            ColumnData::Enum(v) => Scalar::Str(v.value(i).to_string()),
        }
    }

    pub fn to_scalars(&self) -> Vec<Scalar> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Gather rows by index; `indices` must be in bounds.
    pub fn take(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Boolean(v) => ColumnData::Boolean(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Int64(v) => ColumnData::Int64(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float64(v) => ColumnData::Float64(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Utf8(v) => ColumnData::Utf8(v.gather(indices.iter().map(|&i| Some(i)))),
            ColumnData::Enum(v) => ColumnData::Enum(EnumData {
                codes: indices.iter().map(|&i| v.codes[i]).collect(),
                dict: Arc::clone(&v.dict),
            }),
        };
        let validity = self
            .validity
            .as_ref()
            .map(|bm| Bitmap::from_fn(indices.len(), |k| bm.get(indices[k])));
        Self::normalized(data, validity)
    }

    /// Gather rows by index, producing a null wherever the index is `None`.
    pub fn take_opt(&self, indices: &[Option<usize>]) -> Column {
        let data = match &self.data {
            ColumnData::Boolean(v) => {
                ColumnData::Boolean(indices.iter().map(|i| i.map_or(false, |i| v[i])).collect())
            }
            ColumnData::Int64(v) => {
                ColumnData::Int64(indices.iter().map(|i| i.map_or(0, |i| v[i])).collect())
            }
            ColumnData::Float64(v) => {
                ColumnData::Float64(indices.iter().map(|i| i.map_or(0.0, |i| v[i])).collect())
            }
            ColumnData::Utf8(v) => ColumnData::Utf8(v.gather(indices.iter().copied())),
            ColumnData::Enum(v) => ColumnData::Enum(EnumData {
                codes: indices.iter().map(|i| i.map_or(0, |i| v.codes[i])).collect(),
                dict: Arc::clone(&v.dict),
            }),
        };
        let validity = Bitmap::from_fn(indices.len(), |k| {
            indices[k].map_or(false, |i| self.is_valid(i))
        });
        Self::normalized(data, Some(validity))
    }

    /// Keep the rows whose mask bit is set, in order.
    pub fn filter(&self, mask: &Bitmap) -> Column {
        self.take(&mask.to_indices())
    }

    /// Rows `start..end`, clamped to the column length.
    pub fn slice(&self, start: usize, end: usize) -> Column {
        let end = end.min(self.len());
        let start = start.min(end);
        let indices: Vec<usize> = (start..end).collect();
        self.take(&indices)
    }
}

/// Logical equality: same type, same length, same cells (enums compare by value).
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.data_type() == other.data_type()
            && self.len() == other.len()
            && (0..self.len()).all(|i| self.get(i) == other.get(i))
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::from_i64(v)
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::from_f64(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::from_bool(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::from_strs(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::from_strs(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_keeps_nulls_and_shares_dictionary() {
        let col = Column::enum_from_strs(vec![Some("b"), None, Some("a")], None).unwrap();
        let taken = col.take(&[2, 1, 0]);
        assert_eq!(
            taken.to_scalars(),
            vec![Scalar::from("a"), Scalar::Null, Scalar::from("b")]
        );
        assert_eq!(taken.as_enum().unwrap().dictionary(), &["a", "b"]);
    }

    #[test]
    fn all_valid_mask_is_dropped() {
        let col = Column::from_opt_i64(vec![Some(1), Some(2)]);
        assert!(col.validity().is_none());
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn declared_enum_rejects_strangers() {
        let declared = vec!["low".to_string(), "high".to_string()];
        let err = Column::enum_from_strs(vec![Some("mid")], Some(&declared)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn utf8_take_opt_nulls_out_missing() {
        let col = Column::from_strs(["x", "yy"]);
        let out = col.take_opt(&[Some(1), None]);
        assert_eq!(out.get(0), Scalar::from("yy"));
        assert!(out.is_null(1));
    }
}
