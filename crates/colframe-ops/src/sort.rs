//! Sort engine: stable multi-key ordering.
//!
//! Each `Order` is resolved once into a typed row comparator; the keys are
//! chained into a single comparator over row indices and fed to a stable
//! merge sort, so the cost is O(n log n) comparisons however many keys there
//! are, and rows equal under every key keep their original order. The
//! resulting permutation is applied to every column of the frame.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use colframe_core::column::ColumnData;
use colframe_core::prelude::{Bitmap, Column, Error, Frame, Result};

use crate::traits::Operator;

/// Caller-supplied value ordering, typed by the column kind it accepts.
/// `Str` is accepted by both `Utf8` and `Enum` columns.
#[derive(Clone)]
pub enum CustomOrdering {
    Int(Arc<dyn Fn(i64, i64) -> Ordering + Send + Sync>),
    Float(Arc<dyn Fn(f64, f64) -> Ordering + Send + Sync>),
    Str(Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>),
    Bool(Arc<dyn Fn(bool, bool) -> Ordering + Send + Sync>),
}

impl CustomOrdering {
    pub fn int(f: impl Fn(i64, i64) -> Ordering + Send + Sync + 'static) -> Self {
        CustomOrdering::Int(Arc::new(f))
    }

    pub fn float(f: impl Fn(f64, f64) -> Ordering + Send + Sync + 'static) -> Self {
        CustomOrdering::Float(Arc::new(f))
    }

    pub fn str(f: impl Fn(&str, &str) -> Ordering + Send + Sync + 'static) -> Self {
        CustomOrdering::Str(Arc::new(f))
    }

    pub fn bool(f: impl Fn(bool, bool) -> Ordering + Send + Sync + 'static) -> Self {
        CustomOrdering::Bool(Arc::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            CustomOrdering::Int(_) => "int",
            CustomOrdering::Float(_) => "float",
            CustomOrdering::Str(_) => "string",
            CustomOrdering::Bool(_) => "bool",
        }
    }
}

impl fmt::Debug for CustomOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomOrdering({})", self.kind())
    }
}

/// One sort key.
///
/// Natural orders: numeric for ints, IEEE total order for floats,
/// byte-lexicographic for strings, dictionary order for enums,
/// `false < true`. `descending` reverses the value order only; nulls go first
/// unless `nulls_last` is set, whatever the direction.
#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub descending: bool,
    pub nulls_last: bool,
    pub comparator: Option<CustomOrdering>,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
            nulls_last: false,
            comparator: None,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            descending: true,
            ..Self::asc(column)
        }
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }

    pub fn with_comparator(mut self, comparator: CustomOrdering) -> Self {
        self.comparator = Some(comparator);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// The stable permutation of row indices for `input`, without applying it.
    pub fn permutation(&self, input: &Frame) -> Result<Vec<usize>> {
        let plan = self.plan(input)?;
        Ok(plan.permutation(input.len()))
    }
}

pub(crate) type RowCmp = Box<dyn Fn(usize, usize) -> Ordering + Send + Sync>;

struct SortKey {
    validity: Option<Bitmap>,
    descending: bool,
    nulls_last: bool,
    cmp: RowCmp,
}

impl SortKey {
    #[inline]
    fn compare(&self, a: usize, b: usize) -> Ordering {
        if let Some(valid) = &self.validity {
            match (valid.get(a), valid.get(b)) {
                (true, true) => {}
                (false, false) => return Ordering::Equal,
                (false, true) if self.nulls_last => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                (true, false) if self.nulls_last => return Ordering::Less,
                (true, false) => return Ordering::Greater,
            }
        }
        let o = (self.cmp)(a, b);
        if self.descending {
            o.reverse()
        } else {
            o
        }
    }
}

/// Sort keys resolved against one frame.
pub struct SortPlan(Vec<SortKey>);

impl SortPlan {
    fn permutation(&self, len: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..len).collect();
        // slice::sort_by is stable: full-key ties keep their input order.
        perm.sort_by(|&a, &b| {
            self.0
                .iter()
                .map(|k| k.compare(a, b))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        perm
    }
}

impl Operator for Sort {
    type Plan = SortPlan;

    fn name(&self) -> &'static str {
        "sort"
    }

    fn plan(&self, input: &Frame) -> Result<SortPlan> {
        let mut keys = Vec::with_capacity(self.orders.len());
        for order in &self.orders {
            let column = input.column(&order.column)?;
            keys.push(SortKey {
                validity: column.validity().cloned(),
                descending: order.descending,
                nulls_last: order.nulls_last,
                cmp: row_comparator(column, order.comparator.as_ref(), &order.column)?,
            });
        }
        Ok(SortPlan(keys))
    }

    fn execute(&self, plan: SortPlan, input: &Frame) -> Result<Frame> {
        if plan.0.is_empty() {
            return Ok(input.clone());
        }
        let perm = plan.permutation(input.len());
        input.take(&perm)
    }
}

pub(crate) fn row_comparator(
    column: &Column,
    custom: Option<&CustomOrdering>,
    name: &str,
) -> Result<RowCmp> {
    Ok(match (custom, column.data().clone()) {
        (None, ColumnData::Int64(v)) => Box::new(move |a, b| v[a].cmp(&v[b])),
        (None, ColumnData::Float64(v)) => Box::new(move |a, b| v[a].total_cmp(&v[b])),
        (None, ColumnData::Boolean(v)) => Box::new(move |a, b| v[a].cmp(&v[b])),
        (None, ColumnData::Utf8(v)) => Box::new(move |a, b| v.value(a).cmp(v.value(b))),
        (None, ColumnData::Enum(e)) => Box::new(move |a, b| e.codes()[a].cmp(&e.codes()[b])),
        (Some(CustomOrdering::Int(f)), ColumnData::Int64(v)) => {
            let f = Arc::clone(f);
            Box::new(move |a, b| f(v[a], v[b]))
        }
        (Some(CustomOrdering::Float(f)), ColumnData::Float64(v)) => {
            let f = Arc::clone(f);
            Box::new(move |a, b| f(v[a], v[b]))
        }
        (Some(CustomOrdering::Bool(f)), ColumnData::Boolean(v)) => {
            let f = Arc::clone(f);
            Box::new(move |a, b| f(v[a], v[b]))
        }
        (Some(CustomOrdering::Str(f)), ColumnData::Utf8(v)) => {
            let f = Arc::clone(f);
            Box::new(move |a, b| f(v.value(a), v.value(b)))
        }
        (Some(CustomOrdering::Str(f)), ColumnData::Enum(e)) => {
            let f = Arc::clone(f);
            Box::new(move |a, b| f(e.value(a), e.value(b)))
        }
        (Some(c), _) => {
            return Err(Error::TypeMismatch(format!(
                "{} comparator cannot order {} column '{name}'",
                c.kind(),
                column.data_type()
            )));
        }
    })
}

