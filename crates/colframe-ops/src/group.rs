//! GroupBy/Aggregate engine.
//!
//! `group_by` makes one pass over the rows, mapping each canonicalised key
//! tuple to a group id through a `HashMap` that lives only for that call. What
//! survives is the list of member rows per group, in order of first
//! appearance. `aggregate` then reduces each source column group by group.
//!
//! Null is an ordinary key value: every null in a key column lands in the same
//! group rather than being dropped.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use colframe_core::column::ColumnData;
use colframe_core::prelude::{Column, DataType, Error, Frame, Result};

use crate::sort::row_comparator;
use crate::trace;
use crate::traits::Operator;

/// Canonical, hashable form of one key cell. `-0.0` folds into `0.0` and all
/// NaNs into one value so equal-looking floats share a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyPart<'a> {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(&'a str),
    Code(u32),
}

impl<'a> KeyPart<'a> {
    #[inline]
    fn of(col: &'a Column, row: usize) -> KeyPart<'a> {
        if col.is_null(row) {
            return KeyPart::Null;
        }
        match col.data() {
            ColumnData::Int64(v) => KeyPart::Int(v[row]),
            ColumnData::Float64(v) => KeyPart::Float(canonical_bits(v[row])),
            ColumnData::Boolean(v) => KeyPart::Bool(v[row]),
            ColumnData::Utf8(v) => KeyPart::Str(v.value(row)),
            ColumnData::Enum(e) => KeyPart::Code(e.codes()[row]),
        }
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Caller-supplied reduction over the non-null values of one group.
#[derive(Clone)]
pub enum CustomReducer {
    Int(Arc<dyn Fn(&[i64]) -> i64 + Send + Sync>),
    Float(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
    Str(Arc<dyn Fn(&[&str]) -> String + Send + Sync>),
    Bool(Arc<dyn Fn(&[bool]) -> bool + Send + Sync>),
}

impl CustomReducer {
    pub fn int(f: impl Fn(&[i64]) -> i64 + Send + Sync + 'static) -> Self {
        CustomReducer::Int(Arc::new(f))
    }

    pub fn float(f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        CustomReducer::Float(Arc::new(f))
    }

    pub fn str(f: impl Fn(&[&str]) -> String + Send + Sync + 'static) -> Self {
        CustomReducer::Str(Arc::new(f))
    }

    pub fn bool(f: impl Fn(&[bool]) -> bool + Send + Sync + 'static) -> Self {
        CustomReducer::Bool(Arc::new(f))
    }

    fn accepts(&self, dt: DataType) -> bool {
        matches!(
            (self, dt),
            (CustomReducer::Int(_), DataType::Int64)
                | (CustomReducer::Float(_), DataType::Float64)
                | (CustomReducer::Str(_), DataType::Utf8 | DataType::Enum)
                | (CustomReducer::Bool(_), DataType::Boolean)
        )
    }
}

impl fmt::Debug for CustomReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            CustomReducer::Int(_) => "int",
            CustomReducer::Float(_) => "float",
            CustomReducer::Str(_) => "string",
            CustomReducer::Bool(_) => "bool",
        };
        write!(f, "CustomReducer({kind})")
    }
}

/// Reducers skip nulls. On a group without non-null values, `Sum` gives 0,
/// `Count`/`CountDistinct` give 0, `Mean`/`Min`/`Max`/`First`/`Last` give
/// null, and `Custom` fails with `EmptyGroupReduction`.
#[derive(Debug, Clone)]
pub enum Reducer {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    CountDistinct,
    First,
    Last,
    Custom(CustomReducer),
}

impl Reducer {
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Count => "count",
            Reducer::CountDistinct => "count_distinct",
            Reducer::First => "first",
            Reducer::Last => "last",
            Reducer::Custom(_) => "custom",
        }
    }

    fn accepts(&self, dt: DataType) -> bool {
        match self {
            Reducer::Sum | Reducer::Mean => dt.is_numeric(),
            Reducer::Custom(c) => c.accepts(dt),
            _ => true,
        }
    }
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "sum" => Reducer::Sum,
            "mean" | "avg" => Reducer::Mean,
            "min" => Reducer::Min,
            "max" => Reducer::Max,
            "count" => Reducer::Count,
            "count_distinct" => Reducer::CountDistinct,
            "first" => Reducer::First,
            "last" => Reducer::Last,
            other => {
                return Err(Error::TypeMismatch(format!("unknown reducer '{other}'")));
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub column: String,
    pub reducer: Reducer,
    /// Output column name; defaults to `column`.
    pub alias: Option<String>,
}

impl Aggregation {
    pub fn new(column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            column: column.into(),
            reducer,
            alias: None,
        }
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Sum)
    }

    pub fn mean(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Mean)
    }

    pub fn min(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Min)
    }

    pub fn max(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Max)
    }

    pub fn count(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Count)
    }

    pub fn count_distinct(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::CountDistinct)
    }

    pub fn first(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::First)
    }

    pub fn last(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Last)
    }

    pub fn custom(column: impl Into<String>, reducer: CustomReducer) -> Self {
        Self::new(column, Reducer::Custom(reducer))
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias = Some(name.into());
        self
    }

    pub fn destination(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

/// Rows of `frame` partitioned by key tuple.
#[derive(Debug)]
pub struct Grouper<'a> {
    frame: &'a Frame,
    keys: Vec<String>,
    groups: Vec<Vec<usize>>,
}

/// Build the group index for `keys`. With no keys the whole frame is one
/// group, even when it has no rows.
pub fn group_by<'a>(frame: &'a Frame, keys: &[&str]) -> Result<Grouper<'a>> {
    let mut cols = Vec::with_capacity(keys.len());
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(*key) {
            return Err(Error::DuplicateColumn(key.to_string()));
        }
        cols.push(frame.column(key)?);
    }

    let groups = if cols.is_empty() {
        vec![(0..frame.len()).collect()]
    } else {
        let mut index: HashMap<Vec<KeyPart<'_>>, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in 0..frame.len() {
            let key: Vec<KeyPart<'_>> = cols.iter().map(|c| KeyPart::of(c, row)).collect();
            match index.entry(key) {
                Entry::Occupied(e) => groups[*e.get()].push(row),
                Entry::Vacant(e) => {
                    e.insert(groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        groups
    };
    trace::groups_built(keys.len(), frame.len(), groups.len());

    Ok(Grouper {
        frame,
        keys: keys.iter().map(|k| k.to_string()).collect(),
        groups,
    })
}

struct ResolvedAgg {
    dest: String,
    column: Column,
    source: String,
    reducer: Reducer,
}

fn resolve(frame: &Frame, keys: &[String], aggs: &[Aggregation]) -> Result<Vec<ResolvedAgg>> {
    let mut names: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let mut out = Vec::with_capacity(aggs.len());
    for agg in aggs {
        let column = frame.column(&agg.column)?;
        if !agg.reducer.accepts(column.data_type()) {
            return Err(Error::TypeMismatch(format!(
                "reducer '{}' is not defined for {} column '{}'",
                agg.reducer.name(),
                column.data_type(),
                agg.column
            )));
        }
        if !names.insert(agg.destination()) {
            return Err(Error::DuplicateColumn(agg.destination().to_string()));
        }
        out.push(ResolvedAgg {
            dest: agg.destination().to_string(),
            column: column.clone(),
            source: agg.column.clone(),
            reducer: agg.reducer.clone(),
        });
    }
    Ok(out)
}

impl<'a> Grouper<'a> {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Member row indices of each group, ascending within a group.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// One row per group: the key columns followed by one column per
    /// aggregation, in request order.
    pub fn aggregate(&self, aggregations: &[Aggregation]) -> Result<Frame> {
        let resolved = resolve(self.frame, &self.keys, aggregations)?;
        self.reduce_all(resolved)
    }

    /// Key columns plus the number of rows in each group.
    pub fn count(&self, dest: &str) -> Result<Frame> {
        if self.keys.iter().any(|k| k == dest) {
            return Err(Error::DuplicateColumn(dest.to_string()));
        }
        let sizes = self.groups.iter().map(|g| g.len() as i64).collect();
        let mut columns = self.key_columns()?;
        columns.push((dest.to_string(), Column::from_i64(sizes)));
        Frame::new(columns)
    }

    fn key_columns(&self) -> Result<Vec<(String, Column)>> {
        let firsts: Vec<Option<usize>> = self.groups.iter().map(|g| g.first().copied()).collect();
        self.keys
            .iter()
            .map(|k| Ok((k.clone(), self.frame.column(k)?.take_opt(&firsts))))
            .collect()
    }

    fn reduce_all(&self, resolved: Vec<ResolvedAgg>) -> Result<Frame> {
        let mut columns = self.key_columns()?;
        for agg in resolved {
            let col = reduce(&agg, &self.groups)?;
            columns.push((agg.dest, col));
        }
        if columns.is_empty() {
            return Ok(Frame::with_rows(self.groups.len()));
        }
        Frame::new(columns)
    }
}

fn reduce(agg: &ResolvedAgg, groups: &[Vec<usize>]) -> Result<Column> {
    let col = &agg.column;
    let valid_rows = |g: &[usize]| -> Vec<usize> {
        g.iter().copied().filter(|&r| col.is_valid(r)).collect()
    };

    Ok(match &agg.reducer {
        Reducer::Count => Column::from_i64(
            groups
                .iter()
                .map(|g| g.iter().filter(|&&r| col.is_valid(r)).count() as i64)
                .collect(),
        ),
        Reducer::CountDistinct => Column::from_i64(
            groups
                .iter()
                .map(|g| {
                    g.iter()
                        .filter(|&&r| col.is_valid(r))
                        .map(|&r| KeyPart::of(col, r))
                        .collect::<HashSet<_>>()
                        .len() as i64
                })
                .collect(),
        ),
        Reducer::First => {
            let picks: Vec<Option<usize>> = groups
                .iter()
                .map(|g| g.iter().copied().find(|&r| col.is_valid(r)))
                .collect();
            col.take_opt(&picks)
        }
        Reducer::Last => {
            let picks: Vec<Option<usize>> = groups
                .iter()
                .map(|g| g.iter().copied().rev().find(|&r| col.is_valid(r)))
                .collect();
            col.take_opt(&picks)
        }
        Reducer::Min | Reducer::Max => {
            let cmp = row_comparator(col, None, &agg.source)?;
            let is_min = matches!(agg.reducer, Reducer::Min);
            let picks: Vec<Option<usize>> = groups
                .iter()
                .map(|g| {
                    let rows = g.iter().copied().filter(|&r| col.is_valid(r));
                    if is_min {
                        rows.min_by(|&a, &b| cmp(a, b))
                    } else {
                        rows.max_by(|&a, &b| cmp(a, b))
                    }
                })
                .collect();
            col.take_opt(&picks)
        }
        Reducer::Sum => match col.data() {
            ColumnData::Int64(v) => Column::from_i64(
                groups
                    .iter()
                    .map(|g| {
                        valid_rows(g)
                            .into_iter()
                            .fold(0i64, |acc, r| acc.wrapping_add(v[r]))
                    })
                    .collect(),
            ),
            ColumnData::Float64(v) => Column::from_f64(
                groups
                    .iter()
                    .map(|g| valid_rows(g).into_iter().map(|r| v[r]).sum())
                    .collect(),
            ),
            _ => return Err(unsupported(agg)),
        },
        Reducer::Mean => {
            let value: Box<dyn Fn(usize) -> f64 + '_> = match col.data() {
                ColumnData::Int64(v) => Box::new(move |r| v[r] as f64),
                ColumnData::Float64(v) => Box::new(move |r| v[r]),
                _ => return Err(unsupported(agg)),
            };
            Column::from_opt_f64(
                groups
                    .iter()
                    .map(|g| {
                        let rows = valid_rows(g);
                        if rows.is_empty() {
                            None
                        } else {
                            let sum: f64 = rows.iter().map(|&r| value(r)).sum();
                            Some(sum / rows.len() as f64)
                        }
                    })
                    .collect(),
            )
        }
        Reducer::Custom(custom) => reduce_custom(agg, custom, groups)?,
    })
}

fn reduce_custom(
    agg: &ResolvedAgg,
    custom: &CustomReducer,
    groups: &[Vec<usize>],
) -> Result<Column> {
    let col = &agg.column;
    let empty = || Error::EmptyGroupReduction {
        column: agg.source.clone(),
        reducer: agg.reducer.name().to_string(),
    };

    // Gather each group's non-null values and hand them to `f`.
    fn each_group<T, R>(
        groups: &[Vec<usize>],
        col: &Column,
        value: impl Fn(usize) -> T,
        f: impl Fn(&[T]) -> R,
        empty: &dyn Fn() -> Error,
    ) -> Result<Vec<R>> {
        let mut buf = Vec::new();
        groups
            .iter()
            .map(|g| {
                buf.clear();
                buf.extend(g.iter().copied().filter(|&r| col.is_valid(r)).map(&value));
                if buf.is_empty() {
                    Err(empty())
                } else {
                    Ok(f(&buf))
                }
            })
            .collect()
    }

    Ok(match (custom, col.data()) {
        (CustomReducer::Int(f), ColumnData::Int64(v)) => {
            Column::from_i64(each_group(groups, col, |r| v[r], |xs| f(xs), &empty)?)
        }
        (CustomReducer::Float(f), ColumnData::Float64(v)) => {
            Column::from_f64(each_group(groups, col, |r| v[r], |xs| f(xs), &empty)?)
        }
        (CustomReducer::Bool(f), ColumnData::Boolean(v)) => {
            Column::from_bool(each_group(groups, col, |r| v[r], |xs| f(xs), &empty)?)
        }
        (CustomReducer::Str(f), ColumnData::Utf8(_) | ColumnData::Enum(_)) => {
            let value = |r: usize| col.str_value(r).unwrap_or("");
            Column::from_strs(each_group(groups, col, value, |xs| f(xs), &empty)?)
        }
        _ => return Err(unsupported(agg)),
    })
}

fn unsupported(agg: &ResolvedAgg) -> Error {
    Error::TypeMismatch(format!(
        "reducer '{}' is not defined for {} column '{}'",
        agg.reducer.name(),
        agg.column.data_type(),
        agg.source
    ))
}

/// Group-by plus aggregation as a single operator.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub keys: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

/// Aggregations resolved against one frame.
pub struct AggregatePlan(Vec<ResolvedAgg>);

impl Operator for Aggregate {
    type Plan = AggregatePlan;

    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn plan(&self, input: &Frame) -> Result<AggregatePlan> {
        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(key.as_str()) {
                return Err(Error::DuplicateColumn(key.clone()));
            }
            input.column(key)?;
        }
        resolve(input, &self.keys, &self.aggregations).map(AggregatePlan)
    }

    fn execute(&self, plan: AggregatePlan, input: &Frame) -> Result<Frame> {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        group_by(input, &keys)?.reduce_all(plan.0)
    }
}

/// Unique rows of `frame`, in order of first appearance.
pub fn distinct(frame: &Frame) -> Result<Frame> {
    if frame.is_empty() {
        return Ok(frame.clone());
    }
    let names = frame.column_names();
    group_by(frame, &names)?.aggregate(&[])
}
