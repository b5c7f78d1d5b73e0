//! Predicate engine: typed filter trees evaluated into row masks.
//!
//! A tree is compiled against the input frame first (columns resolved,
//! literals checked against column types, patterns compiled, `in` sets
//! built); only then is any row scanned. Each leaf produces one `Bitmap` over
//! the whole column and `And`/`Or`/`Not` combine masks word-wise. The final
//! mask selects rows in their original order.
//!
//! Null cells never satisfy a comparator other than `IsNull`, so `Not` of a
//! comparison includes the null rows.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use colframe_core::column::ColumnData;
use colframe_core::prelude::{Bitmap, Column, DataType, Error, Frame, Result, Scalar};
use serde::{Deserialize, Serialize};

use crate::pattern::Matcher;
use crate::traits::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Case-sensitive pattern match.
    Like,
    /// Case-insensitive pattern match.
    ILike,
    /// Set membership against a literal list.
    In,
    IsNull,
    IsNotNull,
}

impl Comparator {
    fn cmp_op(self) -> Option<CmpOp> {
        match self {
            Comparator::Eq => Some(CmpOp::Eq),
            Comparator::Ne => Some(CmpOp::Ne),
            Comparator::Lt => Some(CmpOp::Lt),
            Comparator::Le => Some(CmpOp::Le),
            Comparator::Gt => Some(CmpOp::Gt),
            Comparator::Ge => Some(CmpOp::Ge),
            _ => None,
        }
    }
}

impl FromStr for Comparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "=" | "==" => Comparator::Eq,
            "!=" | "<>" => Comparator::Ne,
            "<" => Comparator::Lt,
            "<=" => Comparator::Le,
            ">" => Comparator::Gt,
            ">=" => Comparator::Ge,
            "like" => Comparator::Like,
            "ilike" => Comparator::ILike,
            "in" => Comparator::In,
            "isnull" => Comparator::IsNull,
            "isnotnull" => Comparator::IsNotNull,
            other => {
                return Err(Error::TypeMismatch(format!("unknown comparator '{other}'")));
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[inline]
    fn test<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

/// Right-hand side of a comparison leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// For `IsNull` / `IsNotNull`.
    None,
    Value(Scalar),
    /// Candidates for `In`. Null candidates never match.
    List(Vec<Scalar>),
    /// Compare against another column of the same frame, row by row.
    Column(String),
}

/// Caller-supplied cell test, typed by the column kind it accepts.
/// `Str` is accepted by both `Utf8` and `Enum` columns.
#[derive(Clone)]
pub enum CustomPredicate {
    Int(Arc<dyn Fn(i64) -> bool + Send + Sync>),
    Float(Arc<dyn Fn(f64) -> bool + Send + Sync>),
    Str(Arc<dyn Fn(&str) -> bool + Send + Sync>),
    Bool(Arc<dyn Fn(bool) -> bool + Send + Sync>),
}

impl CustomPredicate {
    pub fn int(f: impl Fn(i64) -> bool + Send + Sync + 'static) -> Self {
        CustomPredicate::Int(Arc::new(f))
    }

    pub fn float(f: impl Fn(f64) -> bool + Send + Sync + 'static) -> Self {
        CustomPredicate::Float(Arc::new(f))
    }

    pub fn str(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        CustomPredicate::Str(Arc::new(f))
    }

    pub fn bool(f: impl Fn(bool) -> bool + Send + Sync + 'static) -> Self {
        CustomPredicate::Bool(Arc::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            CustomPredicate::Int(_) => "int",
            CustomPredicate::Float(_) => "float",
            CustomPredicate::Str(_) => "string",
            CustomPredicate::Bool(_) => "bool",
        }
    }

    fn accepts(&self, dt: DataType) -> bool {
        matches!(
            (self, dt),
            (CustomPredicate::Int(_), DataType::Int64)
                | (CustomPredicate::Float(_), DataType::Float64)
                | (CustomPredicate::Str(_), DataType::Utf8 | DataType::Enum)
                | (CustomPredicate::Bool(_), DataType::Boolean)
        )
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomPredicate({})", self.kind())
    }
}

#[derive(Debug, Clone)]
pub enum Test {
    Compare { comparator: Comparator, arg: Arg },
    Custom(CustomPredicate),
}

#[derive(Debug, Clone)]
pub struct Leaf {
    pub column: String,
    pub test: Test,
}

/// A filter tree. Stateless; one tree can be applied to any frame whose
/// schema fits it.
#[derive(Debug, Clone)]
pub enum Filter {
    Leaf(Leaf),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn new(column: impl Into<String>, comparator: Comparator, arg: Arg) -> Self {
        Filter::Leaf(Leaf {
            column: column.into(),
            test: Test::Compare { comparator, arg },
        })
    }

    fn literal(column: impl Into<String>, comparator: Comparator, v: impl Into<Scalar>) -> Self {
        Self::new(column, comparator, Arg::Value(v.into()))
    }

    pub fn eq(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Eq, v)
    }

    pub fn ne(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Ne, v)
    }

    pub fn lt(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Lt, v)
    }

    pub fn le(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Le, v)
    }

    pub fn gt(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Gt, v)
    }

    pub fn ge(column: impl Into<String>, v: impl Into<Scalar>) -> Self {
        Self::literal(column, Comparator::Ge, v)
    }

    pub fn like(column: impl Into<String>, pattern: &str) -> Self {
        Self::literal(column, Comparator::Like, pattern)
    }

    pub fn ilike(column: impl Into<String>, pattern: &str) -> Self {
        Self::literal(column, Comparator::ILike, pattern)
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Self::new(column, Comparator::In, Arg::List(list))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, Comparator::IsNull, Arg::None)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, Comparator::IsNotNull, Arg::None)
    }

    /// Row-wise comparison of two columns.
    pub fn columns(
        column: impl Into<String>,
        comparator: Comparator,
        other: impl Into<String>,
    ) -> Self {
        Self::new(column, comparator, Arg::Column(other.into()))
    }

    pub fn custom(column: impl Into<String>, predicate: CustomPredicate) -> Self {
        Filter::Leaf(Leaf {
            column: column.into(),
            test: Test::Custom(predicate),
        })
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    /// Row mask for `frame` without materializing the filtered frame.
    pub fn mask(&self, frame: &Frame) -> Result<Bitmap> {
        self.plan(frame)?.0.evaluate()
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

impl Operator for Filter {
    type Plan = CompiledFilter;

    fn name(&self) -> &'static str {
        "filter"
    }

    fn plan(&self, input: &Frame) -> Result<CompiledFilter> {
        compile(self, input).map(CompiledFilter)
    }

    fn execute(&self, plan: CompiledFilter, input: &Frame) -> Result<Frame> {
        let mask = plan.0.evaluate()?;
        input.filter_mask(&mask)
    }
}

/// A filter tree bound to one frame's columns.
pub struct CompiledFilter(Node);

enum Node {
    Leaf(Compiled),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

fn compile(filter: &Filter, input: &Frame) -> Result<Node> {
    Ok(match filter {
        Filter::Leaf(leaf) => Node::Leaf(compile_leaf(leaf, input)?),
        Filter::And(a, b) => Node::And(Box::new(compile(a, input)?), Box::new(compile(b, input)?)),
        Filter::Or(a, b) => Node::Or(Box::new(compile(a, input)?), Box::new(compile(b, input)?)),
        Filter::Not(a) => Node::Not(Box::new(compile(a, input)?)),
    })
}

impl Node {
    fn evaluate(&self) -> Result<Bitmap> {
        match self {
            Node::Leaf(c) => c.evaluate(),
            Node::And(a, b) => Ok(a.evaluate()?.and(&b.evaluate()?)),
            Node::Or(a, b) => Ok(a.evaluate()?.or(&b.evaluate()?)),
            Node::Not(a) => Ok(a.evaluate()?.not()),
        }
    }
}

struct Compiled {
    column: Column,
    kind: Kind,
}

enum Kind {
    Int(CmpOp, i64),
    Float(CmpOp, f64),
    Str(CmpOp, String),
    Bool(CmpOp, bool),
    /// Enum columns: one verdict per dictionary code.
    Dict(Vec<bool>),
    Match(Matcher),
    InInt(HashSet<i64>),
    InFloat(Vec<f64>),
    InStr(HashSet<String>),
    InBool([bool; 2]),
    IsNull,
    IsNotNull,
    Columns(CmpOp, Column),
    Custom(CustomPredicate),
}

fn compile_leaf(leaf: &Leaf, frame: &Frame) -> Result<Compiled> {
    let column = frame.column(&leaf.column)?.clone();
    let kind = match &leaf.test {
        Test::Custom(p) => {
            if !p.accepts(column.data_type()) {
                return Err(Error::TypeMismatch(format!(
                    "{} predicate cannot be applied to {} column '{}'",
                    p.kind(),
                    column.data_type(),
                    leaf.column
                )));
            }
            Kind::Custom(p.clone())
        }
        Test::Compare { comparator, arg } => {
            compile_compare(*comparator, arg, &column, &leaf.column, frame)?
        }
    };
    Ok(Compiled { column, kind })
}

fn compile_compare(
    comparator: Comparator,
    arg: &Arg,
    column: &Column,
    name: &str,
    frame: &Frame,
) -> Result<Kind> {
    let dt = column.data_type();
    match comparator {
        Comparator::IsNull | Comparator::IsNotNull => {
            if *arg != Arg::None {
                return Err(Error::TypeMismatch(format!(
                    "{comparator:?} on '{name}' takes no argument"
                )));
            }
            Ok(if comparator == Comparator::IsNull {
                Kind::IsNull
            } else {
                Kind::IsNotNull
            })
        }
        Comparator::Like | Comparator::ILike => {
            let Arg::Value(Scalar::Str(pattern)) = arg else {
                return Err(Error::TypeMismatch(format!(
                    "{comparator:?} on '{name}' expects a string pattern, got {arg:?}"
                )));
            };
            if !dt.is_string() {
                return Err(Error::TypeMismatch(format!(
                    "{comparator:?} is not defined for {dt} column '{name}'"
                )));
            }
            let matcher = Matcher::compile(pattern, comparator == Comparator::ILike)?;
            Ok(match column.data() {
                ColumnData::Enum(e) => {
                    Kind::Dict(e.dictionary().iter().map(|s| matcher.is_match(s)).collect())
                }
                _ => Kind::Match(matcher),
            })
        }
        Comparator::In => {
            let Arg::List(list) = arg else {
                return Err(Error::TypeMismatch(format!(
                    "In on '{name}' expects a list of candidates, got {arg:?}"
                )));
            };
            compile_in(list, column, name)
        }
        _ => {
            let op = comparator
                .cmp_op()
                .ok_or_else(|| Error::InternalInvariantViolation(format!("{comparator:?}")))?;
            match arg {
                Arg::Value(v) => compile_literal(op, v, column, name),
                Arg::Column(other) => {
                    let other_col = frame.column(other)?;
                    check_comparable(op, column, other_col, name, other)?;
                    Ok(Kind::Columns(op, other_col.clone()))
                }
                _ => Err(Error::TypeMismatch(format!(
                    "{comparator:?} on '{name}' expects a value or a column, got {arg:?}"
                ))),
            }
        }
    }
}

fn literal_mismatch(name: &str, dt: DataType, v: &Scalar) -> Error {
    Error::TypeMismatch(format!("{dt} column '{name}' cannot be compared with {v:?}"))
}

fn compile_literal(op: CmpOp, v: &Scalar, column: &Column, name: &str) -> Result<Kind> {
    let dt = column.data_type();
    Ok(match (column.data(), v) {
        (ColumnData::Int64(_), Scalar::I64(x)) => Kind::Int(op, *x),
        (ColumnData::Float64(_), Scalar::F64(x)) => Kind::Float(op, *x),
        (ColumnData::Float64(_), Scalar::I64(x)) => Kind::Float(op, *x as f64),
        (ColumnData::Utf8(_), Scalar::Str(s)) => Kind::Str(op, s.clone()),
        (ColumnData::Boolean(_), Scalar::Bool(b)) if op.is_equality() => Kind::Bool(op, *b),
        (ColumnData::Enum(e), Scalar::Str(s)) => {
            let n = e.dictionary().len();
            match e.code_of(s) {
                Some(code) => Kind::Dict((0..n as u32).map(|c| op.test(&c, &code)).collect()),
                None if op == CmpOp::Eq => Kind::Dict(vec![false; n]),
                None if op == CmpOp::Ne => Kind::Dict(vec![true; n]),
                None => {
                    return Err(Error::TypeMismatch(format!(
                        "'{s}' is not a value of enum column '{name}'; ordering needs a member"
                    )));
                }
            }
        }
        _ => return Err(literal_mismatch(name, dt, v)),
    })
}

fn compile_in(list: &[Scalar], column: &Column, name: &str) -> Result<Kind> {
    let dt = column.data_type();
    let candidates = list.iter().filter(|v| !v.is_null());
    Ok(match column.data() {
        ColumnData::Int64(_) => Kind::InInt(
            candidates
                .map(|v| v.as_i64().ok_or_else(|| literal_mismatch(name, dt, v)))
                .collect::<Result<_>>()?,
        ),
        ColumnData::Float64(_) => Kind::InFloat(
            candidates
                .map(|v| v.as_f64().ok_or_else(|| literal_mismatch(name, dt, v)))
                .collect::<Result<_>>()?,
        ),
        ColumnData::Utf8(_) => Kind::InStr(
            candidates
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| literal_mismatch(name, dt, v))
                })
                .collect::<Result<_>>()?,
        ),
        ColumnData::Enum(e) => {
            let mut verdicts = vec![false; e.dictionary().len()];
            for v in candidates {
                let s = v.as_str().ok_or_else(|| literal_mismatch(name, dt, v))?;
                if let Some(code) = e.code_of(s) {
                    verdicts[code as usize] = true;
                }
            }
            Kind::Dict(verdicts)
        }
        ColumnData::Boolean(_) => {
            let mut allowed = [false; 2];
            for v in candidates {
                let b = v.as_bool().ok_or_else(|| literal_mismatch(name, dt, v))?;
                allowed[usize::from(b)] = true;
            }
            Kind::InBool(allowed)
        }
    })
}

fn check_comparable(op: CmpOp, left: &Column, right: &Column, l: &str, r: &str) -> Result<()> {
    use DataType::*;
    let ok = match (left.data_type(), right.data_type()) {
        (Int64 | Float64, Int64 | Float64) => true,
        (Utf8, Utf8) => true,
        (Utf8, Enum) | (Enum, Utf8) | (Boolean, Boolean) => op.is_equality(),
        (Enum, Enum) => op.is_equality() || same_dictionary(left, right),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::TypeMismatch(format!(
            "cannot compare {} column '{l}' with {} column '{r}' using {op:?}",
            left.data_type(),
            right.data_type()
        )))
    }
}

fn same_dictionary(a: &Column, b: &Column) -> bool {
    match (a.as_enum(), b.as_enum()) {
        (Some(a), Some(b)) => a.dictionary() == b.dictionary(),
        _ => false,
    }
}

/// Mask of valid rows for which `f` holds.
fn valid_where(col: &Column, f: impl Fn(usize) -> bool) -> Bitmap {
    match col.validity() {
        None => Bitmap::from_fn(col.len(), f),
        Some(valid) => Bitmap::from_fn(col.len(), |i| valid.get(i) && f(i)),
    }
}

impl Compiled {
    fn evaluate(&self) -> Result<Bitmap> {
        let col = &self.column;
        Ok(match (&self.kind, col.data()) {
            (Kind::IsNull, _) => Bitmap::from_fn(col.len(), |i| col.is_null(i)),
            (Kind::IsNotNull, _) => Bitmap::from_fn(col.len(), |i| col.is_valid(i)),
            (Kind::Int(op, x), ColumnData::Int64(v)) => valid_where(col, |i| op.test(&v[i], x)),
            (Kind::Float(op, x), ColumnData::Float64(v)) => {
                valid_where(col, |i| op.test(&v[i], x))
            }
            (Kind::Str(op, x), ColumnData::Utf8(v)) => {
                valid_where(col, |i| op.test(v.value(i), x.as_str()))
            }
            (Kind::Bool(op, x), ColumnData::Boolean(v)) => {
                valid_where(col, |i| op.test(&v[i], x))
            }
            (Kind::Dict(verdicts), ColumnData::Enum(e)) => {
                let codes = e.codes();
                valid_where(col, |i| verdicts[codes[i] as usize])
            }
            (Kind::Match(m), ColumnData::Utf8(v)) => valid_where(col, |i| m.is_match(v.value(i))),
            (Kind::InInt(set), ColumnData::Int64(v)) => valid_where(col, |i| set.contains(&v[i])),
            (Kind::InFloat(set), ColumnData::Float64(v)) => {
                valid_where(col, |i| set.contains(&v[i]))
            }
            (Kind::InStr(set), ColumnData::Utf8(v)) => {
                valid_where(col, |i| set.contains(v.value(i)))
            }
            (Kind::InBool(allowed), ColumnData::Boolean(v)) => {
                valid_where(col, |i| allowed[usize::from(v[i])])
            }
            (Kind::Columns(op, other), _) => compare_columns(*op, col, other)?,
            (Kind::Custom(p), _) => custom_mask(p, col)?,
            _ => {
                return Err(Error::InternalInvariantViolation(format!(
                    "compiled predicate does not fit {} column",
                    col.data_type()
                )));
            }
        })
    }
}

fn compare_columns(op: CmpOp, l: &Column, r: &Column) -> Result<Bitmap> {
    let both = |f: &dyn Fn(usize) -> bool| {
        Bitmap::from_fn(l.len(), |i| l.is_valid(i) && r.is_valid(i) && f(i))
    };
    Ok(match (l.data(), r.data()) {
        (ColumnData::Int64(a), ColumnData::Int64(b)) => both(&|i| op.test(&a[i], &b[i])),
        (ColumnData::Int64(a), ColumnData::Float64(b)) => {
            both(&|i| op.test(&(a[i] as f64), &b[i]))
        }
        (ColumnData::Float64(a), ColumnData::Int64(b)) => {
            both(&|i| op.test(&a[i], &(b[i] as f64)))
        }
        (ColumnData::Float64(a), ColumnData::Float64(b)) => both(&|i| op.test(&a[i], &b[i])),
        (ColumnData::Boolean(a), ColumnData::Boolean(b)) => both(&|i| op.test(&a[i], &b[i])),
        (ColumnData::Enum(a), ColumnData::Enum(b)) if a.dictionary() == b.dictionary() => {
            let (ca, cb) = (a.codes(), b.codes());
            both(&|i| op.test(&ca[i], &cb[i]))
        }
        (ColumnData::Utf8(_) | ColumnData::Enum(_), ColumnData::Utf8(_) | ColumnData::Enum(_)) => {
            both(&|i| op.test(l.str_value(i).unwrap_or(""), r.str_value(i).unwrap_or("")))
        }
        _ => {
            return Err(Error::InternalInvariantViolation(format!(
                "cannot compare {} with {}",
                l.data_type(),
                r.data_type()
            )));
        }
    })
}

fn custom_mask(p: &CustomPredicate, col: &Column) -> Result<Bitmap> {
    Ok(match (p, col.data()) {
        (CustomPredicate::Int(f), ColumnData::Int64(v)) => valid_where(col, |i| f(v[i])),
        (CustomPredicate::Float(f), ColumnData::Float64(v)) => valid_where(col, |i| f(v[i])),
        (CustomPredicate::Str(f), ColumnData::Utf8(v)) => valid_where(col, |i| f(v.value(i))),
        (CustomPredicate::Str(f), ColumnData::Enum(e)) => valid_where(col, |i| f(e.value(i))),
        (CustomPredicate::Bool(f), ColumnData::Boolean(v)) => valid_where(col, |i| f(v[i])),
        _ => {
            return Err(Error::InternalInvariantViolation(format!(
                "{} predicate bound to {} column",
                p.kind(),
                col.data_type()
            )));
        }
    })
}
