//! Expression evaluator.
//!
//! An `Expr` tree is typed in full against the input frame before any row is
//! touched. Evaluation then walks the typed tree bottom-up, each node turning
//! whole input columns into one output column. Null in any operand gives null.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::ops;
use std::str::FromStr;
use std::sync::Arc;

use colframe_core::column::{ColumnData, EnumData};
use colframe_core::prelude::{Column, DataType, Error, Frame, Result, Scalar};
use serde::{Deserialize, Serialize};

use crate::traits::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
        }
    }

    fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    fn is_ordering(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    fn holds<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            BinaryOp::Eq => a == b,
            BinaryOp::Ne => a != b,
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => false,
        }
    }
}

impl FromStr for BinaryOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "=" | "==" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&" | "&&" | "and" => BinaryOp::And,
            "|" | "||" | "or" => BinaryOp::Or,
            other => return Err(Error::TypeMismatch(format!("unknown operator '{other}'"))),
        })
    }
}

/// Built-in unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryFn {
    Abs,
    Neg,
    Sqrt,
    Floor,
    Ceil,
    Round,
    Not,
    Str,
    Int,
    Float,
    Bool,
    Len,
    Upper,
    Lower,
}

impl UnaryFn {
    pub fn from_name(name: &str) -> Option<UnaryFn> {
        Some(match name {
            "abs" => UnaryFn::Abs,
            "neg" => UnaryFn::Neg,
            "sqrt" => UnaryFn::Sqrt,
            "floor" => UnaryFn::Floor,
            "ceil" => UnaryFn::Ceil,
            "round" => UnaryFn::Round,
            "not" => UnaryFn::Not,
            "str" => UnaryFn::Str,
            "int" => UnaryFn::Int,
            "float" => UnaryFn::Float,
            "bool" => UnaryFn::Bool,
            "len" => UnaryFn::Len,
            "upper" => UnaryFn::Upper,
            "lower" => UnaryFn::Lower,
            _ => return None,
        })
    }

    /// Output type for an input of type `input`, or `None` when undefined.
    fn output(self, input: DataType) -> Option<DataType> {
        use DataType::*;
        let input = value_type(input);
        match (self, input) {
            (
                UnaryFn::Abs | UnaryFn::Neg | UnaryFn::Floor | UnaryFn::Ceil | UnaryFn::Round,
                Int64 | Float64,
            ) => Some(input),
            (UnaryFn::Sqrt, Int64 | Float64) => Some(Float64),
            (UnaryFn::Not, Boolean) => Some(Boolean),
            (UnaryFn::Str, _) => Some(Utf8),
            (UnaryFn::Int, _) => Some(Int64),
            (UnaryFn::Float, _) => Some(Float64),
            (UnaryFn::Bool, _) => Some(Boolean),
            (UnaryFn::Len, Utf8) => Some(Int64),
            (UnaryFn::Upper | UnaryFn::Lower, Utf8) => Some(Utf8),
            _ => None,
        }
    }
}

/// Expression tree. `Unary` names either a built-in or a function from the
/// registry passed at evaluation time.
#[derive(Debug, Clone)]
pub enum Expr {
    Col(String),
    Lit(Scalar),
    Unary(String, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Col(name.into())
}

pub fn lit(value: impl Into<Scalar>) -> Expr {
    Expr::Lit(value.into())
}

impl Expr {
    pub fn call(name: impl Into<String>, arg: Expr) -> Expr {
        Expr::Unary(name.into(), Box::new(arg))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn abs(self) -> Expr {
        Expr::call("abs", self)
    }

    pub fn sqrt(self) -> Expr {
        Expr::call("sqrt", self)
    }

    pub fn equals(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    pub fn not_equals(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Ne, self, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        Expr::binary(BinaryOp::Ge, self, other)
    }
}

macro_rules! binary_ops {
    ($($trait:ident $method:ident => $op:ident),* $(,)?) => {
        $(
            impl ops::$trait for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binary(BinaryOp::$op, self, rhs)
                }
            }
        )*
    };
}

binary_ops! {
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => Div,
    BitAnd bitand => And,
    BitOr bitor => Or,
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::call("neg", self)
    }
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::call("not", self)
    }
}

#[derive(Clone)]
enum UserFn {
    Int(Arc<dyn Fn(i64) -> i64 + Send + Sync>),
    Float(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
    Str(Arc<dyn Fn(&str) -> String + Send + Sync>),
    Bool(Arc<dyn Fn(bool) -> bool + Send + Sync>),
}

/// Named user functions, keyed by name and input type. Built-in names cannot
/// be shadowed.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<(String, DataType), UserFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_int(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(i64) -> i64 + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert((name.into(), DataType::Int64), UserFn::Int(Arc::new(f)));
        self
    }

    pub fn register_float(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert((name.into(), DataType::Float64), UserFn::Float(Arc::new(f)));
        self
    }

    /// Also applies to `Enum` inputs; the result is `Utf8`.
    pub fn register_str(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert((name.into(), DataType::Utf8), UserFn::Str(Arc::new(f)));
        self
    }

    pub fn register_bool(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(bool) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert((name.into(), DataType::Boolean), UserFn::Bool(Arc::new(f)));
        self
    }

    pub fn contains(&self, name: &str, input: DataType) -> bool {
        self.functions.contains_key(&(name.to_string(), value_type(input)))
    }

    fn lookup(&self, name: &str, input: DataType) -> Option<&UserFn> {
        self.functions.get(&(name.to_string(), value_type(input)))
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .functions
            .keys()
            .map(|(name, ty)| format!("{name}({ty})"))
            .collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

/// Enum values take part in expressions as their strings, except under
/// `<`, `<=`, `>` and `>=`, which rank them by dictionary code.
fn value_type(t: DataType) -> DataType {
    if t == DataType::Enum {
        DataType::Utf8
    } else {
        t
    }
}

// A null literal has no type of its own; it takes the type its context needs.
type Ty = Option<DataType>;

enum Step {
    Builtin(UnaryFn),
    User(UserFn),
}

enum Node {
    Col(Column),
    Lit(Scalar),
    Unary(Step, Box<Typed>),
    Binary(BinaryOp, Box<Typed>, Box<Typed>),
    Ranked(BinaryOp, Rank, Rank),
}

/// One side of an ordering comparison over enum codes.
enum Rank {
    Codes(Column, EnumData),
    Code(u32),
}

impl Rank {
    fn column(&self) -> Option<&Column> {
        match self {
            Rank::Codes(c, _) => Some(c),
            Rank::Code(_) => None,
        }
    }

    #[inline]
    fn code(&self, i: usize) -> u32 {
        match self {
            Rank::Codes(_, e) => e.codes()[i],
            Rank::Code(c) => *c,
        }
    }
}

struct Typed {
    node: Node,
    ty: Ty,
}

fn resolve(expr: &Expr, frame: &Frame, registry: Option<&FunctionRegistry>) -> Result<Typed> {
    Ok(match expr {
        Expr::Col(name) => {
            let column = frame.column(name)?.clone();
            let ty = Some(column.data_type());
            Typed {
                node: Node::Col(column),
                ty,
            }
        }
        Expr::Lit(value) => Typed {
            ty: value.data_type(),
            node: Node::Lit(value.clone()),
        },
        Expr::Unary(name, arg) => {
            let arg = resolve(arg, frame, registry)?;
            let input = arg.ty.unwrap_or(DataType::Float64);
            let (step, ty) = match UnaryFn::from_name(name) {
                Some(f) => {
                    let out = f.output(input).ok_or_else(|| {
                        Error::TypeMismatch(format!("{name}() is not defined for {input} input"))
                    })?;
                    (Step::Builtin(f), Some(out))
                }
                None => {
                    let user = registry.and_then(|r| r.lookup(name, input)).ok_or_else(|| {
                        Error::UnknownFunction {
                            name: name.clone(),
                            data_type: input,
                        }
                    })?;
                    (Step::User(user.clone()), Some(value_type(input)))
                }
            };
            Typed {
                node: Node::Unary(step, Box::new(arg)),
                ty,
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = resolve(lhs, frame, registry)?;
            let rhs = resolve(rhs, frame, registry)?;
            let ty = binary_type(*op, lhs.ty, rhs.ty)?;
            let node = match ranked(*op, &lhs, &rhs)? {
                Some((l, r)) => Node::Ranked(*op, l, r),
                None => Node::Binary(*op, Box::new(lhs), Box::new(rhs)),
            };
            Typed { node, ty }
        }
    })
}

fn binary_type(op: BinaryOp, lhs: Ty, rhs: Ty) -> Result<Ty> {
    use DataType::*;
    let (l, r) = (lhs.map(value_type), rhs.map(value_type));
    let mismatch = || {
        let show = |t: Ty| t.map_or_else(|| "null".to_string(), |t| t.to_string());
        Error::TypeMismatch(format!(
            "operator '{}' is not defined for {} and {}",
            op.symbol(),
            show(lhs),
            show(rhs)
        ))
    };

    if op.is_arithmetic() {
        let ok = |t: DataType| t.is_numeric() || (op == BinaryOp::Add && t == Utf8);
        return match (l, r) {
            (None, None) => Ok(None),
            (Some(t), None) | (None, Some(t)) if ok(t) => Ok(Some(t)),
            (Some(Int64), Some(Int64)) => Ok(Some(Int64)),
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(Some(Float64)),
            (Some(Utf8), Some(Utf8)) if op == BinaryOp::Add => Ok(Some(Utf8)),
            _ => Err(mismatch()),
        };
    }

    if op.is_comparison() {
        return match (l, r) {
            (None, _) | (_, None) => Ok(Some(Boolean)),
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(Some(Boolean)),
            (Some(a), Some(b)) if a == b => Ok(Some(Boolean)),
            _ => Err(mismatch()),
        };
    }

    match (l, r) {
        (None | Some(Boolean), None | Some(Boolean)) => Ok(Some(Boolean)),
        _ => Err(mismatch()),
    }
}

/// Ordering comparisons with an enum operand compare dictionary codes. The
/// other side must be an enum column over the same dictionary or a string
/// literal naming a member.
fn ranked(op: BinaryOp, lhs: &Typed, rhs: &Typed) -> Result<Option<(Rank, Rank)>> {
    let is_enum = |t: &Typed| t.ty == Some(DataType::Enum);
    let untyped = lhs.ty.is_none() || rhs.ty.is_none();
    if !op.is_ordering() || untyped || !(is_enum(lhs) || is_enum(rhs)) {
        return Ok(None);
    }
    let mismatch = || {
        Error::TypeMismatch(format!(
            "operator '{}' orders an enum only against a member or the same dictionary",
            op.symbol()
        ))
    };
    let codes = |c: &Column| c.as_enum().map(|e| Rank::Codes(c.clone(), e.clone()));
    let member = |c: &Column, s: &str| {
        c.as_enum().and_then(|e| e.code_of(s)).map(Rank::Code).ok_or_else(|| {
            Error::TypeMismatch(format!("'{s}' is not an enum value; ordering needs a member"))
        })
    };
    let pair = match (&lhs.node, &rhs.node) {
        (Node::Col(a), Node::Col(b)) => match (a.as_enum(), b.as_enum()) {
            (Some(x), Some(y)) if x.dictionary() == y.dictionary() => codes(a).zip(codes(b)),
            _ => None,
        },
        (Node::Col(c), Node::Lit(Scalar::Str(s))) => {
            codes(c).zip(Some(member(c, s.as_str())?))
        }
        (Node::Lit(Scalar::Str(s)), Node::Col(c)) => {
            Some(member(c, s.as_str())?).zip(codes(c))
        }
        _ => None,
    };
    pair.map(Some).ok_or_else(mismatch)
}

/// A column of `len` nulls of type `ty`; untyped nulls materialise as floats.
fn null_column(ty: Ty, len: usize) -> Column {
    match ty {
        Some(DataType::Boolean) => Column::from_opt_bool(vec![None; len]),
        Some(DataType::Int64) => Column::from_opt_i64(vec![None; len]),
        Some(DataType::Utf8 | DataType::Enum) => {
            Column::from_opt_strs(iter::repeat(None::<&str>).take(len))
        }
        Some(DataType::Float64) | None => Column::from_opt_f64(vec![None; len]),
    }
}

fn broadcast(value: &Scalar, len: usize) -> Column {
    match value {
        Scalar::Null => null_column(None, len),
        Scalar::Bool(v) => Column::from_bool(vec![*v; len]),
        Scalar::I64(v) => Column::from_i64(vec![*v; len]),
        Scalar::F64(v) => Column::from_f64(vec![*v; len]),
        Scalar::Str(s) => Column::from_strs(iter::repeat(s.as_str()).take(len)),
    }
}

fn floats(col: &Column) -> Option<Cow<'_, [f64]>> {
    match col.data() {
        ColumnData::Float64(v) => Some(Cow::Borrowed(&v[..])),
        ColumnData::Int64(v) => Some(Cow::Owned(v.iter().map(|&x| x as f64).collect())),
        _ => None,
    }
}

fn strs(col: &Column) -> Option<Vec<&str>> {
    match col.data() {
        ColumnData::Utf8(v) => Some(v.iter().collect()),
        ColumnData::Enum(e) => Some((0..e.len()).map(|i| e.value(i)).collect()),
        _ => None,
    }
}

/// `f` applied to each row where every input is valid; null elsewhere.
fn rows<R>(inputs: &[&Column], len: usize, f: impl Fn(usize) -> Option<R>) -> Vec<Option<R>> {
    (0..len)
        .map(|i| if inputs.iter().all(|c| c.is_valid(i)) { f(i) } else { None })
        .collect()
}

fn internal(what: &str) -> Error {
    Error::InternalInvariantViolation(format!(
        "expression operand does not match its resolved type: {what}"
    ))
}

impl Typed {
    fn evaluate(&self, len: usize) -> Result<Column> {
        match &self.node {
            Node::Col(c) => Ok(c.clone()),
            Node::Lit(v) => Ok(broadcast(v, len)),
            Node::Unary(step, arg) => {
                if arg.ty.is_none() {
                    return Ok(null_column(self.ty, len));
                }
                let input = arg.evaluate(len)?;
                match step {
                    Step::Builtin(f) => unary(*f, &input, len),
                    Step::User(f) => user(f, &input, len),
                }
            }
            Node::Binary(op, lhs, rhs) => {
                if lhs.ty.is_none() || rhs.ty.is_none() {
                    return Ok(null_column(self.ty, len));
                }
                let l = lhs.evaluate(len)?;
                let r = rhs.evaluate(len)?;
                binary(*op, &l, &r, len)
            }
            Node::Ranked(op, l, r) => {
                let inputs: Vec<&Column> = l.column().into_iter().chain(r.column()).collect();
                let f = |i: usize| Some(op.holds(&l.code(i), &r.code(i)));
                Ok(Column::from_opt_bool(rows(&inputs, len, f)))
            }
        }
    }
}

fn binary(op: BinaryOp, l: &Column, r: &Column, len: usize) -> Result<Column> {
    let both = [l, r];
    match (l.data(), r.data()) {
        (ColumnData::Int64(a), ColumnData::Int64(b)) if op.is_arithmetic() => {
            let f: fn(i64, i64) -> Option<i64> = match op {
                BinaryOp::Add => i64::checked_add,
                BinaryOp::Sub => i64::checked_sub,
                BinaryOp::Mul => i64::checked_mul,
                _ => i64::checked_div,
            };
            Ok(Column::from_opt_i64(rows(&both, len, |i| f(a[i], b[i]))))
        }
        (ColumnData::Int64(a), ColumnData::Int64(b)) => {
            Ok(Column::from_opt_bool(rows(&both, len, |i| Some(op.holds(&a[i], &b[i])))))
        }
        (ColumnData::Boolean(a), ColumnData::Boolean(b)) => {
            let f = |i: usize| match op {
                BinaryOp::And => Some(a[i] && b[i]),
                BinaryOp::Or => Some(a[i] || b[i]),
                _ => Some(op.holds(&a[i], &b[i])),
            };
            Ok(Column::from_opt_bool(rows(&both, len, f)))
        }
        _ => {
            if let (Some(a), Some(b)) = (floats(l), floats(r)) {
                return Ok(match op {
                    BinaryOp::Add => Column::from_opt_f64(rows(&both, len, |i| Some(a[i] + b[i]))),
                    BinaryOp::Sub => Column::from_opt_f64(rows(&both, len, |i| Some(a[i] - b[i]))),
                    BinaryOp::Mul => Column::from_opt_f64(rows(&both, len, |i| Some(a[i] * b[i]))),
                    BinaryOp::Div => Column::from_opt_f64(rows(&both, len, |i| Some(a[i] / b[i]))),
                    _ => Column::from_opt_bool(rows(&both, len, |i| Some(op.holds(&a[i], &b[i])))),
                });
            }
            let (a, b) = strs(l).zip(strs(r)).ok_or_else(|| internal(op.symbol()))?;
            Ok(if op == BinaryOp::Add {
                Column::from_opt_strs(rows(&both, len, |i| Some(format!("{}{}", a[i], b[i]))))
            } else {
                Column::from_opt_bool(rows(&both, len, |i| Some(op.holds(a[i], b[i]))))
            })
        }
    }
}

fn unary(f: UnaryFn, input: &Column, len: usize) -> Result<Column> {
    let only = [input];
    let bad = || internal(&format!("{f:?}"));
    let col = match (f, input.data()) {
        (UnaryFn::Abs, ColumnData::Int64(v)) => {
            Column::from_opt_i64(rows(&only, len, |i| v[i].checked_abs()))
        }
        (UnaryFn::Neg, ColumnData::Int64(v)) => {
            Column::from_opt_i64(rows(&only, len, |i| v[i].checked_neg()))
        }
        (UnaryFn::Floor | UnaryFn::Ceil | UnaryFn::Round, ColumnData::Int64(_)) => input.clone(),
        (
            UnaryFn::Abs | UnaryFn::Neg | UnaryFn::Floor | UnaryFn::Ceil | UnaryFn::Round,
            ColumnData::Float64(v),
        ) => {
            let g: fn(f64) -> f64 = match f {
                UnaryFn::Abs => f64::abs,
                UnaryFn::Neg => |x| -x,
                UnaryFn::Floor => f64::floor,
                UnaryFn::Ceil => f64::ceil,
                _ => f64::round,
            };
            Column::from_opt_f64(rows(&only, len, |i| Some(g(v[i]))))
        }
        (UnaryFn::Sqrt, _) => {
            let v = floats(input).ok_or_else(bad)?;
            Column::from_opt_f64(rows(&only, len, |i| Some(v[i].sqrt())))
        }
        (UnaryFn::Not, ColumnData::Boolean(v)) => {
            Column::from_opt_bool(rows(&only, len, |i| Some(!v[i])))
        }
        (UnaryFn::Str, _) => {
            Column::from_opt_strs(rows(&only, len, |i| Some(input.get(i).to_string())))
        }
        (UnaryFn::Int, data) => Column::from_opt_i64(rows(&only, len, |i| to_int(data, input, i))),
        (UnaryFn::Float, data) => {
            Column::from_opt_f64(rows(&only, len, |i| to_float(data, input, i)))
        }
        (UnaryFn::Bool, data) => {
            Column::from_opt_bool(rows(&only, len, |i| to_bool(data, input, i)))
        }
        (UnaryFn::Len | UnaryFn::Upper | UnaryFn::Lower, _) => {
            let v = strs(input).ok_or_else(bad)?;
            match f {
                UnaryFn::Len => {
                    Column::from_opt_i64(rows(&only, len, |i| Some(v[i].chars().count() as i64)))
                }
                UnaryFn::Upper => {
                    Column::from_opt_strs(rows(&only, len, |i| Some(v[i].to_uppercase())))
                }
                _ => Column::from_opt_strs(rows(&only, len, |i| Some(v[i].to_lowercase()))),
            }
        }
        _ => return Err(bad()),
    };
    Ok(col)
}

// Casts yield null when the value has no representation in the target type.

fn to_int(data: &ColumnData, col: &Column, i: usize) -> Option<i64> {
    match data {
        ColumnData::Int64(v) => Some(v[i]),
        // 2^63 itself is out of range.
        ColumnData::Float64(v) => {
            let x = v[i].trunc();
            (x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64).then_some(x as i64)
        }
        ColumnData::Boolean(v) => Some(i64::from(v[i])),
        _ => col.str_value(i)?.trim().parse().ok(),
    }
}

fn to_float(data: &ColumnData, col: &Column, i: usize) -> Option<f64> {
    match data {
        ColumnData::Int64(v) => Some(v[i] as f64),
        ColumnData::Float64(v) => Some(v[i]),
        ColumnData::Boolean(v) => Some(if v[i] { 1.0 } else { 0.0 }),
        _ => col.str_value(i)?.trim().parse().ok(),
    }
}

fn to_bool(data: &ColumnData, col: &Column, i: usize) -> Option<bool> {
    match data {
        ColumnData::Int64(v) => Some(v[i] != 0),
        ColumnData::Float64(v) => Some(v[i] != 0.0),
        ColumnData::Boolean(v) => Some(v[i]),
        _ => match col.str_value(i)?.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
    }
}

fn user(f: &UserFn, input: &Column, len: usize) -> Result<Column> {
    let only = [input];
    Ok(match (f, input.data()) {
        (UserFn::Int(g), ColumnData::Int64(v)) => {
            Column::from_opt_i64(rows(&only, len, |i| Some(g(v[i]))))
        }
        (UserFn::Float(g), ColumnData::Float64(v)) => {
            Column::from_opt_f64(rows(&only, len, |i| Some(g(v[i]))))
        }
        (UserFn::Bool(g), ColumnData::Boolean(v)) => {
            Column::from_opt_bool(rows(&only, len, |i| Some(g(v[i]))))
        }
        (UserFn::Str(g), _) => {
            let v = strs(input).ok_or_else(|| internal("user string function"))?;
            Column::from_opt_strs(rows(&only, len, |i| Some(g(v[i]))))
        }
        _ => return Err(internal("user function")),
    })
}

/// Evaluate `expr` over a frame and bind the result to `dest`. A column
/// already named `dest` is replaced where it stands.
#[derive(Debug, Clone, Copy)]
pub struct Eval<'a> {
    pub dest: &'a str,
    pub expr: &'a Expr,
    pub registry: Option<&'a FunctionRegistry>,
}

impl<'a> Eval<'a> {
    pub fn new(dest: &'a str, expr: &'a Expr) -> Self {
        Self {
            dest,
            expr,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a FunctionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Typed expression tree for one input frame.
pub struct EvalPlan(Typed);

impl EvalPlan {
    /// Result type of the expression; `None` for an untyped null.
    pub fn data_type(&self) -> Option<DataType> {
        self.0.ty
    }
}

impl Operator for Eval<'_> {
    type Plan = EvalPlan;

    fn name(&self) -> &'static str {
        "eval"
    }

    fn plan(&self, input: &Frame) -> Result<EvalPlan> {
        resolve(self.expr, input, self.registry).map(EvalPlan)
    }

    fn execute(&self, plan: EvalPlan, input: &Frame) -> Result<Frame> {
        let column = plan.0.evaluate(input.len())?;
        input.with_column(self.dest, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new([
            ("a", Column::from_i64(vec![i64::MAX, 6, 7])),
            ("b", Column::from_i64(vec![1, 0, 2])),
            ("s", Column::from_strs(["x", "y", "z"])),
        ])
        .unwrap()
    }

    #[test]
    fn checked_int_arithmetic_nulls_on_overflow_and_zero_division() {
        let f = frame();
        let out = Eval::new("r", &(col("a") + col("b"))).apply(&f).unwrap();
        assert_eq!(out.column("r").unwrap().get(0), Scalar::Null);
        assert_eq!(out.column("r").unwrap().get(1), Scalar::I64(6));

        let out = Eval::new("r", &(col("a") / col("b"))).apply(&f).unwrap();
        assert_eq!(out.column("r").unwrap().get(1), Scalar::Null);
        assert_eq!(out.column("r").unwrap().get(2), Scalar::I64(3));
    }

    #[test]
    fn type_errors_surface_before_evaluation() {
        let f = frame();
        let err = Eval::new("r", &(col("s") - col("b"))).plan(&f).err().unwrap();
        assert!(matches!(err, Error::TypeMismatch(_)));
        let err = Eval::new("r", &Expr::call("nope", col("b"))).plan(&f).err().unwrap();
        assert!(matches!(err, Error::UnknownFunction { .. }));
    }

    #[test]
    fn null_literal_adopts_context_type() {
        let f = frame();
        let plan = Eval::new("r", &(col("s") + lit(Scalar::Null))).plan(&f).unwrap();
        assert_eq!(plan.data_type(), Some(DataType::Utf8));
        let out = Eval::new("r", &(col("b") + lit(Scalar::Null))).apply(&f).unwrap();
        assert_eq!(out.column("r").unwrap().null_count(), 3);
        assert_eq!(out.column("r").unwrap().data_type(), DataType::Int64);
    }

    #[test]
    fn casts() {
        let f = Frame::new([("s", Column::from_strs(["12", "x", " 3 "]))]).unwrap();
        let out = Eval::new("n", &Expr::call("int", col("s"))).apply(&f).unwrap();
        let n = out.column("n").unwrap();
        assert_eq!(n.to_scalars(), vec![Scalar::I64(12), Scalar::Null, Scalar::I64(3)]);
    }
}
