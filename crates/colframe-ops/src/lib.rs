#![forbid(unsafe_code)]
//! colframe-ops: the engines that turn one immutable `Frame` into another.
//!
//! - `filter`: predicate trees evaluated into row masks.
//! - `sort`: stable multi-key ordering.
//! - `group`: group index plus reducers.
//! - `eval`: column-wise expression evaluation.
//!
//! Every engine implements [`Operator`]: the request is validated against the
//! input in full before any row is processed. [`FrameExt`] puts the engines on
//! `Frame` directly.

pub mod eval;
pub mod filter;
pub mod group;
pub mod pattern;
pub mod sort;
pub mod trace;
pub mod traits;

use colframe_core::prelude::{Frame, Result};

pub use eval::{col, lit, BinaryOp, Eval, Expr, FunctionRegistry, UnaryFn};
pub use filter::{Arg, Comparator, CustomPredicate, Filter};
pub use group::{Aggregate, Aggregation, CustomReducer, Grouper, Reducer};
pub use sort::{CustomOrdering, Order, Sort};
pub use traits::Operator;

/// Engine entry points as methods on `Frame`.
pub trait FrameExt {
    fn filter(&self, filter: &Filter) -> Result<Frame>;
    fn sort(&self, orders: &[Order]) -> Result<Frame>;
    fn group_by(&self, keys: &[&str]) -> Result<Grouper<'_>>;
    fn eval(&self, dest: &str, expr: &Expr) -> Result<Frame>;
    fn eval_with(&self, dest: &str, expr: &Expr, registry: &FunctionRegistry) -> Result<Frame>;
    /// Unique rows, first occurrence kept.
    fn distinct(&self) -> Result<Frame>;
}

impl FrameExt for Frame {
    fn filter(&self, filter: &Filter) -> Result<Frame> {
        filter.apply(self)
    }

    fn sort(&self, orders: &[Order]) -> Result<Frame> {
        Sort::new(orders.to_vec()).apply(self)
    }

    fn group_by(&self, keys: &[&str]) -> Result<Grouper<'_>> {
        group::group_by(self, keys)
    }

    fn eval(&self, dest: &str, expr: &Expr) -> Result<Frame> {
        Eval::new(dest, expr).apply(self)
    }

    fn eval_with(&self, dest: &str, expr: &Expr, registry: &FunctionRegistry) -> Result<Frame> {
        Eval::new(dest, expr).with_registry(registry).apply(self)
    }

    fn distinct(&self) -> Result<Frame> {
        group::distinct(self)
    }
}
