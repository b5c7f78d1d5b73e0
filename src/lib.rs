#![forbid(unsafe_code)]
//! colframe: immutable, in-memory, columnar dataframes.
//!
//! This crate only stitches the workspace together:
//! - [`colframe_core`]: columns, frames, scalars, schema, errors.
//! - [`colframe_ops`]: filter, sort, group-by/aggregate and expression engines.
//! - [`colframe_io`]: CSV ingest and CSV/JSON/NDJSON output.
//!
//! ```
//! use colframe::prelude::*;
//!
//! let frame = Frame::new([
//!     ("id", Column::from_i64(vec![1, 2, 3])),
//!     ("x", Column::from_f64(vec![5.0, 30.0, 5.0])),
//! ])?;
//! let big = frame.filter(&Filter::gt("x", 10.0))?;
//! assert_eq!(big.column("id")?.get(0), Scalar::I64(2));
//! # Ok::<(), colframe::Error>(())
//! ```

pub use colframe_core;
pub use colframe_io;
pub use colframe_ops;

pub use colframe_core::{Error, Result};

pub mod prelude {
    pub use colframe_core::prelude::*;
    pub use colframe_ops::eval::{col, lit};
    pub use colframe_ops::{
        Aggregation, CustomOrdering, CustomPredicate, CustomReducer, Expr, Filter, FrameExt,
        FunctionRegistry, Order, Reducer,
    };
}
