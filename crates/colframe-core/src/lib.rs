#![forbid(unsafe_code)]
//! colframe-core: the immutable columnar data model.
//!
//! - `Column`: typed, reference-counted buffers plus a validity bitmap.
//! - `Frame`: ordered, uniquely named, equal-length columns.
//! - `Scalar`, `DataType`, `Schema`: the value/type vocabulary shared with
//!   the engines in `colframe-ops` and the collaborators in `colframe-io`.
//!
//! No I/O and no query logic live here.

pub mod bitmap;
pub mod column;
pub mod error;
pub mod frame;
pub mod prelude;
pub mod schema;
pub mod types;

pub use bitmap::Bitmap;
pub use column::{Column, ColumnData, EnumData, Utf8Data};
pub use error::{Error, Result};
pub use frame::Frame;
pub use schema::{DataType, Field, Schema};
pub use types::Scalar;
