//! Convenient re-exports for downstream crates.

pub use crate::bitmap::Bitmap;
pub use crate::column::{Column, ColumnData};
pub use crate::error::{Error, Result};
pub use crate::frame::Frame;
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::Scalar;
