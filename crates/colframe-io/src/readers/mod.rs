//! Readers that materialise a whole `Frame`.

pub mod csv;
