//! Commands exposed by the binary

pub mod sync;
