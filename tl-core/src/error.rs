//! Error types, re-exported from the shared `tl-error` crate

pub use tl_error::{Result, ThermologError};
