//! Report module - evaluation and batch summaries

pub mod evaluation;
pub mod summary;

pub use evaluation::*;
pub use summary::*;
