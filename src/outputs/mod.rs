//! Output writers.
//!
//! - [`csv`]: CSV destinations shared by the bulk sink and one-shot saves

pub mod csv;
