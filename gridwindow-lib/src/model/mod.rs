//! Row model

mod row;

pub use row::*;
