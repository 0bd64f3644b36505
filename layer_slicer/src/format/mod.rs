//! Writers for sliced results.

pub mod svg;
