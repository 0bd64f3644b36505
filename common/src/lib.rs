//! Plain data shared by the slicing engine and its front ends.

pub mod color;
pub mod config;
pub mod progress;
