//! Command-line argument definitions for the `mapred` binaries.

pub mod coordinator;
pub mod worker;
