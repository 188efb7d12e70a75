//! Benchmark harness for external microbenchmark executables.
//!
//! A [`profiles::Profile`] describes which executables to run and over which
//! parameter grid. The [`harness`] walks that grid, launches one child per
//! trial through a [`runner::TrialRunner`], scrapes the `TIME:` token from
//! each child's stdout and streams report lines back to the caller.

pub mod config;
pub mod harness;
pub mod profiles;
pub mod runner;
pub mod summary;
pub mod timing;
