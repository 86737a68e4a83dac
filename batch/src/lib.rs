// batch/src/lib.rs

pub mod driver;
pub mod stager;

pub use driver::{BatchDriver, BatchReport, BenchmarkRequest, UnitFailure};
pub use stager::{discover_assets, package, ArchiveFailure, IterationFilter, StagedTree, Stager, StreamOutcome};
