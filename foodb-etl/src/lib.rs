//! foodb-etl library interface
//!
//! Builds the local nutrition reference database: USDA CSV exports are
//! loaded into SQLite, then a canonical foods table and its macro-nutrient
//! lookup are derived from a hand-maintained mapping file.

pub mod nutrition;
pub mod pipeline;
pub mod usda;

pub use pipeline::{run_pipeline, run_step, PipelineReport, Step, StepReport};
