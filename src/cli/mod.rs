//! CLI command implementations

pub mod error;
pub mod long_range;
pub mod report;
pub mod window;

pub use error::CliError;
pub use long_range::LongRangeArgs;
pub use report::{Cli, Commands, OutputFormat, ReportArgs, RunSummary};
