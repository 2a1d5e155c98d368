pub mod orchestrator;
pub mod report;

pub use orchestrator::{BatchOrchestrator, BatchStats, UnitResult};
pub use report::{describe_finding, print_finding, print_summary, BatchReport, RecheckSet};
