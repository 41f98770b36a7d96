pub mod cypress;
pub mod results;

pub use cypress::{scan_epic, scan_specs, CypressParser, SpecFile, DEFAULT_EPIC, DEFAULT_SPEC_SUFFIX};
pub use results::{load_results, TestResult};
