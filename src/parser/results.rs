//! Results file of a finished test run
//!
//! A YAML (or JSON) list of test case definitions, each carrying the verdict of
//! its run:
//!
//! ```yaml
//! - externalId: CY-SAMPLE-LOGIN-01
//!   name: Login page contains specified elements.
//!   testSteps: [Go to the login page., Check the username field.]
//!   verdict: Passed
//! ```

use crate::model::{TestCaseDefinition, Verdict};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestResult {
    #[serde(flatten)]
    pub definition: TestCaseDefinition,
    pub verdict: Verdict,
}

impl TestResult {
    pub fn into_pair(self) -> (TestCaseDefinition, Verdict) {
        (self.definition, self.verdict)
    }
}

pub fn parse_results(content: &str) -> Result<Vec<TestResult>> {
    let results: Vec<TestResult> = serde_yaml::from_str(content)?;
    Ok(results)
}

pub fn load_results(path: &Path) -> Result<Vec<TestResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    parse_results(&content).with_context(|| format!("Failed to parse results: {}", path.display()))
}
