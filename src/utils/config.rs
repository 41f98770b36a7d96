use crate::gateway::http::DEFAULT_TIMEOUT_SECS;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable consulted when no password is configured
pub const PASSWORD_ENV: &str = "TESTBENCH_PASSWORD";

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "testbench.yaml";

/// How results reach the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportingMode {
    /// Synchronize the test case, then create an execution and report per step
    #[default]
    Steps,
    /// Submit the test case and result as one automation run
    AutomationRun,
}

/// Run options. Immutable once the run has started.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Server address (e.g., "https://testbench.example.com")
    pub server_url: String,

    /// Workspace (tenant) name
    pub workspace: String,

    pub username: String,

    pub password: String,

    /// Product the test cases belong to
    pub product_id: i64,

    /// Prefix of the reporting session name
    pub session_prefix: String,

    /// Never create test cases or rewrite their steps
    pub skip_test_case_updates: bool,

    /// Terminate a stale automation run on conflict and retry once
    pub close_already_running_automation: bool,

    /// Synchronize test cases but do not report executions
    pub skip_result_import: bool,

    pub reporting_mode: ReportingMode,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Skip TLS certificate verification (self-signed on-premise servers)
    pub accept_invalid_certs: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            workspace: String::new(),
            username: String::new(),
            password: String::new(),
            product_id: 1,
            session_prefix: "AUTOMATION".to_string(),
            skip_test_case_updates: false,
            close_already_running_automation: false,
            skip_result_import: false,
            reporting_mode: ReportingMode::Steps,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

impl Options {
    /// Load options from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let options: Options = serde_yaml::from_str(content)?;
        Ok(options)
    }

    /// Load `path` if given, else the default file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Fill the password from the environment when the file left it empty
    pub fn apply_env(&mut self) {
        if self.password.is_empty() {
            if let Ok(password) = std::env::var(PASSWORD_ENV) {
                self.password = password;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            anyhow::bail!("serverUrl is not configured");
        }
        if self.workspace.trim().is_empty() {
            anyhow::bail!("workspace is not configured");
        }
        if self.username.trim().is_empty() {
            anyhow::bail!("username is not configured");
        }
        Ok(())
    }
}
