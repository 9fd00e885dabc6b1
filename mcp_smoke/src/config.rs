use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mcp_protocol::{IdGenerator, IdStyle};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::fs;
use tracing::debug;

use crate::driver::ProcessDriver;
use crate::extract::LineStrategy;
use crate::suite::TestCase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub line_strategy: LineStrategy,

    #[serde(default)]
    pub request_ids: IdStyle,

    /// Extra environment for the server process
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default = "default_cases")]
    pub cases: Vec<TestCase>,
}

fn default_title() -> String {
    "Forward MCP Server Semantic Search Functionality".to_string()
}

fn default_executable() -> PathBuf {
    PathBuf::from("./bin/forward-mcp-server")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("get_query_index_stats", json!({"detailed": true})),
        TestCase::new("search_nqe_queries", json!({"query": "security vulnerabilities", "limit": 3})),
        TestCase::new("search_nqe_queries", json!({"query": "BGP routing problems", "limit": 3})),
        TestCase::new("search_nqe_queries", json!({"query": "interface utilization", "limit": 3})),
        TestCase::new("find_executable_query", json!({"query": "show me all network devices", "limit": 2})),
    ]
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            executable: default_executable(),
            timeout_secs: default_timeout_secs(),
            line_strategy: LineStrategy::default(),
            request_ids: IdStyle::default(),
            env: HashMap::new(),
            cases: default_cases(),
        }
    }
}

impl HarnessConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading harness config from {:?}", path);

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse TOML text and expand `~` in every executable path
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: HarnessConfig = toml::from_str(content)?;
        config.executable = expand_tilde(&config.executable);
        for case in &mut config.cases {
            if let Some(executable) = case.executable.take() {
                case.executable = Some(expand_tilde(&executable));
            }
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn driver(&self) -> ProcessDriver {
        ProcessDriver::new(self.timeout()).with_env(self.env.clone())
    }

    pub fn id_generator(&self) -> IdGenerator {
        IdGenerator::new(self.request_ids)
    }

    /// Cases in declared order, optionally restricted to some operation names
    pub fn test_cases(&self, only: &[String]) -> Vec<TestCase> {
        self.cases
            .iter()
            .filter(|case| only.is_empty() || only.contains(&case.operation))
            .cloned()
            .collect()
    }
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
