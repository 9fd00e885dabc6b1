use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

use console::style;
use mcp_protocol::{IdGenerator, ToolCallRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::driver::ProcessDriver;
use crate::error::HarnessError;
use crate::extract::{extract, ExtractedResponse, LineStrategy};

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// One tool call to make against the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "name")]
    pub operation: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
    /// Run this case against a different executable than the rest of the suite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
}

impl TestCase {
    pub fn new(operation: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation: operation.into(),
            arguments,
            executable: None,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Arguments go on the wire as an object, nothing else is accepted
    pub fn arguments_object(&self) -> Result<&Map<String, Value>, HarnessError> {
        match &self.arguments {
            Value::Object(map) => Ok(map),
            other => Err(HarnessError::InvalidArguments {
                operation: self.operation.clone(),
                kind: json_kind(other),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Structured(Value),
    Raw(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub operation: String,
    pub outcome: CaseOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteSummary {
    pub records: Vec<CaseRecord>,
}

impl SuiteSummary {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn structured(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Structured(_)))
    }

    pub fn raw(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Raw(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.records.iter().filter(|record| predicate(&record.outcome)).count()
    }
}

/// Human readable report. Write errors are logged, never fatal.
pub struct Reporter<W> {
    out: W,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl Display) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("Failed to write report line: {}", e);
        }
    }

    pub fn banner(&mut self, title: &str) {
        let heading = style(format!("🚀 Testing {}", title)).bold().force_styling(self.color);
        self.line(heading);
        self.line("=".repeat(60));
    }

    pub fn case_started(&mut self, operation: &str) {
        self.line(format!("\n{}", style(format!("🔍 Testing {}...", operation)).cyan().force_styling(self.color)));
    }

    pub fn case_response(&mut self, operation: &str, response: &ExtractedResponse) {
        self.line(style(format!("✅ Response from {}:", operation)).green().force_styling(self.color));
        match response {
            ExtractedResponse::Structured(value) => {
                let shown = response.result().unwrap_or(value);
                self.line(pretty(shown));
            }
            ExtractedResponse::Raw(text) => {
                self.line("Raw output:");
                self.line(text);
            }
        }
    }

    pub fn case_failed(&mut self, operation: &str, err: &HarnessError) {
        let message = if err.is_timeout() {
            format!("❌ Timeout waiting for {}", operation)
        } else {
            format!("❌ Error testing {}: {}", operation, err)
        };
        self.line(style(message).red().force_styling(self.color));
    }

    pub fn finished(&mut self, summary: &SuiteSummary) {
        let done = style("✅ All tests completed!").bold().force_styling(self.color);
        self.line(format!("\n{}", done));
        self.line(format!(
            "{} cases: {} structured, {} raw, {} failed",
            summary.len(),
            summary.structured(),
            summary.raw(),
            summary.failed()
        ));
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Runs cases one after another, each against a fresh server process
pub struct SuiteRunner<W> {
    driver: ProcessDriver,
    executable: PathBuf,
    strategy: LineStrategy,
    ids: IdGenerator,
    title: String,
    reporter: Reporter<W>,
}

impl<W: Write> SuiteRunner<W> {
    pub fn new(driver: ProcessDriver, executable: impl Into<PathBuf>, reporter: Reporter<W>) -> Self {
        Self {
            driver,
            executable: executable.into(),
            strategy: LineStrategy::default(),
            ids: IdGenerator::default(),
            title: "MCP Server".to_string(),
            reporter,
        }
    }

    pub fn with_line_strategy(mut self, strategy: LineStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Build, send, collect, extract. A timeout is an error here even though
    /// the driver hands back the partial output.
    pub async fn run_case(&self, case: &TestCase) -> Result<ExtractedResponse, HarnessError> {
        let arguments = case.arguments_object()?.clone();
        let request = ToolCallRequest::new(self.ids.next_id(), &case.operation, arguments);
        let executable = case.executable.as_deref().unwrap_or(&self.executable);

        let captured = self.driver.run(executable, &request).await?;
        if !captured.stderr.is_empty() {
            debug!("[{} STDERR] {}", case.operation, captured.stderr.trim_end());
        }
        if !captured.exited_within_timeout {
            return Err(HarnessError::Timeout {
                operation: case.operation.clone(),
                timeout: self.driver.timeout(),
                stdout_bytes: captured.stdout.len(),
            });
        }
        if let Some(code) = captured.exit_code.filter(|code| *code != 0) {
            info!("{} exited with status {}", case.operation, code);
        }

        Ok(extract(&captured, self.strategy))
    }

    pub async fn run_suite(&mut self, cases: &[TestCase]) -> SuiteSummary {
        let title = self.title.clone();
        self.reporter.banner(&title);

        let mut summary = SuiteSummary::default();
        for case in cases {
            self.reporter.case_started(&case.operation);
            let outcome = match self.run_case(case).await {
                Ok(response) => {
                    self.reporter.case_response(&case.operation, &response);
                    match response {
                        ExtractedResponse::Structured(value) => CaseOutcome::Structured(value),
                        ExtractedResponse::Raw(text) => CaseOutcome::Raw(text),
                    }
                }
                Err(e) => {
                    error!("Case {} failed: {}", case.operation, e);
                    self.reporter.case_failed(&case.operation, &e);
                    CaseOutcome::Failed(e.to_string())
                }
            };
            summary.records.push(CaseRecord {
                operation: case.operation.clone(),
                outcome,
            });
        }

        self.reporter.finished(&summary);
        summary
    }
}
