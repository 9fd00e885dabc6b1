//! Smoke tests for MCP servers that speak JSON-RPC over stdio.
//!
//! Each case launches the server, writes one `tools/call` request, closes
//! stdin and reads back whatever the server printed before exiting.

pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod suite;

pub use config::HarnessConfig;
pub use driver::{CapturedOutput, ProcessDriver};
pub use error::HarnessError;
pub use extract::{extract, extract_text, ExtractedResponse, LineStrategy};
pub use suite::{CaseOutcome, CaseRecord, Reporter, SuiteRunner, SuiteSummary, TestCase};
