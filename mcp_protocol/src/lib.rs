use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

mod id_generator;

pub use id_generator::{IdGenerator, IdStyle};

/// JSON-RPC version tag carried by every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Method discriminator for invoking a named tool
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// Correlation id of a request. Either a number or a string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl From<RequestId> for Value {
    fn from(id: RequestId) -> Self {
        match id {
            RequestId::Number(n) => Value::Number(n.into()),
            RequestId::String(s) => Value::String(s),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// A single `tools/call` request, the only message the smoke harness sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    pub params: CallToolParams,
}

impl ToolCallRequest {
    /// Build the envelope for `operation`. The tool name is not checked here;
    /// unknown tools are the server's problem.
    pub fn new(id: impl Into<RequestId>, operation: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: TOOLS_CALL_METHOD.to_string(),
            params: CallToolParams {
                name: operation.into(),
                arguments,
            },
        }
    }

    pub fn operation(&self) -> &str {
        &self.params.name
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.params.arguments
    }

    /// Serialize to one line of compact JSON terminated by `\n`.
    /// The newline is what the server uses to delimit the request.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_id_display() {
        assert_eq!(RequestId::from(7).to_string(), "7");
        assert_eq!(RequestId::from("abc").to_string(), "abc");
    }

    #[test]
    fn request_id_is_untagged_on_the_wire() {
        assert_eq!(serde_json::to_value(RequestId::from(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(RequestId::from("x-1")).unwrap(), json!("x-1"));

        let parsed: RequestId = serde_json::from_value(json!("req")).unwrap();
        assert_eq!(parsed, RequestId::String("req".into()));
    }

    #[test]
    fn missing_arguments_default_to_empty_object() {
        let params: CallToolParams = serde_json::from_value(json!({"name": "list_networks"})).unwrap();
        assert!(params.arguments.is_empty());
    }
}
