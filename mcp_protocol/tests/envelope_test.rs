use mcp_protocol::{RequestId, ToolCallRequest, JSONRPC_VERSION, TOOLS_CALL_METHOD};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

#[test]
fn test_envelope_carries_operation_and_arguments_unchanged() {
    let arguments = object(json!({
        "query": "security vulnerabilities",
        "limit": 3,
        "filters": {"vendors": ["cisco", "arista"], "strict": false},
        "cursor": null
    }));

    let request = ToolCallRequest::new(1, "search_nqe_queries", arguments.clone());

    assert_eq!(request.operation(), "search_nqe_queries");
    assert_eq!(request.arguments(), &arguments);
    assert_eq!(request.jsonrpc, JSONRPC_VERSION);
    assert_eq!(request.method, TOOLS_CALL_METHOD);
    assert_eq!(request.id, RequestId::Number(1));
}

#[test]
fn test_envelope_wire_shape() {
    let request = ToolCallRequest::new("case-a", "get_query_index_stats", object(json!({"detailed": true})));
    let wire = serde_json::to_value(&request).unwrap();

    assert_eq!(
        wire,
        json!({
            "jsonrpc": "2.0",
            "id": "case-a",
            "method": "tools/call",
            "params": {
                "name": "get_query_index_stats",
                "arguments": {"detailed": true}
            }
        })
    );
}

#[test]
fn test_to_line_is_single_newline_terminated_line() {
    let request = ToolCallRequest::new(
        2,
        "find_executable_query",
        object(json!({"query": "show me all\nnetwork devices", "limit": 2})),
    );
    let line = request.to_line().unwrap();

    assert!(line.ends_with('\n'));
    // Embedded newlines in argument strings must stay escaped
    assert_eq!(line.matches('\n').count(), 1);

    let decoded: ToolCallRequest = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn test_empty_arguments() {
    let request = ToolCallRequest::new(5, "list_networks", Map::new());
    let wire = serde_json::to_value(&request).unwrap();
    assert_eq!(wire["params"]["arguments"], json!({}));
}
