// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// §6.2: `{ "jsonrpc": "2.0", "id": <int>, "method": "<name>", "params": <object> }`
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A fire-and-forget notification (no `id`, no response expected), e.g.
/// `notifications/initialized`.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// §6.2: either `{ ..., "result": <any> }` or `{ ..., "error": {...} }`.
/// `id` is optional on the wire in malformed-server edge cases, so it is
/// kept `Option` here even though a well-behaved server always sets it.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match (self.result, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => Err(error),
            (None, None) => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_per_6_2() {
        let request = Request::new(1, "initialize", json!({ "capabilities": {} }));
        let line = request.to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["method"], "initialize");
    }

    #[test]
    fn response_with_result_parses() {
        let response = Response::from_line(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        let value = response.into_result().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn response_with_error_parses() {
        let response =
            Response::from_line(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no such method"}}"#)
                .unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, -32601);
    }

    #[test]
    fn malformed_line_fails_to_parse() {
        assert!(Response::from_line("not json").is_err());
    }
}
