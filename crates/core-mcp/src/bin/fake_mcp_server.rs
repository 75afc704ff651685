// SPDX-License-Identifier: Apache-2.0
//! Test double speaking the §6.2 wire protocol over stdio: answers
//! `initialize`, `notifications/initialized`, `tools/list` (one `echo`
//! tool) and `tools/call` (echoes its `text` argument back). Exists so
//! `core-mcp`'s integration tests can exercise a real child process
//! instead of an in-process mock.
use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(request): Result<Value, _> = serde_json::from_str(&line) else {
            continue;
        };

        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let id = request.get("id").cloned();

        if method == "notifications/initialized" {
            continue;
        }
        if method == "exit" {
            break;
        }

        let Some(id) = id else { continue };

        let result = match method {
            "initialize" => json!({ "serverInfo": { "name": "fake_mcp_server", "version": "0.1.0" } }),
            "tools/list" => json!({
                "tools": [{
                    "name": "echo",
                    "description": "echoes the `text` argument back",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "text": { "type": "string", "description": "text to echo" } },
                        "required": ["text"]
                    }
                }]
            }),
            "tools/call" => {
                let text = request
                    .pointer("/params/arguments/text")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                json!({ "content": text })
            }
            _ => {
                let response = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32601, "message": format!("unknown method {method}") }
                });
                writeln!(stdout, "{response}").ok();
                stdout.flush().ok();
                continue;
            }
        };

        let response = json!({ "jsonrpc": "2.0", "id": id, "result": result });
        writeln!(stdout, "{response}").ok();
        stdout.flush().ok();
    }
}
