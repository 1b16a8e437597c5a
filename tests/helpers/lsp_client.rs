//! LSP client for E2E tests.
//!
//! Drives the repolink binary over stdin/stdout with Content-Length framed
//! JSON-RPC 2.0.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Messages to skip while waiting for one response before giving up.
const MAX_MESSAGES: u32 = 1000;

pub struct LspClient {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl LspClient {
    /// Spawn the repolink binary with `config_home` as its XDG config directory.
    pub fn new(config_home: &Path) -> Self {
        // Set by Cargo for integration tests.
        let mut child = Command::new(env!("CARGO_BIN_EXE_repolink"))
            .arg("--stdio")
            .env("XDG_CONFIG_HOME", config_home)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn repolink binary");

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        Self {
            child,
            stdin: Some(stdin),
            stdout,
            request_id: 0,
        }
    }

    /// Send a request and wait for its response, skipping notifications.
    pub fn send_request(&mut self, method: &str, params: Value) -> Value {
        let request_id = self.start_request(method, params);
        self.receive_response(request_id)
    }

    /// Send a request without waiting; returns its id.
    pub fn start_request(&mut self, method: &str, params: Value) -> i64 {
        self.request_id += 1;
        let request_id = self.request_id;

        let mut request = json!({"jsonrpc": "2.0", "id": request_id, "method": method});
        if !params.is_null() {
            request["params"] = params;
        }
        self.send_message(&request);
        request_id
    }

    pub fn receive_response(&mut self, request_id: i64) -> Value {
        self.receive_until(|message| {
            message.get("method").is_none() && message["id"].as_i64() == Some(request_id)
        })
    }

    /// Wait for a `window/logMessage` whose text starts with `prefix`.
    pub fn wait_for_log_message(&mut self, prefix: &str) -> Value {
        self.receive_until(|message| {
            message["method"] == "window/logMessage"
                && message["params"]["message"]
                    .as_str()
                    .is_some_and(|text| text.starts_with(prefix))
        })
    }

    fn receive_until(&mut self, mut wanted: impl FnMut(&Value) -> bool) -> Value {
        for _ in 0..MAX_MESSAGES {
            let message = self.receive_message();
            if wanted(&message) {
                return message;
            }
        }
        panic!("Wanted message not received within {MAX_MESSAGES} messages");
    }

    pub fn send_notification(&mut self, method: &str, params: Value) {
        let mut notification = json!({"jsonrpc": "2.0", "method": method});
        if !params.is_null() {
            notification["params"] = params;
        }
        self.send_message(&notification);
    }

    fn send_message(&mut self, message: &Value) {
        let body = message.to_string();
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        write!(stdin, "Content-Length: {}\r\n\r\n{}", body.len(), body)
            .expect("Failed to write message");
        stdin.flush().expect("Failed to flush stdin");
    }

    fn receive_message(&mut self) -> Value {
        let mut content_length = None;
        loop {
            let mut line = String::new();
            let read = self
                .stdout
                .read_line(&mut line)
                .expect("Failed to read header");
            assert!(read > 0, "Server closed stdout");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse::<usize>().ok();
                }
            }
        }

        let length = content_length.expect("Missing Content-Length header");
        let mut body = vec![0u8; length];
        self.stdout
            .read_exact(&mut body)
            .expect("Failed to read body");
        serde_json::from_slice(&body).expect("Invalid JSON body")
    }

    /// Shut the server down cleanly and wait for it to exit.
    pub fn shutdown(mut self) -> std::process::ExitStatus {
        self.send_request("shutdown", Value::Null);
        self.send_notification("exit", Value::Null);
        self.stdin.take();
        self.child.wait().expect("Failed to wait for server")
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
