//! A scripted remote code-intelligence service on the far end of an in-memory pipe.

use std::io;

use repolink::remote::RpcChannel;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Connect an `RpcChannel` to a fresh scripted remote.
pub fn connect() -> (RpcChannel, ScriptedRemote) {
    let (client_read, remote_write) = tokio::io::duplex(PIPE_CAPACITY);
    let (remote_read, client_write) = tokio::io::duplex(PIPE_CAPACITY);
    (
        RpcChannel::connect(client_read, client_write),
        ScriptedRemote {
            reader: BufReader::new(remote_read),
            writer: remote_write,
        },
    )
}

pub struct ScriptedRemote {
    reader: BufReader<DuplexStream>,
    writer: DuplexStream,
}

impl ScriptedRemote {
    /// Next message from the client, or `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<Value> {
        self.read_frame().await.ok()
    }

    async fn read_frame(&mut self) -> io::Result<Value> {
        let mut content_length = None;
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length: ") {
                content_length = value.parse::<usize>().ok();
            }
        }
        let mut body = vec![0u8; content_length.unwrap_or_default()];
        self.reader.read_exact(&mut body).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn send(&mut self, message: Value) {
        let body = message.to_string();
        let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        self.writer.write_all(frame.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn ack(&mut self, request: &Value) {
        self.send(json!({"jsonrpc": "2.0", "id": request["id"], "result": null}))
            .await;
    }

    pub async fn refuse(&mut self, request: &Value, message: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": -32000, "message": message}
        }))
        .await;
    }

    pub async fn emit(&mut self, proxy: &Value, value: Value) {
        self.send(json!({
            "jsonrpc": "2.0",
            "method": "codeIntel/emit",
            "params": {"proxy": proxy, "value": value}
        }))
        .await;
    }

    pub async fn complete(&mut self, proxy: &Value) {
        self.send(json!({
            "jsonrpc": "2.0",
            "method": "codeIntel/complete",
            "params": {"proxy": proxy}
        }))
        .await;
    }
}

/// The `proxy` param of a client message.
pub fn proxy_of(message: &Value) -> Value {
    message["params"]["proxy"].clone()
}
