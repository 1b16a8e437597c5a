//! Content-Length framing of JSON-RPC messages.
//!
//! Format: `Content-Length: N\r\n[other headers\r\n]\r\n{json}`

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const CONTENT_LENGTH: &str = "content-length";

/// Largest body accepted from the remote service.
pub(crate) const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Reads framed messages from the remote service's stdout.
pub(crate) struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Read the next message.
    ///
    /// Returns `UnexpectedEof` when the stream ends, including cleanly between
    /// messages.
    pub(crate) async fn read_message(&mut self) -> io::Result<serde_json::Value> {
        let mut content_length = None;

        loop {
            let mut line = String::new();
            if self.inner.read_line(&mut line).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "remote closed the stream",
                ));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if content_length.is_some() {
                    break;
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(invalid_data(format!("malformed header line: {line:?}")));
            };
            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
                let length = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| invalid_data(format!("invalid Content-Length: {e}")))?;
                if length > MAX_MESSAGE_SIZE {
                    return Err(invalid_data(format!(
                        "Content-Length {length} exceeds the {MAX_MESSAGE_SIZE} byte limit"
                    )));
                }
                content_length = Some(length);
            }
        }

        let length = content_length.unwrap_or_default();
        let mut body = vec![0u8; length];
        self.inner.read_exact(&mut body).await?;

        serde_json::from_slice(&body).map_err(|e| invalid_data(format!("invalid JSON body: {e}")))
    }
}

/// Writes framed messages to the remote service's stdin.
pub(crate) struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    pub(crate) async fn write_message(&mut self, message: &serde_json::Value) -> io::Result<()> {
        let body = serde_json::to_string(message)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.inner.write_all(header.as_bytes()).await?;
        self.inner.write_all(body.as_bytes()).await?;
        self.inner.flush().await
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
