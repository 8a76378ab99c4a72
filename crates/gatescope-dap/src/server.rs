//! DAP transport: Content-Length framed JSON over a byte stream.

use std::sync::Arc;

use dap::events::Event;
use dap::prelude::*;
use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::adapter::DebugAdapter;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed Content-Length header: {0}")]
    BadHeader(String),

    #[error("malformed message: {0}")]
    BadMessage(#[from] serde_json::Error),

    #[error("message is not valid utf-8")]
    BadEncoding(#[from] std::string::FromUtf8Error),
}

pub struct DapServer {
    adapter: Arc<DebugAdapter>,
}

impl DapServer {
    pub fn new() -> Self {
        Self {
            adapter: Arc::new(DebugAdapter::new()),
        }
    }

    pub fn adapter(&self) -> Arc<DebugAdapter> {
        Arc::clone(&self.adapter)
    }

    /// Serve one session over the given byte streams (stdio in practice).
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let writer = Arc::new(Mutex::new(BufWriter::new(writer)));

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(100);
        self.adapter.set_event_sender(event_tx).await;
        self.adapter.spawn_event_pump();

        // Events are produced by pushed simulator state and must not wait
        // for the request loop; a separate task drains them.
        let event_writer = Arc::clone(&writer);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(err) = write_framed(&event_writer, &json).await {
                            error!(error = %err, "failed to write event");
                            break;
                        }
                    }
                    Err(err) => error!(error = %err, "failed to serialize event"),
                }
            }
        });

        while let Some(request) = read_request(&mut reader).await? {
            debug!(seq = request.seq, "request received");
            let response = self.adapter.handle_request(request).await;
            let json = serde_json::to_string(&response)?;
            write_framed(&writer, &json).await?;
        }
        Ok(())
    }
}

impl Default for DapServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_request<R>(reader: &mut BufReader<R>) -> Result<Option<Request>, ServerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None); // EOF, client is gone
        }
        let trimmed = line.trim();
        let Some(value) = trimmed.strip_prefix("Content-Length:") else {
            continue;
        };
        let length: usize = value
            .trim()
            .parse()
            .map_err(|_| ServerError::BadHeader(trimmed.to_string()))?;

        // Blank separator line between header and body.
        let mut separator = String::new();
        reader.read_line(&mut separator).await?;

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        let text = String::from_utf8(body)?;
        return Ok(Some(serde_json::from_str(&text)?));
    }
}

async fn write_framed<W>(
    writer: &Arc<Mutex<BufWriter<W>>>,
    json: &str,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = writer.lock().await;
    writer
        .write_all(format!("Content-Length: {}\r\n\r\n{}", json.len(), json).as_bytes())
        .await?;
    writer.flush().await
}
