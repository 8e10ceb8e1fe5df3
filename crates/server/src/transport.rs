//! Line-delimited JSON-RPC transport.
//!
//! Each line on the reader is one JSON-RPC message; each response is written
//! as one line. Stdout carries nothing else, so all logging goes to stderr.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::instrument;

use sales_assistant_core::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

use crate::handler::McpHandler;

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// Malformed lines are answered with a parse or invalid-request error and
/// do not stop the loop.
///
/// # Errors
///
/// Returns an I/O error if reading or writing fails.
#[instrument(skip_all)]
pub async fn serve<R, W>(reader: R, mut writer: W, handler: &McpHandler) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match decode(line) {
            Ok(request) => handler.handle(request).await,
            Err(error) => Some(error),
        };
        handled += 1;

        if let Some(response) = response {
            let mut payload = serde_json::to_string(&response).map_err(std::io::Error::other)?;
            payload.push('\n');
            writer.write_all(payload.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    tracing::info!(messages = handled, "Input closed, shutting down");
    Ok(())
}

/// Serve on the process's stdin and stdout.
///
/// # Errors
///
/// Returns an I/O error if stdio fails.
pub async fn serve_stdio(handler: &McpHandler) -> std::io::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(stdin, stdout, handler).await
}

/// Parse one line into a request, or the error response to send back.
fn decode(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        tracing::warn!(error = %e, "Unparsable message");
        JsonRpcResponse::failure(None, JsonRpcError::parse_error(e.to_string()))
    })?;

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(error = %e, "Invalid request");
        JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e.to_string()))
    })
}
