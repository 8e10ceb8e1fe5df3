//! Tool transport client.
//!
//! [`StdioTransport`] starts the tool server as a child process and speaks
//! line-delimited JSON-RPC over its stdin/stdout. Requests are sequential:
//! one in flight at a time, ids increasing from 1.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use sales_assistant_core::ToolDefinition;
use sales_assistant_core::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RequestId,
    methods,
};

use crate::config::ServerCommand;

const CLIENT_NAME: &str = "sales-assistant-client";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
/// How long one request may wait for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors talking to the tool server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server process could not be started.
    #[error("failed to start tool server `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the server failed.
    #[error("tool server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed its output.
    #[error("tool server closed the connection")]
    Closed,

    /// The server answered with a JSON-RPC error.
    #[error("tool server error: {0}")]
    Rpc(#[from] JsonRpcError),

    /// No reply arrived in time. The request is not retried.
    #[error("tool server did not answer `{method}` within {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// A message could not be encoded or decoded.
    #[error("invalid tool server message: {0}")]
    Decode(String),
}

/// Invokes tools on a tool server.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Fetch the server's tool catalog.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, TransportError>;

    /// Call a tool by name.
    ///
    /// A tool-level failure is a successful call whose result has
    /// `is_error` set.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails or the server rejects it.
    async fn call_tool(&self, name: &str, arguments: Value)
    -> Result<CallToolResult, TransportError>;
}

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Connection {
    writer: BoxedWriter,
    lines: Lines<BoxedReader>,
    next_id: i64,
    request_timeout: Duration,
    child: Option<Child>,
}

impl Connection {
    async fn send(&mut self, message: &JsonRpcRequest) -> Result<(), TransportError> {
        let mut payload =
            serde_json::to_string(message).map_err(|e| TransportError::Decode(e.to_string()))?;
        payload.push('\n');
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, TransportError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&JsonRpcRequest::new(id, method, params)).await?;

        let timeout = self.request_timeout;
        tokio::time::timeout(timeout, read_reply(&mut self.lines, &RequestId::Number(id), method))
            .await
            .map_err(|_| {
                warn!(method, ?timeout, "Tool server did not answer");
                TransportError::Timeout {
                    method: method.to_string(),
                    timeout,
                }
            })?
    }
}

/// Read lines until the reply to `expected` arrives.
async fn read_reply(
    lines: &mut Lines<BoxedReader>,
    expected: &RequestId,
    method: &str,
) -> Result<Value, TransportError> {
    loop {
        let line = lines.next_line().await?.ok_or(TransportError::Closed)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response: JsonRpcResponse =
            serde_json::from_str(line).map_err(|e| TransportError::Decode(e.to_string()))?;

        // A null id is the server rejecting a message it could not read.
        let answers_request = response.id.as_ref() == Some(expected)
            || (response.id.is_none() && response.error.is_some());
        if answers_request {
            return Ok(response.into_result()?);
        }
        debug!(id = ?response.id, method, "Skipping unrelated message");
    }
}

/// JSON-RPC over a child process's stdio (or any line-oriented stream pair).
pub struct StdioTransport {
    connection: Mutex<Connection>,
    server_info: Implementation,
}

impl StdioTransport {
    /// Start the server and perform the `initialize` handshake.
    ///
    /// The child inherits stderr, so server logs reach the terminal. It is
    /// killed if the transport is dropped without [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the process cannot start or the
    /// handshake fails.
    #[instrument(skip(command), fields(program = %command.program))]
    pub async fn spawn(command: &ServerCommand) -> Result<Self, TransportError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(TransportError::Closed)?;
        let stdout = child.stdout.take().ok_or(TransportError::Closed)?;

        Self::establish(Box::new(BufReader::new(stdout)), Box::new(stdin), Some(child)).await
    }

    /// Perform the handshake over an existing stream pair.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the handshake fails.
    pub async fn connect<R, W>(reader: R, writer: W) -> Result<Self, TransportError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::establish(Box::new(reader), Box::new(writer), None).await
    }

    async fn establish(
        reader: BoxedReader,
        writer: BoxedWriter,
        child: Option<Child>,
    ) -> Result<Self, TransportError> {
        let mut connection = Connection {
            writer,
            lines: reader.lines(),
            next_id: 1,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            child,
        };

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let result = connection
            .request(methods::INITIALIZE, Some(encode(&params)?))
            .await?;
        let init: InitializeResult = decode(result)?;

        if init.protocol_version != PROTOCOL_VERSION {
            warn!(
                server_version = %init.protocol_version,
                client_version = PROTOCOL_VERSION,
                "Protocol version mismatch"
            );
        }

        connection
            .send(&JsonRpcRequest::notification(methods::INITIALIZED, None))
            .await?;

        info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            "Connected to tool server"
        );

        Ok(Self {
            connection: Mutex::new(connection),
            server_info: init.server_info,
        })
    }

    /// Set how long each later request waits for its reply.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.connection.get_mut().request_timeout = timeout;
        self
    }

    /// Name and version the server reported during the handshake.
    #[must_use]
    pub const fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Check that the server is still answering.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails.
    pub async fn ping(&self) -> Result<(), TransportError> {
        self.connection
            .lock()
            .await
            .request(methods::PING, None)
            .await
            .map(|_| ())
    }

    /// Close the server's input and wait briefly for it to exit.
    pub async fn close(self) {
        let Connection {
            writer, mut child, ..
        } = self.connection.into_inner();
        drop(writer);

        if let Some(child) = child.as_mut() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Tool server exited"),
                Ok(Err(e)) => warn!(error = %e, "Failed to wait for tool server"),
                Err(_) => {
                    warn!("Tool server did not exit, killing it");
                    let _ = child.kill().await;
                }
            }
        }
    }
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("server_info", &self.server_info)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolTransport for StdioTransport {
    #[instrument(skip(self))]
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, TransportError> {
        let result = self
            .connection
            .lock()
            .await
            .request(methods::TOOLS_LIST, None)
            .await?;
        let list: ListToolsResult = decode(result)?;
        Ok(list.tools)
    }

    #[instrument(skip(self, arguments), fields(tool = %name))]
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, TransportError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self
            .connection
            .lock()
            .await
            .request(methods::TOOLS_CALL, Some(encode(&params)?))
            .await?;
        let result: CallToolResult = decode(result)?;
        if result.is_error {
            warn!("Tool reported an error");
        }
        Ok(result)
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use sales_assistant_core::protocol::error_codes;
    use sales_assistant_core::tool_catalog;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    use super::*;

    type ServerSide = (Lines<BufReader<ReadHalf<DuplexStream>>>, WriteHalf<DuplexStream>);

    /// A client connected to an in-memory stream, plus the server's end.
    fn pipe() -> (
        BufReader<ReadHalf<DuplexStream>>,
        WriteHalf<DuplexStream>,
        ServerSide,
    ) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        (
            BufReader::new(client_read),
            client_write,
            (BufReader::new(server_read).lines(), server_write),
        )
    }

    async fn next_request(lines: &mut Lines<BufReader<ReadHalf<DuplexStream>>>) -> JsonRpcRequest {
        let line = lines.next_line().await.expect("read").expect("line");
        serde_json::from_str(&line).expect("request")
    }

    async fn reply(writer: &mut WriteHalf<DuplexStream>, response: &JsonRpcResponse) {
        let mut line = serde_json::to_string(response).expect("serialize");
        line.push('\n');
        writer.write_all(line.as_bytes()).await.expect("write");
    }

    async fn handshake(server: &mut ServerSide) {
        let (lines, writer) = server;
        let init = next_request(lines).await;
        assert_eq!(init.method, methods::INITIALIZE);
        assert_eq!(init.id, Some(RequestId::Number(1)));
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": "fake", "version": "0.0.1"}
        });
        reply(writer, &JsonRpcResponse::success(init.id, result)).await;

        let initialized = next_request(lines).await;
        assert_eq!(initialized.method, methods::INITIALIZED);
        assert!(initialized.is_notification());
    }

    #[tokio::test]
    async fn test_handshake_and_list_tools() {
        let (reader, writer, mut server) = pipe();
        let fake = tokio::spawn(async move {
            handshake(&mut server).await;
            let (lines, writer) = &mut server;
            let list = next_request(lines).await;
            assert_eq!(list.method, methods::TOOLS_LIST);
            assert_eq!(list.id, Some(RequestId::Number(2)));
            reply(
                writer,
                &JsonRpcResponse::success(list.id, json!({ "tools": tool_catalog() })),
            )
            .await;
        });

        let transport = StdioTransport::connect(reader, writer).await.expect("connect");
        assert_eq!(transport.server_info().name, "fake");

        let tools = transport.list_tools().await.expect("tools");
        assert_eq!(tools, tool_catalog());
        fake.await.expect("fake server");
    }

    #[tokio::test]
    async fn test_call_tool_skips_unrelated_replies() {
        let (reader, writer, mut server) = pipe();
        let fake = tokio::spawn(async move {
            handshake(&mut server).await;
            let (lines, writer) = &mut server;
            let call = next_request(lines).await;
            assert_eq!(call.method, methods::TOOLS_CALL);
            let params: CallToolParams =
                serde_json::from_value(call.params.clone().expect("params")).expect("params");
            assert_eq!(params.name, "GetShopPerformance");
            assert_eq!(params.arguments, json!({"shop_id": 3}));

            reply(
                writer,
                &JsonRpcResponse::success(Some(RequestId::Number(99)), json!({})),
            )
            .await;
            let result = CallToolResult::success(json!({"shop_id": 3}));
            reply(
                writer,
                &JsonRpcResponse::success(call.id, serde_json::to_value(result).expect("value")),
            )
            .await;
        });

        let transport = StdioTransport::connect(reader, writer).await.expect("connect");
        let result = transport
            .call_tool("GetShopPerformance", json!({"shop_id": 3}))
            .await
            .expect("call");
        assert!(!result.is_error);
        assert_eq!(
            result.structured_content,
            Some(json!({"result": {"shop_id": 3}}))
        );
        fake.await.expect("fake server");
    }

    #[tokio::test]
    async fn test_rpc_error_is_returned() {
        let (reader, writer, mut server) = pipe();
        let fake = tokio::spawn(async move {
            handshake(&mut server).await;
            let (lines, writer) = &mut server;
            let call = next_request(lines).await;
            reply(
                writer,
                &JsonRpcResponse::failure(call.id, JsonRpcError::invalid_params("bad shop_id")),
            )
            .await;
        });

        let transport = StdioTransport::connect(reader, writer).await.expect("connect");
        let err = transport
            .call_tool("GetShopPerformance", json!({"shop_id": "x"}))
            .await
            .expect_err("rejected");
        assert!(matches!(
            err,
            TransportError::Rpc(ref e) if e.code == error_codes::INVALID_PARAMS
        ));
        fake.await.expect("fake server");
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (reader, writer, mut server) = pipe();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let fake = tokio::spawn(async move {
            handshake(&mut server).await;
            let (lines, _writer) = &mut server;
            let call = next_request(lines).await;
            let _ = seen_tx.send(call.method);
            // Keep the pipe open without ever answering.
            let _ = lines.next_line().await;
        });

        let transport = StdioTransport::connect(reader, writer)
            .await
            .expect("connect")
            .with_request_timeout(Duration::from_millis(50));
        let err = transport
            .call_tool("GetShopPerformance", json!({"shop_id": 1}))
            .await
            .expect_err("no reply");
        assert!(
            matches!(err, TransportError::Timeout { ref method, .. } if method == methods::TOOLS_CALL),
            "{err:?}"
        );
        assert_eq!(seen_rx.await.expect("request seen"), methods::TOOLS_CALL);

        drop(transport);
        fake.await.expect("fake server");
    }

    #[tokio::test]
    async fn test_server_closing_is_closed_error() {
        let (reader, writer, server) = pipe();
        drop(server);
        let err = StdioTransport::connect(reader, writer)
            .await
            .expect_err("no server");
        assert!(matches!(err, TransportError::Io(_) | TransportError::Closed));
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let command = ServerCommand {
            program: "/nonexistent/sales-assistant-server".to_string(),
            args: Vec::new(),
        };
        let err = StdioTransport::spawn(&command).await.expect_err("no binary");
        assert!(matches!(err, TransportError::Spawn { .. }));
    }
}
