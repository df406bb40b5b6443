//! Client for a remote MCP knowledge tool over streamable HTTP
//!
//! The connection is opened with [`KnowledgeClient::connect`] and must be
//! released with [`KnowledgeClient::close`] once the run is over; dropping an
//! open client logs a warning.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientInfo, Implementation, JsonObject, Tool,
};
use rmcp::service::RunningService;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{Peer, RoleClient, ServiceExt};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{Error, Result};

type Session = RunningService<RoleClient, ClientInfo>;

/// A tool advertised by the server
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl From<Tool> for ToolInfo {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// Open connection to a knowledge server
#[derive(Debug)]
pub struct KnowledgeClient {
    url: String,
    timeout: Duration,
    peer: Peer<RoleClient>,
    session: Mutex<Option<Session>>,
    tools: Vec<ToolInfo>,
    closed: AtomicBool,
}

impl KnowledgeClient {
    /// Initialize a session and fetch the tool list
    #[instrument(skip(timeout))]
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let transport = StreamableHttpClientTransport::from_config(
            StreamableHttpClientTransportConfig::with_uri(url.to_string()),
        );
        let client_info = ClientInfo {
            client_info: Implementation {
                name: "pixel-perfect".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let session = bounded(timeout, "initialize", client_info.serve(transport)).await?;
        let server = session
            .peer_info()
            .map(|info| info.server_info.name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let tools = match bounded(timeout, "tools/list", session.list_all_tools()).await {
            Ok(tools) => tools.into_iter().map(ToolInfo::from).collect::<Vec<_>>(),
            Err(e) => {
                release(session).await;
                return Err(e);
            }
        };

        info!(url, server = %server, tools = tools.len(), "Connected to knowledge tool");
        Ok(Self {
            url: url.to_string(),
            timeout,
            peer: session.peer().clone(),
            session: Mutex::new(Some(session)),
            tools,
            closed: AtomicBool::new(false),
        })
    }

    /// Endpoint this client talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tools advertised at connect time
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Call a tool and return its text content
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        if self.is_closed() {
            return Err(Error::Knowledge("Connection is closed".to_string()));
        }
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(Error::Knowledge(format!(
                    "Tool arguments must be an object, got {}",
                    other
                )))
            }
        };

        let request = CallToolRequestParam {
            meta: None,
            name: name.to_string().into(),
            arguments,
            task: None,
        };
        let result = bounded(self.timeout, "tools/call", self.peer.call_tool(request)).await?;
        let text = extract_text(&result);

        if result.is_error == Some(true) {
            return Err(Error::Knowledge(format!("Tool {} failed: {}", name, text)));
        }
        Ok(text)
    }

    /// Ask the server's search tool about `query`
    ///
    /// Returns `None` when the server has no tool that takes a text query.
    pub async fn lookup(&self, query: &str) -> Result<Option<String>> {
        let Some((tool, argument)) = search_tool(&self.tools) else {
            debug!("Knowledge tool has no search tool");
            return Ok(None);
        };
        let mut arguments = JsonObject::new();
        arguments.insert(argument, Value::String(query.to_string()));

        debug!(tool = %tool.name, "Knowledge lookup");
        self.call_tool(&tool.name, Value::Object(arguments))
            .await
            .map(Some)
    }

    /// End the server session
    ///
    /// Safe to call more than once; only the first call contacts the server.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let session = self
            .session
            .lock()
            .map_err(|_| Error::Knowledge("Session lock poisoned".to_string()))?
            .take();
        if let Some(session) = session {
            release(session).await;
        }

        info!(url = %self.url, "Closed knowledge tool connection");
        Ok(())
    }
}

impl Drop for KnowledgeClient {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(url = %self.url, "Knowledge tool connection dropped without close()");
        }
    }
}

/// Run one protocol step under the connection timeout
async fn bounded<T, E, F>(timeout: Duration, step: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::Knowledge(format!("{} failed: {}", step, e))),
        Err(_) => Err(Error::Knowledge(format!(
            "{} timed out after {:?}",
            step, timeout
        ))),
    }
}

/// Cancel the session; the transport deletes it on the server on the way out
async fn release(session: Session) {
    if let Err(e) = session.cancel().await {
        warn!(error = %e, "Knowledge session did not shut down cleanly");
    }
}

/// Text items of a `tools/call` result, joined by newlines
fn extract_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|item| item.as_text())
        .map(|text| text.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pick a search-like tool and the string argument to put the query in
fn search_tool(tools: &[ToolInfo]) -> Option<(&ToolInfo, String)> {
    let tool = tools
        .iter()
        .find(|t| t.name.contains("search"))
        .or_else(|| tools.iter().find(|t| t.name.contains("docs")))?;

    let properties = tool.input_schema.get("properties")?.as_object()?;
    if properties.contains_key("query") {
        return Some((tool, "query".to_string()));
    }
    properties
        .iter()
        .find(|(_, schema)| schema.get("type").and_then(Value::as_str) == Some("string"))
        .map(|(name, _)| (tool, name.clone()))
}
