//! MCP stdio surface for the document store tools.
//!
//! Exposes exactly three read-only tools — `search`, `list_documents`,
//! `get_document_info` — over the standard JSON-RPC stdio transport. Tool
//! payloads (including `{"error": ...}` results from the handler boundary)
//! are passed through as serialized text content.

use std::borrow::Cow;
use std::sync::Arc;

use docstore_core::{ToolHandlers, DEFAULT_SEARCH_RESULTS};
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct DocstoreService {
    tools: Arc<ToolHandlers>,
}

impl DocstoreService {
    pub fn new(tools: Arc<ToolHandlers>) -> Self {
        Self { tools }
    }

    fn tool_descriptor(name: &str, description: &str, schema: Value) -> Tool {
        let input_schema = match schema {
            Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(name.to_string()),
            title: None,
            description: Some(Cow::Owned(description.to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    fn tool_descriptors() -> Vec<Tool> {
        vec![
            Self::tool_descriptor(
                "search",
                "Search indexed PDF documents for relevant chunks. \
                 Returns matching chunks with their source filenames.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search text; must not be empty."
                        },
                        "n_results": {
                            "type": "integer",
                            "description": "Maximum number of chunks to return.",
                            "default": DEFAULT_SEARCH_RESULTS
                        },
                        "document": {
                            "type": "string",
                            "description": "Optional filename to restrict the search to."
                        }
                    },
                    "required": ["query"]
                }),
            ),
            Self::tool_descriptor(
                "list_documents",
                "List the filenames of all ingested PDF documents.",
                json!({ "type": "object", "properties": {} }),
            ),
            Self::tool_descriptor(
                "get_document_info",
                "Chunk count and embedding status for one ingested document.",
                json!({
                    "type": "object",
                    "properties": {
                        "document": {
                            "type": "string",
                            "description": "Filename of the ingested document."
                        }
                    },
                    "required": ["document"]
                }),
            ),
        ]
    }

    async fn dispatch(&self, name: &str, args: &Value) -> Option<Value> {
        match name {
            "search" => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
                let n_results = args
                    .get("n_results")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
                    .unwrap_or(DEFAULT_SEARCH_RESULTS);
                let document = args.get("document").and_then(Value::as_str);
                Some(self.tools.search(query, n_results, document).await)
            }
            "list_documents" => Some(self.tools.list_documents().await),
            "get_document_info" => {
                let document = args
                    .get("document")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Some(self.tools.get_document_info(document).await)
            }
            _ => None,
        }
    }
}

impl ServerHandler for DocstoreService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "docstore".to_string(),
                title: Some("PDF Document Store".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search over ingested PDF documents. Use the search tool to find \
                 relevant chunks, list_documents to see what has been ingested, and \
                 get_document_info for per-document chunk counts."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(Self::tool_descriptors())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        Self::tool_descriptors()
            .into_iter()
            .find(|tool| tool.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));

        let payload = self.dispatch(&request.name, &args).await.ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let text = serde_json::to_string_pretty(&payload).unwrap_or_default();
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

/// Serves the tools over stdio until the client disconnects.
pub async fn serve_stdio(tools: Arc<ToolHandlers>) -> anyhow::Result<()> {
    use rmcp::transport::stdio;
    use rmcp::ServiceExt;

    let service = DocstoreService::new(tools).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
