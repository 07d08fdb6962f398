//! MCP server over stdio.
//!
//! VendureMcpServer -> tools (registry) + resources (docs cache)
//! Helpers: handle_call / read_document are callable without a live session.
//!
pub mod registry;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion, RawResource,
    ReadResourceRequestParam, ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ServerHandler, ServiceExt};
use serde_json::{Map, Value};

use crate::analysis::{self, AnalysisTask};
use crate::context::ProjectContext;
use crate::docs::{DocsCache, DocumentKind};
use crate::exec::ExecutionDispatcher;
use crate::help;
pub use registry::{ToolEntry, ToolRegistry, ToolRoute};

const RESOURCE_SCHEME: &str = "vendure://";

const INSTRUCTIONS: &str = "Exposes the Vendure CLI of one project as tools.\n\
FLOW:\n\
1) Run the analyse tool (task list_plugins) to discover existing plugins.\n\
2) Use the add_help tool for required parameter combinations.\n\
3) Call the add / add_* tools or migrate.\n\
Documentation is available through get_docs and the vendure://llms.txt / vendure://llms-full.txt resources.";

#[derive(Clone)]
pub struct VendureMcpServer {
    registry: Arc<ToolRegistry>,
    dispatcher: Arc<ExecutionDispatcher>,
    docs: Arc<DocsCache>,
    project: ProjectContext,
    prefix: String,
    cli_binary: String,
}

impl VendureMcpServer {
    pub fn new(
        registry: Arc<ToolRegistry>,
        dispatcher: Arc<ExecutionDispatcher>,
        docs: Arc<DocsCache>,
        project: ProjectContext,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            docs,
            project,
            prefix: "vendure".into(),
            cli_binary: "vendure".into(),
        }
    }

    /// Prefix used in help texts; tool names come from the registry.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Binary name checked by the installation analysis.
    pub fn with_cli_binary(mut self, name: impl Into<String>) -> Self {
        self.cli_binary = name.into();
        self
    }

    /// Serve on stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        tracing::info!(
            project = %self.project.project_path().display(),
            tools = self.registry.len(),
            "starting MCP server on stdio"
        );
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start MCP server")?;
        service.waiting().await.context("MCP server terminated abnormally")?;
        tracing::info!("client disconnected");
        Ok(())
    }

    /// Route one tool call. Unknown tools are protocol errors; everything
    /// else (validation, dispatch failures) is an error result.
    pub async fn handle_call(&self, name: &str, args: Option<Map<String, Value>>) -> Result<CallToolResult, McpError> {
        let Some(entry) = self.registry.get(name) else {
            return Err(McpError::invalid_params(format!("Unknown tool: {name}"), None));
        };
        tracing::debug!(tool = name, "tool call");

        let result = match &entry.route {
            ToolRoute::Command { command } => {
                let bag = match validated(entry, args.as_ref()) {
                    Ok(bag) => bag,
                    Err(msg) => return Ok(error_text(msg)),
                };
                self.dispatch(command, bag).await
            }
            ToolRoute::SubCommand {
                command,
                option,
                value_field,
            } => {
                let bag = match validated(entry, args.as_ref()) {
                    Ok(bag) => bag,
                    Err(msg) => return Ok(error_text(msg)),
                };
                let bare_flag = entry
                    .schema
                    .as_ref()
                    .and_then(|s| s.get(value_field))
                    .is_some_and(|spec| spec.optional_value);
                self.dispatch(command, lift_value_field(bag, option, value_field, bare_flag))
                    .await
            }
            ToolRoute::Docs => match string_arg(args.as_ref(), "type") {
                Some("full") => success_text(self.docs.get(DocumentKind::Full).await),
                Some("standard") => success_text(self.docs.get(DocumentKind::Overview).await),
                Some(other) => error_text(format!("invalid documentation type '{other}': expected full or standard")),
                None => error_text("missing required parameter: type"),
            },
            ToolRoute::Analyse => match string_arg(args.as_ref(), "task") {
                Some(task) => match task.parse::<AnalysisTask>() {
                    Ok(task) => success_text(
                        analysis::run_task(
                            task,
                            self.project.project_path().to_path_buf(),
                            self.cli_binary.clone(),
                        )
                        .await,
                    ),
                    Err(e) => success_text(format!("Error: {e}")),
                },
                None => error_text("missing required parameter: task"),
            },
            ToolRoute::Help => {
                success_text(help::help_content(string_arg(args.as_ref(), "operation"), &self.prefix))
            }
        };
        Ok(result)
    }

    async fn dispatch(&self, command: &str, bag: Map<String, Value>) -> CallToolResult {
        match self
            .dispatcher
            .execute(command, bag, self.project.project_path())
            .await
        {
            Ok(message) => success_text(message),
            Err(e) => error_text(e.to_string()),
        }
    }

    pub fn resources(&self) -> Vec<Resource> {
        [
            (DocumentKind::Overview, "Vendure documentation overview (llms.txt)"),
            (DocumentKind::Full, "Complete Vendure documentation with project context (llms-full.txt)"),
        ]
        .into_iter()
        .map(|(kind, description)| {
            let mut raw = RawResource::new(resource_uri(kind), kind.filename());
            raw.description = Some(description.into());
            raw.mime_type = Some("text/plain".into());
            raw.no_annotation()
        })
        .collect()
    }

    pub async fn read_document(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let kind = [DocumentKind::Overview, DocumentKind::Full]
            .into_iter()
            .find(|k| resource_uri(*k) == uri)
            .ok_or_else(|| McpError::resource_not_found(format!("Unknown resource: {uri}"), None))?;
        let text = self.docs.get(kind).await;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

fn resource_uri(kind: DocumentKind) -> String {
    format!("{RESOURCE_SCHEME}{}", kind.filename())
}

fn validated(entry: &ToolEntry, args: Option<&Map<String, Value>>) -> Result<Map<String, Value>, String> {
    match &entry.schema {
        Some(schema) => schema.validate(args).map_err(|e| e.to_string()),
        None => Ok(args.cloned().unwrap_or_default()),
    }
}

/// Put the sub-command's own value back under the parent option, first in
/// the bag. Without a value the option is passed bare (`--job-queue`) when
/// `bare_flag` allows it and left out otherwise.
fn lift_value_field(
    bag: Map<String, Value>,
    option: &str,
    value_field: &str,
    bare_flag: bool,
) -> Map<String, Value> {
    let mut out = Map::new();
    match bag.get(value_field) {
        Some(own) => {
            out.insert(option.to_string(), own.clone());
        }
        None if bare_flag => {
            out.insert(option.to_string(), Value::Bool(true));
        }
        None => {}
    }
    for (key, value) in bag {
        if key != value_field && key != option {
            out.insert(key, value);
        }
    }
    out
}

fn string_arg<'a>(args: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    args?.get(key)?.as_str()
}

fn success_text(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn error_text(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

impl ServerHandler for VendureMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = env!("CARGO_PKG_NAME").into();
        server_info.version = env!("CARGO_PKG_VERSION").into();
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            server_info,
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.registry.tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.handle_call(&request.name, request.arguments).await }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult::with_all_items(self.resources())))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move { self.read_document(&request.uri).await }
    }
}

/* ---- Tests ---- */
