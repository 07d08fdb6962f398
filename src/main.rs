use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

mod analysis;
mod catalog;
mod context;
mod descriptions;
mod docs;
mod exec;
mod help;
mod mcp;
mod schema;
mod utils;

use catalog::CommandCatalog;
use context::ProjectContext;
use descriptions::DescriptionEnhancer;
use docs::{DocsCache, DocsCacheConfig, HttpFetcher};
use exec::ExecutionDispatcher;
use mcp::{ToolRegistry, VendureMcpServer};

/// Vendure MCP - the Vendure CLI as schema-validated MCP tools (stdio transport)
///
/// Tools:
///   vendure_<command>              one per catalog command (add, migrate)
///   vendure_<command>_<sub>        one per option with sub-options (add_entity, add_job_queue, ...)
///   vendure_get_docs               llms.txt / llms-full.txt (cached 24h)
///   vendure_analyse                project scans (list_plugins, get_database_type, ...)
///   vendure_add_help               usage guides for the add tools
///
/// Resources:
///   vendure://llms.txt, vendure://llms-full.txt
///
/// Global flags / env:
///   -v / -vv        Increase verbosity (logs go to stderr; stdout is the MCP stream)
///   -q / --quiet    Errors only
///   RUST_LOG        Overrides the derived log level
///
/// Examples:
///   vendure-mcp --project-path ./my-shop
///   VENDURE_PROJECT_PATH=/srv/shop vendure-mcp -v
///   vendure-mcp --catalog ./commands.yaml --tool-prefix shop
#[derive(Parser, Debug)]
#[command(name = "vendure-mcp", version, author, about = "Vendure MCP - the Vendure CLI as MCP tools")]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Vendure project directory (defaults to the current directory)
    #[arg(long, env = "VENDURE_PROJECT_PATH", value_name = "DIR")]
    project_path: Option<PathBuf>,

    /// Command catalog file (.json, or .yaml/.yml); defaults to the compiled-in catalog
    #[arg(long, env = "VENDURE_MCP_CATALOG", value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Directory for the on-disk documentation cache
    #[arg(long, env = "VENDURE_DOCS_CACHE_DIR", default_value = docs::DEFAULT_CACHE_DIR, value_name = "DIR")]
    cache_dir: PathBuf,

    /// Base URL serving llms.txt / llms-full.txt
    #[arg(long, env = "VENDURE_DOCS_URL", default_value = docs::DEFAULT_BASE_URL, value_name = "URL")]
    docs_url: Url,

    /// Name of the CLI binary under <project>/node_modules/.bin
    #[arg(long, default_value = "vendure", value_name = "NAME")]
    cli_binary: String,

    /// Prefix of every tool name
    #[arg(long, default_value = "vendure", value_name = "PREFIX")]
    tool_prefix: String,

    /// Timeout for documentation fetches
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    fetch_timeout_secs: u64,

    /// Skip the package.json check of the project directory
    #[arg(long)]
    skip_validation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let raw_project = match &cli.project_path {
        Some(p) => p.clone(),
        None => PathBuf::from("."),
    };
    let project = ProjectContext::resolve(&raw_project)?;
    if cli.skip_validation {
        tracing::warn!(project = %project.project_path().display(), "skipping project validation");
    } else {
        project.validate()?;
    }

    let catalog = match &cli.catalog {
        Some(path) => CommandCatalog::load(path)
            .with_context(|| format!("Failed to load command catalog {}", path.display()))?,
        None => CommandCatalog::builtin().context("Compiled-in command catalog is invalid")?,
    };
    tracing::debug!(commands = catalog.len(), "catalog loaded");

    let enhancer = DescriptionEnhancer::vendure().with_cli_binary(cli.cli_binary.clone());
    let registry =
        ToolRegistry::build(&catalog, &enhancer, &cli.tool_prefix).context("Failed to derive tool schemas")?;

    let fetcher = HttpFetcher::new(Duration::from_secs(cli.fetch_timeout_secs))
        .context("Failed to build HTTP client")?;
    let docs_config =
        DocsCacheConfig::new(cli.docs_url.clone(), cli.cache_dir.clone()).with_tool_prefix(cli.tool_prefix.clone());
    let docs = DocsCache::new(docs_config, Arc::new(fetcher), project.clone());

    let dispatcher = ExecutionDispatcher::for_binary(cli.cli_binary.clone());

    VendureMcpServer::new(Arc::new(registry), Arc::new(dispatcher), Arc::new(docs), project)
        .with_prefix(cli.tool_prefix)
        .with_cli_binary(cli.cli_binary)
        .serve_stdio()
        .await
}
