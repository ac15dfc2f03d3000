//! Daily Task Reminder
//!
//! MCP server, reminder daemon and one-shot task CLI over a shared JSON task
//! file.

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, Content, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
    transport::io::stdio,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use task_reminder::cli::{Cli, Command};
use task_reminder::config::{Config, ConfigLoader, ConfigPaths};
use task_reminder::logging;
use task_reminder::scheduler::{Deliver, Notifier, ReminderScheduler, TerminalTarget};
use task_reminder::store::TaskStore;
use task_reminder::tools::{ToolRequest, ToolRouter};
use tracing::{debug, info};

const INSTRUCTIONS: &str = "\
Daily task reminders. Add tasks with addtask(title, due_at?, remind_at?), review them with listtasks(filter?) and finish them with completetask(task_id).
Ids may be shortened to any unique prefix of 4+ characters. Reminders are delivered by the server once remind_at passes.";

/// MCP server handler. Every `tools/call` goes through [`ToolRouter::dispatch`].
#[derive(Clone)]
struct TaskReminderServer {
    router: Arc<ToolRouter>,
    next_request: Arc<AtomicU64>,
}

impl TaskReminderServer {
    fn new(router: Arc<ToolRouter>) -> Self {
        Self {
            router,
            next_request: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl ServerHandler for TaskReminderServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "task-reminder".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.router.definitions(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let id = format!("mcp-{}", self.next_request.fetch_add(1, Ordering::Relaxed));
        let tool_request = ToolRequest::new(
            id,
            request.name.to_string(),
            Value::Object(request.arguments.unwrap_or_default()),
        );

        // Store transactions block on file locks.
        let router = Arc::clone(&self.router);
        let response = tokio::task::spawn_blocking(move || router.dispatch(tool_request))
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        let text = serde_json::to_string(&response)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(CallToolResult {
            content: vec![Content::text(text)],
            is_error: Some(!response.is_success()),
            meta: None,
            structured_content: None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log, cli.verbose)?;

    let loader = ConfigLoader::load(ConfigPaths::discover(cli.config.clone()), &cli.overrides())?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }
    let config = loader.into_config();

    let storage_path = config.storage_path();
    let store = TaskStore::open_with(&storage_path, config.store_options())
        .with_context(|| format!("failed to open task file {}", storage_path.display()))?;
    let store = Arc::new(store);
    info!(path = %storage_path.display(), "Task store ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(store, &config).await,
        Command::Watch => watch(store, &config).await,
        command => run_once(store, &config, &command),
    }
}

fn scheduler(store: Arc<TaskStore>, config: &Config, target: TerminalTarget) -> ReminderScheduler {
    let notifier: Arc<dyn Deliver> = Arc::new(
        Notifier::new(config.timezone())
            .with_target(target)
            .with_desktop(config.reminders.desktop_notifications),
    );
    ReminderScheduler::new(store, notifier).with_interval(config.poll_interval())
}

/// MCP over stdio, with reminders on stderr so they never mix with the protocol.
async fn serve(store: Arc<TaskStore>, config: &Config) -> Result<()> {
    let router = Arc::new(ToolRouter::standard(Arc::clone(&store), config.timezone()));
    let reminders = scheduler(store, config, TerminalTarget::Stderr).start();

    info!(tools = ?router.tool_names(), "Server ready, listening on stdio");
    let server = TaskReminderServer::new(router);
    let outcome = async {
        let service = server.serve(stdio()).await?;
        service.waiting().await?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    reminders.stop().await;
    outcome
}

/// Scheduler only, until Ctrl-C.
async fn watch(store: Arc<TaskStore>, config: &Config) -> Result<()> {
    let reminders = scheduler(store, config, TerminalTarget::Stdout).start();
    info!("Watching for reminders, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    reminders.stop().await;
    Ok(())
}

/// Dispatch one task command and print the response envelope.
fn run_once(store: Arc<TaskStore>, config: &Config, command: &Command) -> Result<()> {
    let router = ToolRouter::standard(store, config.timezone());
    let Some(request) = command.to_request("cli") else {
        return Ok(());
    };
    let response = router.dispatch(request);
    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
