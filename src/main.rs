//! `nexus-console`: command-line front end for the Nexus management console.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse arguments
//!   3. Load config (file → env → flags)
//!   4. Init logger at the resolved level
//!   5. Build the console and run one command on a current-thread runtime

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::info;

use nexus_console::api::chat::{A2aMessage, McpRequest};
use nexus_console::api::types::{EntityId, NewAgent};
use nexus_console::confirm::{Confirm, TerminalConfirm};
use nexus_console::modal::{ModalOutcome, ToolModal};
use nexus_console::pages::AgenciesPage;
use nexus_console::routes::Route;
use nexus_console::config::Overrides;
use nexus_console::console::lookup;
use nexus_console::{AppError, Console, config, logger};

#[derive(Debug, Parser)]
#[command(name = "nexus-console", version, about = "Manage agencies, agents and tools")]
struct Cli {
    /// Config file (default: config/default.toml if present).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Backend base URL, overrides config and NEXUS_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level, overrides config, NEXUS_LOG_LEVEL and RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a route, e.g. `/agencies/3`.
    Open { route: String },
    #[command(subcommand)]
    Agency(AgencyCommand),
    #[command(subcommand)]
    Agent(AgentCommand),
    #[command(subcommand)]
    Tool(ToolCommand),
    #[command(subcommand)]
    Link(LinkCommand),
    /// Render an agency's workflow graph.
    Workflow { agency: String },
    #[command(subcommand)]
    Chat(ChatCommand),
}

#[derive(Debug, Args)]
struct DeleteArgs {
    id: String,
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Debug, Subcommand)]
enum AgencyCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Debug, Subcommand)]
enum AgentCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Debug, Subcommand)]
enum ToolCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        kind: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Debug, Subcommand)]
enum LinkCommand {
    /// Link (or with --remove, unlink) an agent to an agency.
    AgencyAgent {
        agency: String,
        agent: String,
        #[arg(long)]
        remove: bool,
    },
    /// Link (or with --remove, unlink) a tool to an agent.
    AgentTool {
        agent: String,
        tool: String,
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ChatCommand {
    /// Send an agent-to-agent message with a JSON object payload.
    A2a { sender: i64, receiver: i64, payload: String },
    /// Invoke a registered tool with a JSON object of arguments.
    Mcp { tool: String, args: String },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let flags = Overrides { api_url: cli.api_url.as_deref(), log_level: cli.log_level.as_deref() };
    let config = config::load(cli.config.as_deref(), flags)?;
    logger::init(&config.log_level, cli.log_level.is_some())?;

    info!(base_url = %config.api.base_url, log_level = %config.log_level, "config loaded");

    let console = Console::new(&config.api)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(execute(&console, cli.command));
    console.dispose();
    result
}

async fn execute(console: &Console, command: Command) -> Result<(), AppError> {
    match command {
        Command::Open { route } => {
            print!("{}", console.open(&Route::parse(&route)).await);
        }
        Command::Workflow { agency } => {
            let route = Route::Workflow { agency_id: EntityId::from(agency) };
            print!("{}", console.open(&route).await);
        }
        Command::Agency(cmd) => agency(console, cmd).await?,
        Command::Agent(cmd) => agent(console, cmd).await?,
        Command::Tool(cmd) => tool(console, cmd).await?,
        Command::Link(cmd) => link(console, cmd).await?,
        Command::Chat(cmd) => chat(console, cmd).await?,
    }
    Ok(())
}

fn confirmer(yes: bool) -> impl FnMut(&str) -> bool {
    move |prompt: &str| yes || TerminalConfirm.confirm(prompt)
}

fn blocked(what: &str) -> AppError {
    AppError::Usage(format!("{what}: name must not be blank"))
}

async fn agency(console: &Console, cmd: AgencyCommand) -> Result<(), AppError> {
    match cmd {
        AgencyCommand::Create { name, description } => {
            let mut page = AgenciesPage::new(&console.agencies);
            page.mount().await?;
            page.form.name = name;
            page.form.description = description.unwrap_or_default();
            page.submit_create().await?.ok_or_else(|| blocked("create agency"))?;
            print!("{}", page.render());
        }
        AgencyCommand::Update { id, name, description } => {
            console.agencies.fetch_all().await?;
            let id = EntityId::from(id);
            lookup(&console.agencies, &id)?;
            let mut page = console.agency_page(id);
            page.start_edit();
            if let Some(name) = name {
                page.form.name = name;
            }
            if let Some(description) = description {
                page.form.description = description;
            }
            let saved = page.submit_update().await?.ok_or_else(|| blocked("update agency"))?;
            println!("updated agency {} ({})", saved.name, saved.id);
        }
        AgencyCommand::Delete(DeleteArgs { id, yes }) => {
            console.agencies.fetch_all().await?;
            let id = EntityId::from(id);
            lookup(&console.agencies, &id)?;
            let mut page = console.agency_page(id);
            if page.delete(&mut confirmer(yes)).await? {
                println!("deleted");
            } else {
                println!("cancelled");
            }
        }
    }
    Ok(())
}

async fn agent(console: &Console, cmd: AgentCommand) -> Result<(), AppError> {
    match cmd {
        AgentCommand::Create { name, role } => {
            if name.trim().is_empty() {
                return Err(blocked("create agent"));
            }
            let created = console.agents.create(NewAgent { name, role }).await?;
            println!("created agent {} ({})", created.name, created.id);
        }
        AgentCommand::Update { id, name, role } => {
            console.agents.fetch_all().await?;
            let id = EntityId::from(id);
            lookup(&console.agents, &id)?;
            // Agents are reached through an agency in the route table; the
            // agency segment only feeds the back link.
            let mut page = console.agent_page(EntityId::from(""), id);
            page.start_edit();
            if let Some(name) = name {
                page.form.name = name;
            }
            if let Some(role) = role {
                page.form.role = role;
            }
            let saved = page.submit_update().await?.ok_or_else(|| blocked("update agent"))?;
            println!("updated agent {} ({})", saved.name, saved.id);
        }
        AgentCommand::Delete(DeleteArgs { id, yes }) => {
            console.agents.fetch_all().await?;
            let id = EntityId::from(id);
            lookup(&console.agents, &id)?;
            let mut page = console.agent_page(EntityId::from(""), id);
            if page.delete(&mut confirmer(yes)).await? {
                println!("deleted");
            } else {
                println!("cancelled");
            }
        }
    }
    Ok(())
}

async fn tool(console: &Console, cmd: ToolCommand) -> Result<(), AppError> {
    let mut modal = ToolModal::new();
    let outcome = match cmd {
        ToolCommand::Create { name, kind } => {
            modal.open(None);
            modal.name = name;
            modal.kind = kind.unwrap_or_default();
            modal.submit(&console.tools).await?
        }
        ToolCommand::Update { id, name, kind } => {
            open_existing(console, &mut modal, &id).await?;
            if let Some(name) = name {
                modal.name = name;
            }
            if let Some(kind) = kind {
                modal.kind = kind;
            }
            modal.submit(&console.tools).await?
        }
        ToolCommand::Delete(DeleteArgs { id, yes }) => {
            open_existing(console, &mut modal, &id).await?;
            modal.delete(&console.tools, &mut confirmer(yes)).await?
        }
    };

    match outcome {
        ModalOutcome::Saved(tool) => println!("saved tool {} ({})", tool.name, tool.id),
        ModalOutcome::Deleted => println!("deleted"),
        ModalOutcome::Declined => println!("cancelled"),
        ModalOutcome::Blocked => return Err(blocked("tool")),
    }
    Ok(())
}

async fn open_existing(console: &Console, modal: &mut ToolModal, id: &str) -> Result<(), AppError> {
    console.tools.fetch_all().await?;
    let tool = lookup(&console.tools, &EntityId::from(id))?;
    modal.open(Some(tool));
    Ok(())
}

async fn link(console: &Console, cmd: LinkCommand) -> Result<(), AppError> {
    match cmd {
        LinkCommand::AgencyAgent { agency, agent, remove } => {
            console.agencies.fetch_all().await?;
            let agency = EntityId::from(agency);
            lookup(&console.agencies, &agency)?;
            let mut page = console.agency_page(agency);
            page.mount().await?;
            let agent = EntityId::from(agent);
            if remove {
                page.remove_agent(&agent).await?;
            } else {
                page.assign_agent(&agent).await?;
            }
            print!("{}", page.render());
        }
        LinkCommand::AgentTool { agent, tool, remove } => {
            console.agents.fetch_all().await?;
            let agent = EntityId::from(agent);
            lookup(&console.agents, &agent)?;
            let mut page = console.agent_page(EntityId::from(""), agent);
            page.mount().await?;
            let tool = EntityId::from(tool);
            if remove {
                page.remove_tool(&tool).await?;
            } else {
                page.assign_tool(&tool).await?;
            }
            print!("{}", page.render());
        }
    }
    Ok(())
}

async fn chat(console: &Console, cmd: ChatCommand) -> Result<(), AppError> {
    let reply = match cmd {
        ChatCommand::A2a { sender, receiver, payload } => {
            let message = A2aMessage {
                sender_agent_id: sender,
                receiver_agent_id: receiver,
                payload: json_object(&payload)?,
            };
            console.client().send_a2a(&message).await?
        }
        ChatCommand::Mcp { tool, args } => {
            let request = McpRequest { tool_name: tool, args: json_object(&args)? };
            console.client().call_mcp_tool(&request).await?
        }
    };
    let pretty = serde_json::to_string_pretty(&Value::Object(reply))
        .map_err(|e| AppError::Usage(format!("cannot format reply: {e}")))?;
    println!("{pretty}");
    Ok(())
}

fn json_object(raw: &str) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Usage("expected a JSON object".into())),
        Err(e) => Err(AppError::Usage(format!("invalid JSON: {e}"))),
    }
}
