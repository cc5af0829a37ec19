use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use inam_core::bulk::{BulkCreator, EntryOutcome, Mode};
use inam_core::conduit::ConduitClient;
use inam_core::config::{load_config, load_global_config, ConnectionSettings};
use inam_core::entities::TaskStatus;
use inam_core::list::{collect, ListRequest};
use inam_core::recipients::load_bulk_config;
use inam_core::resolve::split_names;
use inam_render::render_forest;

mod version;

#[derive(Parser)]
#[command(name = "inam", version = version::FULL, about = "Phabricator task trees and bulk task creation")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Read connection defaults from this TOML file instead of $INAM_HOME/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct Connection {
    /// Phabricator base URI
    #[arg(long, env = "PHAB_URI")]
    phab_uri: Option<String>,
    /// Conduit API token
    #[arg(long, env = "PHAB_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print project and task dependency trees
    List {
        #[command(flatten)]
        connection: Connection,
        /// Comma-separated task names, e.g. T12,T34
        #[arg(long, default_value = "")]
        tasks: String,
        /// Comma-separated project names
        #[arg(long, default_value = "")]
        projects: String,
        /// Status filter for top-level tasks (dependencies are always open)
        #[arg(long, default_value = "open", value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Create one templated task per entry of a YAML recipient file
    BulkCreate {
        #[command(flatten)]
        connection: Connection,
        /// YAML file with templates, shared projects/CC users and entries
        #[arg(long, value_name = "FILE")]
        email_config: PathBuf,
        /// Create the tasks; without this flag the run only logs what it would do
        #[arg(long)]
        actually_create: bool,
    },
    /// Print version information
    Version,
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value).ok_or_else(|| format!("unknown task status: {value}"))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn connection_settings(config: Option<&Path>, connection: Connection) -> Result<ConnectionSettings> {
    let file = match config {
        Some(path) => Some(
            load_config(path).with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => load_global_config(),
    };
    Ok(ConnectionSettings::resolve(
        connection.phab_uri,
        connection.api_token,
        file.as_ref(),
    ))
}

fn dial(settings: &ConnectionSettings) -> Result<ConduitClient> {
    debug!(uri = %settings.phab_uri, "dialing conduit");
    Ok(ConduitClient::dial(&settings.phab_uri, &settings.api_token)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Command::List {
            connection,
            tasks,
            projects,
            status,
        }) => {
            let settings = connection_settings(cli.config.as_deref(), connection)?;
            let client = dial(&settings)?;
            let request = ListRequest {
                projects: split_names(&projects),
                tasks: split_names(&tasks),
                status,
            };
            let listing = collect(&client, &request)?;
            for name in &listing.projects {
                println!("Project: {name}");
            }
            print!("{}", render_forest(&listing.project_tasks));
            print!("{}", render_forest(&listing.named_tasks));
        }
        Some(Command::BulkCreate {
            connection,
            email_config,
            actually_create,
        }) => {
            let settings = connection_settings(cli.config.as_deref(), connection)?;
            let bulk = load_bulk_config(&email_config)?;
            let client = dial(&settings)?;
            let mode = if actually_create {
                Mode::Commit
            } else {
                Mode::DryRun
            };
            let creator = BulkCreator::new(&client, mode);
            info!(mode = ?creator.mode(), entries = bulk.emails.len(), "starting bulk create");
            let outcomes = creator.create_all(&bulk)?;
            let created = outcomes
                .iter()
                .filter(|outcome| matches!(outcome, EntryOutcome::Created { .. }))
                .count();
            info!(entries = outcomes.len(), created, "bulk create finished");
        }
        Some(Command::Version) => {
            println!("inam {}", version::FULL);
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }
    Ok(())
}
