//! blueprint CLI - Project scaffolding from versioned blueprint registries

mod commands;
mod context;

use anyhow::Result;
use blueprint_core::{CancelToken, ProductConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// blueprint product configuration
#[derive(Clone)]
pub struct BlueprintConfig;

impl ProductConfig for BlueprintConfig {
    fn name(&self) -> &'static str {
        "blueprint"
    }

    fn display_name(&self) -> &'static str {
        "Blueprint"
    }

    fn default_registry(&self) -> &'static str {
        "registry.json"
    }

    fn registry_env(&self) -> &'static str {
        "BLUEPRINT_REGISTRY"
    }

    fn cli_description(&self) -> &'static str {
        "CLI for scaffolding projects from blueprint registries"
    }

    fn user_agent(&self) -> &'static str {
        concat!("blueprint/", env!("CARGO_PKG_VERSION"))
    }
}

#[derive(Parser, Debug)]
#[command(name = "blueprint")]
#[command(about = "CLI for scaffolding projects from blueprint registries")]
#[command(version)]
pub struct Args {
    /// Registry location: a local JSON file or an http(s) URL (defaults to $BLUEPRINT_REGISTRY, then registry.json)
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List blueprints in the registry
    List,
    /// Show one blueprint record
    Show {
        /// Blueprint name
        name: String,
        /// Exact version to show instead of the first match
        #[arg(long = "blueprint-version")]
        version: Option<String>,
    },
    /// Create a new project from a registry blueprint
    New(NewArgs),
    /// Render a local template directory without consulting the registry
    Render(RenderArgs),
    /// Bump a blueprint's version in a local registry file
    Bump {
        /// Blueprint name
        name: String,
        /// major, minor or patch (anything else is treated as patch)
        kind: String,
    },
    /// Print the result of bumping a version string
    BumpVersion {
        /// Version to bump, e.g. 1.2.3-rc1
        version: String,
        /// major, minor or patch (anything else is treated as patch)
        kind: String,
    },
}

/// Options shared by every command that renders templates
#[derive(clap::Args, Debug, Clone)]
pub struct ContextArgs {
    /// Context value as key=value; dotted keys create nested objects (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// YAML or JSON file with context values (--set entries override it)
    #[arg(short, long)]
    pub context: Option<PathBuf>,

    /// Render the content of every file, not only *.tmpl files
    #[arg(long)]
    pub all: bool,

    /// Render undefined context keys as empty instead of failing
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Blueprint name
    pub name: String,

    /// Project directory to create
    pub directory: PathBuf,

    /// Exact blueprint version (defaults to the first record with the name)
    #[arg(long = "blueprint-version")]
    pub version: Option<String>,

    /// Directory for extracted blueprint archives
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Template source directory
    pub source: PathBuf,

    /// Destination directory
    pub directory: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Ctrl+C stops further writes; files already rendered stay on disk
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let mut interrupted = false;
    ctrlc::set_handler(move || {
        if interrupted {
            std::process::exit(130);
        }
        interrupted = true;
        handler_token.cancel();
    })
    .ok();

    let config = BlueprintConfig;
    let registry = config.registry_location(args.registry.as_deref());

    match args.command {
        Command::List => commands::list(&config, &registry, &cancel).await,
        Command::Show { name, version } => {
            commands::show(&config, &registry, &name, version.as_deref(), &cancel).await
        }
        Command::New(new_args) => commands::new_project(&config, &registry, new_args, &cancel).await,
        Command::Render(render_args) => commands::render(render_args, &cancel).await,
        Command::Bump { name, kind } => commands::bump(&registry, &name, &kind).await,
        Command::BumpVersion { version, kind } => commands::bump_version(&version, &kind),
    }
}
