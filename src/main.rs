use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "lumiere")]
#[command(version, about = "Lumiere perfume storefront: API server and admin tools")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = lumiere::config::CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the storefront API server
    Serve {
        /// Port to serve on (overrides lumiere.toml and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (permissive CORS for a local UI dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database schema without starting the server
    InitDb {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Load the launch catalog into the database
    Seed {
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Seed even when the catalog already has products
        #[arg(long)]
        force: bool,
    },
    /// View, validate or create lumiere.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage products on a running server
    Products {
        #[command(flatten)]
        remote: RemoteArgs,

        #[command(subcommand)]
        command: ProductsCommands,
    },
    /// Manage orders on a running server
    Orders {
        #[command(flatten)]
        remote: RemoteArgs,

        #[command(subcommand)]
        command: OrdersCommands,
    },
}

/// How to reach and authenticate against a running server.
#[derive(Args, Clone, Debug)]
pub struct RemoteArgs {
    /// Server base URL
    #[arg(long, env = "LUMIERE_URL", default_value = "http://127.0.0.1:5050")]
    pub url: String,

    /// Admin bearer token (skips login)
    #[arg(long, env = "LUMIERE_TOKEN")]
    pub token: Option<String>,

    /// Admin username (defaults to lumiere.toml)
    #[arg(long, env = "LUMIERE_ADMIN_USER")]
    pub username: Option<String>,

    /// Admin password (defaults to lumiere.toml)
    #[arg(long, env = "LUMIERE_ADMIN_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default lumiere.toml file
    Init,
}

#[derive(Subcommand, Clone)]
pub enum ProductsCommands {
    /// List every product with price and stock
    List,
    /// Hide a product from the collection page
    Hide { id: String },
    /// Show a hidden product on the collection page again
    Show { id: String },
    /// Add units to one size
    Restock {
        id: String,
        /// Size label, e.g. 50ml
        size: String,
        amount: u32,
    },
    /// Delete a product
    Delete { id: String },
}

#[derive(Subcommand, Clone)]
pub enum OrdersCommands {
    /// List orders, newest first
    List {
        /// pending, confirmed, cancelled or all
        #[arg(long)]
        status: Option<String>,

        /// Match order number, customer name or email
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Set an order's status
    Status {
        id: String,
        /// pending, confirmed or cancelled
        status: String,
    },
    /// Mark an order shipped
    Ship {
        id: String,
        /// Clear the shipped flag instead
        #[arg(long)]
        undo: bool,
    },
    /// Mark an order delivered
    Deliver {
        id: String,
        /// Clear the delivered flag instead
        #[arg(long)]
        undo: bool,
    },
}

fn init_tracing(json: bool, verbose: bool) {
    let default = if verbose {
        "lumiere=debug,tower_http=debug"
    } else {
        "lumiere=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.verbose);

    match &cli.command {
        Commands::Serve {
            port,
            host,
            db_path,
            dev,
        } => {
            cmd::cmd_serve(&cli.config, *port, host.clone(), db_path.clone(), *dev).await?;
        }
        Commands::InitDb { db_path } => cmd::cmd_init_db(&cli.config, db_path.clone())?,
        Commands::Seed { db_path, force } => cmd::cmd_seed(&cli.config, db_path.clone(), *force)?,
        Commands::Config { command } => cmd::cmd_config(&cli.config, command.clone())?,
        Commands::Products { remote, command } => {
            cmd::cmd_products(&cli.config, remote, command.clone()).await?
        }
        Commands::Orders { remote, command } => {
            cmd::cmd_orders(&cli.config, remote, command.clone()).await?
        }
    }

    Ok(())
}
