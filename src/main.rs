//! Binary entrypoint for the Codyssey CLI.
//!
//! Commands:
//! - `serve` - run the progress server
//! - `init` - write a starter `config.toml` and seed the store with the starter world
//! - `seed --dir <path>` - load content tables from a directory of JSON files
//! - `create-admin <name>` - create or promote an administrator (password prompted)
//! - `status` - print record counts
//! - `play --username <name> [--local]` - play in the terminal
//!
//! See the library crate docs for module-level details: `codyssey::`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use codyssey::api::ApiServer;
use codyssey::auth::AuthService;
use codyssey::config::Config;
use codyssey::content::{
    load_content_from_dir, starter_content, ContentBundle, ContentStore, ContentStoreBuilder,
    DialogueRecord, InventoryRecord, PlayerProgressRecord, QuestRecord, SessionRecord,
    SubquestRecord, UserRecord,
};
use codyssey::game::{run_terminal, HttpProgressClient, ProgressApi, SceneController, StoreProgressClient};

#[derive(Parser)]
#[command(name = "codyssey")]
#[command(about = "The Codyssey: an educational adventure game and its progress server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the progress server
    Serve,
    /// Write a default configuration and seed the store
    Init,
    /// Load content tables from JSON seed files
    Seed {
        /// Directory holding quests.json, dialogue.json, ...
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Create an administrator account, or promote an existing user
    CreateAdmin {
        username: String,
    },
    /// Show record counts
    Status,
    /// Play in the terminal
    Play {
        #[arg(short, long)]
        username: String,
        /// Use the local store directly instead of a running server
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    match &cli.command {
        // Playing in the terminal keeps stdout for the game.
        Commands::Play { .. } => init_logging(&pre_config, cli.verbose, false),
        _ => init_logging(&pre_config, cli.verbose, true),
    }

    match cli.command {
        Commands::Serve => {
            let config = load_config(pre_config, &cli.config).await?;
            info!("Starting Codyssey v{}", env!("CARGO_PKG_VERSION"));
            let seed = seed_bundle(&config.storage.seed_dir)?;
            let store = ContentStoreBuilder::new(config.storage.db_path())
                .with_seed(seed)
                .open()?;
            ApiServer::new(&config, Arc::new(store))?.run().await?;
        }
        Commands::Init => {
            info!("Initializing new Codyssey configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let config = Config::default();
            tokio::fs::create_dir_all(&config.storage.data_dir).await?;
            let store = ContentStoreBuilder::new(config.storage.db_path()).open()?;
            if store.is_seeded()? {
                info!("Store at {} already has content", config.storage.db_path().display());
            } else {
                let written = store.load_bundle(&starter_content()?)?;
                info!("Seeded {} starter records", written);
            }
        }
        Commands::Seed { dir } => {
            let config = load_config(pre_config, &cli.config).await?;
            let dir = dir.unwrap_or_else(|| config.storage.seed_dir.clone());
            let bundle = load_content_from_dir(&dir)?;
            let store = ContentStoreBuilder::new(config.storage.db_path()).open()?;
            let written = store.load_bundle(&bundle)?;
            println!("Loaded {} records from {}.", written, dir);
        }
        Commands::CreateAdmin { username } => {
            let config = load_config(pre_config, &cli.config).await?;
            let store = Arc::new(open_store(&config)?);
            let auth = AuthService::new(store, &config.security)?;
            println!("Setting password for administrator '{}'.", username);
            let pass1 = rpassword::prompt_password("New password: ")?;
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }
            match auth.create_admin(&username, &pass1) {
                Ok(user) => println!("Administrator '{}' is ready.", user.username),
                Err(e) => println!("Error: {}", e),
            }
        }
        Commands::Status => {
            let config = load_config(pre_config, &cli.config).await?;
            let store = open_store(&config)?;
            show_status(&store, &config)?;
        }
        Commands::Play { username, local } => {
            let config = load_config(pre_config, &cli.config).await?;
            let api: Box<dyn ProgressApi> = if local {
                let store = Arc::new(open_store(&config)?);
                let auth = AuthService::new(Arc::clone(&store), &config.security)?;
                let user = auth.user(&username)?;
                Box::new(StoreProgressClient::new(store, &user.user_id))
            } else {
                let mut client = HttpProgressClient::new(&config.client);
                let password = rpassword::prompt_password("Password: ")?;
                let user = client.login(&username, &password).await?;
                info!("Logged in as {}", user.username);
                Box::new(client)
            };
            let mut scene = SceneController::create(api, &config.game).await?;
            let stdin = std::io::stdin();
            run_terminal(&mut scene, stdin.lock(), std::io::stdout()).await?;
        }
    }

    Ok(())
}

async fn load_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    match pre_config {
        Some(config) => Ok(config),
        None => Config::load(path).await,
    }
}

fn open_store(config: &Config) -> Result<ContentStore> {
    let path = config.storage.db_path();
    if !path.exists() {
        return Err(anyhow!(
            "no store at {} (run `codyssey init` first)",
            path.display()
        ));
    }
    Ok(ContentStoreBuilder::new(path).open()?)
}

/// Seed files from disk when present, else the embedded starter world.
fn seed_bundle(seed_dir: &str) -> Result<ContentBundle> {
    if Path::new(seed_dir).is_dir() {
        match load_content_from_dir(seed_dir) {
            Ok(bundle) => return Ok(bundle),
            Err(e) => warn!("Ignoring seed directory {}: {}", seed_dir, e),
        }
    }
    Ok(starter_content()?)
}

fn show_status(store: &ContentStore, config: &Config) -> Result<()> {
    println!("Codyssey v{}", env!("CARGO_PKG_VERSION"));
    println!("Store: {}", config.storage.db_path().display());
    println!("Server: {}", config.server.bind);
    println!("Quests: {}", store.count::<QuestRecord>()?);
    println!("Subquests: {}", store.count::<SubquestRecord>()?);
    println!("Dialogue lines: {}", store.count::<DialogueRecord>()?);
    println!("Users: {}", store.count::<UserRecord>()?);
    println!("Sessions: {}", store.count::<SessionRecord>()?);
    println!("Progress entries: {}", store.count::<PlayerProgressRecord>()?);
    println!("Inventory entries: {}", store.count::<InventoryRecord>()?);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8, console: bool) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());
    let opened = file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match opened {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only when attached to a terminal
            let is_tty = console && atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if record.target() == "security" {
                    if let Some(ref sec_path) = security_path {
                        if let Ok(mut sf) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(sec_path)
                        {
                            let _ = writeln!(sf, "{}", line);
                        }
                    }
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
