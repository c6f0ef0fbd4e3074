//! Binary entrypoint for the Questdesk CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and an example quest document
//! - `start [--user <name>]` - run the console editor host
//! - `status [--json]` - print guild and document counts
//!
//! See the library crate docs for module-level details: `questdesk::`.
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use questdesk::config::Config;
use questdesk::errors::QuestError;
use questdesk::gui::console::{spawn_stdin_reader, ConsoleHost};
use questdesk::gui::controller::{GuiSettings, QuestGui};
use questdesk::gui::server::QuestServer;
use questdesk::progress::{LogSink, ProgressBridge};
use questdesk::storage::{DocumentStore, GuildKey};

#[derive(Parser)]
#[command(name = "questdesk")]
#[command(about = "Menu-driven editor for guild-grouped quest documents")]
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
    /// Start the console editor
    Start {
        /// Operator identity for the console session
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Write a default configuration and an example quest
    Init,
    /// Show guild and document counts
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { user } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Questdesk v{}", env!("CARGO_PKG_VERSION"));

            let store = DocumentStore::open(&config.storage.quests_dir)
                .with_context(|| format!("opening quest directory {}", config.storage.quests_dir))?;
            let gui = QuestGui::new(store, GuiSettings::from(&config));
            let progress = if config.progress.enabled {
                ProgressBridge::new(Arc::new(LogSink))
            } else {
                ProgressBridge::disconnected()
            };

            let host = ConsoleHost::stdout();
            let open_menus = host.open_menus();
            let mut server = QuestServer::new(gui, host, progress);
            let user = user
                .or_else(|| std::env::var("USER").ok())
                .unwrap_or_else(|| "operator".to_string());
            println!("Questdesk console as '{user}'. Type 'open' to begin, 'help' for commands.");
            let _reader = spawn_stdin_reader(user, server.sender(), server.relay(), open_menus);
            server.run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new Questdesk configuration");
            let cfg = Config::default();
            if tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                warn!("Overwriting existing configuration at {}", cli.config);
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let store = DocumentStore::open(&cfg.storage.quests_dir)?;
            match store.create(&GuildKey::NoGuild, "example") {
                Ok(doc) => info!("Example quest written to {}", store.path_of(&doc.key).display()),
                Err(QuestError::Conflict { key }) => info!("Example quest {} already present", key),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Status { json } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let store = DocumentStore::open(&config.storage.quests_dir)?;
            let groups = store.group_by_guild();
            let total: usize = groups.iter().map(|g| g.documents.len()).sum();

            if json {
                let payload = serde_json::json!({
                    "quests_dir": config.storage.quests_dir,
                    "documents": total,
                    "guilds": groups
                        .iter()
                        .map(|g| serde_json::json!({
                            "name": g.guild.display_name(),
                            "documents": g.documents.len(),
                        }))
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Quest directory: {}", config.storage.quests_dir);
                println!("Documents: {}", total);
                for group in &groups {
                    println!("  {:<24} {}", group.guild.display_name(), group.documents.len());
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins; otherwise the configured level applies
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let audit_path = config.as_ref().and_then(|c| c.logging.audit_file.clone());
    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    let file = file.map(|f| Arc::new(std::sync::Mutex::new(f)));
    // The console host owns the terminal; log lines go there only for interactive runs
    let is_tty = atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        if record.target() == "audit" {
            if let Some(ref path) = audit_path {
                if let Ok(mut af) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
                    let _ = writeln!(af, "{}", line);
                }
            }
        }

        match file {
            Some(ref file) => {
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            }
            None => writeln!(fmt, "{}", line),
        }
    });
    let _ = builder.try_init();
}
