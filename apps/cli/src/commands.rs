//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use sourcedock_client::SourceClient;
use sourcedock_shared::{AppConfig, guard, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SourceDock — fetch topic-relevant documents from every configured source.
#[derive(Parser)]
#[command(
    name = "sourcedock",
    version,
    about = "Query documentation sites, forums, feeds, and local mirrors through one client.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch documents for a topic from one or more sources.
    Fetch {
        /// Topic to search for. Supports boolean syntax:
        /// (mobile OR web) AND crash AND NOT obsolete.
        topic: String,

        /// Source name(s) to query (can be specified multiple times).
        /// Defaults to every enabled source.
        #[arg(short, long)]
        source: Vec<String>,

        /// Maximum documents per source (0 = source default).
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Section(s) to narrow the search to.
        #[arg(long)]
        section: Vec<String>,

        /// Emit raw JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,
    },

    /// List configured sources and their state.
    Sources,

    /// Validate a topic's search syntax against a source's adapter.
    Check {
        /// Source whose adapter should validate the topic.
        source: String,

        /// Topic to validate.
        topic: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
    /// Run the configuration guard and report problems.
    Check,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sourcedock=info",
        1 => "sourcedock=debug",
        _ => "sourcedock=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch {
            topic,
            source,
            limit,
            section,
            json,
        } => cmd_fetch(&topic, &source, limit, &section, json).await,
        Command::Sources => cmd_sources().await,
        Command::Check { source, topic } => cmd_check(&source, &topic).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
            ConfigAction::Check => cmd_config_check().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(
    topic: &str,
    sources: &[String],
    limit: usize,
    sections: &[String],
    json: bool,
) -> Result<()> {
    let client = build_client()?;

    let names: Vec<String> = if sources.is_empty() {
        client.available_sources()
    } else {
        sources.to_vec()
    };
    if names.is_empty() {
        return Err(eyre!(
            "no sources configured — add [[sources]] entries to the config file"
        ));
    }

    info!(topic, sources = names.len(), limit, "fetching");

    let results = if names.len() == 1 {
        let docs = client
            .fetch_from_source(&names[0], topic, sections, limit)
            .await?;
        std::collections::HashMap::from([(names[0].clone(), docs)])
    } else {
        if !sections.is_empty() {
            tracing::warn!("--section is ignored when fetching from multiple sources");
        }
        client.fetch_from_many(&names, topic, limit).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        let total: usize = results.values().map(Vec::len).sum();
        println!();
        println!("  {total} document(s) for '{topic}'");
        for (source, docs) in &results {
            println!();
            println!("  [{source}] {} document(s)", docs.len());
            for doc in docs {
                println!("    - {} ({})", doc.title, doc.url);
            }
        }
        println!();
    }

    client.close().await;
    Ok(())
}

async fn cmd_sources() -> Result<()> {
    let config = load_config()?;
    if config.sources.is_empty() {
        println!("No sources configured. Run `sourcedock config init` to get started.");
        return Ok(());
    }

    println!();
    for source in &config.sources {
        let state = if source.enabled { "enabled" } else { "disabled" };
        let endpoint = source.primary_endpoint().unwrap_or("-");
        println!(
            "  {:<20} {:<8} {:<9} {}",
            source.name, source.protocol, state, endpoint
        );
    }
    println!();
    Ok(())
}

async fn cmd_check(source: &str, topic: &str) -> Result<()> {
    let client = build_client()?;
    let report = client.validate_topic(source, topic)?;

    if report.valid {
        println!("OK: '{topic}' is valid for source '{source}'");
    } else {
        println!("INVALID: '{topic}' for source '{source}'");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }

    client.close().await;
    if report.valid {
        Ok(())
    } else {
        Err(eyre!("topic failed syntax validation"))
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_config_check() -> Result<()> {
    let config = load_config()?;
    match guard::validate(&config) {
        Ok(()) => {
            println!(
                "Config OK: {} source(s), {} allowed domain(s)",
                config.sources.len(),
                config.allowed_domains.len()
            );
            Ok(())
        }
        Err(e) => Err(eyre!("config validation failed: {e}")),
    }
}

fn build_client() -> Result<SourceClient> {
    let config = load_config()?;
    Ok(SourceClient::new(Some(config))?)
}
