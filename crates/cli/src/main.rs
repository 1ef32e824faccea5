use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use podcast_finder_core::aggregate::{AggregateResult, Aggregator, LookupContext};
use podcast_finder_core::config::{config_path, load_config, AppConfig};
use podcast_finder_core::lookup::Verdict;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "podcast-finder")]
#[command(about = "Check which podcast platforms carry a show")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a podcast up on every platform
    Lookup {
        /// Podcast name
        #[arg(required = true)]
        name: String,

        /// Overall timeout in seconds (defaults to the configured value)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List the platforms that are searched
    Platforms,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration (secrets masked)
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Lookup { name, timeout } => run_lookup(name, *timeout, cli.json).await,
        Commands::Platforms => run_platforms(cli.json),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_lookup(name: &str, timeout: Option<u64>, json: bool) -> CliResult {
    let cfg = load_config();
    let aggregator = Aggregator::from_config(&cfg)?;
    let ctx = LookupContext::with_timeout(
        timeout.map(Duration::from_secs).unwrap_or_else(|| aggregator.timeout()),
    );

    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Searching {} platforms", aggregator.platforms().len()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = aggregator.lookup_with(name, &ctx).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(name.trim(), &result);
    }
    Ok(())
}

fn print_result(name: &str, result: &AggregateResult) {
    println!("Results for \"{}\":", name);
    for (platform, verdict) in result.iter() {
        if !verdict.is_found() {
            println!("  {:<10} not found", platform);
            continue;
        }
        match verdict {
            Verdict::Found(_) => println!("  {:<10} found", platform),
            Verdict::Matches(matches) => {
                println!("  {:<10} {} match(es)", platform, matches.len());
                for m in matches {
                    println!("    - {} <{}>", m.title, m.url);
                }
            }
        }
    }
}

fn run_platforms(json: bool) -> CliResult {
    let aggregator = Aggregator::from_config(&load_config())?;
    let names = aggregator.platforms();
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for n in names {
            println!("{}", n);
        }
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if path.exists() {
                return Err(format!("Config already exists at {}", path.display()).into());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config().redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Path => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if json {
                println!("{}", serde_json::json!({ "path": path }));
            } else {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
