//! RunCodeLocally CLI
//!
//! Serve the HTTP ingress and panel, or run a single file through the dispatcher.

use anyhow::Context;
use clap::{Parser, Subcommand};
use runcodelocally::config::{config_path, validate_config, Config};
use runcodelocally::runner::{Dispatcher, Language, RunOutcome};
use runcodelocally::{AppContext, VERSION};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "runcodelocally",
    version = VERSION,
    about = "Receive code over HTTP and run it with local toolchains",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and panel, stop on Ctrl-C
    Serve {
        /// Port (overrides config)
        #[arg(long, short)]
        port: Option<u16>,
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run a source file once ("-" reads stdin)
    Run {
        /// Source file
        file: PathBuf,
        /// Language (inferred from the file extension when omitted)
        #[arg(long, short)]
        lang: Option<String>,
    },

    /// List supported languages and whether their toolchains are installed
    Languages,

    /// Show the effective configuration
    Config {
        /// Report validation issues
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config).await
        }
        Commands::Run { file, lang } => run_file(config, &file, lang.as_deref()).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::Config { validate } => show_config(&config, validate),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let ctx = AppContext::new(config);

    let notice = ctx
        .start_server()
        .await
        .context("Failed to start server")?;
    println!("{}", notice);
    if let Some(addr) = ctx.server_addr().await {
        println!("Panel: http://{}/panel", addr);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    println!("{}", ctx.stop_server().await?);
    Ok(())
}

async fn run_file(config: Config, file: &PathBuf, lang: Option<&str>) -> anyhow::Result<()> {
    let code = if file.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin().read_to_string(&mut code)?;
        code
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };

    let language = match lang {
        Some(lang) => lang.parse::<Language>()?,
        None => file
            .extension()
            .and_then(|ext| Language::from_extension(&ext.to_string_lossy()))
            .unwrap_or_else(|| Language::from_key(&config.runner.default_language)),
    };

    let dispatcher = Dispatcher::from_config(&config.runner);
    let outcome = dispatcher.execute(&code, &language.to_string()).await;
    print!("{}", outcome.render());

    match outcome {
        RunOutcome::Completed(result) if result.is_success() => Ok(()),
        RunOutcome::Completed(result) => std::process::exit(result.exit_code.unwrap_or(1).max(1)),
        RunOutcome::NoCode => Ok(()),
        RunOutcome::Failed { .. } => std::process::exit(1),
    }
}

fn list_languages(config: &Config) {
    let dispatcher = Dispatcher::from_config(&config.runner);
    for status in dispatcher.registry().probe_toolchains() {
        let marker = if status.is_available() { "✅" } else { "❌" };
        let location = status
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not found on PATH".to_string());
        println!(
            "{} {:<11} {:<8} {}",
            marker,
            status.language.to_string(),
            status.program,
            location
        );
    }
}

fn show_config(config: &Config, validate: bool) -> anyhow::Result<()> {
    println!("# {}", config_path().display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if validate {
        let result = validate_config(config);
        for issue in &result.errors {
            println!("❌ {}", issue);
        }
        for issue in &result.warnings {
            println!("⚠️  {}", issue);
        }
        if result.valid {
            println!("✅ Configuration is valid");
        } else {
            anyhow::bail!("Configuration has {} error(s)", result.errors.len());
        }
    }

    Ok(())
}
