use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use prompt_runner::banner::{BannerInfo, print_banner};
use prompt_runner::config::EnvSource;
use prompt_runner::consts::{DEFAULT_ADDR, default_secrets_path};
use prompt_runner::model::gemini::GeminiProvider;
use prompt_runner::repl;
use prompt_runner::startup::{build_runner, load_configuration};
use prompt_runner::web;

#[derive(Parser)]
#[command(name = "prompt-runner", version, about = "Send a prompt to a generative model.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Model name (overrides the configured one)
    #[arg(short, long, env = "PROMPT_RUNNER_MODEL")]
    model: Option<String>,

    /// TOML secrets file holding GOOGLE_API_KEY and optionally model_name
    #[arg(short, long)]
    secrets: Option<PathBuf>,

    /// Run a single prompt and exit (non-interactive)
    #[arg(short, long)]
    run: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web form
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let secrets_path = cli.secrets.clone().unwrap_or_else(default_secrets_path);

    // Environment wins over the secrets file
    let configuration = load_configuration(EnvSource, &secrets_path, cli.model.as_deref());
    let runner = Arc::new(build_runner(configuration, Arc::new(GeminiProvider::new())));

    if let Some(Command::Serve { addr }) = cli.command {
        return web::serve(runner, addr).await;
    }

    if let Some(prompt) = cli.run {
        let outcome = repl::run_once(&runner, &prompt).await;
        return match outcome {
            Ok(text) => {
                println!("{text}");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("prompt failed")),
        };
    }

    print_banner(&BannerInfo {
        status: &runner.status(),
        secrets: &secrets_path,
    });

    let stdin = BufReader::new(tokio::io::stdin());
    repl::run(&runner, stdin).await?;
    println!("goodbye.");
    Ok(())
}
