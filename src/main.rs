use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use waitlist_gateway::app::submit_use_case::SubmitUseCase;
use waitlist_gateway::config::GatewayConfig;
use waitlist_gateway::domain::SubmissionRecord;
use waitlist_gateway::infra::http_client::ReqwestUpstream;
use waitlist_gateway::observability::{init_logging, metrics};
use waitlist_gateway::server::{start_server, AppState};

#[derive(Parser)]
#[command(name = "waitlist_gateway")]
#[command(about = "Relay waitlist and contact submissions to the upstream intake endpoint")]
#[command(version)]
struct Cli {
    /// Config file (defaults to WAITLIST_CONFIG or ./waitlist.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one submission upstream and print the result
    Submit {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = GatewayConfig::load(cli.config.as_deref())?;
    let upstream = ReqwestUpstream::new(config.upstream_url.clone(), config.request_timeout())?;
    info!("Upstream intake endpoint: {}", upstream.url());
    let use_case = SubmitUseCase::new(Arc::new(upstream));

    match cli.command {
        Commands::Serve { port } => {
            metrics::init();
            let port = port.unwrap_or(config.port);
            start_server(AppState { use_case }, port).await?;
        }
        Commands::Submit { email, role, source, message } => {
            let record = SubmissionRecord::new(email, role, source, message)
                .map_err(|e| anyhow::anyhow!("invalid submission: {:?}", e))?;
            let result = use_case.submit(&record).await;

            println!("{}", serde_json::to_string_pretty(&result.to_body())?);
            if !result.is_accepted() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
