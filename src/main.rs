use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use debate_judge::config::AppConfig;
use debate_judge::evaluation::LlmEvaluator;
use debate_judge::ledger::{
    fingerprint, ConfigError, EthLedgerClient, LedgerIdentity, LedgerRecorder, RecorderConfig,
};
use debate_judge::llm::openai::LlmClient;
use debate_judge::server::{run_server, Engine};
use debate_judge::types::ResultRecord;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debate-judge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Serve POST /judge (default)
    Serve {
        /// Optional TOML config; environment variables override it
        #[arg(long, env = "DEBATE_JUDGE_CONFIG")]
        config: Option<PathBuf>,
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the payload and SHA-256 digest committed on-chain for a result
    Fingerprint {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        side_a_score: f64,
        #[arg(long)]
        side_b_score: f64,
        #[arg(long)]
        verdict: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.cmd.unwrap_or(Cmd::Serve { config: None, bind: None }) {
        Cmd::Serve { config, bind } => serve(config, bind).await,
        Cmd::Fingerprint { topic, side_a_score, side_b_score, verdict } => {
            let fp = fingerprint(&ResultRecord { topic, side_a_score, side_b_score, verdict });
            println!("payload: {}", fp.payload);
            println!("sha256:  {}", fp.digest);
            Ok(())
        }
    }
}

async fn serve(config: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let cfg = AppConfig::load(config.as_deref())?;
    info!(ledger = ?cfg.ledger, model = %cfg.evaluator.model, "configuration loaded");

    let (client, reported) = EthLedgerClient::connect(&cfg.ledger.rpc_url, cfg.ledger.rpc_timeout())
        .await
        .context("ledger connectivity check failed")?;
    if let Some(configured) = cfg.ledger.chain_id {
        if configured != reported {
            return Err(ConfigError::ChainIdMismatch { configured, reported }.into());
        }
    }
    info!(chain_id = reported, "ledger connected");

    let identity = LedgerIdentity::from_config(&cfg.ledger, reported).context("invalid ledger identity")?;
    info!(
        address = %identity.checksummed_address(),
        contract = %identity.checksummed_contract(),
        "ledger identity ready"
    );

    let recorder = LedgerRecorder::new(
        Arc::new(identity),
        Arc::new(client),
        RecorderConfig::from_ledger_config(&cfg.ledger),
    );
    let llm = LlmClient::from_config(&cfg.evaluator);
    let evaluator = LlmEvaluator::new(Arc::new(llm), &cfg.evaluator);

    let engine = Engine {
        evaluator: Arc::new(evaluator),
        recorder: Arc::new(recorder),
    };
    let addr = bind.unwrap_or(cfg.server.bind);
    run_server(engine, &addr).await
}
