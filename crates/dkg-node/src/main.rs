use std::convert::TryFrom;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use dkg_node::chain_gateway::ChainGateway;
use dkg_node::config::Config;
use dkg_node::contract::Dkg;
use dkg_node::error::RunError;
use dkg_node::opts::NodeOpts;
use dkg_node::orchestrator::Orchestrator;
use dkg_node::prover::Prover;

use dkg_core::LocalSecret;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use gumdrop::Options;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = NodeOpts::parse_args_default_or_exit();

    match run(opts).await {
        Ok(master_public_key) => {
            tracing::info!(?master_public_key, "round complete");
        }
        Err(e) if e.is_abort() => {
            tracing::error!("aborted");
            process::exit(e.exit_code());
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            process::exit(e.exit_code());
        }
    }
}

async fn run(opts: NodeOpts) -> Result<Option<dkg_crypto::Point>, RunError> {
    let config = Config::load(&opts.config).map_err(RunError::Config)?;

    let provider = Provider::<Http>::try_from(config.ethereum_node.as_str())
        .map_err(|e| RunError::Config(anyhow::anyhow!(e)))?;
    let wallet: LocalWallet = config
        .ethereum_private_key
        .parse()
        .map_err(|e| RunError::Config(anyhow::anyhow!("{}", e)))?;
    let own_address = wallet.address();
    let client = Arc::new(
        SignerMiddleware::new_with_provider_chain(provider, wallet)
            .await
            .map_err(|e| RunError::Config(anyhow::anyhow!(e)))?,
    );

    let dkg = Dkg::new(config.contract_address, client);
    let gateway = ChainGateway::new(dkg);

    let prover = Prover::new(PathBuf::from(&config.mount_source), opts.id_pipe.map(PathBuf::from));

    let orchestrator = Orchestrator::new(
        gateway,
        prover,
        own_address,
        opts.rogue,
        opts.ignore_invalid,
        opts.broadcast_only,
    );

    let own_secret = LocalSecret::new(config.dkg_scalar().map_err(RunError::Config)?);

    match orchestrator.run(own_secret, &mut rand::thread_rng()).await? {
        dkg_node::orchestrator::Outcome::Done { master_public_key } => Ok(Some(master_public_key)),
        dkg_node::orchestrator::Outcome::BroadcastOnly => Ok(None),
    }
}
