use crate::types::network::Network;
use anyhow::{Context, Result};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::sync::Arc;

pub type EvmClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// One EVM network handle: a read provider and a signing middleware bound to
/// the configured key. Shared process-wide behind `Arc`.
pub struct EvmChain {
    pub network: Network,
    pub provider: Arc<Provider<Http>>,
    pub client: Arc<EvmClient>,
    pub wallet_address: Address,
}

impl EvmChain {
    pub fn connect(network: Network, rpc_url: &str, private_key: &str) -> Result<Self> {
        let chain_id = network
            .chain_id()
            .with_context(|| format!("{network} is not an EVM network"))?;
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid RPC endpoint for {network}"))?;
        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .with_context(|| format!("invalid private key for {network}"))?;
        let wallet = wallet.with_chain_id(chain_id);
        let wallet_address = wallet.address();
        let client = SignerMiddleware::new(provider.clone(), wallet);
        Ok(Self {
            network,
            provider: Arc::new(provider),
            client: Arc::new(client),
            wallet_address,
        })
    }
}
