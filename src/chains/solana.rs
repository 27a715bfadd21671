use anyhow::{anyhow, Context, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

/// Solana network handle: nonblocking RPC client at confirmed commitment and
/// the trading keypair decoded from its base58 form.
pub struct SolanaChain {
    pub rpc: Arc<RpcClient>,
    pub keypair: Arc<Keypair>,
}

impl SolanaChain {
    pub fn connect(rpc_url: &str, private_key: &str) -> Result<Self> {
        let rpc = RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        let bytes = bs58::decode(private_key.trim())
            .into_vec()
            .context("Solana private key is not valid base58")?;
        let keypair =
            Keypair::from_bytes(&bytes).map_err(|e| anyhow!("invalid Solana keypair: {e}"))?;
        Ok(Self {
            rpc: Arc::new(rpc),
            keypair: Arc::new(keypair),
        })
    }

    pub fn pubkey(&self) -> solana_sdk::pubkey::Pubkey {
        self.keypair.pubkey()
    }
}
