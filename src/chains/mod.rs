pub mod evm;
pub mod solana;

use crate::config::settings::Settings;
use crate::types::network::{Network, ALL_NETWORKS};
use evm::EvmChain;
use solana::SolanaChain;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{info, warn};

/// Process-wide pool of per-network signing clients. Built once at startup;
/// a network missing its endpoint or key simply never appears here, and all
/// operations against it resolve to `NetworkUnavailable` upstream.
#[derive(Clone, Default)]
pub struct ClientPool {
    evm: HashMap<Network, Arc<EvmChain>>,
    solana: Option<Arc<SolanaChain>>,
}

impl Debug for ClientPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("evm", &self.evm.keys())
            .field("solana", &self.solana.is_some())
            .finish()
    }
}

impl ClientPool {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut pool = ClientPool::default();
        for network in ALL_NETWORKS {
            let (Some(url), Some(key)) = (settings.rpc_url(network), settings.private_key(network))
            else {
                info!("{network} disabled: RPC endpoint or signing key not configured");
                continue;
            };
            if network.is_evm() {
                match EvmChain::connect(network, url, key) {
                    Ok(chain) => {
                        pool.evm.insert(network, Arc::new(chain));
                        info!("{network} client ready");
                    }
                    Err(e) => warn!("{network} disabled: {e:#}"),
                }
            } else {
                match SolanaChain::connect(url, key) {
                    Ok(chain) => {
                        pool.solana = Some(Arc::new(chain));
                        info!("{network} client ready");
                    }
                    Err(e) => warn!("{network} disabled: {e:#}"),
                }
            }
        }
        pool
    }

    pub fn evm(&self, network: Network) -> Option<Arc<EvmChain>> {
        self.evm.get(&network).cloned()
    }

    pub fn solana(&self) -> Option<Arc<SolanaChain>> {
        self.solana.clone()
    }

    pub fn is_enabled(&self, network: Network) -> bool {
        match network {
            Network::Sol => self.solana.is_some(),
            evm => self.evm.contains_key(&evm),
        }
    }

    pub fn enabled_networks(&self) -> Vec<Network> {
        ALL_NETWORKS
            .into_iter()
            .filter(|n| self.is_enabled(*n))
            .collect()
    }
}
