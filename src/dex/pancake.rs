use crate::chains::evm::EvmChain;
use crate::dex::uniswap_v2::execute_v2_swap;
use crate::dex::Swap;
use crate::types::trade::{SwapRequest, TradeOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// PancakeSwap V2 on BNB Smart Chain. Protocol-identical to Uniswap V2;
/// only the router and the wrapped native (WBNB) differ, and there is no
/// version selection.
pub struct PancakeAdapter {
    chain: Arc<EvmChain>,
}

impl PancakeAdapter {
    pub fn new(chain: Arc<EvmChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Swap for PancakeAdapter {
    fn dex(&self) -> &'static str {
        "PancakeSwap"
    }

    async fn execute_swap(&self, request: &SwapRequest) -> TradeOutcome {
        match execute_v2_swap(&self.chain, self.dex(), request).await {
            Ok(outcome) => outcome,
            Err(err) => TradeOutcome::failure(self.dex(), err),
        }
    }
}
