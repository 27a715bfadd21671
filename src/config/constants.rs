//! Network-qualified protocol constants. Router and wrapped-native addresses
//! are the canonical mainnet deployments.

use crate::types::network::Network;

// Uniswap V2 (ETH, BASE)
pub const UNISWAP_V2_ROUTER_ETH: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
pub const UNISWAP_V2_ROUTER_BASE: &str = "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24";

// Uniswap V3 (ETH, BASE)
pub const UNISWAP_V3_ROUTER_ETH: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
pub const UNISWAP_V3_QUOTER_ETH: &str = "0xb27308f9F90D607463bb33eA1BeBb41C27CE5AB6";
pub const UNISWAP_V3_ROUTER_BASE: &str = "0x2626664c2603336E57B271c5C0b26F421741e481";
pub const UNISWAP_V3_QUOTER_BASE: &str = "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a";

// PancakeSwap V2 (BNB)
pub const PANCAKE_V2_ROUTER: &str = "0x10ED43C718714eb63d5aA57B78B54704E256024E";

// Wrapped native tokens
pub const WETH_ETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const WETH_BASE: &str = "0x4200000000000000000000000000000000000006";
pub const WBNB: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub fn wrapped_native(network: Network) -> &'static str {
    match network {
        Network::Eth => WETH_ETH,
        Network::Base => WETH_BASE,
        Network::Bnb => WBNB,
        Network::Sol => WRAPPED_SOL_MINT,
    }
}

pub fn v2_router(network: Network) -> Option<&'static str> {
    match network {
        Network::Eth => Some(UNISWAP_V2_ROUTER_ETH),
        Network::Base => Some(UNISWAP_V2_ROUTER_BASE),
        Network::Bnb => Some(PANCAKE_V2_ROUTER),
        Network::Sol => None,
    }
}

pub fn v3_router(network: Network) -> Option<&'static str> {
    match network {
        Network::Eth => Some(UNISWAP_V3_ROUTER_ETH),
        Network::Base => Some(UNISWAP_V3_ROUTER_BASE),
        _ => None,
    }
}

pub fn v3_quoter(network: Network) -> Option<&'static str> {
    match network {
        Network::Eth => Some(UNISWAP_V3_QUOTER_ETH),
        Network::Base => Some(UNISWAP_V3_QUOTER_BASE),
        _ => None,
    }
}

/// V3 fee tiers probed in ascending order; ties on quoted output go to the
/// first tier tried.
pub const V3_FEE_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];

/// Pause between V3 tier probes on BASE to dampen RPC rate pressure.
pub const V3_PROBE_PAUSE_MS: u64 = 500;

/// Router deadline on EVM swaps.
pub const SWAP_DEADLINE_SECS: u64 = 20 * 60;

/// Upper bound on waiting for an EVM receipt.
pub const EVM_RECEIPT_TIMEOUT_SECS: u64 = 60;

/// Nominal gas units of one router swap, used by the pre-trade gas check.
pub const NOMINAL_SWAP_GAS_UNITS: u64 = 200_000;

/// Flat Solana transaction fee in SOL; not worth live estimation.
pub const SOLANA_FLAT_FEE_SOL: &str = "0.000005";

/// Default token decimals when a Solana mint account cannot be read.
pub const DEFAULT_SOL_TOKEN_DECIMALS: u8 = 9;

/// Price oracle memoization window.
pub const PRICE_CACHE_TTL_SECS: u64 = 30;

/// Static USD fallbacks when the price source is unreachable.
pub const FALLBACK_PRICE_ETH: u64 = 2_000;
pub const FALLBACK_PRICE_BNB: u64 = 600;
pub const FALLBACK_PRICE_SOL: u64 = 150;

/// Gas ratio applied to manual trades, which carry no per-config limit.
pub const DEFAULT_MAX_GAS_RATIO: &str = "0.5";
