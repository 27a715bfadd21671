pub mod jupiter;
pub mod pancake;
pub mod uniswap_v2;
pub mod uniswap_v3;

use crate::types::trade::{SwapRequest, TradeOutcome};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use ethers::contract::abigen;
use ethers::types::U256;

abigen!(
    IUniswapV2Router,
    r#"[
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts)
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts)
    ]"#
);

// ExactInputSingleParams: (tokenIn, tokenOut, fee, recipient, deadline, amountIn, amountOutMinimum, sqrtPriceLimitX96)
abigen!(
    ISwapRouter,
    r#"[{"inputs":[{"components":[{"internalType":"address","name":"tokenIn","type":"address"},{"internalType":"address","name":"tokenOut","type":"address"},{"internalType":"uint24","name":"fee","type":"uint24"},{"internalType":"address","name":"recipient","type":"address"},{"internalType":"uint256","name":"deadline","type":"uint256"},{"internalType":"uint256","name":"amountIn","type":"uint256"},{"internalType":"uint256","name":"amountOutMinimum","type":"uint256"},{"internalType":"uint160","name":"sqrtPriceLimitX96","type":"uint160"}],"internalType":"struct ISwapRouter.ExactInputSingleParams","name":"params","type":"tuple"}],"name":"exactInputSingle","outputs":[{"internalType":"uint256","name":"amountOut","type":"uint256"}],"stateMutability":"payable","type":"function"}]"#
);

// The quoter is not a view function; it reverts internally after computing.
// Use .call() only.
abigen!(
    IQuoter,
    r#"[
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) external returns (uint256 amountOut)
    ]"#
);

abigen!(
    IErc20,
    r#"[
        function decimals() external view returns (uint8)
    ]"#
);

/// The one capability every DEX adapter implements. Adapters are
/// single-protocol; cross-protocol policy (Uniswap version fallback) lives in
/// the trading service.
#[async_trait]
pub trait Swap: Send + Sync {
    fn dex(&self) -> &'static str;

    async fn execute_swap(&self, request: &SwapRequest) -> TradeOutcome;
}

/// `expected × floor((1 − slippage/100) × 1000) / 1000`, entirely in big
/// integers so large token amounts lose no precision.
pub fn min_out_with_slippage(expected: U256, slippage_pct: &BigDecimal) -> U256 {
    let factor = ((BigDecimal::from(100) - slippage_pct) * BigDecimal::from(10))
        .with_scale_round(0, RoundingMode::Floor);
    let millis = factor.to_u64().unwrap_or(0).min(1_000);
    expected * U256::from(millis) / U256::from(1_000u64)
}

/// Native units paid per token received, scale 8. Zero output never reaches
/// here (it is a `NoLiquidity`/`NoV3Pool` upstream).
pub fn price_per_token(amount_native: &BigDecimal, token_amount: &BigDecimal) -> BigDecimal {
    (amount_native / token_amount).with_scale_round(8, RoundingMode::HalfUp)
}

/// Strict-max fee tier selection; ties keep the earlier (ascending) tier.
pub fn pick_best_tier(quotes: &[(u32, U256)]) -> Option<(u32, U256)> {
    let mut best: Option<(u32, U256)> = None;
    for &(tier, out) in quotes {
        if out.is_zero() {
            continue;
        }
        match best {
            Some((_, best_out)) if out <= best_out => {}
            _ => best = Some((tier, out)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_out_applies_millis_floor() {
        let expected = U256::from(1_000_000u64);
        let one_pct: BigDecimal = "1".parse().unwrap();
        assert_eq!(min_out_with_slippage(expected, &one_pct), U256::from(990_000u64));
        // 0.15% floors to 998/1000
        let fractional: BigDecimal = "0.15".parse().unwrap();
        assert_eq!(
            min_out_with_slippage(expected, &fractional),
            U256::from(998_000u64)
        );
        let half: BigDecimal = "50".parse().unwrap();
        assert_eq!(min_out_with_slippage(expected, &half), U256::from(500_000u64));
    }

    #[test]
    fn tier_selection_is_strict_max_first_tie() {
        let quotes = [
            (100u32, U256::from(5u64)),
            (500, U256::from(9)),
            (3_000, U256::from(9)),
            (10_000, U256::from(7)),
        ];
        assert_eq!(pick_best_tier(&quotes), Some((500, U256::from(9u64))));
        let empty = [(100u32, U256::zero()), (500, U256::zero())];
        assert_eq!(pick_best_tier(&empty), None);
    }
}
