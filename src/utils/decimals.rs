use anyhow::{anyhow, Result};
use bigdecimal::num_bigint::{BigInt, ToBigInt};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use ethers::types::U256;
use std::str::FromStr;

pub const ETH_DECIMALS: u8 = 18;
pub const SOL_DECIMALS: u8 = 9;

/// Raw on-chain integer amount to its UI decimal representation.
pub fn raw_to_ui(raw: &BigInt, decimals: u8) -> BigDecimal {
    BigDecimal::new(raw.clone(), decimals as i64)
}

pub fn u256_to_ui(raw: U256, decimals: u8) -> BigDecimal {
    let raw = BigInt::from_str(&raw.to_string()).expect("U256 is always base-10 digits");
    raw_to_ui(&raw, decimals)
}

/// UI decimal amount to the raw integer unit, truncating sub-unit dust.
pub fn ui_to_raw(amount: &BigDecimal, decimals: u8) -> BigInt {
    let scaled = amount.with_scale_round(decimals as i64, RoundingMode::Down);
    let (digits, _) = scaled.into_bigint_and_exponent();
    digits
}

pub fn native_to_wei(amount: &BigDecimal) -> Result<U256> {
    let raw = ui_to_raw(amount, ETH_DECIMALS);
    if raw.sign() == bigdecimal::num_bigint::Sign::Minus {
        return Err(anyhow!("negative native amount: {amount}"));
    }
    U256::from_dec_str(&raw.to_string()).map_err(|e| anyhow!("amount overflows u256: {e}"))
}

pub fn wei_to_native(wei: U256) -> BigDecimal {
    u256_to_ui(wei, ETH_DECIMALS)
}

pub fn sol_to_lamports(amount: &BigDecimal) -> Result<u64> {
    ui_to_raw(amount, SOL_DECIMALS)
        .to_u64()
        .ok_or_else(|| anyhow!("SOL amount out of lamport range: {amount}"))
}

pub fn lamports_to_sol(lamports: u64) -> BigDecimal {
    BigDecimal::new(
        lamports.to_bigint().expect("u64 fits in BigInt"),
        SOL_DECIMALS as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wei_round_trip() {
        let one_and_a_half: BigDecimal = "1.5".parse().unwrap();
        let wei = native_to_wei(&one_and_a_half).unwrap();
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(wei_to_native(wei), one_and_a_half);
    }

    #[test]
    fn sub_wei_dust_truncates() {
        let dusty: BigDecimal = "0.0000000000000000019".parse().unwrap();
        assert_eq!(native_to_wei(&dusty).unwrap(), U256::from(1u64));
    }

    #[test]
    fn lamports_round_trip() {
        let amount: BigDecimal = "0.000005".parse().unwrap();
        assert_eq!(sol_to_lamports(&amount).unwrap(), 5_000);
        assert_eq!(lamports_to_sol(5_000), amount);
    }

    #[test]
    fn token_raw_to_ui_uses_token_decimals() {
        let raw = BigInt::from(1_234_567u64);
        assert_eq!(raw_to_ui(&raw, 6), "1.234567".parse().unwrap());
    }

    #[test]
    fn usd_notional_to_lamports() {
        // $10 at 150 USD/SOL buys 0.0666… SOL
        let amount_sol = BigDecimal::from(10) / BigDecimal::from(150);
        assert_eq!(sol_to_lamports(&amount_sol).unwrap(), 66_666_666);
    }
}
