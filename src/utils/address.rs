use crate::types::network::Network;
use once_cell::sync::Lazy;
use regex::Regex;

static EVM_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

static SOLANA_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap());

/// Validates an address against the network's address family. This is a
/// format check only; existence on chain is the adapter's problem.
pub fn is_valid_address(network: Network, address: &str) -> bool {
    if network.is_evm() {
        EVM_ADDRESS.is_match(address)
    } else {
        SOLANA_ADDRESS.is_match(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_accepts_exactly_40_hex_digits() {
        let body = "a".repeat(40);
        assert!(is_valid_address(Network::Eth, &format!("0x{body}")));
        assert!(!is_valid_address(Network::Eth, &format!("0x{}", "a".repeat(39))));
        assert!(!is_valid_address(Network::Eth, &format!("0x{}", "a".repeat(41))));
        assert!(!is_valid_address(Network::Eth, &format!("0x{}g", "a".repeat(39))));
        assert!(!is_valid_address(Network::Base, &body));
    }

    #[test]
    fn solana_accepts_base58_of_32_to_44() {
        assert!(is_valid_address(
            Network::Sol,
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        ));
        assert!(is_valid_address(Network::Sol, &"1".repeat(32)));
        assert!(!is_valid_address(Network::Sol, &"1".repeat(31)));
        assert!(!is_valid_address(Network::Sol, &"1".repeat(45)));
        // 0, O, I and l are outside the base58 alphabet
        assert!(!is_valid_address(Network::Sol, &format!("{}0", "1".repeat(32))));
        assert!(!is_valid_address(Network::Sol, &format!("{}l", "1".repeat(32))));
    }
}
