use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of chains the service trades on. The network fixes the
/// address family, the default DEX, the retry profile and the price feed id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "BASE")]
    Base,
    #[serde(rename = "BNB")]
    Bnb,
    #[serde(rename = "SOL")]
    Sol,
}

pub const ALL_NETWORKS: [Network; 4] = [Network::Eth, Network::Base, Network::Bnb, Network::Sol];

impl Network {
    pub fn is_evm(&self) -> bool {
        !matches!(self, Network::Sol)
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Eth => Some(1),
            Network::Base => Some(8453),
            Network::Bnb => Some(56),
            Network::Sol => None,
        }
    }

    /// CoinGecko asset id of the native unit. ETH and BASE both settle in
    /// ether, so they share the `ethereum` feed.
    pub fn price_feed_id(&self) -> &'static str {
        match self {
            Network::Eth | Network::Base => "ethereum",
            Network::Bnb => "binancecoin",
            Network::Sol => "solana",
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            Network::Eth | Network::Base => "ETH",
            Network::Bnb => "BNB",
            Network::Sol => "SOL",
        }
    }

    pub fn default_dex(&self) -> &'static str {
        match self {
            Network::Eth | Network::Base => "Uniswap",
            Network::Bnb => "PancakeSwap",
            Network::Sol => "Jupiter",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Eth => "ETH",
            Network::Base => "BASE",
            Network::Bnb => "BNB",
            Network::Sol => "SOL",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ETH" | "ETHEREUM" => Ok(Network::Eth),
            "BASE" => Ok(Network::Base),
            "BNB" | "BSC" => Ok(Network::Bnb),
            "SOL" | "SOLANA" => Ok(Network::Sol),
            other => Err(anyhow::anyhow!("unknown network: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("eth".parse::<Network>().unwrap(), Network::Eth);
        assert_eq!("BSC".parse::<Network>().unwrap(), Network::Bnb);
        assert!("DOGE".parse::<Network>().is_err());
    }

    #[test]
    fn eth_and_base_share_price_feed() {
        assert_eq!(Network::Eth.price_feed_id(), Network::Base.price_feed_id());
    }
}
