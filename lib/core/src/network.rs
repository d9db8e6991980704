use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract address of the only ERC-20 token the account path supports (USDT).
pub const ERC_USDT_TOKEN_ID: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

/// Blockchain network of an investigated address.
///
/// Serialized as the token identifier used on edges and on the wire
/// (`BTC`, `ETH`, `erc`, `TRX`, `XRP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "erc", alias = "ERC", alias = "USDT")]
    Erc,
    #[serde(rename = "TRX")]
    Trx,
    #[serde(rename = "XRP")]
    Xrp,
}

/// How a network's backend describes activity around an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFamily {
    /// Transaction list with intermediate transaction nodes.
    Utxo,
    /// Address list, transactions collapsed into edges.
    Account,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Btc,
        Network::Eth,
        Network::Erc,
        Network::Trx,
        Network::Xrp,
    ];

    pub fn family(&self) -> NetworkFamily {
        match self {
            Network::Btc => NetworkFamily::Utxo,
            _ => NetworkFamily::Account,
        }
    }

    /// Token identifier carried by edges of this network.
    pub fn token(&self) -> &'static str {
        match self {
            Network::Btc => "BTC",
            Network::Eth => "ETH",
            Network::Erc => "erc",
            Network::Trx => "TRX",
            Network::Xrp => "XRP",
        }
    }

    /// Path segment used by the graph data service.
    pub fn endpoint_prefix(&self) -> &'static str {
        match self {
            Network::Btc => "btc",
            Network::Eth | Network::Erc => "eth",
            Network::Trx => "trx",
            Network::Xrp => "xrp",
        }
    }

    /// Token contract pinned for token-transfer queries.
    pub fn token_id(&self) -> Option<&'static str> {
        match self {
            Network::Erc => Some(ERC_USDT_TOKEN_ID),
            _ => None,
        }
    }

    /// Number of minor units in one displayed unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Network::Btc => 0,
            Network::Eth => 18,
            Network::Erc => 5,
            Network::Trx | Network::Xrp => 6,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" => Ok(Network::Btc),
            "ETH" => Ok(Network::Eth),
            "ERC" | "ERC20" | "ERC-20" | "USDT" => Ok(Network::Erc),
            "TRX" => Ok(Network::Trx),
            "XRP" => Ok(Network::Xrp),
            other => Err(Error::UnsupportedNetwork(other.to_string())),
        }
    }
}
