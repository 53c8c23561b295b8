//! Static network table
//!
//! Maps the network name stored on completed records to the block explorer
//! used in notification and history messages.

/// Token symbol shown in transfer messages
pub const TOKEN_SYMBOL: &str = "APT";

/// A supported network
#[derive(Debug, Clone, Copy)]
pub struct Network {
    /// Query-parameter key for explorer URLs
    pub key: &'static str,
    /// Display name, matched against the `network` field on records
    pub name: &'static str,
    /// Block explorer base URL
    pub explorer: &'static str,
}

pub const NETWORKS: &[Network] = &[
    Network {
        key: "mainnet",
        name: "Mainnet",
        explorer: "https://explorer.aptoslabs.com",
    },
    Network {
        key: "testnet",
        name: "Testnet",
        explorer: "https://explorer.aptoslabs.com",
    },
];

/// Look up a network by its display name
pub fn network_by_name(name: &str) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.name == name)
}

/// Explorer URL for a transaction, or None for an unknown network
pub fn explorer_link(network_name: &str, transaction_hash: &str) -> Option<String> {
    network_by_name(network_name)
        .map(|n| format!("{}/txn/{}?network={}", n.explorer, transaction_hash, n.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_link_for_known_network() {
        let link = explorer_link("Testnet", "0xhash").unwrap();
        assert_eq!(link, "https://explorer.aptoslabs.com/txn/0xhash?network=testnet");
    }

    #[test]
    fn test_unknown_network_has_no_link() {
        assert!(explorer_link("Devnet", "0xhash").is_none());
    }
}
