//! Simulation report input types.
//!
//! A [`SimulationData`] report is produced by an external balance-simulation
//! engine for a pending transaction: the expected native balance delta plus
//! one entry per touched token. Field names follow the wallet's JSON state
//! (camelCase), so reports deserialize directly from the simulator's output.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Token standard of a simulated balance change.
///
/// The simulator may report asset kinds this policy set does not cover yet;
/// those deserialize as [`TokenStandard::Other`] and are skipped (with a
/// warning) during caveat compilation rather than failing the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenStandard {
    Erc20,
    Erc721,
    Erc1155,
    /// Any standard this policy set has no caveat kinds for.
    #[serde(other)]
    Other,
}

/// One simulated balance delta, as an unsigned decimal magnitude plus
/// direction. Amounts are never floats; they parse into `U256` at
/// compilation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    /// True if the account's balance goes down.
    pub is_decrease: bool,
    /// Magnitude of the change, as a decimal string.
    pub difference: String,
}

/// A simulated balance change for one token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceChange {
    /// The token contract address.
    pub address: Address,
    /// Which standard the token implements.
    pub standard: TokenStandard,
    /// True if the account's balance goes down.
    pub is_decrease: bool,
    /// Magnitude of the change, as a decimal string.
    pub difference: String,
    /// Token id, required for ERC-1155 changes; absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The full balance-delta report for a pending transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationData {
    /// Expected native-asset delta, if the simulator observed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_balance_change: Option<BalanceChange>,
    /// Expected token deltas, in simulator order. Order matters: caveats are
    /// emitted in this order and caveat order is hash-significant.
    #[serde(default)]
    pub token_balance_changes: Vec<TokenBalanceChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn report_deserializes_from_wallet_json() {
        let json = r#"{
            "nativeBalanceChange": { "isDecrease": true, "difference": "1000000000000000000" },
            "tokenBalanceChanges": [
                {
                    "address": "0x6b175474e89094c44da98b954eedeac495271d0f",
                    "standard": "ERC20",
                    "isDecrease": false,
                    "difference": "250"
                }
            ]
        }"#;

        let report: SimulationData = serde_json::from_str(json).unwrap();
        let native = report.native_balance_change.unwrap();
        assert!(native.is_decrease);
        assert_eq!(native.difference, "1000000000000000000");

        let token = &report.token_balance_changes[0];
        assert_eq!(
            token.address,
            address!("6b175474e89094c44da98b954eedeac495271d0f")
        );
        assert_eq!(token.standard, TokenStandard::Erc20);
        assert!(token.id.is_none());
    }

    #[test]
    fn unknown_standard_deserializes_as_other() {
        let json = r#"{
            "address": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "standard": "ERC4626",
            "isDecrease": true,
            "difference": "1"
        }"#;

        let change: TokenBalanceChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.standard, TokenStandard::Other);
    }
}
