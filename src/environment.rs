//! Per-network delegation environment configuration.
//!
//! Enforcer contract addresses differ per deployed network, so they are data,
//! not code: a [`DelegationEnvironment`] is loaded from configuration and
//! threaded through caveat compilation. Switching networks is a config change.

use crate::error::Result;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of enforcer kinds this policy compiler can invoke.
///
/// One variant per deployed enforcer contract. Keeping the set closed (rather
/// than a string-keyed registry) means an unknown enforcer is unrepresentable:
/// every kind resolves to an address at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnforcerKind {
    /// Bounds worst-case native-asset loss.
    NativeTokenMaxLoss,
    /// Requires the native balance to end at least this much higher.
    NativeBalanceGte,
    /// Bounds worst-case loss of an ERC-20 balance.
    Erc20MaxLoss,
    /// Requires an ERC-20 balance to end at least this much higher.
    Erc20BalanceGte,
    /// Bounds worst-case loss of an ERC-721 balance.
    Erc721MaxLoss,
    /// Requires an ERC-721 balance to end at least this much higher.
    Erc721BalanceGte,
    /// Bounds worst-case loss of an ERC-1155 token-id balance.
    Erc1155MaxLoss,
    /// Requires an ERC-1155 token-id balance to end at least this much higher.
    Erc1155BalanceGte,
}

/// Deployed enforcer contract addresses for one network.
///
/// One field per [`EnforcerKind`]; [`EnforcerAddresses::address_for`] is a
/// total function, so resolution cannot fail at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerAddresses {
    pub native_token_max_loss: Address,
    pub native_balance_gte: Address,
    pub erc20_max_loss: Address,
    pub erc20_balance_gte: Address,
    pub erc721_max_loss: Address,
    pub erc721_balance_gte: Address,
    pub erc1155_max_loss: Address,
    pub erc1155_balance_gte: Address,
}

impl EnforcerAddresses {
    /// Resolve the deployed contract address for an enforcer kind.
    pub fn address_for(&self, kind: EnforcerKind) -> Address {
        match kind {
            EnforcerKind::NativeTokenMaxLoss => self.native_token_max_loss,
            EnforcerKind::NativeBalanceGte => self.native_balance_gte,
            EnforcerKind::Erc20MaxLoss => self.erc20_max_loss,
            EnforcerKind::Erc20BalanceGte => self.erc20_balance_gte,
            EnforcerKind::Erc721MaxLoss => self.erc721_max_loss,
            EnforcerKind::Erc721BalanceGte => self.erc721_balance_gte,
            EnforcerKind::Erc1155MaxLoss => self.erc1155_max_loss,
            EnforcerKind::Erc1155BalanceGte => self.erc1155_balance_gte,
        }
    }
}

/// Everything the pipeline needs to know about one network's delegation
/// framework deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationEnvironment {
    /// Chain id this environment applies to.
    pub chain_id: u64,
    /// Entry point the wrapped transaction is sent to.
    pub delegation_manager: Address,
    /// Deployed enforcer addresses.
    pub enforcers: EnforcerAddresses,
}

impl DelegationEnvironment {
    /// Parse one environment from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Environments for every network the wallet knows about, keyed by chain id.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRegistry {
    environments: HashMap<u64, DelegationEnvironment>,
}

impl EnvironmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from a JSON array of environments.
    pub fn from_json(json: &str) -> Result<Self> {
        let environments: Vec<DelegationEnvironment> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for environment in environments {
            registry.insert(environment);
        }
        Ok(registry)
    }

    /// Add or replace the environment for its chain id.
    pub fn insert(&mut self, environment: DelegationEnvironment) {
        self.environments.insert(environment.chain_id, environment);
    }

    /// Look up the environment for a chain id.
    pub fn get(&self, chain_id: u64) -> Option<&DelegationEnvironment> {
        self.environments.get(&chain_id)
    }
}
