//! Caveat policy compilation.
//!
//! Turns a simulated balance-delta report into the minimal ordered list of
//! on-chain-checkable guarantees that make the protected call safe to execute
//! blind: every simulated loss is capped at exactly the simulated amount, and
//! every simulated gain must actually arrive.
//!
//! Evaluation order is fixed (native change first, then each token change in
//! report order) because caveat order is delegation-hash-significant.

use crate::delegation::Caveat;
use crate::environment::{DelegationEnvironment, EnforcerKind};
use crate::error::{Error, Result};
use crate::simulation::{SimulationData, TokenStandard};
use alloy_primitives::{Address, Bytes, U256};
use tracing::warn;

/// Typed arguments for one caveat, one variant per enforcer kind.
///
/// Parameter lists and their order are dictated by the deployed enforcer
/// contracts and are intentionally asymmetric: the increase-direction ERC-20
/// variant omits the account parameter that its decrease-direction
/// counterpart carries. The enforcers' layouts are authoritative; do not
/// regularize them here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaveatTerms {
    NativeTokenMaxLoss { account: Address, amount: U256 },
    NativeBalanceGte { account: Address, amount: U256 },
    Erc20MaxLoss { account: Address, token: Address, amount: U256 },
    Erc20BalanceGte { token: Address, amount: U256 },
    Erc721MaxLoss { token: Address, account: Address, amount: U256 },
    Erc721BalanceGte { token: Address, account: Address, amount: U256 },
    Erc1155MaxLoss { token: Address, account: Address, id: U256, amount: U256 },
    Erc1155BalanceGte { token: Address, account: Address, id: U256, amount: U256 },
}

impl CaveatTerms {
    /// Which enforcer contract evaluates these terms.
    pub fn kind(&self) -> EnforcerKind {
        match self {
            CaveatTerms::NativeTokenMaxLoss { .. } => EnforcerKind::NativeTokenMaxLoss,
            CaveatTerms::NativeBalanceGte { .. } => EnforcerKind::NativeBalanceGte,
            CaveatTerms::Erc20MaxLoss { .. } => EnforcerKind::Erc20MaxLoss,
            CaveatTerms::Erc20BalanceGte { .. } => EnforcerKind::Erc20BalanceGte,
            CaveatTerms::Erc721MaxLoss { .. } => EnforcerKind::Erc721MaxLoss,
            CaveatTerms::Erc721BalanceGte { .. } => EnforcerKind::Erc721BalanceGte,
            CaveatTerms::Erc1155MaxLoss { .. } => EnforcerKind::Erc1155MaxLoss,
            CaveatTerms::Erc1155BalanceGte { .. } => EnforcerKind::Erc1155BalanceGte,
        }
    }

    /// Pack the parameters into the enforcer's `terms` layout: 20 bytes per
    /// address, 32 big-endian bytes per integer, concatenated in declared
    /// order with no interior padding. This is a tightly packed tuple, not
    /// head-tail ABI encoding.
    pub fn encode(&self) -> Bytes {
        let mut buf = Vec::with_capacity(104);
        match self {
            CaveatTerms::NativeTokenMaxLoss { account, amount }
            | CaveatTerms::NativeBalanceGte { account, amount } => {
                buf.extend_from_slice(account.as_slice());
                buf.extend_from_slice(&amount.to_be_bytes::<32>());
            }
            CaveatTerms::Erc20MaxLoss {
                account,
                token,
                amount,
            } => {
                buf.extend_from_slice(account.as_slice());
                buf.extend_from_slice(token.as_slice());
                buf.extend_from_slice(&amount.to_be_bytes::<32>());
            }
            CaveatTerms::Erc20BalanceGte { token, amount } => {
                buf.extend_from_slice(token.as_slice());
                buf.extend_from_slice(&amount.to_be_bytes::<32>());
            }
            CaveatTerms::Erc721MaxLoss {
                token,
                account,
                amount,
            }
            | CaveatTerms::Erc721BalanceGte {
                token,
                account,
                amount,
            } => {
                buf.extend_from_slice(token.as_slice());
                buf.extend_from_slice(account.as_slice());
                buf.extend_from_slice(&amount.to_be_bytes::<32>());
            }
            CaveatTerms::Erc1155MaxLoss {
                token,
                account,
                id,
                amount,
            }
            | CaveatTerms::Erc1155BalanceGte {
                token,
                account,
                id,
                amount,
            } => {
                buf.extend_from_slice(token.as_slice());
                buf.extend_from_slice(account.as_slice());
                buf.extend_from_slice(&id.to_be_bytes::<32>());
                buf.extend_from_slice(&amount.to_be_bytes::<32>());
            }
        }
        Bytes::from(buf)
    }
}

/// Accumulates caveats for one delegation, in order.
///
/// Single use: [`CaveatBuilder::build`] consumes the builder, so a finalized
/// caveat list cannot be mutated afterwards.
#[derive(Debug)]
pub struct CaveatBuilder<'a> {
    environment: &'a DelegationEnvironment,
    caveats: Vec<Caveat>,
}

impl<'a> CaveatBuilder<'a> {
    /// Start an empty builder against one network's enforcer deployment.
    pub fn new(environment: &'a DelegationEnvironment) -> Self {
        Self {
            environment,
            caveats: Vec::new(),
        }
    }

    /// Append one caveat. The enforcer address is resolved from the
    /// environment; `args` is left empty (redemption-time values only).
    pub fn push(&mut self, terms: CaveatTerms) {
        let enforcer = self.environment.enforcers.address_for(terms.kind());
        self.caveats.push(Caveat {
            enforcer,
            terms: terms.encode(),
            args: Bytes::new(),
        });
    }

    /// Finalize the ordered caveat list.
    pub fn build(self) -> Vec<Caveat> {
        self.caveats
    }
}

/// Compile a balance-delta report into the caveat list for one delegation.
///
/// Rules, in fixed order:
///
/// 1. Native change: a decrease caps native loss at the simulated amount; an
///    increase requires at least that gain. No native change but a non-zero
///    transaction value means the simulator missed a value transfer, so any
///    native loss at all is forbidden.
/// 2. Each token change, in report order, maps to the max-loss or
///    balance-gte caveat for its standard. An ERC-1155 change must carry a
///    token id; token standards without caveat kinds are skipped with a
///    warning (the delegation still guards everything it knows about).
pub fn compile_caveats(
    account: Address,
    simulation: &SimulationData,
    tx_value: U256,
    environment: &DelegationEnvironment,
) -> Result<Vec<Caveat>> {
    let mut builder = CaveatBuilder::new(environment);

    match &simulation.native_balance_change {
        Some(change) => {
            let amount = parse_amount(&change.difference)?;
            if change.is_decrease {
                builder.push(CaveatTerms::NativeTokenMaxLoss { account, amount });
            } else {
                builder.push(CaveatTerms::NativeBalanceGte { account, amount });
            }
        }
        None if tx_value > U256::ZERO => {
            // Value leaves the account but the simulator saw no native
            // effect. Forbid any native loss rather than trusting the gap.
            builder.push(CaveatTerms::NativeTokenMaxLoss {
                account,
                amount: U256::ZERO,
            });
        }
        None => {}
    }

    for change in &simulation.token_balance_changes {
        let token = change.address;
        match change.standard {
            TokenStandard::Erc20 => {
                let amount = parse_amount(&change.difference)?;
                if change.is_decrease {
                    builder.push(CaveatTerms::Erc20MaxLoss {
                        account,
                        token,
                        amount,
                    });
                } else {
                    builder.push(CaveatTerms::Erc20BalanceGte { token, amount });
                }
            }
            TokenStandard::Erc721 => {
                let amount = parse_amount(&change.difference)?;
                if change.is_decrease {
                    builder.push(CaveatTerms::Erc721MaxLoss {
                        token,
                        account,
                        amount,
                    });
                } else {
                    builder.push(CaveatTerms::Erc721BalanceGte {
                        token,
                        account,
                        amount,
                    });
                }
            }
            TokenStandard::Erc1155 => {
                let id = match &change.id {
                    Some(id) => parse_amount(id)?,
                    None => return Err(Error::MissingTokenId { token }),
                };
                let amount = parse_amount(&change.difference)?;
                if change.is_decrease {
                    builder.push(CaveatTerms::Erc1155MaxLoss {
                        token,
                        account,
                        id,
                        amount,
                    });
                } else {
                    builder.push(CaveatTerms::Erc1155BalanceGte {
                        token,
                        account,
                        id,
                        amount,
                    });
                }
            }
            TokenStandard::Other => {
                warn!(token = %token, "unsupported token standard in simulation report, skipping");
            }
        }
    }

    Ok(builder.build())
}

/// Parse a simulated difference as an unsigned 256-bit decimal. Never floats.
fn parse_amount(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim(), 10).map_err(|_| Error::InvalidAmount {
        value: value.to_string(),
    })
}
