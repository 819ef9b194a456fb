//! Delegation assembly and redemption calldata encoding.
//!
//! [`generate_delegation`] produces a self-scoped root delegation whose
//! caveats bound exactly the simulated effect of a pending transaction.
//! [`generate_calldata`] then packages the original call so it can only
//! execute under that delegation: one execution, one delegation chain, one
//! fixed execution mode, encoded for the framework's batched redemption
//! entry point.
//!
//! The encoder itself sits behind [`RedeemEncoder`] — the framework owns the
//! wire format and is versioned by whatever is deployed on-chain.
//! [`DelegationManagerEncoder`] implements the currently deployed
//! `redeemDelegations(bytes[],bytes32[],bytes[])` ABI.

use crate::delegation::{fresh_salt, Delegation, ROOT_AUTHORITY, UNSIGNED};
use crate::environment::DelegationEnvironment;
use crate::error::{Error, Result};
use crate::lifecycle::TxParams;
use crate::policy::compile_caveats;
use crate::simulation::SimulationData;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};

/// ERC-7579 execution mode tag. Only the single/default mode is ever used
/// here: one call, revert on failure, no mode payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionMode(pub B256);

impl ExecutionMode {
    /// Single execution, default (revert-on-failure) semantics.
    pub const SINGLE_DEFAULT: ExecutionMode = ExecutionMode(B256::ZERO);
}

/// The underlying call being gated, taken verbatim from the transaction
/// being protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub target: Address,
    pub call_data: Bytes,
    pub value: U256,
}

/// The delegation framework's batched-redemption encoder.
///
/// The three arguments are index-aligned: `delegations[i]` is the chain
/// redeemed under `modes[i]` to perform `executions[i]`. This pipeline only
/// ever passes one element per array, but the wire format is batch-shaped.
pub trait RedeemEncoder {
    fn encode_redeem_delegations(
        &self,
        delegations: &[Vec<Delegation>],
        modes: &[ExecutionMode],
        executions: &[Vec<Execution>],
    ) -> Result<Bytes>;
}

mod abi {
    use alloy_sol_types::sol;

    sol! {
        struct Caveat {
            address enforcer;
            bytes terms;
            bytes args;
        }

        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
            bytes signature;
        }

        function redeemDelegations(
            bytes[] permissionContexts,
            bytes32[] modes,
            bytes[] executionCallDatas
        );
    }
}

fn to_abi_delegation(delegation: &Delegation) -> abi::Delegation {
    abi::Delegation {
        delegate: delegation.delegate,
        delegator: delegation.delegator,
        authority: delegation.authority,
        caveats: delegation
            .caveats
            .iter()
            .map(|caveat| abi::Caveat {
                enforcer: caveat.enforcer,
                terms: caveat.terms.clone(),
                args: caveat.args.clone(),
            })
            .collect(),
        salt: delegation.salt,
        signature: delegation.signature.clone(),
    }
}

fn from_abi_delegation(delegation: abi::Delegation) -> Delegation {
    Delegation {
        delegate: delegation.delegate,
        delegator: delegation.delegator,
        authority: delegation.authority,
        caveats: delegation
            .caveats
            .into_iter()
            .map(|caveat| crate::delegation::Caveat {
                enforcer: caveat.enforcer,
                terms: caveat.terms,
                args: caveat.args,
            })
            .collect(),
        salt: delegation.salt,
        signature: delegation.signature,
    }
}

/// Pack a single-mode execution: `target (20) || value (32) || callData`.
fn encode_single_execution(execution: &Execution) -> Bytes {
    let mut buf = Vec::with_capacity(52 + execution.call_data.len());
    buf.extend_from_slice(execution.target.as_slice());
    buf.extend_from_slice(&execution.value.to_be_bytes::<32>());
    buf.extend_from_slice(&execution.call_data);
    Bytes::from(buf)
}

fn decode_single_execution(data: &[u8]) -> Result<Execution> {
    if data.len() < 52 {
        return Err(Error::Encoding(format!(
            "single execution calldata too short: {} bytes",
            data.len()
        )));
    }
    Ok(Execution {
        target: Address::from_slice(&data[..20]),
        value: U256::from_be_slice(&data[20..52]),
        call_data: Bytes::copy_from_slice(&data[52..]),
    })
}

/// Encoder for the deployed `DelegationManager.redeemDelegations` ABI.
///
/// Each delegation chain is ABI-encoded as a `Delegation[]` permission
/// context; each execution batch is packed per its mode (single/default
/// only). Anything else the framework rejects on-chain, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegationManagerEncoder;

impl RedeemEncoder for DelegationManagerEncoder {
    fn encode_redeem_delegations(
        &self,
        delegations: &[Vec<Delegation>],
        modes: &[ExecutionMode],
        executions: &[Vec<Execution>],
    ) -> Result<Bytes> {
        if delegations.len() != modes.len() || modes.len() != executions.len() {
            return Err(Error::Encoding(format!(
                "redemption batch arrays must be index-aligned: {} delegations, {} modes, {} executions",
                delegations.len(),
                modes.len(),
                executions.len()
            )));
        }

        let permission_contexts: Vec<Bytes> = delegations
            .iter()
            .map(|chain| {
                let chain: Vec<abi::Delegation> = chain.iter().map(to_abi_delegation).collect();
                Bytes::from(chain.abi_encode())
            })
            .collect();

        let execution_call_datas: Vec<Bytes> = executions
            .iter()
            .zip(modes)
            .map(|(batch, mode)| match batch.as_slice() {
                [execution] if *mode == ExecutionMode::SINGLE_DEFAULT => {
                    Ok(encode_single_execution(execution))
                }
                _ => Err(Error::Encoding(
                    "only single-execution batches in single/default mode are supported".into(),
                )),
            })
            .collect::<Result<_>>()?;

        let call = abi::redeemDelegationsCall {
            permissionContexts: permission_contexts,
            modes: modes.iter().map(|mode| mode.0).collect(),
            executionCallDatas: execution_call_datas,
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}

/// Decode `redeemDelegations` calldata back into the triple it was built
/// from. The inverse of [`DelegationManagerEncoder`]; single/default mode
/// only.
pub fn decode_redeem_delegations(
    calldata: &[u8],
) -> Result<(Vec<Vec<Delegation>>, Vec<ExecutionMode>, Vec<Vec<Execution>>)> {
    let call = abi::redeemDelegationsCall::abi_decode(calldata, true)?;

    let delegations = call
        .permissionContexts
        .iter()
        .map(|context| {
            let chain = <Vec<abi::Delegation>>::abi_decode(context, true)?;
            Ok(chain.into_iter().map(from_abi_delegation).collect())
        })
        .collect::<Result<Vec<Vec<Delegation>>>>()?;

    let modes: Vec<ExecutionMode> = call.modes.iter().copied().map(ExecutionMode).collect();

    let executions = call
        .executionCallDatas
        .iter()
        .map(|data| Ok(vec![decode_single_execution(data)?]))
        .collect::<Result<Vec<Vec<Execution>>>>()?;

    Ok((delegations, modes, executions))
}

/// Build a self-scoped root delegation bounding exactly the simulated effect
/// of the pending transaction.
///
/// Delegator and delegate are both `account`; the caveat list comes from the
/// policy rules; the salt is fresh, CSPRNG-backed, and unique for the life
/// of the process. Fails (producing no delegation at all) if the report
/// cannot be compiled.
pub fn generate_delegation(
    account: Address,
    environment: &DelegationEnvironment,
    simulation: &SimulationData,
    tx_value: U256,
) -> Result<Delegation> {
    let caveats = compile_caveats(account, simulation, tx_value, environment)?;
    Ok(Delegation {
        delegate: account,
        delegator: account,
        authority: ROOT_AUTHORITY,
        caveats,
        salt: fresh_salt(),
        signature: UNSIGNED,
    })
}

/// Wrap the protected call into redemption calldata for the framework's
/// entry point.
///
/// The transaction's `to`/`data`/`value` become one [`Execution`] (missing
/// `to` and `data` default to the empty call, missing `value` to zero),
/// paired with the one delegation and the single/default mode as a
/// one-element batch. The result replaces the original transaction's `data`
/// field; encoder failures propagate unchanged.
pub fn generate_calldata(
    tx_params: &TxParams,
    delegation: &Delegation,
    encoder: &impl RedeemEncoder,
) -> Result<Bytes> {
    let execution = Execution {
        target: tx_params.to.unwrap_or(Address::ZERO),
        call_data: tx_params.data.clone().unwrap_or_default(),
        value: tx_params.value.unwrap_or(U256::ZERO),
    };

    encoder.encode_redeem_delegations(
        &[vec![delegation.clone()]],
        &[ExecutionMode::SINGLE_DEFAULT],
        &[vec![execution]],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn single_execution_packs_target_value_calldata() {
        let execution = Execution {
            target: address!("00000000000000000000000000000000000000cc"),
            call_data: Bytes::from(vec![0xde, 0xad]),
            value: U256::from(7u64),
        };

        let packed = encode_single_execution(&execution);
        assert_eq!(packed.len(), 54);
        assert_eq!(&packed[..20], execution.target.as_slice());
        assert_eq!(U256::from_be_slice(&packed[20..52]), U256::from(7u64));
        assert_eq!(&packed[52..], &[0xde, 0xad]);

        assert_eq!(decode_single_execution(&packed).unwrap(), execution);
    }

    #[test]
    fn truncated_execution_calldata_is_an_encoding_error() {
        let err = decode_single_execution(&[0u8; 51]).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn misaligned_batch_arrays_are_rejected() {
        let err = DelegationManagerEncoder
            .encode_redeem_delegations(&[], &[ExecutionMode::SINGLE_DEFAULT], &[])
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
