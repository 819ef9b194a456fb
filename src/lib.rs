//! # delegation-core
//!
//! Delegation-based spend-limit enforcement for an EVM wallet.
//!
//! Given a simulated preview of what a transaction will do to an account's
//! balances, this crate synthesizes a cryptographically scoped, on-chain
//! verifiable permission (a *delegation*) that authorizes exactly that effect
//! and nothing worse, packages the original call so it can only execute under
//! that permission, and tracks the resulting transaction through its
//! confirmation lifecycle to decide whether the permission record is kept,
//! rotated, or discarded.
//!
//! ## Pipeline
//!
//! - [`policy`] compiles a [`SimulationData`] balance-delta report into an
//!   ordered list of [`Caveat`]s, each bound to a deployed enforcer contract.
//! - [`redeem`] assembles the self-scoped [`Delegation`] and encodes it with
//!   the underlying call into redemption calldata for the framework's entry
//!   point.
//! - [`lifecycle`] watches the wrapped transaction's status events and, on a
//!   terminal outcome, deletes or rotates the stored delegation entry.
//!
//! The balance simulator, the on-chain enforcers, the delegation store, and
//! the status event source are external collaborators, reachable only through
//! the input types and the [`RedeemEncoder`] / [`DelegationStore`] /
//! [`StatusSubscription`] seams.
//!
//! ## Example
//!
//! ```rust,ignore
//! use delegation_core::{
//!     generate_calldata, generate_delegation, DelegationManagerEncoder,
//! };
//!
//! let delegation = generate_delegation(account, &environment, &simulation, tx_value)?;
//! let calldata = generate_calldata(&tx.tx_params, &delegation, &DelegationManagerEncoder)?;
//! // Caller: store the delegation, point the transaction at
//! // environment.delegation_manager with `calldata`, then track:
//! let outcome = track_delegation_lifecycle(coordinator, events, subscription).await?;
//! ```

pub mod delegation;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod redeem;
pub mod simulation;

pub use delegation::{fresh_salt, Caveat, Delegation, DelegationEntry, ROOT_AUTHORITY, UNSIGNED};
pub use environment::{
    DelegationEnvironment, EnforcerAddresses, EnforcerKind, EnvironmentRegistry,
};
pub use error::{Error, Result};
pub use lifecycle::{
    track_delegation_lifecycle, DelegationStore, Disposition, LifecycleCoordinator,
    LifecycleState, StatusSubscription, TransactionMeta, TransactionStatus, TransactionType,
    TxParams,
};
pub use policy::{compile_caveats, CaveatBuilder, CaveatTerms};
pub use redeem::{
    decode_redeem_delegations, generate_calldata, generate_delegation,
    DelegationManagerEncoder, Execution, ExecutionMode, RedeemEncoder,
};
pub use simulation::{BalanceChange, SimulationData, TokenBalanceChange, TokenStandard};
