//! Generate-only transaction builders
//!
//! These produce the unsigned payloads that get published for signing. The
//! chain binary builds the transaction; we only choose the message and pass
//! fees, gas and the multisig address as the sender.

use crate::binary::{Args, ChainBinary};
use crate::ChainError;
use chrono::{TimeDelta, Utc};
use cosign_types::Coin;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Gov vote options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOption {
    Yes,
    No,
    NoWithVeto,
    Abstain,
}

impl FromStr for VoteOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(VoteOption::Yes),
            "no" => Ok(VoteOption::No),
            "veto" | "no_with_veto" | "nowithveto" => Ok(VoteOption::NoWithVeto),
            "abstain" => Ok(VoteOption::Abstain),
            other => Err(format!(
                "invalid vote option {other}: expected yes, no, veto or abstain"
            )),
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VoteOption::Yes => "yes",
            VoteOption::No => "no",
            VoteOption::NoWithVeto => "no_with_veto",
            VoteOption::Abstain => "abstain",
        })
    }
}

/// Message kinds an authz grant or revoke can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzMsg {
    Withdraw,
    Delegate,
    Commission,
    Vote,
    Unbond,
    Redelegate,
}

impl AuthzMsg {
    pub fn type_url(&self) -> &'static str {
        match self {
            AuthzMsg::Withdraw => "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward",
            AuthzMsg::Delegate => "/cosmos.staking.v1beta1.MsgDelegate",
            AuthzMsg::Commission => "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission",
            AuthzMsg::Vote => "/cosmos.gov.v1beta1.MsgVote",
            AuthzMsg::Unbond => "/cosmos.staking.v1beta1.MsgUndelegate",
            AuthzMsg::Redelegate => "/cosmos.staking.v1beta1.MsgBeginRedelegate",
        }
    }
}

impl FromStr for AuthzMsg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withdraw" => Ok(AuthzMsg::Withdraw),
            "delegate" => Ok(AuthzMsg::Delegate),
            "commission" => Ok(AuthzMsg::Commission),
            "vote" => Ok(AuthzMsg::Vote),
            "unbond" => Ok(AuthzMsg::Unbond),
            "redelegate" => Ok(AuthzMsg::Redelegate),
            other => Err(format!("message type {other} not supported")),
        }
    }
}

/// Unix timestamp `days` days from now
pub fn authz_expiration(days: u32) -> Result<i64, ChainError> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .map(|at| at.timestamp())
        .ok_or_else(|| ChainError::Unparsable(format!("expiration of {days} days is out of range")))
}

/// A transaction to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateTx {
    WithdrawAllRewards,
    Delegate {
        validator: String,
        amount: Coin,
    },
    /// Validator rewards plus commission
    WithdrawCommission {
        validator: String,
    },
    Vote {
        proposal: u64,
        option: VoteOption,
    },
    AuthzGrant {
        grantee: String,
        msg: AuthzMsg,
        /// Unix timestamp
        expiration: i64,
    },
    AuthzRevoke {
        grantee: String,
        msg: AuthzMsg,
    },
}

impl GenerateTx {
    fn subcommand(&self) -> Vec<String> {
        fn words(w: &[&str]) -> Vec<String> {
            w.iter().map(|s| s.to_string()).collect()
        }
        match self {
            GenerateTx::WithdrawAllRewards => words(&["tx", "distribution", "withdraw-all-rewards"]),
            GenerateTx::Delegate { validator, amount } => {
                let mut args = words(&["tx", "staking", "delegate"]);
                args.extend([validator.clone(), amount.to_string()]);
                args
            }
            GenerateTx::WithdrawCommission { validator } => {
                let mut args = words(&["tx", "distribution", "withdraw-rewards"]);
                args.extend([validator.clone(), "--commission".to_string()]);
                args
            }
            GenerateTx::Vote { proposal, option } => {
                let mut args = words(&["tx", "gov", "vote"]);
                args.extend([proposal.to_string(), option.to_string()]);
                args
            }
            GenerateTx::AuthzGrant {
                grantee,
                msg,
                expiration,
            } => {
                let mut args = words(&["tx", "authz", "grant"]);
                args.extend([
                    grantee.clone(),
                    "generic".to_string(),
                    "--expiration".to_string(),
                    expiration.to_string(),
                    "--msg-type".to_string(),
                    msg.type_url().to_string(),
                ]);
                args
            }
            GenerateTx::AuthzRevoke { grantee, msg } => {
                let mut args = words(&["tx", "authz", "revoke"]);
                args.extend([grantee.clone(), msg.type_url().to_string()]);
                args
            }
        }
    }
}

/// Parameters shared by every generated transaction
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Multisig address the transaction is sent from
    pub from: String,
    pub chain_id: String,
    pub fees: Coin,
    pub gas: u64,
    pub node: Option<String>,
}

impl ChainBinary {
    fn generate_args(&self, tx: &GenerateTx, opts: &GenerateOptions) -> Args {
        let mut args = Args::new(tx.subcommand());
        args.push("--from")
            .push(&opts.from)
            .push("--fees")
            .push(opts.fees.to_string())
            .push("--gas")
            .push(opts.gas.to_string())
            .push("--generate-only")
            .push("--chain-id")
            .push(&opts.chain_id);
        args.opt("--node", opts.node.as_deref())
            .opt("--keyring-backend", self.keyring_backend());
        args
    }

    /// Build an unsigned transaction
    pub async fn generate(
        &self,
        tx: &GenerateTx,
        opts: &GenerateOptions,
    ) -> Result<Vec<u8>, ChainError> {
        let unsigned = self.run(&self.generate_args(tx, opts)).await?;
        info!(bytes = unsigned.len(), "generated unsigned transaction");
        Ok(unsigned)
    }

    /// Refuse a delegation the account cannot pay for.
    ///
    /// The check is best effort: if the balance cannot be queried it is
    /// skipped with a warning.
    pub async fn ensure_balance(
        &self,
        address: &str,
        node: &str,
        amount: &Coin,
        fees: &Coin,
    ) -> Result<(), ChainError> {
        let balance = match self.balance(address, &amount.denom, node).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(error = %e, "cannot query balance, skipping the balance check");
                return Ok(());
            }
        };

        let required = amount.checked_add(fees).unwrap_or_else(|| amount.clone());
        if balance < required.amount {
            return Err(ChainError::InsufficientBalance {
                balance: format!("{balance}{}", amount.denom),
                required: required.to_string(),
            });
        }
        Ok(())
    }
}
