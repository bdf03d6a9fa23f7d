//! CLI framework for cosign

use clap::{Args, Parser, Subcommand};
use cosign_log::LogFormat;
use cosign_types::Coin;
use std::path::PathBuf;

/// Coordinate offline multisig transactions through a shared store
#[derive(Parser, Debug)]
#[command(name = "cosign")]
#[command(about = "Coordinate offline multisig transactions through a shared store")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global_opts: GlobalOpts,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global CLI options
#[derive(Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keystore home passed to the chain binary when signing and broadcasting
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

impl GlobalOpts {
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and publish unsigned transactions
    Tx(TxCmd),

    /// Sign a published transaction and upload the signature
    Sign(SignCmd),

    /// Aggregate signatures, broadcast and clean up
    Broadcast(BroadcastCmd),

    /// Remove every file of a transaction
    Delete(DeleteCmd),

    /// Show published transactions
    List(ListCmd),

    /// Low level store and address utilities
    Raw(RawCmd),

    /// Configuration management
    Config(ConfigCmd),
}

/// Chain and key naming a transaction queue
#[derive(Args, Clone, Debug)]
pub struct Target {
    /// Chain name from the config
    pub chain: String,

    /// Multisig key name from the config
    pub key: String,
}

/// Flags shared by every command that publishes a transaction
#[derive(Args, Clone, Debug, Default)]
pub struct PublishOpts {
    /// Account number, queried from the node when absent
    #[arg(short, long)]
    pub account: Option<u64>,

    /// Sequence, queried from the node when absent
    #[arg(short, long)]
    pub sequence: Option<u64>,

    /// RPC node, overrides the config
    #[arg(short, long)]
    pub node: Option<String>,

    /// Overwrite the transaction already published
    #[arg(short, long)]
    pub force: bool,

    /// Queue after the transactions already published
    #[arg(short = 'x', long)]
    pub additional: bool,

    /// Free text shown to co-signers
    #[arg(short = 'i', long, default_value = "")]
    pub description: String,
}

/// Fee and gas flags for generated transactions
#[derive(Args, Clone, Debug)]
pub struct FeeOpts {
    /// Fees to pay, e.g. 5000uatom
    #[arg(long)]
    pub fees: Coin,

    /// Gas limit, defaults to the config value
    #[arg(short, long)]
    pub gas: Option<u64>,

    /// Expected fee denom, overrides the config and the chain registry
    #[arg(short, long)]
    pub denom: Option<String>,
}

/// Transaction command
#[derive(Parser, Debug)]
pub struct TxCmd {
    #[command(subcommand)]
    pub action: TxAction,
}

#[derive(Subcommand, Debug)]
pub enum TxAction {
    /// Publish an unsigned transaction file
    Push(PushCmd),

    /// Withdraw all staking rewards
    Withdraw(WithdrawCmd),

    /// Delegate to a validator
    Delegate(DelegateCmd),

    /// Withdraw validator rewards and commission
    ClaimValidator(ClaimValidatorCmd),

    /// Vote on a governance proposal
    Vote(VoteCmd),

    /// Grant or revoke authz permissions
    Authz(AuthzCmd),
}

#[derive(Parser, Debug)]
pub struct PushCmd {
    /// Unsigned transaction JSON
    pub file: PathBuf,

    #[command(flatten)]
    pub target: Target,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct WithdrawCmd {
    #[command(flatten)]
    pub target: Target,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct DelegateCmd {
    #[command(flatten)]
    pub target: Target,

    /// Validator operator address
    pub validator: String,

    /// Amount to delegate, e.g. 1000000uatom
    pub amount: Coin,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct ClaimValidatorCmd {
    #[command(flatten)]
    pub target: Target,

    /// Validator operator address
    pub validator: String,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct VoteCmd {
    #[command(flatten)]
    pub target: Target,

    /// Proposal id
    pub proposal: u64,

    /// yes, no, veto or abstain
    pub option: cosign_chain::VoteOption,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct AuthzCmd {
    #[command(subcommand)]
    pub action: AuthzAction,
}

#[derive(Subcommand, Debug)]
pub enum AuthzAction {
    /// Grant a generic authorization
    Grant(AuthzGrantCmd),

    /// Revoke an authorization
    Revoke(AuthzRevokeCmd),
}

#[derive(Parser, Debug)]
pub struct AuthzGrantCmd {
    #[command(flatten)]
    pub target: Target,

    /// Grantee address
    pub grantee: String,

    /// withdraw, delegate, commission, vote, unbond or redelegate
    pub msg: cosign_chain::AuthzMsg,

    /// Days until the grant expires
    pub expiration_days: u32,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

#[derive(Parser, Debug)]
pub struct AuthzRevokeCmd {
    #[command(flatten)]
    pub target: Target,

    /// Grantee address
    pub grantee: String,

    /// withdraw, delegate, commission, vote, unbond or redelegate
    pub msg: cosign_chain::AuthzMsg,

    #[command(flatten)]
    pub fee: FeeOpts,

    #[command(flatten)]
    pub publish: PublishOpts,
}

/// Sign command
#[derive(Parser, Debug)]
pub struct SignCmd {
    #[command(flatten)]
    pub target: Target,

    /// Local key to sign with
    #[arg(short, long)]
    pub from: String,

    /// Version to sign
    #[arg(short, long, default_value_t = 0)]
    pub index: u64,

    /// Name to store the signature under, defaults to `user` from the config
    #[arg(long = "as", value_name = "NAME")]
    pub signer: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Broadcast command
#[derive(Parser, Debug)]
pub struct BroadcastCmd {
    #[command(flatten)]
    pub target: Target,

    /// Version to broadcast
    #[arg(short, long, default_value_t = 0)]
    pub index: u64,

    /// Node to broadcast to, overrides the config
    #[arg(short, long)]
    pub node: Option<String>,

    /// Local multisig key name, overrides the config
    #[arg(short = 'k', long = "key")]
    pub multisig_key: Option<String>,

    /// Signatures required, overrides the config
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub threshold: Option<u64>,

    /// Keep the transaction in the store when the chain rejects it
    #[arg(long)]
    pub keep_on_failure: bool,
}

/// Delete command
#[derive(Parser, Debug)]
pub struct DeleteCmd {
    #[command(flatten)]
    pub target: Target,

    /// Version to delete
    #[arg(short, long, default_value_t = 0)]
    pub index: u64,
}

/// List command
#[derive(Parser, Debug)]
pub struct ListCmd {
    /// Chain name
    #[arg(required_unless_present = "all")]
    pub chain: Option<String>,

    /// Multisig key name
    #[arg(required_unless_present = "all")]
    pub key: Option<String>,

    /// List everything in the store
    #[arg(short, long, conflicts_with_all = ["chain", "key"])]
    pub all: bool,
}

/// Raw command
#[derive(Parser, Debug)]
pub struct RawCmd {
    #[command(subcommand)]
    pub action: RawAction,
}

#[derive(Subcommand, Debug)]
pub enum RawAction {
    /// Re-encode an address with another prefix
    Bech32 {
        address: String,
        prefix: String,
    },

    /// Print every file under a chain and key
    Cat {
        #[command(flatten)]
        target: Target,
    },

    /// Upload a local file
    Up {
        local: PathBuf,
        remote: String,
    },

    /// Download a file, or a directory when the remote path ends with '/'
    Down {
        remote: String,
        local: PathBuf,
    },

    /// Create a directory marker, the path must end with '/'
    Mkdir {
        dir: String,
    },

    /// Delete one object
    Delete {
        path: String,
    },
}

/// Configuration command
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the loaded configuration with secrets redacted
    Show,
}
