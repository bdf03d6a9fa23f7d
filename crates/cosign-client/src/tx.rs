//! Publishing unsigned transactions, from a file or generated by the chain binary

use crate::cli::{AuthzAction, FeeOpts, PublishOpts, Target, TxAction, TxCmd};
use crate::config_error;
use crate::handler::{tx_key, Session};
use cosign_chain::{authz_expiration, payload_fee_denom, resolve_denom, GenerateOptions, GenerateTx};
use cosign_coordinator::{ConflictPolicy, PublishRequest};
use cosign_errors::Result;
use cosign_log::{debug, warn};
use cosign_store::BlobStore;
use cosign_types::ChainProfile;

impl<S: BlobStore> Session<S> {
    pub(crate) async fn handle_tx(&self, cmd: TxCmd) -> Result<()> {
        match cmd.action {
            TxAction::Push(cmd) => {
                let policy = ConflictPolicy::from_flags(cmd.publish.force, cmd.publish.additional)?;
                let payload = tokio::fs::read(&cmd.file).await?;
                let (chain, _) = self.resolve(&cmd.target)?;
                if let Some(denom) = payload_fee_denom(&payload) {
                    check_fee_denom(chain, &denom, None).await;
                }
                self.publish(&cmd.target, payload, &cmd.publish, policy).await
            }
            TxAction::Withdraw(cmd) => {
                self.generate(&cmd.target, GenerateTx::WithdrawAllRewards, &cmd.fee, &cmd.publish)
                    .await
            }
            TxAction::Delegate(cmd) => {
                let tx = GenerateTx::Delegate {
                    validator: cmd.validator,
                    amount: cmd.amount,
                };
                self.generate(&cmd.target, tx, &cmd.fee, &cmd.publish).await
            }
            TxAction::ClaimValidator(cmd) => {
                let tx = GenerateTx::WithdrawCommission {
                    validator: cmd.validator,
                };
                self.generate(&cmd.target, tx, &cmd.fee, &cmd.publish).await
            }
            TxAction::Vote(cmd) => {
                let tx = GenerateTx::Vote {
                    proposal: cmd.proposal,
                    option: cmd.option,
                };
                self.generate(&cmd.target, tx, &cmd.fee, &cmd.publish).await
            }
            TxAction::Authz(authz) => match authz.action {
                AuthzAction::Grant(cmd) => {
                    let tx = GenerateTx::AuthzGrant {
                        grantee: cmd.grantee,
                        msg: cmd.msg,
                        expiration: authz_expiration(cmd.expiration_days)?,
                    };
                    self.generate(&cmd.target, tx, &cmd.fee, &cmd.publish).await
                }
                AuthzAction::Revoke(cmd) => {
                    let tx = GenerateTx::AuthzRevoke {
                        grantee: cmd.grantee,
                        msg: cmd.msg,
                    };
                    self.generate(&cmd.target, tx, &cmd.fee, &cmd.publish).await
                }
            },
        }
    }

    /// Build a transaction with the chain binary and publish it
    async fn generate(
        &self,
        target: &Target,
        tx: GenerateTx,
        fee: &FeeOpts,
        opts: &PublishOpts,
    ) -> Result<()> {
        let policy = ConflictPolicy::from_flags(opts.force, opts.additional)?;
        let (chain, key) = self.resolve(target)?;
        let address = chain.address_of(key).map_err(config_error)?;
        check_fee_denom(chain, &fee.fees.denom, fee.denom.as_deref()).await;

        let options = GenerateOptions {
            from: address.clone(),
            chain_id: chain.id.clone(),
            fees: fee.fees.clone(),
            gas: fee.gas.unwrap_or(self.config.default_gas),
            node: chain.node_or(opts.node.as_deref()),
        };
        let binary = self.binary(chain);

        if let GenerateTx::Delegate { amount, .. } = &tx {
            match options.node.as_deref() {
                Some(node) => {
                    binary
                        .ensure_balance(&address, node, amount, &options.fees)
                        .await?
                }
                None => warn!("no node to query, skipping the balance check"),
            }
        }

        let payload = binary.generate(&tx, &options).await?;
        debug!(payload = %String::from_utf8_lossy(&payload), "generated transaction");
        self.publish(target, payload, opts, policy).await
    }

    async fn publish(
        &self,
        target: &Target,
        payload: Vec<u8>,
        opts: &PublishOpts,
        policy: ConflictPolicy,
    ) -> Result<()> {
        let (chain, key) = self.resolve(target)?;
        let request = PublishRequest {
            key: tx_key(target)?,
            chain_id: chain.id.clone(),
            payload,
            address: chain.address_of(key).map_err(config_error)?,
            account: opts.account,
            sequence: opts.sequence,
            node: chain.node_or(opts.node.as_deref()),
            policy,
            description: opts.description.clone(),
        };

        let published = self
            .coordinator
            .publish(&request, &self.binary(chain))
            .await?;
        println!(
            "published {} (account {}, sequence {})",
            published.version, published.metadata.account, published.metadata.sequence
        );
        Ok(())
    }
}

/// Warn when `denom` is not the chain's fee denom. `expected` overrides
/// the configured and registry denom.
async fn check_fee_denom(chain: &ChainProfile, denom: &str, expected: Option<&str>) {
    let expected = match expected {
        Some(expected) => expected.to_string(),
        None => match resolve_denom(chain).await {
            Ok(expected) => expected,
            Err(e) => {
                debug!(error = %e, "cannot resolve the fee denom, skipping the check");
                return;
            }
        },
    };
    if expected != denom {
        warn!(
            chain = %chain.name,
            fee_denom = %denom,
            expected = %expected,
            "fee denom differs from the chain's fee denom"
        );
    }
}
