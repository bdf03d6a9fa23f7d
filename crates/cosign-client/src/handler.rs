//! Command handlers

use crate::cli::{
    BroadcastCmd, Commands, ConfigAction, ConfigCmd, DeleteCmd, GlobalOpts, ListCmd, RawAction,
    RawCmd, SignCmd, Target,
};
use crate::{config_error, listing, prompt, raw};
use cosign_chain::ChainBinary;
use cosign_coordinator::{
    BroadcastRequest, CleanupPolicy, Coordinator, DeleteOutcome, Settings, SignRequest,
};
use cosign_errors::{Error, Result};
use cosign_log::{info, warn};
use cosign_store::BlobStore;
use cosign_types::{ChainProfile, Config, SignerIdentity, TxKey};
use std::path::PathBuf;

/// Entry point for a parsed command line
pub struct CliHandler {
    global_opts: GlobalOpts,
}

impl CliHandler {
    pub fn new(global_opts: GlobalOpts) -> Self {
        Self { global_opts }
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            // neither needs the store
            Commands::Raw(RawCmd {
                action: RawAction::Bech32 { address, prefix },
            }) => raw::bech32(&address, &prefix),
            Commands::Config(cmd) => handle_config(&self.load_config()?, cmd),
            command => self.session().await?.execute(command).await,
        }
    }

    fn load_config(&self) -> Result<Config> {
        Config::load(self.global_opts.config.as_deref()).map_err(config_error)
    }

    /// Load the configuration and open its store
    pub async fn session(&self) -> Result<Session<Box<dyn BlobStore>>> {
        let config = self.load_config()?;
        let store = cosign_store::open(&config).await?;
        Ok(Session::new(config, store, self.global_opts.home.clone()))
    }
}

/// Configuration plus an open store, for the commands that touch the store
pub struct Session<S> {
    pub(crate) config: Config,
    pub(crate) coordinator: Coordinator<S>,
    home: Option<PathBuf>,
}

impl<S: BlobStore> Session<S> {
    pub fn new(config: Config, store: S, home: Option<PathBuf>) -> Self {
        let settings = Settings::from(&config.timeouts);
        Self {
            config,
            coordinator: Coordinator::new(store, settings),
            home,
        }
    }

    pub fn coordinator(&self) -> &Coordinator<S> {
        &self.coordinator
    }

    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Tx(cmd) => self.handle_tx(cmd).await,
            Commands::Sign(cmd) => self.handle_sign(cmd).await,
            Commands::Broadcast(cmd) => self.handle_broadcast(cmd).await,
            Commands::Delete(cmd) => self.handle_delete(cmd).await,
            Commands::List(cmd) => self.handle_list(cmd).await,
            Commands::Raw(cmd) => self.handle_raw(cmd).await,
            Commands::Config(cmd) => handle_config(&self.config, cmd),
        }
    }

    /// Chain and key profiles named by `target`
    pub(crate) fn resolve(&self, target: &Target) -> Result<(&ChainProfile, &SignerIdentity)> {
        let chain = self.config.chain(&target.chain).map_err(config_error)?;
        let key = self.config.key(&target.key).map_err(config_error)?;
        Ok((chain, key))
    }

    pub(crate) fn binary(&self, chain: &ChainProfile) -> ChainBinary {
        ChainBinary::for_chain(chain, &self.config).with_home(self.home.clone())
    }

    async fn handle_sign(&self, cmd: SignCmd) -> Result<()> {
        let (chain, key) = self.resolve(&cmd.target)?;
        let multisig_address = chain.address_of(key).map_err(config_error)?;
        let signer = match cmd.signer.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None if !self.config.user.is_empty() => self.config.user.clone(),
            None => {
                return Err(Error::Config(
                    "no signer name: set user in the config or pass --as".to_string(),
                ))
            }
        };

        let version = tx_key(&cmd.target)?.version(cmd.index);
        let bundle = self.coordinator.prepare_sign(&version).await?;
        let metadata = &bundle.metadata;
        if metadata.chain_id != chain.id {
            warn!(
                expected = %chain.id,
                published = %metadata.chain_id,
                "transaction was published for another chain id"
            );
        }

        if !cmd.yes {
            println!("{}", String::from_utf8_lossy(&bundle.payload));
            println!(
                "account: {}  sequence: {}  chain-id: {}",
                metadata.account, metadata.sequence, metadata.chain_id
            );
            if !metadata.description.is_empty() {
                println!("description: {}", metadata.description);
            }
            if !prompt::confirm("Sign this transaction?")? {
                println!("not signed");
                return Ok(());
            }
        }

        let request = SignRequest {
            version,
            from: cmd.from,
            signer,
            multisig_address,
        };
        let path = self
            .coordinator
            .complete_sign(&bundle, &request, &self.binary(chain))
            .await?;
        println!("uploaded signature to {path}");
        Ok(())
    }

    async fn handle_broadcast(&self, cmd: BroadcastCmd) -> Result<()> {
        let (chain, key) = self.resolve(&cmd.target)?;
        let request = BroadcastRequest {
            version: tx_key(&cmd.target)?.version(cmd.index),
            multisig_key: cmd
                .multisig_key
                .unwrap_or_else(|| key.local_name.clone()),
            node: chain.node_or(cmd.node.as_deref()),
            threshold: cmd.threshold.map_or(key.threshold, |t| {
                usize::try_from(t).unwrap_or(usize::MAX)
            }),
            cleanup: if cmd.keep_on_failure {
                CleanupPolicy::OnSuccess
            } else {
                CleanupPolicy::Always
            },
        };

        let outcome = self
            .coordinator
            .broadcast(&request, &self.binary(chain))
            .await?;
        println!("code: {}", outcome.code);
        println!("txhash: {}", outcome.txhash);
        if outcome.code != 0 {
            warn!(code = outcome.code, "transaction was rejected by the chain");
            if outcome.removed {
                warn!("the version was removed; publish it again to retry");
            }
        }
        Ok(())
    }

    async fn handle_delete(&self, cmd: DeleteCmd) -> Result<()> {
        let version = tx_key(&cmd.target)?.version(cmd.index);
        match self.coordinator.delete(&version).await? {
            DeleteOutcome::NothingToDelete => {
                println!("nothing to delete under {}", version.prefix())
            }
            DeleteOutcome::Removed(paths) => {
                for path in paths {
                    println!("deleted {path}");
                }
            }
        }
        Ok(())
    }

    async fn handle_list(&self, cmd: ListCmd) -> Result<()> {
        let inspector = self.coordinator.inspector();
        if cmd.all {
            let listing = inspector.list_everything().await?;
            print!("{}", listing::render_listing(&listing));
            return Ok(());
        }

        let (Some(chain), Some(key)) = (cmd.chain, cmd.key) else {
            return Err(Error::InputConflict(
                "specify <chain> <key> or --all".to_string(),
            ));
        };
        let key = TxKey::new(chain, key).map_err(|e| Error::Classification(e.to_string()))?;
        let versions = inspector.list_versions(&key).await?;
        if versions.is_empty() {
            println!("no transactions under {}", key.prefix());
        }
        for index in versions {
            let version = key.version(index);
            let contents = inspector.version_contents(&version).await?;
            println!("{}", listing::render_version(&version, &contents));
        }
        Ok(())
    }
}

fn handle_config(config: &Config, cmd: ConfigCmd) -> Result<()> {
    match cmd.action {
        ConfigAction::Show => {
            info!(chains = config.chains.len(), keys = config.keys.len(), "loaded config");
            print!("{}", config.to_redacted_toml().map_err(config_error)?);
            Ok(())
        }
    }
}

pub(crate) fn tx_key(target: &Target) -> Result<TxKey> {
    TxKey::new(&target.chain, &target.key).map_err(|e| Error::Classification(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{PublishOpts, PushCmd, TxAction, TxCmd};
    use cosign_store::MemStore;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
user = "alice"
keyring_backend = "test"

[store]
backend = "fs"
path = "/unused"

[[keys]]
name = "val"
address = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu"
local_name = "val-multi"

[[chains]]
name = "cosmoshub"
id = "cosmoshub-4"
binary = "gaiad"
prefix = "cosmos"
denom = "uatom"
"#;

    fn session() -> Session<MemStore> {
        Session::new(Config::from_toml(CONFIG).unwrap(), MemStore::new(), None)
    }

    fn target() -> Target {
        Target {
            chain: "cosmoshub".to_string(),
            key: "val".to_string(),
        }
    }

    fn push_cmd(file: PathBuf, publish: PublishOpts) -> Commands {
        Commands::Tx(TxCmd {
            action: TxAction::Push(PushCmd {
                file,
                target: target(),
                publish,
            }),
        })
    }

    #[tokio::test]
    async fn test_push_then_delete() {
        let session = session();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tx.json");
        std::fs::write(&file, br#"{"body":{"messages":[]}}"#).unwrap();

        let pinned = PublishOpts {
            account: Some(7),
            sequence: Some(3),
            ..PublishOpts::default()
        };
        session.execute(push_cmd(file.clone(), pinned.clone())).await.unwrap();
        session
            .execute(push_cmd(
                file,
                PublishOpts {
                    additional: true,
                    ..pinned
                },
            ))
            .await
            .unwrap();

        let store = session.coordinator().store();
        let mut objects = store.list_all().await.unwrap();
        objects.sort();
        assert_eq!(
            objects,
            vec![
                "cosmoshub/val/0/signdata",
                "cosmoshub/val/0/unsigned",
                "cosmoshub/val/1/signdata",
                "cosmoshub/val/1/unsigned",
            ]
        );

        session
            .execute(Commands::Delete(DeleteCmd {
                target: target(),
                index: 0,
            }))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_push_without_numbers_or_node_is_advisory() {
        let session = session();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tx.json");
        std::fs::write(&file, b"{}").unwrap();

        let err = session
            .execute(push_cmd(file, PublishOpts::default()))
            .await
            .unwrap_err();
        assert!(err.is_advisory());
        assert!(session.coordinator().store().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_chain_is_a_config_error() {
        let session = session();
        let err = session
            .execute(Commands::Broadcast(BroadcastCmd {
                target: Target {
                    chain: "juno".to_string(),
                    key: "val".to_string(),
                },
                index: 0,
                node: None,
                multisig_key: None,
                threshold: None,
                keep_on_failure: false,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_broadcast_without_node_is_a_config_error() {
        let session = session();
        let err = session
            .execute(Commands::Broadcast(BroadcastCmd {
                target: target(),
                index: 0,
                node: None,
                multisig_key: None,
                threshold: None,
                keep_on_failure: false,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_sign_missing_version() {
        let session = session();
        let err = session
            .execute(Commands::Sign(SignCmd {
                target: target(),
                from: "ledger".to_string(),
                index: 0,
                signer: None,
                yes: true,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }));
    }
}
