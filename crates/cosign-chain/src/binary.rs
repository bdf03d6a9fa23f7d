//! Subprocess-backed chain client
//!
//! Every call writes its inputs into a private scratch directory, runs the
//! chain binary with a bounded timeout and returns its standard output. The
//! scratch directory is removed when the call returns, whatever the outcome.

use crate::account::{parse_account, parse_balance, AccountNumbers};
use crate::result::TxResult;
use crate::{AccountQuery, AggregateRequest, Broadcaster, ChainError, SignRequest, Signer};
use async_trait::async_trait;
use cosign_types::{ChainProfile, Config};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Default limit for a single invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Argument list for one invocation
#[derive(Debug, Default)]
pub(crate) struct Args(Vec<OsString>);

impl Args {
    pub(crate) fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut this = Self::default();
        this.extend(args);
        this
    }

    pub(crate) fn push(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.0.push(arg.as_ref().to_os_string());
        self
    }

    pub(crate) fn extend<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.push(arg);
        }
        self
    }

    /// Append `flag value` when `value` is set and non-empty
    pub(crate) fn opt(&mut self, flag: &str, value: Option<impl AsRef<OsStr>>) -> &mut Self {
        if let Some(value) = value {
            if !value.as_ref().is_empty() {
                self.push(flag).push(value);
            }
        }
        self
    }

    pub(crate) fn as_slice(&self) -> &[OsString] {
        &self.0
    }
}

/// A chain's command line client
#[derive(Debug, Clone)]
pub struct ChainBinary {
    binary: String,
    keyring_backend: Option<String>,
    home: Option<PathBuf>,
    timeout: Duration,
}

impl ChainBinary {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            keyring_backend: None,
            home: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client for `chain` with the keyring and timeout from `config`
    pub fn for_chain(chain: &ChainProfile, config: &Config) -> Self {
        Self::new(&chain.binary)
            .with_keyring_backend(&config.keyring_backend)
            .with_timeout(config.timeouts.subprocess())
    }

    pub fn with_keyring_backend(mut self, backend: &str) -> Self {
        self.keyring_backend = (!backend.is_empty()).then(|| backend.to_string());
        self
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub(crate) fn keyring_backend(&self) -> Option<&str> {
        self.keyring_backend.as_deref()
    }

    fn render(&self, args: &Args) -> String {
        let mut rendered = self.binary.clone();
        for arg in args.as_slice() {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }

    /// Run the binary, returning stdout on success
    pub(crate) async fn run(&self, args: &Args) -> Result<Vec<u8>, ChainError> {
        let output = self.run_raw(args).await?;
        Ok(output.stdout)
    }

    /// Run the binary, returning stdout followed by stderr on success
    pub(crate) async fn run_combined(&self, args: &Args) -> Result<Vec<u8>, ChainError> {
        let mut output = self.run_raw(args).await?;
        output.stdout.extend_from_slice(&output.stderr);
        Ok(output.stdout)
    }

    async fn run_raw(&self, args: &Args) -> Result<std::process::Output, ChainError> {
        let command = self.render(args);
        debug!(command = %command, "running chain binary");

        let child = Command::new(&self.binary)
            .args(args.as_slice())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ChainError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ChainError::Timeout {
                command: command.clone(),
                after: self.timeout,
            })??;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ChainError::Exit {
                command,
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(output)
    }

    /// Append the flags every keyring-touching command takes
    fn keyring_flags(&self, args: &mut Args) {
        args.opt("--keyring-backend", self.keyring_backend.as_deref())
            .opt("--home", self.home.as_deref());
    }

    /// Current balance of `denom` held by `address`
    pub async fn balance(&self, address: &str, denom: &str, node: &str) -> Result<u128, ChainError> {
        let mut args = Args::new(["query", "bank", "balances", "--output", "json"]);
        args.opt("--node", Some(node)).push(address);
        let output = self.run(&args).await?;
        parse_balance(&output, denom)
    }
}

fn scratch_file(dir: &TempDir, name: &str, data: &[u8]) -> Result<PathBuf, ChainError> {
    let path = dir.path().join(name);
    std::fs::write(&path, data)?;
    Ok(path)
}

fn scratch_dir() -> Result<TempDir, ChainError> {
    Ok(tempfile::Builder::new().prefix("cosign-").tempdir()?)
}

fn metadata_flags(args: &mut Args, account: u64, sequence: u64, chain_id: &str) {
    args.push("--account-number")
        .push(account.to_string())
        .push("--sequence")
        .push(sequence.to_string())
        .push("--chain-id")
        .push(chain_id);
}

#[async_trait]
impl Signer for ChainBinary {
    async fn sign(&self, request: SignRequest<'_>) -> cosign_errors::Result<Vec<u8>> {
        let dir = scratch_dir()?;
        let unsigned = scratch_file(&dir, "unsigned.json", request.payload)?;

        let mut args = Args::new([OsStr::new("tx"), OsStr::new("sign"), unsigned.as_os_str()]);
        args.push("--multisig")
            .push(request.multisig_address)
            .push("--from")
            .push(request.from);
        let meta = request.metadata;
        metadata_flags(&mut args, meta.account, meta.sequence, &meta.chain_id);
        args.extend(["--sign-mode", "amino-json", "--offline"]);
        self.keyring_flags(&mut args);

        let signature = self.run(&args).await?;
        info!(from = request.from, bytes = signature.len(), "signed transaction");
        Ok(signature)
    }
}

#[async_trait]
impl Broadcaster for ChainBinary {
    async fn aggregate(&self, request: AggregateRequest<'_>) -> cosign_errors::Result<Vec<u8>> {
        let dir = scratch_dir()?;
        let unsigned = scratch_file(&dir, "unsigned.json", request.payload)?;

        let mut args = Args::new([OsStr::new("tx"), OsStr::new("multisign"), unsigned.as_os_str()]);
        args.push(request.multisig_key);
        for (i, (_, signature)) in request.signatures.iter().enumerate() {
            let file = scratch_file(&dir, &format!("sig-{i}.json"), signature)?;
            args.push(file);
        }
        let meta = request.metadata;
        metadata_flags(&mut args, meta.account, meta.sequence, &meta.chain_id);
        args.push("--offline");
        args.opt("--keyring-backend", self.keyring_backend.as_deref())
            .opt("--node", request.node)
            .opt("--home", self.home.as_deref());

        Ok(self.run(&args).await?)
    }

    async fn submit(&self, signed: &[u8], node: &str) -> cosign_errors::Result<TxResult> {
        let dir = scratch_dir()?;
        let signed = scratch_file(&dir, "signed.json", signed)?;

        let mut args = Args::new([OsStr::new("tx"), OsStr::new("broadcast"), signed.as_os_str()]);
        args.push("--node").push(node);

        let output = self.run_combined(&args).await?;
        let result = TxResult::parse(&output)?;
        info!(code = result.code, txhash = %result.txhash, "broadcast submitted");
        Ok(result)
    }
}

#[async_trait]
impl AccountQuery for ChainBinary {
    async fn account(&self, address: &str, node: &str) -> cosign_errors::Result<AccountNumbers> {
        let args = Args::new(["query", "--node", node, "account", address, "--output", "json"]);
        let output = self.run(&args).await?;
        Ok(parse_account(&output)?)
    }
}
