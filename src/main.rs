use anyhow::{anyhow, Result};
use clap::Parser;
use cosign_client::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cosign_client::init_logging(&cli.global_opts).map_err(|e| anyhow!(e))?;

    match cosign_client::run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_advisory() => {
            eprintln!("warning: {e}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let code = u8::try_from(e.code()).unwrap_or(1);
            eprintln!("error: {:#}", anyhow::Error::from(e));
            Ok(ExitCode::from(code))
        }
    }
}
