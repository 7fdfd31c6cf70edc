use anyhow::Context;
use clap::Parser;
use keyvault_secret::{get_secret_version_with, AzureClientFactory, KeyVaultSettings};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Print a secret from Azure Key Vault.
///
/// Uses `keyvault.appID`/`keyvault.appSecret`/`keyvault.tenantID` from the config file or
/// `KEYVAULT_APPID`/`KEYVAULT_APPSECRET`/`KEYVAULT_TENANTID` when set, the default Azure
/// credential chain otherwise.
#[derive(Parser, Debug)]
#[command(name = "keyvault-secret", version, about)]
struct Cli {
    /// Vault name, or full vault URL.
    #[arg(long, env = "KEYVAULT_NAME")]
    vault: String,

    #[arg(long)]
    secret: String,

    /// Secret version; the latest when omitted.
    #[arg(long = "secret-version", default_value = "")]
    secret_version: String,

    /// Config file (TOML, YAML or JSON) holding a `keyvault` table.
    #[arg(long, short = 'c', env = "KEYVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Key Vault DNS suffix for sovereign clouds.
    #[arg(long, default_value = "vault.azure.net")]
    endpoint_suffix: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(value) => println!("{}", value),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let settings = KeyVaultSettings::load(cli.config.as_deref()).context("failed to load settings")?;
    let factory = AzureClientFactory::with_endpoint_suffix(cli.endpoint_suffix);
    let value = get_secret_version_with(&factory, &settings, &cli.vault, &cli.secret, &cli.secret_version).await?;
    Ok(value)
}
