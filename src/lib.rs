//! Fetch secrets from Azure Key Vault.
//!
//! [`get_secret`] authenticates with an Azure AD application when `keyvault.appID` and
//! `keyvault.appSecret` are configured, and falls back to [`DefaultCredential`]
//! (environment variables, managed identity, developer logins) otherwise. Tokens come from
//! `azure_identity`.

mod client;
mod credential;
mod default_credential;
mod errors;
mod fetch;
mod secret;
mod settings;

pub use client::KeyVaultClient;
pub use credential::{AccessToken, AzureCredential, CredentialKind, TokenCredential};
pub use default_credential::DefaultCredential;
pub use errors::KeyVaultError;
pub use fetch::{get_secret, get_secret_version_with, get_secret_with, AzureClientFactory, ClientFactory};
pub use secret::{KeyVaultSecret, SecretStore};
pub use settings::KeyVaultSettings;
