use std::error::Error as StdError;
use thiserror::Error;

/// Errors returned by credential construction, token acquisition and secret retrieval.
///
/// Variants that wrap another error expose it through `source()` and leave it out of their own
/// message, so `{:#}` on an `anyhow::Error` prints each cause once.
#[derive(Error, Debug)]
pub enum KeyVaultError {
    #[error("invalid key vault url for {vault:?}")]
    InvalidVaultUrl {
        vault: String,
        #[source]
        source: url::ParseError,
    },

    /// An Azure identity credential could not be built from the given settings.
    #[error("failed to create the credentials")]
    Credential(#[source] azure_core::Error),

    #[error("failed to acquire a token from {credential}")]
    TokenRequest {
        credential: &'static str,
        #[source]
        source: azure_core::Error,
    },

    /// Every source of the default credential chain failed; the message lists each one's reason.
    #[error("no credential in the default chain could authenticate ({0})")]
    CredentialUnavailable(String),

    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    /// Non-success response from Key Vault, decoded from its error envelope.
    #[error("key vault returned {status}: ({code}) {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response body")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("failed to load configuration")]
    Config(#[from] config::ConfigError),

    /// A fetch failure. The message carries the whole cause chain, so it has no `source()`.
    #[error("failed to get the secret: {}", .0.chain())]
    GetSecret(Box<KeyVaultError>),
}

impl KeyVaultError {
    pub(crate) fn get_secret(cause: KeyVaultError) -> Self {
        KeyVaultError::GetSecret(Box::new(cause))
    }

    pub fn is_credential_unavailable(&self) -> bool {
        matches!(self, KeyVaultError::CredentialUnavailable(_))
    }

    fn chain(&self) -> String {
        error_chain(self)
    }
}

/// `err` and its sources joined with `": "`.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
