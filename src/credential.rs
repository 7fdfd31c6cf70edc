use crate::{KeyVaultError, KeyVaultSettings};
use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential as AzureTokenCredential};
use azure_identity::{ClientSecretCredential, DeveloperToolsCredential, ManagedIdentityCredential};
use chrono::{DateTime, Duration, TimeZone, Utc};
use getset::Getters;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct AccessToken {
    token: Secret,
    expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: Secret::new(token.into()),
            expires_on,
        }
    }

    pub fn secret(&self) -> &str {
        self.token.secret()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_on <= Utc::now() + Duration::seconds(EXPIRY_SKEW_SECONDS)
    }
}

/// Something that can produce bearer tokens for an Azure AD scope such as `https://vault.azure.net/.default`.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, KeyVaultError>;
}

/// Which way of authenticating a lookup uses.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialKind {
    ClientSecret {
        tenant_id: String,
        app_id: String,
        app_secret: String,
    },
    /// Ambient identity discovered by [`DefaultCredential`](crate::DefaultCredential).
    Default,
}

impl CredentialKind {
    /// `ClientSecret` when both the app id and app secret are set, `Default` otherwise.
    /// The tenant id plays no part in the choice.
    pub fn select(settings: &KeyVaultSettings) -> Self {
        if settings.app_id.is_empty() || settings.app_secret.is_empty() {
            CredentialKind::Default
        } else {
            CredentialKind::ClientSecret {
                tenant_id: settings.tenant_id.clone(),
                app_id: settings.app_id.clone(),
                app_secret: settings.app_secret.clone(),
            }
        }
    }
}

impl fmt::Debug for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ClientSecret { tenant_id, app_id, .. } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("app_id", app_id)
                .field("app_secret", &"[redacted]")
                .finish(),
            CredentialKind::Default => f.write_str("Default"),
        }
    }
}

/// An `azure_identity` credential behind the crate's [`TokenCredential`].
///
/// # Examples
///
/// ```
/// use keyvault_secret::AzureCredential;
/// let credential = AzureCredential::client_secret(&"bc598e67-03d8-44d5-aa46-8289b9a39a14", &"c1a6d79b-082b-4798-b362-a77e96de50db", &"SUPER_SECRET_KEY");
/// assert!(credential.is_ok());
/// ```
#[derive(Clone)]
pub struct AzureCredential {
    name: &'static str,
    inner: Arc<dyn AzureTokenCredential>,
}

impl fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredential").field("name", &self.name).finish()
    }
}

impl AzureCredential {
    pub fn new(name: &'static str, inner: Arc<dyn AzureTokenCredential>) -> Self {
        Self { name, inner }
    }

    /// Azure AD application with a client secret. A malformed tenant id is rejected here.
    pub fn client_secret(tenant_id: &str, app_id: &str, app_secret: &str) -> Result<Self, KeyVaultError> {
        let credential =
            ClientSecretCredential::new(tenant_id, app_id.to_owned(), Secret::new(app_secret.to_owned()), None)
                .map_err(KeyVaultError::Credential)?;
        Ok(Self::new("ClientSecretCredential", credential))
    }

    /// The host's managed identity.
    pub fn managed_identity() -> Result<Self, KeyVaultError> {
        let credential = ManagedIdentityCredential::new(None).map_err(KeyVaultError::Credential)?;
        Ok(Self::new("ManagedIdentityCredential", credential))
    }

    /// Local developer logins (`az login`, `azd auth login`).
    pub fn developer_tools() -> Result<Self, KeyVaultError> {
        let credential = DeveloperToolsCredential::new(None).map_err(KeyVaultError::Credential)?;
        Ok(Self::new("DeveloperToolsCredential", credential))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl TokenCredential for AzureCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, KeyVaultError> {
        debug!(credential = self.name, scope, "requesting token");
        let token = self
            .inner
            .get_token(&[scope], None)
            .await
            .map_err(|source| KeyVaultError::TokenRequest {
                credential: self.name,
                source,
            })?;
        let expires_on = Utc
            .timestamp_opt(token.expires_on.unix_timestamp(), 0)
            .single()
            .unwrap_or_else(Utc::now);
        Ok(AccessToken {
            token: token.token,
            expires_on,
        })
    }
}
