use crate::KeyVaultClient;
use crate::KeyVaultError;
use async_trait::async_trait;
use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use getset::Getters;
use serde::Deserialize;
use tracing::debug;

pub(crate) const API_VERSION: &str = "7.4";

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct KeyVaultSecret {
    id: String,
    value: String,
    enabled: bool,
    content_type: Option<String>,
    time_created: DateTime<Utc>,
    time_updated: DateTime<Utc>,
}

impl KeyVaultSecret {
    /// An enabled secret created now, for stores that are not backed by Key Vault.
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            value: value.into(),
            enabled: true,
            content_type: None,
            time_created: now,
            time_updated: now,
        }
    }

    /// The version segment of the secret id.
    pub fn version(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or_default()
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct KeyVaultGetSecretResponse {
    value: String,
    id: String,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    attributes: KeyVaultGetSecretResponseAttributes,
}

#[derive(Deserialize, Debug)]
pub(crate) struct KeyVaultGetSecretResponseAttributes {
    enabled: bool,
    #[serde(with = "ts_seconds")]
    created: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    updated: DateTime<Utc>,
}

impl From<KeyVaultGetSecretResponse> for KeyVaultSecret {
    fn from(response: KeyVaultGetSecretResponse) -> Self {
        KeyVaultSecret {
            enabled: response.attributes.enabled,
            value: response.value,
            content_type: response.content_type,
            time_created: response.attributes.created,
            time_updated: response.attributes.updated,
            id: response.id,
        }
    }
}

/// Read access to named, versioned secrets.
#[async_trait]
pub trait SecretStore: Send {
    /// Fetches `secret_name` at `version`; an empty version means the latest.
    async fn get_secret_with_version(
        &mut self,
        secret_name: &str,
        version: &str,
    ) -> Result<KeyVaultSecret, KeyVaultError>;

    async fn get_secret(&mut self, secret_name: &str) -> Result<KeyVaultSecret, KeyVaultError> {
        self.get_secret_with_version(secret_name, "").await
    }
}

impl KeyVaultClient {
    /// Gets a secret from the Key Vault.
    /// Note that the latest version is fetched. For a specific version, use `get_secret_with_version`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use keyvault_secret::{AzureCredential, KeyVaultClient};
    /// use std::sync::Arc;
    /// # async fn example() -> Result<(), keyvault_secret::KeyVaultError> {
    /// let mut client = KeyVaultClient::new(&"test-keyvault", Arc::new(AzureCredential::developer_tools()?))?;
    /// let secret = client.get_secret(&"SECRET_NAME").await?;
    /// println!("{}", secret.value());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_secret(&mut self, secret_name: &str) -> Result<KeyVaultSecret, KeyVaultError> {
        self.get_secret_with_version(secret_name, "").await
    }

    /// Gets a secret from the Key Vault with a specific version.
    /// If you need the latest version, use `get_secret`.
    pub async fn get_secret_with_version(
        &mut self,
        secret_name: &str,
        secret_version_name: &str,
    ) -> Result<KeyVaultSecret, KeyVaultError> {
        let mut uri = if secret_version_name.is_empty() {
            self.secrets_url(&[secret_name])
        } else {
            self.secrets_url(&[secret_name, secret_version_name])
        };
        uri.query_pairs_mut().append_pair("api-version", API_VERSION);

        debug!(%uri, "fetching secret");
        let resp_body = self.get_authed(uri).await?;
        let response = serde_json::from_str::<KeyVaultGetSecretResponse>(&resp_body)?;
        Ok(response.into())
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret_with_version(
        &mut self,
        secret_name: &str,
        version: &str,
    ) -> Result<KeyVaultSecret, KeyVaultError> {
        KeyVaultClient::get_secret_with_version(self, secret_name, version).await
    }
}
