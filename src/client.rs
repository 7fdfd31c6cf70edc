use crate::{AccessToken, KeyVaultError, TokenCredential};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub(crate) const PUBLIC_ENDPOINT_SUFFIX: &str = "vault.azure.net";

/// Client for Key Vault secret operations.
///
/// The vault is given either by name, which resolves to `https://{name}.vault.azure.net`,
/// or by a full `https://` URL which is used as-is.
///
/// # Examples
///
/// ```
/// use keyvault_secret::{AzureCredential, KeyVaultClient};
/// use std::sync::Arc;
/// let credential = AzureCredential::client_secret(&"bc598e67-03d8-44d5-aa46-8289b9a39a14", &"c1a6d79b-082b-4798-b362-a77e96de50db", &"SUPER_SECRET_KEY").unwrap();
/// let client = KeyVaultClient::new(&"test-keyvault", Arc::new(credential)).unwrap();
/// assert_eq!(client.vault_url().as_str(), "https://test-keyvault.vault.azure.net/");
/// ```
pub struct KeyVaultClient {
    pub(crate) vault_url: Url,
    pub(crate) scope: String,
    pub(crate) credential: Arc<dyn TokenCredential>,
    pub(crate) http: reqwest::Client,
    pub(crate) token: Option<AccessToken>,
}

impl fmt::Debug for KeyVaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultClient")
            .field("vault_url", &self.vault_url.as_str())
            .field("scope", &self.scope)
            .field("token", &self.token)
            .finish()
    }
}

#[derive(Deserialize, Debug)]
struct KeyVaultErrorResponse {
    error: KeyVaultErrorBody,
}

#[derive(Deserialize, Debug)]
struct KeyVaultErrorBody {
    code: String,
    message: String,
}

impl KeyVaultClient {
    /// Creates a new `KeyVaultClient` with an endpoint suffix. Useful for non-public Azure clouds.
    /// For the default public environment, use `KeyVaultClient::new`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyvault_secret::{AzureCredential, KeyVaultClient};
    /// use std::sync::Arc;
    /// let credential = AzureCredential::developer_tools().unwrap();
    /// let client = KeyVaultClient::new_with_endpoint_suffix(&"test-keyvault", &"vault.azure.cn", Arc::new(credential)).unwrap();
    /// assert_eq!(client.vault_url().as_str(), "https://test-keyvault.vault.azure.cn/");
    /// ```
    pub fn new_with_endpoint_suffix(
        vault_name: &str,
        endpoint_suffix: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, KeyVaultError> {
        Ok(Self {
            vault_url: resolve_vault_url(vault_name, endpoint_suffix)?,
            scope: format!("https://{}/.default", endpoint_suffix),
            credential,
            http: reqwest::Client::new(),
            token: None,
        })
    }

    /// Creates a new `KeyVaultClient` in the public Azure cloud.
    pub fn new(vault_name: &str, credential: Arc<dyn TokenCredential>) -> Result<Self, KeyVaultError> {
        KeyVaultClient::new_with_endpoint_suffix(vault_name, PUBLIC_ENDPOINT_SUFFIX, credential)
    }

    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    pub(crate) async fn refresh_token(&mut self) -> Result<String, KeyVaultError> {
        if let Some(token) = self.token.as_ref().filter(|token| !token.is_expired()) {
            // Token is valid, return it.
            return Ok(token.secret().to_owned());
        }
        debug!(scope = %self.scope, "acquiring key vault token");
        let token = self.credential.get_token(&self.scope).await?;
        let secret = token.secret().to_owned();
        self.token = Some(token);
        Ok(secret)
    }

    /// `{vault}/secrets/{segments...}` with every segment percent-encoded.
    pub(crate) fn secrets_url(&self, segments: &[&str]) -> Url {
        let mut url = self.vault_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("secrets");
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    pub(crate) async fn get_authed(&mut self, uri: Url) -> Result<String, KeyVaultError> {
        let token = self.refresh_token().await?;

        let resp = self.http.get(uri).bearer_auth(token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        Err(match serde_json::from_str::<KeyVaultErrorResponse>(&body) {
            Ok(response) => KeyVaultError::Service {
                status: status.as_u16(),
                code: response.error.code,
                message: response.error.message,
            },
            Err(_) => KeyVaultError::Service {
                status: status.as_u16(),
                code: status.canonical_reason().unwrap_or("Unknown").to_owned(),
                message: body,
            },
        })
    }
}

fn resolve_vault_url(vault_name: &str, endpoint_suffix: &str) -> Result<Url, KeyVaultError> {
    let raw = if vault_name.starts_with("https://") || vault_name.starts_with("http://") {
        vault_name.to_owned()
    } else {
        format!("https://{}.{}", vault_name, endpoint_suffix)
    };
    Url::parse(&raw).map_err(|source| KeyVaultError::InvalidVaultUrl {
        vault: vault_name.to_owned(),
        source,
    })
}
