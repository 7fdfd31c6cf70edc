use crate::errors::error_chain;
use crate::{AccessToken, AzureCredential, KeyVaultError, TokenCredential};
use async_trait::async_trait;
use tracing::{debug, info};

/// Ambient credential: an environment-configured service principal, then the host's managed
/// identity, then local developer logins. Every source is an `azure_identity` credential.
///
/// Sources are tried in order; the first token wins and every failure hands over to the next source.
pub struct DefaultCredential {
    sources: Vec<(&'static str, Box<dyn TokenCredential>)>,
}

impl DefaultCredential {
    pub fn new() -> Result<Self, KeyVaultError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Like `new`, with environment lookups going through `lookup`.
    ///
    /// The environment source is included only when `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
    /// `AZURE_CLIENT_SECRET` are all set and non-empty.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, KeyVaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut sources: Vec<(&'static str, Box<dyn TokenCredential>)> = Vec::with_capacity(3);

        if let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (var("AZURE_TENANT_ID"), var("AZURE_CLIENT_ID"), var("AZURE_CLIENT_SECRET"))
        {
            let credential = AzureCredential::client_secret(&tenant_id, &client_id, &client_secret)?;
            sources.push(("EnvironmentCredential", Box::new(credential) as Box<dyn TokenCredential>));
        }
        sources.push((
            "ManagedIdentityCredential",
            Box::new(AzureCredential::managed_identity()?) as Box<dyn TokenCredential>,
        ));
        sources.push((
            "DeveloperToolsCredential",
            Box::new(AzureCredential::developer_tools()?) as Box<dyn TokenCredential>,
        ));

        Ok(Self::with_sources(sources))
    }

    pub fn with_sources(sources: Vec<(&'static str, Box<dyn TokenCredential>)>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, KeyVaultError> {
        let mut reasons = Vec::with_capacity(self.sources.len());
        for (name, source) in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    info!(source = *name, "authenticated with default credential chain");
                    return Ok(token);
                }
                Err(e) => {
                    let reason = error_chain(&e);
                    debug!(source = *name, %reason, "credential source failed");
                    reasons.push(format!("{}: {}", name, reason));
                }
            }
        }
        Err(KeyVaultError::CredentialUnavailable(reasons.join("; ")))
    }
}
