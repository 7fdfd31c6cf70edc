use crate::client::PUBLIC_ENDPOINT_SUFFIX;
use crate::{
    AzureCredential, CredentialKind, DefaultCredential, KeyVaultClient, KeyVaultError, KeyVaultSettings, SecretStore,
    TokenCredential,
};
use std::sync::Arc;
use tracing::info;

/// Builds the credential and vault client used by a lookup.
pub trait ClientFactory: Send + Sync {
    fn client_secret_credential(
        &self,
        tenant_id: &str,
        app_id: &str,
        app_secret: &str,
    ) -> Result<Arc<dyn TokenCredential>, KeyVaultError>;

    fn default_credential(&self) -> Result<Arc<dyn TokenCredential>, KeyVaultError>;

    fn secret_client(
        &self,
        vault_name: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Box<dyn SecretStore>, KeyVaultError>;
}

/// `azure_identity` credentials and `KeyVaultClient`s.
#[derive(Debug, Clone)]
pub struct AzureClientFactory {
    endpoint_suffix: String,
}

impl Default for AzureClientFactory {
    fn default() -> Self {
        Self::with_endpoint_suffix(PUBLIC_ENDPOINT_SUFFIX)
    }
}

impl AzureClientFactory {
    /// For sovereign clouds, e.g. `vault.azure.cn`.
    pub fn with_endpoint_suffix(endpoint_suffix: impl Into<String>) -> Self {
        Self {
            endpoint_suffix: endpoint_suffix.into(),
        }
    }
}

impl ClientFactory for AzureClientFactory {
    fn client_secret_credential(
        &self,
        tenant_id: &str,
        app_id: &str,
        app_secret: &str,
    ) -> Result<Arc<dyn TokenCredential>, KeyVaultError> {
        Ok(Arc::new(AzureCredential::client_secret(tenant_id, app_id, app_secret)?))
    }

    fn default_credential(&self) -> Result<Arc<dyn TokenCredential>, KeyVaultError> {
        Ok(Arc::new(DefaultCredential::new()?))
    }

    fn secret_client(
        &self,
        vault_name: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Box<dyn SecretStore>, KeyVaultError> {
        Ok(Box::new(KeyVaultClient::new_with_endpoint_suffix(
            vault_name,
            &self.endpoint_suffix,
            credential,
        )?))
    }
}

/// Fetches the latest value of `secret_name` from the vault `vault_name`.
///
/// Authenticates with the app id and secret from `settings` when both are set,
/// otherwise with [`DefaultCredential`].
///
/// # Example
///
/// ```no_run
/// use keyvault_secret::{get_secret, KeyVaultSettings};
/// # async fn example() -> Result<(), keyvault_secret::KeyVaultError> {
/// let settings = KeyVaultSettings::load(None)?;
/// let password = get_secret(&settings, "test-keyvault", "db-password").await?;
/// # Ok(())
/// # }
/// ```
pub async fn get_secret(
    settings: &KeyVaultSettings,
    vault_name: &str,
    secret_name: &str,
) -> Result<String, KeyVaultError> {
    get_secret_with(&AzureClientFactory::default(), settings, vault_name, secret_name).await
}

/// `get_secret` with credentials and client supplied by `factory`.
pub async fn get_secret_with<F>(
    factory: &F,
    settings: &KeyVaultSettings,
    vault_name: &str,
    secret_name: &str,
) -> Result<String, KeyVaultError>
where
    F: ClientFactory + ?Sized,
{
    get_secret_version_with(factory, settings, vault_name, secret_name, "").await
}

/// Like `get_secret_with` for a specific secret version; an empty version means the latest.
pub async fn get_secret_version_with<F>(
    factory: &F,
    settings: &KeyVaultSettings,
    vault_name: &str,
    secret_name: &str,
    version: &str,
) -> Result<String, KeyVaultError>
where
    F: ClientFactory + ?Sized,
{
    let credential = match CredentialKind::select(settings) {
        CredentialKind::ClientSecret {
            tenant_id,
            app_id,
            app_secret,
        } => {
            info!("using ClientSecretCredential to authenticate to the key vault");
            factory.client_secret_credential(&tenant_id, &app_id, &app_secret)?
        }
        CredentialKind::Default => {
            info!("using DefaultAzureCredential to authenticate to the key vault");
            factory.default_credential()?
        }
    };

    let mut client = factory.secret_client(vault_name, credential)?;
    let secret = client
        .get_secret_with_version(secret_name, version)
        .await
        .map_err(KeyVaultError::get_secret)?;
    Ok(secret.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessToken, KeyVaultSecret};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct NoopCredential;

    #[async_trait]
    impl TokenCredential for NoopCredential {
        async fn get_token(&self, _scope: &str) -> Result<AccessToken, KeyVaultError> {
            Ok(AccessToken::new("token", Utc::now() + Duration::hours(1)))
        }
    }

    struct StubStore {
        secrets: HashMap<String, String>,
        requested: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SecretStore for StubStore {
        async fn get_secret_with_version(
            &mut self,
            secret_name: &str,
            version: &str,
        ) -> Result<KeyVaultSecret, KeyVaultError> {
            self.requested.lock().unwrap().push(format!("{}@{}", secret_name, version));
            match self.secrets.get(secret_name) {
                Some(value) => Ok(KeyVaultSecret::new(format!("stub/{}", secret_name), value.clone())),
                None => Err(KeyVaultError::Service {
                    status: 404,
                    code: "SecretNotFound".to_owned(),
                    message: "not found".to_owned(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        secrets: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
        requested: Arc<Mutex<Vec<String>>>,
        fail_client: bool,
    }

    impl RecordingFactory {
        fn with_secret(name: &str, value: &str) -> Self {
            let mut factory = Self::default();
            factory.secrets.insert(name.to_owned(), value.to_owned());
            factory
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ClientFactory for RecordingFactory {
        fn client_secret_credential(
            &self,
            tenant_id: &str,
            app_id: &str,
            app_secret: &str,
        ) -> Result<Arc<dyn TokenCredential>, KeyVaultError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("client_secret({},{},{})", tenant_id, app_id, app_secret));
            Ok(Arc::new(NoopCredential))
        }

        fn default_credential(&self) -> Result<Arc<dyn TokenCredential>, KeyVaultError> {
            self.calls.lock().unwrap().push("default".to_owned());
            Ok(Arc::new(NoopCredential))
        }

        fn secret_client(
            &self,
            vault_name: &str,
            _credential: Arc<dyn TokenCredential>,
        ) -> Result<Box<dyn SecretStore>, KeyVaultError> {
            self.calls.lock().unwrap().push(format!("client({})", vault_name));
            if self.fail_client {
                return Err(KeyVaultError::InvalidVaultUrl {
                    vault: vault_name.to_owned(),
                    source: url::ParseError::EmptyHost,
                });
            }
            Ok(Box::new(StubStore {
                secrets: self.secrets.clone(),
                requested: self.requested.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn returns_secret_value() {
        let factory = RecordingFactory::with_secret("db-password", "s3cr3t");
        let value = get_secret_with(&factory, &KeyVaultSettings::default(), "vault", "db-password")
            .await
            .unwrap();
        assert_eq!(value, "s3cr3t");
    }

    #[tokio::test]
    async fn client_secret_used_when_configured() {
        let factory = RecordingFactory::with_secret("db-password", "s3cr3t");
        let settings = KeyVaultSettings::new("app", "secret", "tenant");
        get_secret_with(&factory, &settings, "vault", "db-password").await.unwrap();
        assert_eq!(factory.calls(), vec!["client_secret(tenant,app,secret)", "client(vault)"]);
    }

    #[tokio::test]
    async fn default_chain_used_when_id_or_secret_missing() {
        for settings in [
            KeyVaultSettings::new("app", "", "tenant"),
            KeyVaultSettings::new("", "secret", "tenant"),
            KeyVaultSettings::default(),
        ]
        .iter()
        {
            let factory = RecordingFactory::with_secret("db-password", "s3cr3t");
            get_secret_with(&factory, settings, "vault", "db-password").await.unwrap();
            assert_eq!(factory.calls(), vec!["default", "client(vault)"], "{:?}", settings);
        }
    }

    #[tokio::test]
    async fn fetch_errors_are_wrapped() {
        let factory = RecordingFactory::default();
        let err = get_secret_with(&factory, &KeyVaultSettings::default(), "vault", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultError::GetSecret(_)));
        let message = err.to_string();
        assert!(message.starts_with("failed to get the secret: "), "{}", message);
        assert!(message.contains("not found"), "{}", message);
    }

    #[tokio::test]
    async fn construction_errors_are_returned_unwrapped() {
        let factory = RecordingFactory {
            fail_client: true,
            ..Default::default()
        };
        let err = get_secret_with(&factory, &KeyVaultSettings::default(), "vault", "db-password")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultError::InvalidVaultUrl { .. }));
        assert!(factory.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_names_pass_through() {
        let factory = RecordingFactory::with_secret("", "blank");
        let value = get_secret_with(&factory, &KeyVaultSettings::default(), "", "").await.unwrap();
        assert_eq!(value, "blank");
        assert_eq!(factory.calls(), vec!["default", "client()"]);
        assert_eq!(*factory.requested.lock().unwrap(), vec!["@".to_owned()]);
    }

    #[tokio::test]
    async fn specific_version_reaches_the_store() {
        let factory = RecordingFactory::with_secret("db-password", "s3cr3t");
        get_secret_version_with(&factory, &KeyVaultSettings::default(), "vault", "db-password", "v2")
            .await
            .unwrap();
        assert_eq!(*factory.requested.lock().unwrap(), vec!["db-password@v2".to_owned()]);
    }

    #[tokio::test]
    async fn concurrent_lookups_do_not_interfere() {
        let mut factory = RecordingFactory::default();
        for i in 0..16 {
            factory.secrets.insert(format!("secret-{}", i), format!("value-{}", i));
        }
        let factory = Arc::new(factory);
        let settings = Arc::new(KeyVaultSettings::new("app", "secret", "tenant"));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let factory = factory.clone();
                let settings = settings.clone();
                tokio::spawn(async move {
                    let name = format!("secret-{}", i);
                    let value = get_secret_with(&*factory, &settings, "vault", &name).await.unwrap();
                    (i, value)
                })
            })
            .collect();

        for handle in handles {
            let (i, value) = handle.await.unwrap();
            assert_eq!(value, format!("value-{}", i));
        }
        assert_eq!(factory.requested.lock().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn azure_factory_builds_identity_credentials() {
        let factory = AzureClientFactory::with_endpoint_suffix("vault.azure.cn");
        assert!(factory
            .client_secret_credential("bc598e67-03d8-44d5-aa46-8289b9a39a14", "app", "secret")
            .is_ok());
        assert!(matches!(
            factory.client_secret_credential("not a tenant/", "app", "secret"),
            Err(KeyVaultError::Credential(_))
        ));
        let credential = factory.default_credential().unwrap();
        assert!(factory.secret_client("test-keyvault", credential).is_ok());
    }

    #[tokio::test]
    async fn bad_tenant_fails_before_any_fetch() {
        let settings = KeyVaultSettings::new("app", "secret", "not a tenant/");
        let err = get_secret(&settings, "test-keyvault", "db-password").await.unwrap_err();
        assert!(matches!(err, KeyVaultError::Credential(_)));
    }
}
