use crate::KeyVaultError;
use config::{Config, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default)]
    keyvault: KeyVaultSettings,
}

/// The `keyvault.appID`, `keyvault.appSecret` and `keyvault.tenantID` settings.
///
/// Absent keys read as empty strings; an empty value and a missing one are treated alike.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyVaultSettings {
    #[serde(rename = "appid", alias = "appID")]
    pub app_id: String,
    #[serde(rename = "appsecret", alias = "appSecret")]
    pub app_secret: String,
    #[serde(rename = "tenantid", alias = "tenantID")]
    pub tenant_id: String,
}

impl fmt::Debug for KeyVaultSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultSettings")
            .field("app_id", &self.app_id)
            .field("app_secret", &if self.app_secret.is_empty() { "" } else { "[redacted]" })
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl KeyVaultSettings {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Loads settings from an optional config file (format picked from its extension),
    /// then applies `KEYVAULT_APPID`, `KEYVAULT_APPSECRET` and `KEYVAULT_TENANTID`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keyvault_secret::KeyVaultSettings;
    /// let settings = KeyVaultSettings::load(Some("config.toml".as_ref())).unwrap();
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Self, KeyVaultError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Like `load`, with environment lookups going through `lookup`.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, KeyVaultError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let mut settings = Self::from_config(&builder.build()?)?;

        if let Some(app_id) = lookup("KEYVAULT_APPID") {
            settings.app_id = app_id;
        }
        if let Some(app_secret) = lookup("KEYVAULT_APPSECRET") {
            settings.app_secret = app_secret;
        }
        if let Some(tenant_id) = lookup("KEYVAULT_TENANTID") {
            settings.tenant_id = tenant_id;
        }
        Ok(settings)
    }

    pub fn from_config(config: &Config) -> Result<Self, KeyVaultError> {
        let settings: Settings = config.clone().try_deserialize()?;
        Ok(settings.keyvault)
    }
}
