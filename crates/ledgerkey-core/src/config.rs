//! Connection configuration.
//!
//! Options are resolved once per invocation from command-line flags,
//! environment variables (both handled by the CLI layer and passed in as
//! [`ConfigOverrides`]), an optional JSON config file, and built-in
//! defaults, in that order of precedence. The result is an immutable
//! [`ConnectionOptions`] record handed to the session client.
//!
//! The default config file is `~/.config/ledgerkey/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Application name used for config directory paths
const APP_NAME: &str = "ledgerkey";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name inside the config directory
const TOKEN_FILE: &str = "token";

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3322;
pub const DEFAULT_AUTH: bool = true;
pub const DEFAULT_SERVERNAME: &str = "localhost";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Mutual TLS settings, present only when mTLS is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtlsOptions {
    /// Name the server certificate is verified against
    pub servername: String,
    pub certificate: PathBuf,
    pub pkey: PathBuf,
    /// Trusted certificate authority bundle
    pub clientcas: PathBuf,
}

/// Everything needed to open a session with the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub address: String,
    pub port: u16,
    pub auth: bool,
    pub mtls: Option<MtlsOptions>,
    pub token_file: PathBuf,
    pub request_timeout: Duration,
}

impl ConnectionOptions {
    /// Defaults with an explicit token file, mostly useful in tests.
    pub fn with_token_file(token_file: impl Into<PathBuf>) -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            auth: DEFAULT_AUTH,
            mtls: None,
            token_file: token_file.into(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfigFile {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub auth: Option<bool>,
    pub mtls: Option<bool>,
    pub servername: Option<String>,
    pub certificate: Option<PathBuf>,
    pub pkey: Option<PathBuf>,
    pub clientcas: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Load the config file.
    ///
    /// An explicit path must exist. The default location is optional and
    /// yields an empty config when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ConfigFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "Using config file");
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub auth: Option<bool>,
    pub mtls: Option<bool>,
    pub servername: Option<String>,
    pub certificate: Option<PathBuf>,
    pub pkey: Option<PathBuf>,
    pub clientcas: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
}

/// Default token location: `~/.config/ledgerkey/token`
pub fn default_token_file() -> Result<PathBuf> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(config_dir.join(APP_NAME).join(TOKEN_FILE))
}

/// Merge overrides over the config file over defaults.
pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> Result<ConnectionOptions> {
    let token_file = match overrides.token_file.or(file.token_file) {
        Some(path) => path,
        None => default_token_file()?,
    };

    let mtls_enabled = overrides.mtls.or(file.mtls).unwrap_or(false);
    let mtls = if mtls_enabled {
        let certificate = overrides.certificate.or(file.certificate);
        let pkey = overrides.pkey.or(file.pkey);
        let clientcas = overrides.clientcas.or(file.clientcas);
        let (Some(certificate), Some(pkey), Some(clientcas)) = (certificate, pkey, clientcas)
        else {
            bail!("mutual TLS requires certificate, pkey and clientcas to be set");
        };
        Some(MtlsOptions {
            servername: overrides
                .servername
                .or(file.servername)
                .unwrap_or_else(|| DEFAULT_SERVERNAME.to_string()),
            certificate,
            pkey,
            clientcas,
        })
    } else {
        None
    };

    Ok(ConnectionOptions {
        address: overrides
            .address
            .or(file.address)
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
        auth: overrides.auth.or(file.auth).unwrap_or(DEFAULT_AUTH),
        mtls,
        token_file,
        request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
    })
}
