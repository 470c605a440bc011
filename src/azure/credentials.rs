//! Azure SDK auth file loading and bearer token acquisition.
//!
//! The auth file is the JSON document produced by
//! `az ad sp create-for-rbac --sdk-auth`. Its location comes from the
//! provisioner configuration or from `AZURE_AUTH_LOCATION`.

use std::fmt;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::ArmError;

/// Environment variable naming the auth file when configuration does not.
pub const AUTH_LOCATION_ENV: &str = "AZURE_AUTH_LOCATION";

const DEFAULT_AAD_ENDPOINT: &str = "https://login.microsoftonline.com/";
const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com/";
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Errors raised while loading credentials or acquiring the first token.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Raised when neither configuration nor environment names an auth file.
    #[error("no Azure auth file configured: set INLETS_ACCESS_KEY_FILE or {AUTH_LOCATION_ENV}")]
    MissingLocation,
    /// Raised when the auth file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Auth file path.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the auth file is not valid JSON or misses a field.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Auth file path.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
    /// Raised when Azure AD rejects the service principal.
    #[error("failed to acquire an access token: {0}")]
    Token(#[source] ArmError),
}

/// Service principal credentials from an Azure SDK auth file.
#[derive(Clone, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthFile {
    /// Application (client) id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Subscription used when a host does not name one.
    #[serde(default)]
    pub subscription_id: String,
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Azure AD authority.
    #[serde(default = "default_aad_endpoint")]
    pub active_directory_endpoint_url: String,
    /// Resource Manager endpoint, also the token audience.
    #[serde(default = "default_arm_endpoint")]
    pub resource_manager_endpoint_url: String,
}

fn default_aad_endpoint() -> String {
    DEFAULT_AAD_ENDPOINT.to_owned()
}

fn default_arm_endpoint() -> String {
    DEFAULT_ARM_ENDPOINT.to_owned()
}

impl fmt::Debug for AuthFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFile")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field(
                "active_directory_endpoint_url",
                &self.active_directory_endpoint_url,
            )
            .field(
                "resource_manager_endpoint_url",
                &self.resource_manager_endpoint_url,
            )
            .finish()
    }
}

impl AuthFile {
    /// Resolves the auth file path from configuration, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::MissingLocation`] when neither is set.
    pub fn locate(configured: Option<&str>) -> Result<Utf8PathBuf, CredentialsError> {
        configured
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_owned)
            .or_else(|| {
                std::env::var(AUTH_LOCATION_ENV)
                    .ok()
                    .filter(|path| !path.trim().is_empty())
            })
            .map(Utf8PathBuf::from)
            .ok_or(CredentialsError::MissingLocation)
    }

    /// Reads and parses an auth file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Io`] when the file cannot be read and
    /// [`CredentialsError::Parse`] when it is not a valid auth file.
    pub fn load(path: &Utf8Path) -> Result<Self, CredentialsError> {
        let raw = read_to_string_ambient(path).map_err(|message| CredentialsError::Io {
            path: path.to_owned(),
            message,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Utf8Path, raw: &str) -> Result<Self, CredentialsError> {
        serde_json::from_str(raw).map_err(|err| CredentialsError::Parse {
            path: path.to_owned(),
            message: err.to_string(),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.active_directory_endpoint_url.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

fn read_to_string_ambient(path: &Utf8Path) -> Result<String, String> {
    let (dir_path, file_path) = if path.is_absolute() {
        let parent = path
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path}"))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime(&self) -> Duration {
        let seconds = match self.expires_in.as_ref() {
            Some(serde_json::Value::Number(number)) => number.as_u64(),
            Some(serde_json::Value::String(text)) => text.parse().ok(),
            _ => None,
        };
        seconds.map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs)
    }
}

/// Client-credentials token source with a refresh-on-expiry cache.
pub(crate) struct TokenSource {
    http: reqwest::Client,
    auth: AuthFile,
    cached: RwLock<AccessToken>,
}

impl TokenSource {
    /// Acquires the first token so bad credentials fail at construction.
    pub(crate) async fn connect(
        http: reqwest::Client,
        auth: AuthFile,
    ) -> Result<Self, CredentialsError> {
        let token = fetch_token(&http, &auth)
            .await
            .map_err(CredentialsError::Token)?;
        Ok(Self {
            http,
            auth,
            cached: RwLock::new(token),
        })
    }

    pub(crate) const fn auth(&self) -> &AuthFile {
        &self.auth
    }

    /// Returns a bearer token, refreshing it when close to expiry.
    pub(crate) async fn bearer(&self) -> Result<String, ArmError> {
        {
            let cached = self.cached.read().await;
            if cached.is_fresh() {
                return Ok(cached.value.clone());
            }
        }
        let mut cached = self.cached.write().await;
        if !cached.is_fresh() {
            debug!(tenant = %self.auth.tenant_id, "refreshing ARM access token");
            *cached = fetch_token(&self.http, &self.auth).await?;
        }
        Ok(cached.value.clone())
    }
}

async fn fetch_token(http: &reqwest::Client, auth: &AuthFile) -> Result<AccessToken, ArmError> {
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", auth.client_id.as_str()),
        ("client_secret", auth.client_secret.as_str()),
        ("resource", auth.resource_manager_endpoint_url.as_str()),
    ];
    let response = http
        .post(auth.token_url())
        .form(&form)
        .send()
        .await
        .map_err(|err| ArmError::transport(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ArmError::transport(err.to_string()))?;
    if !status.is_success() {
        return Err(token_error(status.as_u16(), &body));
    }
    let parsed: TokenResponse =
        serde_json::from_slice(&body).map_err(|err| ArmError::transport(err.to_string()))?;
    Ok(AccessToken {
        expires_at: Instant::now() + parsed.lifetime(),
        value: parsed.access_token,
    })
}

/// Azure AD replies `{"error": "invalid_client", "error_description": ...}`.
fn token_error(status: u16, body: &[u8]) -> ArmError {
    #[derive(Deserialize)]
    struct AadError {
        error: String,
        #[serde(default)]
        error_description: String,
    }

    match serde_json::from_slice::<AadError>(body) {
        Ok(aad) => ArmError {
            status: Some(status),
            code: aad.error,
            message: aad.error_description,
        },
        Err(_) => ArmError::from_response(status, body),
    }
}
