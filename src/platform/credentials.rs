//! Google credential discovery and OAuth2 access tokens.

use crate::errors::PlatformError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde_derive::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
                      https://www.googleapis.com/auth/datastore \
                      https://www.googleapis.com/auth/identitytoolkit \
                      https://www.googleapis.com/auth/userinfo.email";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

/// The credential file formats we understand, keyed by their `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    /// Compute metadata server of the machine we run on.
    MetadataServer,
    /// Local emulators accept a fixed bearer token.
    Emulator,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn from_response(response: TokenResponse) -> Self {
        AccessToken {
            value: response.access_token,
            expires_at: response
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        }
    }

    pub fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + REFRESH_MARGIN < at,
            None => true,
        }
    }
}

impl Credentials {
    /// Parses a credential JSON document.
    pub fn from_json(content: &str) -> Result<Self, PlatformError> {
        let file: CredentialFile = serde_json::from_str(content)
            .map_err(|e| PlatformError::Auth(format!("Unsupported credential file: {}", e)))?;
        Ok(match file {
            CredentialFile::ServiceAccount(key) => Credentials::ServiceAccount(key),
            CredentialFile::AuthorizedUser(user) => Credentials::AuthorizedUser(user),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, PlatformError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlatformError::Auth(format!(
                "Failed to read credential file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Uses `explicit` if given, otherwise the application-default chain.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PlatformError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            debug!(path = %path, "Using GOOGLE_APPLICATION_CREDENTIALS");
            return Self::from_file(Path::new(&path));
        }
        if let Some(path) = gcloud_default_path().filter(|p| p.exists()) {
            debug!(path = %path.display(), "Using gcloud application default credentials");
            return Self::from_file(&path);
        }
        debug!("Falling back to the metadata server");
        Ok(Credentials::MetadataServer)
    }

    pub fn project_id(&self) -> Option<String> {
        match self {
            Credentials::ServiceAccount(key) => key.project_id.clone(),
            Credentials::AuthorizedUser(user) => user.quota_project_id.clone(),
            Credentials::MetadataServer | Credentials::Emulator => None,
        }
    }

    /// Project billed for user-credential calls.
    pub fn quota_project(&self) -> Option<&str> {
        match self {
            Credentials::AuthorizedUser(user) => user.quota_project_id.as_deref(),
            _ => None,
        }
    }

    pub fn fetch_token(&self, http: &Client) -> Result<AccessToken, PlatformError> {
        let response: TokenResponse = match self {
            Credentials::ServiceAccount(key) => {
                let assertion = sign_assertion(key)?;
                http.post(&key.token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()?
                    .error_for_status()?
                    .json()?
            }
            Credentials::AuthorizedUser(user) => http
                .post(DEFAULT_TOKEN_URI)
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ])
                .send()?
                .error_for_status()?
                .json()?,
            Credentials::MetadataServer => http
                .get(format!(
                    "{}/instance/service-accounts/default/token",
                    METADATA_BASE
                ))
                .header("Metadata-Flavor", "Google")
                .send()?
                .error_for_status()?
                .json()?,
            Credentials::Emulator => TokenResponse {
                access_token: "owner".to_string(),
                expires_in: None,
            },
        };
        debug!(expires_in = ?response.expires_in, "Fetched access token");
        Ok(AccessToken::from_response(response))
    }
}

/// Asks the metadata server which project this machine belongs to.
pub fn metadata_project_id(http: &Client) -> Result<String, PlatformError> {
    let id = http
        .get(format!("{}/project/project-id", METADATA_BASE))
        .header("Metadata-Flavor", "Google")
        .send()?
        .error_for_status()?
        .text()?;
    Ok(id.trim().to_string())
}

fn gcloud_default_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("gcloud")
            .join("application_default_credentials.json"),
    )
}

/// Signs the RS256 JWT assertion exchanged for a service-account token.
fn sign_assertion(key: &ServiceAccountKey) -> Result<String, PlatformError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| PlatformError::Auth(format!("System time error: {}", e)))?
        .as_secs();

    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME.as_secs(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| PlatformError::Auth(format!("Invalid RSA private key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| PlatformError::Auth(format!("Failed to encode JWT: {}", e)))
}
