// Credential loading for the Recognition Service
//
// The credential file is either a Google service account key (exchanged for an
// OAuth2 access token through a signed JWT) or an API key, given as JSON
// `{ "api_key": "..." }` or as the bare key on a single line.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion, in seconds (Google's maximum)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Access tokens are refreshed this long before they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Failed to read credential file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid credential file: {0}")]
    Parse(String),

    #[error("Invalid service account private key: {0}")]
    KeyParse(String),

    #[error("Failed to sign token assertion: {0}")]
    JwtSign(String),

    #[error("Access token exchange failed: {0}")]
    TokenExchange(String),
}

/// Fields read from a credential JSON file. Unknown fields are ignored.
#[derive(Deserialize)]
struct CredentialFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
    api_key: Option<String>,
}

/// How outbound recognize calls are authorised
pub enum Credentials {
    /// No authorisation header or key (local emulators)
    Anonymous,
    /// Sent as the `key` query parameter
    ApiKey(String),
    /// Sent as a bearer token obtained from the token endpoint
    ServiceAccount(ServiceAccount),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::ServiceAccount(account) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &account.client_email)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CredentialsError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let credentials = Self::parse(&contents)?;
        info!(
            "Loaded {} credentials from {}",
            credentials.describe(),
            path.display()
        );
        Ok(credentials)
    }

    pub fn parse(contents: &str) -> Result<Self, CredentialsError> {
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Err(CredentialsError::Parse("file is empty".to_string()));
        }

        if !trimmed.starts_with('{') {
            if trimmed.lines().count() > 1 || trimmed.contains(char::is_whitespace) {
                return Err(CredentialsError::Parse(
                    "expected JSON or a single-line API key".to_string(),
                ));
            }
            return Ok(Credentials::ApiKey(trimmed.to_string()));
        }

        let file: CredentialFile =
            serde_json::from_str(trimmed).map_err(|e| CredentialsError::Parse(e.to_string()))?;

        if file.kind.as_deref() == Some("service_account") {
            let client_email = file
                .client_email
                .ok_or_else(|| CredentialsError::Parse("missing client_email".to_string()))?;
            let private_key = file
                .private_key
                .ok_or_else(|| CredentialsError::Parse("missing private_key".to_string()))?;
            let account = ServiceAccount::new(
                client_email,
                private_key.as_bytes(),
                file.private_key_id,
                file.token_uri
                    .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            )?;
            return Ok(Credentials::ServiceAccount(account));
        }

        match file.api_key {
            Some(key) if !key.trim().is_empty() => Ok(Credentials::ApiKey(key.trim().to_string())),
            _ => Err(CredentialsError::Parse(
                "neither a service account nor an api_key entry".to_string(),
            )),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::ApiKey(_) => "API key",
            Credentials::ServiceAccount(_) => "service account",
        }
    }

    /// Adds authorisation to an outbound request
    pub async fn authorize(
        &self,
        client: &reqwest::Client,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, CredentialsError> {
        match self {
            Credentials::Anonymous => Ok(request),
            Credentials::ApiKey(key) => Ok(request.query(&[("key", key)])),
            Credentials::ServiceAccount(account) => {
                let token = account.access_token(client).await?;
                Ok(request.bearer_auth(token))
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Service account identity with a cached access token
pub struct ServiceAccount {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    cached_token: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(
        client_email: String,
        private_key_pem: &[u8],
        key_id: Option<String>,
        token_uri: String,
    ) -> Result<Self, CredentialsError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| CredentialsError::KeyParse(e.to_string()))?;
        Ok(Self {
            client_email,
            key_id,
            token_uri,
            encoding_key,
            cached_token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn signed_assertion(&self) -> Result<String, CredentialsError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| CredentialsError::JwtSign(e.to_string()))
    }

    /// Returns the cached access token, exchanging a new assertion when it is
    /// missing or about to expire
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, CredentialsError> {
        let mut cached = self.cached_token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + REFRESH_MARGIN < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Requesting access token for {}", self.client_email);
        let assertion = self.signed_assertion()?;
        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::TokenExchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("testdata/service_account_key.pem");

    fn service_account_json(token_uri: &str) -> String {
        json!({
            "type": "service_account",
            "project_id": "relay-test",
            "private_key_id": "key-1",
            "private_key": TEST_KEY,
            "client_email": "relay@relay-test.iam.gserviceaccount.com",
            "token_uri": token_uri
        })
        .to_string()
    }

    #[test]
    fn parses_bare_api_key() {
        let credentials = Credentials::parse("AIzaSyExample\n").unwrap();
        assert!(matches!(credentials, Credentials::ApiKey(ref k) if k == "AIzaSyExample"));
    }

    #[test]
    fn parses_json_api_key() {
        let credentials = Credentials::parse(r#"{ "api_key": "AIzaSyExample" }"#).unwrap();
        assert!(matches!(credentials, Credentials::ApiKey(ref k) if k == "AIzaSyExample"));
    }

    #[test]
    fn parses_service_account() {
        let credentials = Credentials::parse(&service_account_json(DEFAULT_TOKEN_URI)).unwrap();
        match credentials {
            Credentials::ServiceAccount(account) => {
                assert_eq!(account.client_email(), "relay@relay-test.iam.gserviceaccount.com")
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_and_unrecognised_files() {
        assert!(matches!(Credentials::parse("  \n"), Err(CredentialsError::Parse(_))));
        assert!(matches!(
            Credentials::parse(r#"{ "type": "authorized_user" }"#),
            Err(CredentialsError::Parse(_))
        ));
        assert!(matches!(
            Credentials::parse("two words"),
            Err(CredentialsError::Parse(_))
        ));
    }

    #[test]
    fn rejects_bad_private_key() {
        let contents = json!({
            "type": "service_account",
            "private_key": "not a key",
            "client_email": "relay@example.com"
        })
        .to_string();
        assert!(matches!(
            Credentials::parse(&contents),
            Err(CredentialsError::KeyParse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", Credentials::ApiKey("secret".to_string()));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn access_token_is_exchanged_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token_uri = format!("{}/token", server.uri());
        let credentials = Credentials::parse(&service_account_json(&token_uri)).unwrap();
        let Credentials::ServiceAccount(account) = credentials else {
            panic!("expected a service account");
        };

        let client = reqwest::Client::new();
        assert_eq!(account.access_token(&client).await.unwrap(), "ya29.test");
        assert_eq!(account.access_token(&client).await.unwrap(), "ya29.test");
    }

    #[tokio::test]
    async fn failed_exchange_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let token_uri = format!("{}/token", server.uri());
        let Credentials::ServiceAccount(account) =
            Credentials::parse(&service_account_json(&token_uri)).unwrap()
        else {
            panic!("expected a service account");
        };

        let err = account
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialsError::TokenExchange(ref m) if m.contains("invalid_grant")));
    }
}
