//! Installed-application OAuth flow for Google APIs.
//!
//! Authorization code with PKCE over a loopback redirect: a listener is bound
//! on an OS-assigned localhost port, the browser is sent to the consent page,
//! and the code delivered to the listener is exchanged for tokens.

use crate::auth::tokens::StoredCredential;
use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Client id and secret from an application-secret file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
}

impl ClientSecret {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Credentials(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Accepts the Cloud Console download (`installed` or `web` section) or a
    /// flat `{client_id, client_secret}` object.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile =
            serde_json::from_str(json).map_err(|e| AuthError::Credentials(e.to_string()))?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self {
                client_id: section.client_id,
                client_secret: section.client_secret,
            });
        }
        match (file.client_id, file.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
            }),
            _ => Err(AuthError::Credentials(
                "expected an 'installed' or 'web' section, or top-level client_id/client_secret"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct OAuthClient {
    secret: ClientSecret,
    http: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(secret: ClientSecret) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            secret,
            http,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Send code exchanges and refreshes to `token_url` instead of Google's
    /// token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Run the interactive consent flow and return a fresh credential.
    pub async fn authorize(&self, scopes: &[&str]) -> Result<StoredCredential, AuthError> {
        let pkce = Pkce::new();
        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|e| AuthError::Network(format!("failed to bind loopback listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Network(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let url = pkce.auth_url(&self.secret.client_id, &redirect_uri, scopes);

        info!("opening browser for Google authorization");
        debug!(%url, "authorization URL");
        if let Err(e) = open::that(&url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", url);
        }

        let (code, state) = wait_for_callback(listener)?;
        if state != pkce.state {
            return Err(AuthError::Denied("OAuth state mismatch".to_string()));
        }

        let response = self
            .token_request(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("code", code.as_str()),
                ("code_verifier", pkce.verifier.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?;

        info!("authorization complete");
        Ok(StoredCredential {
            client_id: self.secret.client_id.clone(),
            client_secret: self.secret.client_secret.clone(),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: StoredCredential::expiry_from(response.expires_in),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Exchange the refresh token for a new access token, in place.
    pub async fn refresh(&self, credential: &mut StoredCredential) -> Result<(), AuthError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Denied("no refresh token stored".to_string()))?;

        let response = self
            .token_request(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        credential.apply_refresh(response.access_token, response.expires_in);
        debug!("refreshed access token");
        Ok(())
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(AuthError::Denied(format!("token endpoint returned {}: {}", status, body)));
        }
        serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

/// PKCE verifier/challenge pair plus the CSRF state value.
struct Pkce {
    verifier: String,
    challenge: String,
    state: String,
}

impl Pkce {
    fn new() -> Self {
        let verifier = random_token(32);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[&str]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
             code_challenge={}&code_challenge_method=S256&state={}&access_type=offline&prompt=consent",
            AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn wait_for_callback(listener: TcpListener) -> Result<(String, String), AuthError> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            if let Some(result) = handle_callback(stream) {
                let _ = tx.send(result);
                return;
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(AuthError::Denied("timed out waiting for the OAuth callback".to_string()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(AuthError::Network("callback listener stopped".to_string()))
        }
    }
}

/// Answer one request on the loopback listener. Returns `None` for requests
/// that are not the OAuth redirect (favicon probes and the like).
fn handle_callback(mut stream: TcpStream) -> Option<Result<(String, String), AuthError>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback(&request_line)?;
    let page = match result {
        Ok(_) => "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
                  <html><body><h1>Authorization complete</h1>\
                  <p>You can close this window.</p></body></html>",
        Err(_) => "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
                   <html><body><h1>Authorization failed</h1></body></html>",
    };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();
    Some(result)
}

/// Extract `(code, state)` from a request line such as
/// `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<Result<(String, String), AuthError>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let query = target.strip_prefix("/callback")?.strip_prefix('?').unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    Some(match (error, code) {
        (Some(error), _) => Err(AuthError::Denied(error)),
        (None, Some(code)) => Ok((code, state.unwrap_or_default())),
        (None, None) => Err(AuthError::Denied(
            "missing authorization code in callback".to_string(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secret_formats() {
        let installed = r#"{"installed": {"client_id": "id", "client_secret": "s", "project_id": "p"}}"#;
        let flat = r#"{"client_id": "id", "client_secret": "s"}"#;
        let expected = ClientSecret {
            client_id: "id".into(),
            client_secret: "s".into(),
        };
        assert_eq!(ClientSecret::from_json(installed).unwrap(), expected);
        assert_eq!(ClientSecret::from_json(flat).unwrap(), expected);
        assert!(matches!(
            ClientSecret::from_json(r#"{"other": 1}"#),
            Err(AuthError::Credentials(_))
        ));
    }

    #[test]
    fn challenge_is_s256_of_verifier() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        let pkce = Pkce::new();
        assert_eq!(pkce.verifier.len(), 43);
        assert_ne!(pkce.state, Pkce::new().state);
    }

    #[test]
    fn auth_url_carries_pkce_and_offline_access() {
        let pkce = Pkce::new();
        let url = pkce.auth_url(
            "client.apps.googleusercontent.com",
            "http://127.0.0.1:5000/callback",
            &["scope-a", "scope-b"],
        );
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("scope=scope-a%20scope-b"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(&format!("state={}", pkce.state)));
    }

    #[test]
    fn callback_parsing() {
        let ok = parse_callback("GET /callback?code=4%2Fabc&state=xyz HTTP/1.1\r\n");
        assert_eq!(
            ok.unwrap().unwrap(),
            ("4/abc".to_string(), "xyz".to_string())
        );

        let denied = parse_callback("GET /callback?error=access_denied HTTP/1.1\r\n");
        assert!(matches!(denied, Some(Err(AuthError::Denied(e))) if e == "access_denied"));

        assert!(parse_callback("GET /favicon.ico HTTP/1.1\r\n").is_none());
        assert!(parse_callback("POST /callback?code=a HTTP/1.1\r\n").is_none());
    }
}
