use super::oauth::{ClientSecret, OAuthClient};
use super::tokens::{StoredCredential, TokenFile};
use crate::error::AuthError;
use std::env;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

const CLASSROOM_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.student-submissions.students.readonly",
    "https://www.googleapis.com/auth/classroom.rosters.readonly",
    "https://www.googleapis.com/auth/classroom.profile.emails",
];

const SHEETS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleService {
    Classroom,
    Sheets,
}

impl GoogleService {
    pub fn name(&self) -> &'static str {
        match self {
            GoogleService::Classroom => "classroom",
            GoogleService::Sheets => "sheets",
        }
    }

    pub fn scopes(&self) -> &'static [&'static str] {
        match self {
            GoogleService::Classroom => CLASSROOM_SCOPES,
            GoogleService::Sheets => SHEETS_SCOPES,
        }
    }
}

impl fmt::Display for GoogleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supplies an access token for one Google service, from the token cache
/// when possible and from the interactive consent flow otherwise.
pub struct TokenProvider {
    service: GoogleService,
    token_file: TokenFile,
    credentials_file: PathBuf,
    token_url: Option<String>,
}

impl TokenProvider {
    pub fn new(service: GoogleService, token_file: PathBuf, credentials_file: PathBuf) -> Self {
        Self {
            service,
            token_file: TokenFile::new(token_file),
            credentials_file,
            token_url: None,
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Locate the files through `{service}_token_file` and
    /// `{service}_credentials_file`, falling back to `{service}_token.json`
    /// and `credentials.json` in the working directory.
    pub fn for_service(service: GoogleService) -> Self {
        let token_file = resolve_path(
            env::var(format!("{}_token_file", service.name())).ok(),
            &format!("{}_token.json", service.name()),
        );
        let credentials_file = resolve_path(
            env::var(format!("{}_credentials_file", service.name())).ok(),
            DEFAULT_CREDENTIALS_FILE,
        );
        Self::new(service, token_file, credentials_file)
    }

    /// Return a usable access token, persisting any refreshed or newly
    /// authorized credential to the token file.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let scopes = self.service.scopes();

        if self.token_file.exists() {
            let mut credential = self.token_file.load()?;

            if !credential.covers(scopes) {
                warn!(service = %self.service, "cached token lacks required scopes, re-authorizing");
            } else if !credential.is_expired() {
                return Ok(credential.access_token);
            } else {
                match self.refresh(&mut credential).await {
                    Ok(()) => {
                        self.token_file.save(&credential)?;
                        return Ok(credential.access_token);
                    }
                    Err(AuthError::Denied(reason)) => {
                        warn!(service = %self.service, %reason, "token invalid, generating a new one");
                    }
                    Err(e) => return Err(e),
                }
            }
        } else {
            warn!(service = %self.service, "token not found, generating from credentials");
        }

        let credential = self.authorize().await?;
        self.token_file.save(&credential)?;
        info!(service = %self.service, path = %self.token_file.path().display(), "saved new token");
        Ok(credential.access_token)
    }

    async fn refresh(&self, credential: &mut StoredCredential) -> Result<(), AuthError> {
        let secret = ClientSecret {
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.clone(),
        };
        self.oauth_client(secret).refresh(credential).await
    }

    async fn authorize(&self) -> Result<StoredCredential, AuthError> {
        if !self.credentials_file.exists() {
            return Err(AuthError::Access {
                service: self.service.name().to_string(),
                token_file: self.token_file.path().display().to_string(),
                credentials_file: self.credentials_file.display().to_string(),
            });
        }

        let secret = ClientSecret::from_file(&self.credentials_file)?;
        self.oauth_client(secret)
            .authorize(self.service.scopes())
            .await
    }

    fn oauth_client(&self, secret: ClientSecret) -> OAuthClient {
        let client = OAuthClient::new(secret);
        match &self.token_url {
            Some(url) => client.with_token_url(url.as_str()),
            None => client,
        }
    }
}

fn resolve_path(from_env: Option<String>, default: &str) -> PathBuf {
    from_env
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
