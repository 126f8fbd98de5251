use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A cached OAuth credential for one service.
///
/// The client id and secret travel with the tokens so a refresh does not
/// need the application-secret file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredCredential {
    pub fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
        expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn covers(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s == scope))
    }

    pub fn apply_refresh(&mut self, access_token: String, expires_in_secs: Option<i64>) {
        self.access_token = access_token;
        self.expires_at = Self::expiry_from(expires_in_secs);
    }
}

/// JSON token file on local disk.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<StoredCredential, AuthError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::TokenFile(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let credential = serde_json::from_str(&content).map_err(|e| {
            AuthError::TokenFile(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        debug!(path = %self.path.display(), "loaded token");
        Ok(credential)
    }

    /// Write via a temp file and rename, readable only by the owner on Unix.
    pub fn save(&self, credential: &StoredCredential) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::TokenFile(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| AuthError::TokenFile(format!("failed to serialize token: {}", e)))?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            AuthError::TokenFile(format!("failed to write {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            AuthError::TokenFile(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)) {
                warn!(path = %self.path.display(), "failed to restrict token file permissions: {}", e);
            }
        }

        debug!(path = %self.path.display(), "saved token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_in: Option<i64>) -> StoredCredential {
        StoredCredential {
            client_id: "client".into(),
            client_secret: "secret".into(),
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: StoredCredential::expiry_from(expires_in),
            scopes: vec!["scope-a".into(), "scope-b".into()],
        }
    }

    #[test]
    fn expiry_and_scope_checks() {
        assert!(!credential(Some(3600)).is_expired());
        assert!(credential(Some(30)).is_expired());
        assert!(!credential(None).is_expired());

        let cred = credential(None);
        assert!(cred.covers(&["scope-a"]));
        assert!(cred.covers(&["scope-b", "scope-a"]));
        assert!(!cred.covers(&["scope-c"]));
    }

    #[test]
    fn refresh_replaces_access_token() {
        let mut cred = credential(Some(30));
        cred.apply_refresh("fresh".into(), Some(3600));
        assert_eq!(cred.access_token, "fresh");
        assert!(!cred.is_expired());
        assert_eq!(cred.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("nested").join("sheets.token.json"));
        assert!(!file.exists());

        let cred = credential(Some(3600));
        file.save(&cred).unwrap();
        assert!(file.exists());
        assert_eq!(file.load().unwrap(), cred);
    }

    #[cfg(unix)]
    #[test]
    fn saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classroom_token.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        TokenFile::new(&path).save(&credential(None)).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_a_token_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            TokenFile::new(path).load(),
            Err(AuthError::TokenFile(_))
        ));
    }
}
