use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the Classroom or Sheets APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed with status {status} for URL {url}\nResponse body: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("failed to parse JSON response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value input mode {0:?}, expected \"literal\" or \"interpreted\"")]
    InvalidMode(String),
}

impl ApiError {
    /// True when the server rejected a range because the sheet does not exist.
    ///
    /// The Sheets API answers a read of a missing tab with 400 "Unable to
    /// parse range" rather than 404, so both are treated as not found.
    pub fn is_missing_range(&self) -> bool {
        match self {
            ApiError::Status { status, body, .. } => {
                *status == StatusCode::NOT_FOUND
                    || (*status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range"))
            }
            _ => false,
        }
    }
}

/// Errors raised while obtaining or persisting OAuth credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "No access token or credentials found for {service}. Specify the file locations with \
         environment variables {service}_token_file or {service}_credentials_file. \
         Alternatively, place them at {token_file} or {credentials_file}"
    )]
    Access {
        service: String,
        token_file: String,
        credentials_file: String,
    },

    #[error("invalid credentials file: {0}")]
    Credentials(String),

    #[error("token file error: {0}")]
    TokenFile(String),

    #[error("network error during authorization: {0}")]
    Network(String),

    #[error("authorization failed: {0}")]
    Denied(String),

    #[error("unexpected token endpoint response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column {0:?} not found in sheet header")]
    MissingColumn(String),
}
