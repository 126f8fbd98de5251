use crate::error::ApiError;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Bearer-authenticated JSON transport shared by the Google API clients.
#[derive(Clone)]
pub(crate) struct GoogleHttp {
    client: reqwest::Client,
    token: String,
    base: String,
}

impl GoogleHttp {
    pub fn new(base: impl Into<String>, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .user_agent("classroom-tracker")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            token,
            base: base.into(),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        let request = self.client.get(&url).query(query);
        self.execute(request, url).await
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base, path);
        let request = self.client.request(method, &url).query(query).json(body);
        self.execute(request, url).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: String,
    ) -> Result<T, ApiError> {
        debug!(%url, "sending request");
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(ApiError::Status { status, url, body });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
    }
}
