use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// HTTP client for the chat service. Every call is sent once: no retries, backoff or timeout.
#[derive(Clone, Debug, Default)]
pub struct Client {
    reqwest: ReqwestClient,
    base_url: String,
    headers: HeaderMap,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

fn create_headers() -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let content_type = HeaderValue::from_str("application/json")?;
    headers.insert("Content-Type", content_type);

    Ok(headers)
}

impl Client {
    /// Creates a new client pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let reqwest = ReqwestClient::builder().build()?;

        tracing::event!(tracing::Level::DEBUG, "Creating API client headers...");
        let headers = create_headers()?;

        Ok(Self {
            reqwest,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Changes the client base url.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        let mut url = self.base_url.clone();
        url.push_str(endpoint);
        url
    }

    /// Makes a GET request.
    pub async fn get(&self, endpoint: &str) -> Result<ReqwestResponse> {
        let url = self.url(endpoint);

        tracing::event!(tracing::Level::INFO, "GET {}", url);

        let response = self
            .reqwest
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        check(response).await
    }

    /// Makes a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let text = self.get(endpoint).await?.text().await?;
        tracing::event!(tracing::Level::DEBUG, "text: {}", text);

        Ok(serde_json::from_str(&text)?)
    }

    /// Makes a POST request.
    pub async fn post(&self, endpoint: &str, body: String) -> Result<ReqwestResponse> {
        let url = self.url(endpoint);

        tracing::event!(tracing::Level::INFO, "POST {}", url);
        tracing::event!(tracing::Level::DEBUG, "body: {}", body);

        let response = self
            .reqwest
            .post(url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        check(response).await
    }

    /// Makes a multipart POST request. The form sets its own content type.
    pub async fn post_multipart(
        &self,
        endpoint: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ReqwestResponse> {
        let url = self.url(endpoint);

        tracing::event!(tracing::Level::INFO, "POST {} (multipart)", url);

        let response = self.reqwest.post(url).multipart(form).send().await?;

        check(response).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, endpoint: &str) -> Result<ReqwestResponse> {
        let url = self.url(endpoint);

        tracing::event!(tracing::Level::INFO, "DELETE {}", url);

        let response = self
            .reqwest
            .delete(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        check(response).await
    }
}

/// Turns any non-2xx response into `Error::Status`, keeping the body as sent.
async fn check(response: ReqwestResponse) -> Result<ReqwestResponse> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}
