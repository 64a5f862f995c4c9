//! Blocking HTTP client for the inventory API

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value as JsonValue;

use super::types::{ApiPort, ApiResponse, HttpMethod, NetworkError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpApiOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpApiOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `ApiPort` over HTTP, authenticated with a bearer token
pub struct HttpApi {
    client: Client,
    options: HttpApiOptions,
}

impl HttpApi {
    pub fn new(options: HttpApiOptions) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| NetworkError::FetchError {
                message: e.to_string(),
            })?;
        Ok(Self { client, options })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.options.base_url.trim_end_matches('/'), endpoint)
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

impl ApiPort for HttpApi {
    fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonValue>,
    ) -> Result<ApiResponse, NetworkError> {
        let url = self.url(endpoint);
        let mut request = self
            .client
            .request(to_reqwest(method), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(key) = &self.options.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|e| NetworkError::FetchError {
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| NetworkError::FetchError {
            message: e.to_string(),
        })?;

        if text.is_empty() {
            return Ok(ApiResponse::new(status, JsonValue::Null));
        }
        let json: JsonValue =
            serde_json::from_str(&text).map_err(|_| NetworkError::InvalidBody {
                route: format!("{} {}", method, endpoint),
                body: text.clone(),
            })?;
        Ok(ApiResponse::new(status, json))
    }
}
