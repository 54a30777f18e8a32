//! reqwest-backed transport for the DevSocial backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};

use super::{HttpRequest, HttpResponse, Transport};
use crate::types::{FormPart, FormValue, RequestBody};
use crate::{DevSocialError, Result};

/// Default base URL for the DevSocial API
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Client-side socket timeout. The cache layer applies its own, usually
/// shorter, per-request deadline on top of this.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport over a shared reqwest connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given base URL (e.g. `https://devsocial.app/api`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| {
                DevSocialError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a transport that reuses an existing reqwest client.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(&request.endpoint);
        let mut builder = self.http.request(request.method.clone(), &url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Multipart(parts)) => builder.multipart(build_form(parts)?),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| DevSocialError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| DevSocialError::Http(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn build_form(parts: Vec<FormPart>) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File {
                file_name,
                mime_type,
                bytes,
            } => {
                let file = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| {
                        DevSocialError::InvalidInput(format!("invalid mime type '{mime_type}': {e}"))
                    })?;
                form.part(part.name, file)
            }
        };
    }
    Ok(form)
}
