use crate::error::{HuntError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;

/// Fixed user agent sent to crt.sh and DNS Dumpster.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:40.0) Gecko/20100101 Firefox/40.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub verify_tls: bool,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            cookies: Vec::new(),
            form: Vec::new(),
            verify_tls: true,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn form_field(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self
    }

    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub cookies: HashMap<String, String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The HTTP capability collectors need. Connection-level failures are `Err`;
/// any HTTP status, success or not, is an `Ok` response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse>;
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// `reqwest` backed transport. Keeps one verifying and one non-verifying client so
/// `verify_tls` can be chosen per request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    verifying: Client,
    insecure: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            verifying: build_client(timeout_secs, true)?,
            insecure: build_client(timeout_secs, false)?,
        })
    }

    fn client_for(&self, request: &HttpRequest) -> &Client {
        if request.verify_tls {
            &self.verifying
        } else {
            &self.insecure
        }
    }

    fn prepare(&self, builder: reqwest::RequestBuilder, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() {
            let cookie = request
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        builder
    }

    async fn collect(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body, cookies })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(url=%request.url, "GET");
        let builder = self.client_for(request).get(&request.url);
        let response = self.prepare(builder, request).send().await?;
        Self::collect(response).await
    }

    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(url=%request.url, "POST");
        let builder = self
            .client_for(request)
            .post(&request.url)
            .form(&request.form);
        let response = self.prepare(builder, request).send().await?;
        Self::collect(response).await
    }
}

fn build_client(timeout_secs: u64, verify_tls: bool) -> Result<Client> {
    ClientBuilder::new()
        .pool_max_idle_per_host(4)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .use_rustls_tls()
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        // DNS Dumpster is scraped with verification off
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| HuntError::Transport(format!("failed to build HTTP client: {}", e)))
}
