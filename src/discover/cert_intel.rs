//! Certificate intelligence lookups against Censys.
//!
//! The client probes its credentials once, at construction, and settles into
//! either `Enabled` or `Disabled`. A disabled client answers every search with
//! `None` without touching the network.

use crate::config::ConfigSource;
use crate::diagnostics::Reporter;
use crate::error::{HuntError, Result};
use crate::filter::{filter_subdomains, parse_cert_subject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const CENSYS_API_URL: &str = "https://search.censys.io/api/v1";
pub const CONFIG_SECTION: &str = "Censys";

/// Projection requested for every certificate search.
pub const CERT_FIELDS: [&str; 8] = [
    "parsed.names",
    "parsed.signature_algorithm.name",
    "parsed.signature.self_signed",
    "parsed.validity.start",
    "parsed.validity.end",
    "parsed.fingerprint_sha256",
    "parsed.subject_dn",
    "parsed.issuer_dn",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertIntelRecord {
    #[serde(rename = "parsed.subject_dn")]
    pub subject_dn: String,
    #[serde(rename = "parsed.issuer_dn")]
    pub issuer_dn: String,
    #[serde(rename = "parsed.signature_algorithm.name")]
    pub signature_algorithm: String,
    #[serde(rename = "parsed.signature.self_signed")]
    pub self_signed: bool,
    #[serde(rename = "parsed.validity.start")]
    pub validity_start: DateTime<Utc>,
    #[serde(rename = "parsed.validity.end")]
    pub validity_end: DateTime<Utc>,
    #[serde(rename = "parsed.fingerprint_sha256")]
    pub fingerprint_sha256: String,
    #[serde(rename = "parsed.names", default)]
    pub names: Vec<String>,
}

/// An authenticated search handle.
#[async_trait]
pub trait CertIntelApi: Send + Sync {
    /// Raw result rows. Quota exhaustion must surface as `HuntError::RateLimited`.
    async fn search(&self, query: &str, fields: &[&str]) -> Result<Vec<Value>>;
}

#[async_trait]
pub trait CertIntelAuthenticator {
    type Api: CertIntelApi;

    /// Bad credentials must surface as `HuntError::Unauthorized`.
    async fn authenticate(&self, api_id: &str, api_secret: &str) -> Result<Self::Api>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    MissingCredentials,
    Unauthorized { api_id: String },
    Unavailable(String),
}

pub enum CertIntelState<A> {
    Enabled(A),
    Disabled(DisabledReason),
}

pub struct CertIntelClient<A> {
    state: CertIntelState<A>,
    reporter: Arc<dyn Reporter>,
}

impl<A: CertIntelApi> CertIntelClient<A> {
    /// Read credentials from `config` and authenticate. Never fails: problems
    /// produce a warning and a disabled client.
    pub async fn connect<Au>(
        config: &dyn ConfigSource,
        authenticator: &Au,
        reporter: Arc<dyn Reporter>,
    ) -> Self
    where
        Au: CertIntelAuthenticator<Api = A> + Sync,
    {
        let creds = (
            config.lookup(CONFIG_SECTION, "api_id"),
            config.lookup(CONFIG_SECTION, "api_secret"),
        );
        let (api_id, api_secret) = match creds {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                reporter.warn("Did not find a Censys API ID/secret, so Censys searches will be skipped.");
                return Self::disabled(DisabledReason::MissingCredentials, reporter);
            }
        };

        match authenticator.authenticate(&api_id, &api_secret).await {
            Ok(api) => Self {
                state: CertIntelState::Enabled(api),
                reporter,
            },
            Err(HuntError::Unauthorized(_)) => {
                reporter.warn(&format!(
                    "Censys reported your API information is invalid, so Censys searches will be skipped. You provided ID {}.",
                    api_id
                ));
                Self::disabled(DisabledReason::Unauthorized { api_id }, reporter)
            }
            Err(e) => {
                reporter.warn(&format!("Could not reach Censys, so Censys searches will be skipped. Details: {}", e));
                Self::disabled(DisabledReason::Unavailable(e.to_string()), reporter)
            }
        }
    }

    pub fn disabled(reason: DisabledReason, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            state: CertIntelState::Disabled(reason),
            reporter,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, CertIntelState::Enabled(_))
    }

    pub fn disabled_reason(&self) -> Option<&DisabledReason> {
        match &self.state {
            CertIntelState::Enabled(_) => None,
            CertIntelState::Disabled(reason) => Some(reason),
        }
    }

    /// Certificates whose names include `target`. `None` when disabled or when the
    /// query failed; the failure has already been reported.
    pub async fn search(&self, target: &str) -> Option<Vec<CertIntelRecord>> {
        let api = match &self.state {
            CertIntelState::Enabled(api) => api,
            CertIntelState::Disabled(_) => return None,
        };

        let query = format!("parsed.names: {}", target);
        let rows = match api.search(&query, &CERT_FIELDS).await {
            Ok(rows) => rows,
            Err(HuntError::RateLimited(_)) => {
                self.reporter
                    .error("Censys reports your account has run out of API credits.");
                return None;
            }
            Err(e) => {
                self.reporter.error(&format!(
                    "Error collecting Censys certificate data for {}. Details: {}",
                    target, e
                ));
                return None;
            }
        };

        match rows
            .into_iter()
            .map(serde_json::from_value::<CertIntelRecord>)
            .collect::<std::result::Result<Vec<_>, _>>()
        {
            Ok(records) => {
                tracing::info!("Censys returned {} certificates for {}", records.len(), target);
                Some(records)
            }
            Err(e) => {
                self.reporter.error(&format!(
                    "Error collecting Censys certificate data for {}. Details: {}",
                    target, e
                ));
                None
            }
        }
    }

    /// Common names of matching certificates that pass the domain filter.
    pub async fn subdomains(&self, target: &str) -> Option<Vec<String>> {
        let records = self.search(target).await?;
        let names: Vec<String> = records
            .iter()
            .filter_map(|r| parse_cert_subject(&r.subject_dn).ok())
            .collect();
        Some(filter_subdomains(target, names))
    }
}

/// Censys v1 REST API with HTTP basic auth.
pub struct CensysApi {
    client: Client,
    base_url: String,
    api_id: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<Value>,
    metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    #[serde(default)]
    pages: u64,
}

impl CensysApi {
    fn status_error(status: StatusCode, url: &str, body: String) -> HuntError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HuntError::Unauthorized(body),
            StatusCode::TOO_MANY_REQUESTS => HuntError::RateLimited(body),
            _ => HuntError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            },
        }
    }
}

#[async_trait]
impl CertIntelApi for CensysApi {
    async fn search(&self, query: &str, fields: &[&str]) -> Result<Vec<Value>> {
        let url = format!("{}/search/certificates", self.base_url);
        let mut rows = Vec::new();
        let mut page = 1u64;
        loop {
            tracing::debug!(page, "Querying Censys certificates");
            let resp = self
                .client
                .post(&url)
                .basic_auth(&self.api_id, Some(&self.api_secret))
                .json(&json!({ "query": query, "fields": fields, "page": page }))
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Self::status_error(status, &url, body));
            }
            let body: SearchPage = resp.json().await?;
            rows.extend(body.results);

            let pages = body.metadata.map(|m| m.pages).unwrap_or(1);
            if page >= pages {
                break;
            }
            page += 1;
        }
        Ok(rows)
    }
}

/// Builds `CensysApi` handles after checking the account endpoint.
pub struct CensysAuthenticator {
    client: Client,
    base_url: String,
}

impl CensysAuthenticator {
    pub fn new() -> Result<Self> {
        Self::with_base_url(CENSYS_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CertIntelAuthenticator for CensysAuthenticator {
    type Api = CensysApi;

    async fn authenticate(&self, api_id: &str, api_secret: &str) -> Result<CensysApi> {
        let url = format!("{}/account", self.base_url);
        let resp = self
            .client
            .get(&url)
            .basic_auth(api_id, Some(api_secret))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CensysApi::status_error(status, &url, body));
        }
        Ok(CensysApi {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_id: api_id.to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}
