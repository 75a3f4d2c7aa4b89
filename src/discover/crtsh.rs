use crate::enrich::repair_concatenated_objects;
use crate::filter::filter_subdomains;
use crate::http_client::{HttpRequest, HttpTransport, USER_AGENT};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const CRTSH_BASE_URI: &str = "https://crt.sh/";

/// One crt.sh log entry. Older responses use `min_cert_id`/`min_entry_timestamp`,
/// newer ones `id`/`entry_timestamp`; both spellings are accepted. Some
/// precertificate rows carry a null entry timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub issuer_ca_id: i64,
    pub issuer_name: String,
    pub name_value: String,
    #[serde(alias = "id")]
    pub min_cert_id: i64,
    #[serde(default, alias = "entry_timestamp")]
    pub min_entry_timestamp: Option<NaiveDateTime>,
    pub not_before: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<NaiveDateTime>,
}

impl CertificateRecord {
    /// `name_value` may hold several SAN entries, one per line.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_value
            .lines()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

pub struct CrtShClient {
    transport: Arc<dyn HttpTransport>,
}

impl CrtShClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn query_url(domain: &str, wildcard: bool) -> String {
        let q = if wildcard {
            format!("%25.{}", domain)
        } else {
            domain.to_string()
        };
        format!("{}?q={}&output=json", CRTSH_BASE_URI, q)
    }

    /// Certificates logged for `domain`. `None` means the query could not be
    /// answered (bad status, transport failure, unparsable body), which is not
    /// the same as an empty list.
    pub async fn search(&self, domain: &str, wildcard: bool) -> Option<Vec<CertificateRecord>> {
        let url = Self::query_url(domain, wildcard);
        tracing::debug!("Querying crt.sh: {}", url);

        let request = HttpRequest::new(url).header("User-Agent", USER_AGENT);
        let response = match self.transport.get(&request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error=%e, "crt.sh request failed");
                return None;
            }
        };
        if !response.is_success() {
            tracing::debug!(status = response.status, "crt.sh returned non-success status");
            return None;
        }

        let content = String::from_utf8(response.body).ok()?;
        let repaired = match repair_concatenated_objects(&content) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error=%e, "crt.sh body is not a JSON object stream");
                return None;
            }
        };
        let rows = match serde_json::from_str::<Vec<Value>>(&repaired) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!(error=%e, "crt.sh body is not a JSON array of objects");
                return None;
            }
        };
        let records: Vec<CertificateRecord> = rows.into_iter().filter_map(parse_record).collect();
        tracing::info!("crt.sh returned {} certificates for {}", records.len(), domain);
        Some(records)
    }

    /// Every certificate name that passes the domain filter, in record order.
    pub async fn subdomains(&self, domain: &str, wildcard: bool) -> Option<Vec<String>> {
        let records = self.search(domain, wildcard).await?;
        Some(filter_subdomains(
            domain,
            records.iter().flat_map(CertificateRecord::names),
        ))
    }
}

/// One row of the response. A row that does not look like a certificate entry
/// is dropped on its own so the rest of the answer survives.
fn parse_record(row: Value) -> Option<CertificateRecord> {
    match serde_json::from_value(row) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(error=%e, "skipping malformed crt.sh row");
            None
        }
    }
}
