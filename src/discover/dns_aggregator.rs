//! DNS Dumpster scrape: CSRF handshake, then four positional result tables.

use crate::diagnostics::Reporter;
use crate::error::{HuntError, Result};
use crate::http_client::{HttpRequest, HttpTransport};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

pub const DNSDUMPSTER_URI: &str = "https://dnsdumpster.com/";

// Position of each table on the results page.
pub const DNS_TABLE: usize = 0;
pub const MX_TABLE: usize = 1;
pub const TXT_TABLE: usize = 2;
pub const HOST_TABLE: usize = 3;

static IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3})").unwrap()
});
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LABEL: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static NETWORK_MAP: Lazy<Selector> = Lazy::new(|| Selector::parse("img.img-responsive").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsHostRecord {
    pub domain: String,
    pub ip: String,
    pub reverse_dns: String,
    #[serde(rename = "as")]
    pub autonomous_system: String,
    pub provider: String,
    pub country: String,
    pub header: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecords {
    pub dns: Vec<DnsHostRecord>,
    pub mx: Vec<DnsHostRecord>,
    pub txt: Vec<String>,
    pub host: Vec<DnsHostRecord>,
}

impl DnsRecords {
    /// Hostnames from the DNS, MX and host tables, in table order.
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.dns
            .iter()
            .chain(self.mx.iter())
            .chain(self.host.iter())
            .map(|r| r.domain.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsAggregateResult {
    pub domain: String,
    pub dns_records: DnsRecords,
    /// Base64 network map; `None` whenever fetching it failed.
    pub image_data: Option<String>,
}

pub struct DnsAggregatorClient {
    transport: Arc<dyn HttpTransport>,
    reporter: Arc<dyn Reporter>,
}

impl DnsAggregatorClient {
    pub fn new(transport: Arc<dyn HttpTransport>, reporter: Arc<dyn Reporter>) -> Self {
        Self { transport, reporter }
    }

    /// Run the token/query handshake and parse the result page.
    ///
    /// Non-200 answers are reported and parsing goes on with whatever came back.
    /// A page that does not have the expected tables and cells is an error.
    pub async fn scrape(&self, domain: &str) -> Result<DnsAggregateResult> {
        let landing = HttpRequest::new(DNSDUMPSTER_URI).insecure();
        let landing = match self.transport.get(&landing).await {
            Ok(resp) => resp,
            Err(e) => {
                self.reporter
                    .error(&format!("Could not reach DNS Dumpster: {}", e));
                return Err(e);
            }
        };
        if landing.status != 200 {
            self.report_status(landing.status);
        }

        let csrf_token = match landing.cookies.get("csrftoken") {
            Some(token) => token.clone(),
            None => {
                self.reporter
                    .warn("DNS Dumpster did not hand out a CSRF token; the query will likely be rejected.");
                String::new()
            }
        };

        let query = HttpRequest::new(DNSDUMPSTER_URI)
            .insecure()
            .cookie("csrftoken", &csrf_token)
            .header("Referer", DNSDUMPSTER_URI)
            .form_field("csrfmiddlewaretoken", &csrf_token)
            .form_field("targetip", domain);
        let page = match self.transport.post(&query).await {
            Ok(resp) => resp,
            Err(e) => {
                self.reporter
                    .error(&format!("Could not reach DNS Dumpster: {}", e));
                return Err(e);
            }
        };
        if page.status != 200 {
            self.report_status(page.status);
        }

        let (dns_records, image_src) = parse_results_page(&page.text())?;
        tracing::info!(
            "DNS Dumpster returned {} dns, {} mx, {} txt and {} host records for {}",
            dns_records.dns.len(),
            dns_records.mx.len(),
            dns_records.txt.len(),
            dns_records.host.len(),
            domain
        );

        let image_data = match image_src {
            Some(src) => self.fetch_network_map(&src).await,
            None => None,
        };

        Ok(DnsAggregateResult {
            domain: domain.to_string(),
            dns_records,
            image_data,
        })
    }

    fn report_status(&self, status: u16) {
        self.reporter.error(&format!(
            "There appears to have been an error communicating with DNS Dumpster -- {} received!",
            status
        ));
    }

    async fn fetch_network_map(&self, src: &str) -> Option<String> {
        let url = Url::parse(DNSDUMPSTER_URI).ok()?.join(src).ok()?;
        let request = HttpRequest::new(url.as_str()).insecure();
        match self.transport.get(&request).await {
            Ok(resp) if resp.is_success() => {
                Some(base64::engine::general_purpose::STANDARD.encode(&resp.body))
            }
            Ok(resp) => {
                tracing::debug!(status = resp.status, "network map fetch failed");
                None
            }
            Err(e) => {
                tracing::debug!(error=%e, "network map fetch failed");
                None
            }
        }
    }
}

/// Parse the four result tables and the network map location.
pub fn parse_results_page(html: &str) -> Result<(DnsRecords, Option<String>)> {
    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&TABLE).collect();
    if tables.len() <= HOST_TABLE {
        return Err(HuntError::TableShape {
            table: tables.len(),
            detail: format!("expected {} tables, found {}", HOST_TABLE + 1, tables.len()),
        });
    }

    let records = DnsRecords {
        dns: host_rows(DNS_TABLE, tables[DNS_TABLE])?,
        mx: host_rows(MX_TABLE, tables[MX_TABLE])?,
        txt: txt_rows(tables[TXT_TABLE]),
        host: host_rows(HOST_TABLE, tables[HOST_TABLE])?,
    };

    let image_src = document
        .select(&NETWORK_MAP)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    Ok((records, image_src))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect()
}

fn label_text(table: usize, cell: ElementRef, what: &str) -> Result<String> {
    cell.select(&LABEL)
        .next()
        .map(text_of)
        .ok_or_else(|| HuntError::TableShape {
            table,
            detail: format!("cell without a {} label", what),
        })
}

/// Rows without any `<td>` (header rows) are skipped; data rows need three cells.
fn host_rows(table_index: usize, table: ElementRef) -> Result<Vec<DnsHostRecord>> {
    let mut results = Vec::new();
    for tr in table.select(&ROW) {
        let tds: Vec<ElementRef> = tr.select(&CELL).collect();
        if tds.is_empty() {
            continue;
        }
        if tds.len() < 3 {
            return Err(HuntError::TableShape {
                table: table_index,
                detail: format!("row with {} cells, expected 3", tds.len()),
            });
        }

        let first = text_of(tds[0]).replace('\n', "");
        let mut tokens = first.split(' ');
        let domain = tokens.next().unwrap_or_default().to_string();
        let header = tokens.collect::<Vec<_>>().join(" ");

        let address_cell = text_of(tds[1]);
        let ip = IP_RE
            .find(&address_cell)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| HuntError::TableShape {
                table: table_index,
                detail: format!("no IPv4 address in {:?}", address_cell),
            })?;
        let reverse_dns = label_text(table_index, tds[1], "reverse DNS")?;

        let additional_info = text_of(tds[2]);
        let country = label_text(table_index, tds[2], "country")?;
        let mut tokens = additional_info.split(' ');
        let autonomous_system = tokens.next().unwrap_or_default().to_string();
        let provider = tokens.collect::<Vec<_>>().join(" ").replace(&country, "");

        results.push(DnsHostRecord {
            domain,
            ip,
            reverse_dns,
            autonomous_system,
            provider,
            country,
            header,
        });
    }
    Ok(results)
}

fn txt_rows(table: ElementRef) -> Vec<String> {
    table.select(&CELL).map(text_of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingReporter;
    use crate::testing::{response, StubTransport};

    fn host_row(name: &str, ip: &str, rdns: &str, asn: &str, country: &str) -> String {
        format!(
            r#"<tr><td class="col-md-4">{name}<br></td><td class="col-md-3">{ip}<br><span style="font-size: 0.9em;">{rdns}</span></td><td class="col-md-3">{asn}<br><span style="font-size: 0.9em;">{country}</span></td></tr>"#
        )
    }

    fn table(rows: &[String]) -> String {
        format!("<table class=\"table\">{}</table>", rows.concat())
    }

    fn page(tables: &[String], image: bool) -> String {
        let img = if image {
            r#"<img class="img-responsive" src="/static/map/example.com.png">"#
        } else {
            ""
        };
        format!("<html><body>{}{}</body></html>", tables.concat(), img)
    }

    fn standard_tables() -> Vec<String> {
        vec![
            table(&[host_row("ns1.example.com", "192.0.2.1", "ns1.example.net", "AS15169 Google LLC", "United States")]),
            table(&[host_row("mail.example.com", "192.0.2.25", "mx.example.net", "AS13335 Cloudflare, Inc.", "Canada")]),
            table(&["<tr><td>\"v=spf1 -all\"</td></tr>".to_string(), "<tr><td>\"google-site-verification=x\"</td></tr>".to_string()]),
            table(&[
                host_row("www.example.com HTTP: nginx", "192.0.2.80", "web.example.net", "AS16509 Amazon.com, Inc.", "Ireland"),
                host_row("api.example.com", "198.51.100.7", "api.example.net", "AS16509 Amazon.com, Inc.", "Ireland"),
            ]),
        ]
    }

    fn transport(post_status: u16, body: String) -> StubTransport {
        let mut landing = response(200, "<html>token</html>");
        landing.cookies.insert("csrftoken".into(), "tok123".into());
        StubTransport::new()
            .on_get(DNSDUMPSTER_URI, landing)
            .on_post(DNSDUMPSTER_URI, response(post_status, &body))
    }

    #[test]
    fn test_parse_row_fields() {
        let (records, image) = parse_results_page(&page(&standard_tables(), true)).unwrap();
        assert_eq!(
            records.dns[0],
            DnsHostRecord {
                domain: "ns1.example.com".into(),
                ip: "192.0.2.1".into(),
                reverse_dns: "ns1.example.net".into(),
                autonomous_system: "AS15169".into(),
                provider: "Google LLC".into(),
                country: "United States".into(),
                header: "".into(),
            }
        );
        assert_eq!(records.mx[0].provider, "Cloudflare, Inc.");
        assert_eq!(records.txt, vec!["\"v=spf1 -all\"", "\"google-site-verification=x\""]);
        assert_eq!(records.host.len(), 2);
        assert_eq!(records.host[0].domain, "www.example.com");
        assert_eq!(records.host[0].header, "HTTP: nginx");
        assert_eq!(image.as_deref(), Some("/static/map/example.com.png"));
    }

    #[test]
    fn test_tables_are_positional() {
        let mut tables = standard_tables();
        tables.swap(DNS_TABLE, MX_TABLE);
        let (records, _) = parse_results_page(&page(&tables, false)).unwrap();
        assert_eq!(records.dns[0].domain, "mail.example.com");
        assert_eq!(records.mx[0].domain, "ns1.example.com");

        let mut tables = standard_tables();
        tables.swap(DNS_TABLE, HOST_TABLE);
        let (records, _) = parse_results_page(&page(&tables, false)).unwrap();
        assert_eq!(records.dns.len(), 2);
        assert_eq!(records.host[0].domain, "ns1.example.com");
    }

    #[test]
    fn test_missing_table_is_shape_error() {
        let tables = &standard_tables()[..3];
        match parse_results_page(&page(tables, false)) {
            Err(HuntError::TableShape { table, .. }) => assert_eq!(table, 3),
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_cells_are_shape_errors() {
        let mut tables = standard_tables();
        tables[MX_TABLE] = table(&["<tr><td>mail.example.com</td><td>192.0.2.25</td></tr>".to_string()]);
        assert!(matches!(
            parse_results_page(&page(&tables, false)),
            Err(HuntError::TableShape { table: MX_TABLE, .. })
        ));

        let mut tables = standard_tables();
        tables[HOST_TABLE] = table(&["<tr><td>www.example.com</td><td>no address<span>x</span></td><td>AS1 X<span>Y</span></td></tr>".to_string()]);
        assert!(matches!(
            parse_results_page(&page(&tables, false)),
            Err(HuntError::TableShape { table: HOST_TABLE, .. })
        ));
    }

    #[test]
    fn test_header_rows_are_skipped() {
        let mut tables = standard_tables();
        tables[DNS_TABLE] = format!(
            "<table><tr><th>Host</th><th>IP</th></tr>{}</table>",
            host_row("ns1.example.com", "192.0.2.1", "r", "AS1 P", "C")
        );
        let (records, _) = parse_results_page(&page(&tables, false)).unwrap();
        assert_eq!(records.dns.len(), 1);
    }

    #[tokio::test]
    async fn test_scrape_handshake_and_image() {
        let stub = transport(200, page(&standard_tables(), true))
            .on_get("https://dnsdumpster.com/static/map/example.com.png", response(200, "PNG"));
        let stub = Arc::new(stub);
        let reporter = Arc::new(RecordingReporter::new());
        let client = DnsAggregatorClient::new(stub.clone(), reporter.clone());

        let result = client.scrape("example.com").await.unwrap();
        assert_eq!(result.domain, "example.com");
        assert_eq!(result.image_data.as_deref(), Some("UE5H"));
        assert!(reporter.diagnostics().is_empty());

        let posts = stub.recorded("POST");
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert!(!post.verify_tls);
        assert!(post.cookies.contains(&("csrftoken".into(), "tok123".into())));
        assert!(post.form.contains(&("csrfmiddlewaretoken".into(), "tok123".into())));
        assert!(post.form.contains(&("targetip".into(), "example.com".into())));
        assert!(post.headers.contains(&("Referer".into(), DNSDUMPSTER_URI.into())));
        assert!(stub.recorded("GET").iter().all(|r| !r.verify_tls));
    }

    #[tokio::test]
    async fn test_image_failure_keeps_tables() {
        let stub = Arc::new(
            transport(200, page(&standard_tables(), true))
                .fail_get("https://dnsdumpster.com/static/map/example.com.png"),
        );
        let reporter = Arc::new(RecordingReporter::new());
        let client = DnsAggregatorClient::new(stub, reporter);

        let result = client.scrape("example.com").await.unwrap();
        assert!(result.image_data.is_none());
        assert_eq!(result.dns_records.dns.len(), 1);
        assert_eq!(result.dns_records.mx.len(), 1);
        assert_eq!(result.dns_records.txt.len(), 2);
        assert_eq!(result.dns_records.host.len(), 2);
    }

    #[tokio::test]
    async fn test_non_200_is_reported_but_parsed() {
        let empty = vec![table(&[]), table(&[]), table(&[]), table(&[])];
        let stub = Arc::new(transport(403, page(&empty, false)));
        let reporter = Arc::new(RecordingReporter::new());
        let client = DnsAggregatorClient::new(stub, reporter.clone());

        let result = client.scrape("example.com").await.unwrap();
        assert_eq!(result.dns_records, DnsRecords::default());
        assert_eq!(reporter.errors(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_site_is_reported() {
        let reporter = Arc::new(RecordingReporter::new());
        let client = DnsAggregatorClient::new(Arc::new(StubTransport::new()), reporter.clone());
        assert!(matches!(
            client.scrape("example.com").await,
            Err(HuntError::Transport(_))
        ));
        assert_eq!(reporter.errors(), 1);
    }

    #[tokio::test]
    async fn test_repeated_scrapes_are_identical() {
        let stub = Arc::new(transport(200, page(&standard_tables(), false)));
        let client = DnsAggregatorClient::new(stub, Arc::new(RecordingReporter::new()));
        let first = client.scrape("example.com").await.unwrap();
        let second = client.scrape("example.com").await.unwrap();
        assert_eq!(first, second);
    }
}
