use crate::diagnostics::Reporter;
use crate::discover::browser::BrowserSession;
use crate::error::Result;
use crate::filter::apex_matches;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const NETCRAFT_SEARCH_URI: &str = "http://searchdns.netcraft.com/";
pub const NETCRAFT_HISTORY_URI: &str = "http://toolbar.netcraft.com/site_report";
pub const RESULTS_PER_PAGE: usize = 20;
const HISTORY_DELAY: Duration = Duration::from_secs(1);

static SITE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a href="http://toolbar.netcraft.com/site_report\?url=(.*)">"#).unwrap()
});
static FOUND_RE: Lazy<Regex> = Lazy::new(|| Regex::new("Found (.*) site").unwrap());
static FIRST_RE: Lazy<Regex> = Lazy::new(|| Regex::new("First (.*) sites returned").unwrap());
static LAST_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"<td align="left">{}.</td><td align="left">\n<a href="(.*)" rel="nofollow">"#,
        RESULTS_PER_PAGE
    ))
    .unwrap()
});
static NETBLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r".*netblock\?q.*").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpHistoryEntry {
    pub netblock_label: String,
    pub descriptive_cell: String,
}

/// Netcraft search scraper. The browser session is supplied per call and stays
/// owned by the caller.
pub struct DnsIndexClient {
    reporter: Arc<dyn Reporter>,
}

impl DnsIndexClient {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    pub fn search_url(domain: &str) -> String {
        format!("{}?host={}", NETCRAFT_SEARCH_URI, domain)
    }

    pub fn next_page_url(domain: &str, last_item: &str, from: usize) -> String {
        format!(
            "{}?host={}&last={}&from={}&restriction=/site%20contains",
            NETCRAFT_SEARCH_URI, domain, last_item, from
        )
    }

    pub fn history_url(domain: &str) -> String {
        format!("{}?url={}", NETCRAFT_HISTORY_URI, domain)
    }

    /// Hostnames under the same apex as `domain`, accumulated across every
    /// result page. Pages are fetched one after another.
    pub async fn search(
        &self,
        session: &mut dyn BrowserSession,
        domain: &str,
    ) -> Result<Vec<String>> {
        session.navigate(&Self::search_url(domain)).await?;
        let page = session.page_source().await?;

        let (mut results, last_link) = scan_page(&page, domain);
        let count = self.result_count(&page);
        let pages = if count == 0 { 0 } else { count / RESULTS_PER_PAGE + 1 };
        tracing::debug!(count, pages, "Netcraft result count");

        if pages > 1 {
            let mut last_item = LAST_ROW_RE
                .captures(&page)
                .and_then(|c| c.get(1))
                .and_then(|m| host_of(m.as_str()))
                .map(str::to_string)
                .or(last_link)
                .unwrap_or_default();

            for page_no in 2..=pages {
                let from = RESULTS_PER_PAGE * (page_no - 1) + 1;
                session
                    .navigate(&Self::next_page_url(domain, &last_item, from))
                    .await?;
                let page = session.page_source().await?;
                let (found, last_link) = scan_page(&page, domain);
                results.extend(found);
                if let Some(last) = last_link {
                    last_item = last;
                }
            }
        }

        tracing::info!("Netcraft found {} hosts for {}", results.len(), domain);
        Ok(results)
    }

    /// Netblock history for `domain`, header row excluded. Waits one second
    /// before loading the report.
    pub async fn fetch_ip_history(
        &self,
        session: &mut dyn BrowserSession,
        domain: &str,
    ) -> Result<Vec<IpHistoryEntry>> {
        tokio::time::sleep(HISTORY_DELAY).await;
        session.navigate(&Self::history_url(domain)).await?;
        let page = session.page_source().await?;
        let history = parse_ip_history(&page);
        tracing::info!("Netcraft returned {} history entries for {}", history.len(), domain);
        Ok(history)
    }

    /// The advertised number of results, or zero when the page does not say.
    fn result_count(&self, page: &str) -> usize {
        let raw = FOUND_RE
            .captures(page)
            .or_else(|| FIRST_RE.captures(page))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().replace(',', ""));
        match raw {
            None => 0,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                self.reporter
                    .warn(&format!("Could not read the Netcraft result count from {:?}", raw));
                0
            }),
        }
    }
}

/// Third `/`-separated segment of a link, i.e. the host of `scheme://host/...`.
fn host_of(link: &str) -> Option<&str> {
    link.split('/').nth(2).filter(|h| !h.is_empty())
}

/// Apex-matching hosts on one page plus the host of the last link seen.
fn scan_page(page: &str, domain: &str) -> (Vec<String>, Option<String>) {
    let mut matched = Vec::new();
    let mut last = None;
    for cap in SITE_LINK_RE.captures_iter(page) {
        let host = match cap.get(1).and_then(|m| host_of(m.as_str())) {
            Some(h) => h,
            None => continue,
        };
        if apex_matches(host, domain) {
            matched.push(host.to_string());
        }
        last = Some(host.to_string());
    }
    (matched, last)
}

pub fn parse_ip_history(html: &str) -> Vec<IpHistoryEntry> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter(|a| a.value().attr("href").map_or(false, |h| NETBLOCK_RE.is_match(h)))
        .skip(1)
        .map(|a| IpHistoryEntry {
            netblock_label: a.text().collect::<String>().trim().to_string(),
            descriptive_cell: a
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(next_cell)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

/// First `<td>` following `element` in document order among its later siblings.
fn next_cell(element: ElementRef) -> Option<ElementRef> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find_map(|sibling| {
            if sibling.value().name() == "td" {
                Some(sibling)
            } else {
                sibling.select(&CELL).next()
            }
        })
}
