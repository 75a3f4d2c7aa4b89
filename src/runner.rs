use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{Cli, Commands};
use sub_hunter::config::JsonConfig;
use sub_hunter::diagnostics::{Reporter, TeeReporter};
use sub_hunter::discover::{
    BrowserSession, CensysAuthenticator, CertIntelClient, ChromeSession, CrtShClient,
    DisabledReason, DnsAggregatorClient, DnsIndexClient,
};
use sub_hunter::http_client::ReqwestTransport;
use sub_hunter::output::{write_csv, write_report_json, write_subdomains_txt, HuntReport};
use sub_hunter::utils::{ensure_dir, normalize_target};
use sub_hunter::HuntError;

struct HuntOptions {
    domain: String,
    config: PathBuf,
    out: PathBuf,
    wildcard: bool,
    browser: bool,
    history: bool,
    headless: bool,
    browser_wait: u64,
    timeout: u64,
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Our crate at the requested level; keep reqwest/hyper/chromiumoxide quiet.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "sub_hunter={crate},reqwest=info,hyper=info,chromiumoxide=warn",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Hunt { domain, config, out, no_wildcard, browser, history, show_browser, browser_wait, timeout } => {
            let opts = HuntOptions {
                domain: normalize_target(&domain),
                config: PathBuf::from(config),
                out: PathBuf::from(out),
                wildcard: !no_wildcard,
                browser: browser || history,
                history,
                headless: !show_browser,
                browser_wait,
                timeout,
            };
            tracing::info!(domain=%opts.domain, out=%opts.out.display(), browser=opts.browser, history=opts.history, "Starting hunt");
            run_hunt(opts).await
        }
        Commands::History { domain, show_browser, browser_wait } => {
            run_history(&normalize_target(&domain), !show_browser, browser_wait).await
        }
    }
}

async fn run_hunt(opts: HuntOptions) -> anyhow::Result<()> {
    ensure_dir(&opts.out)?;
    let domain = opts.domain.as_str();
    let tee = Arc::new(TeeReporter::default());
    let reporter: Arc<dyn Reporter> = tee.clone();
    let transport = Arc::new(ReqwestTransport::with_timeout(opts.timeout)?);
    let mut report = HuntReport::new(domain);

    println!("[>] Target: {}", domain);
    println!("\n{}\n", "-".repeat(60));

    // crt.sh
    println!("[*] Searching crt.sh certificate transparency logs...");
    let crtsh = CrtShClient::new(transport.clone());
    match crtsh.search(domain, opts.wildcard).await {
        Some(records) => {
            let count = records.len();
            let added = report.add_crtsh(records);
            println!("[+] crt.sh: {} certificates, {} new subdomains", count, added);
        }
        None => reporter.warn("crt.sh returned no usable data."),
    }

    // Censys
    let config = JsonConfig::load_or_empty(&opts.config);
    let authenticator = CensysAuthenticator::new()?;
    let censys = CertIntelClient::connect(&config, &authenticator, reporter.clone()).await;
    if censys.is_enabled() {
        println!("[*] Searching Censys certificates...");
    }
    if let Some(records) = censys.search(domain).await {
        let count = records.len();
        let added = report.add_censys(records);
        println!("[+] Censys: {} certificates, {} new subdomains", count, added);
    } else if let Some(DisabledReason::MissingCredentials) = censys.disabled_reason() {
        println!("[·] Censys: skipped (no credentials in {})", opts.config.display());
    }

    // DNS Dumpster
    println!("[*] Checking DNS Dumpster...");
    let dumpster = DnsAggregatorClient::new(transport.clone(), reporter.clone());
    match dumpster.scrape(domain).await {
        Ok(result) => {
            let hosts = result.dns_records.host.len();
            let map = if result.image_data.is_some() { "saved" } else { "unavailable" };
            let added = report.add_dns_dumpster(result);
            println!("[+] DNS Dumpster: {} hosts, {} new subdomains, network map {}", hosts, added, map);
        }
        Err(e @ HuntError::TableShape { .. }) => {
            reporter.error(&format!("DNS Dumpster page layout has changed, results discarded: {}", e));
        }
        Err(e) => tracing::debug!(error=%e, "DNS Dumpster skipped"),
    }

    // Netcraft
    if opts.browser {
        println!("[*] Searching Netcraft (browser)...");
        let launched = ChromeSession::launch(opts.headless, opts.browser_wait).await;
        collect_browser_sources(launched, &mut report, &reporter, opts.history).await;
    }

    write_outputs(&opts.out, &report)?;
    print_summary(&report, &tee);
    Ok(())
}

/// Netcraft search (and IP history when asked) on a freshly launched session.
/// A session that failed to launch is reported and the sources are skipped.
async fn collect_browser_sources<S: BrowserSession>(
    launched: sub_hunter::Result<S>,
    report: &mut HuntReport,
    reporter: &Arc<dyn Reporter>,
    history: bool,
) {
    let mut session = match launched {
        Ok(session) => session,
        Err(e) => {
            reporter.error(&format!("Could not start the browser, Netcraft skipped: {}", e));
            return;
        }
    };
    let domain = report.domain.clone();
    let netcraft = DnsIndexClient::new(reporter.clone());

    match netcraft.search(&mut session, &domain).await {
        Ok(hosts) => {
            let count = hosts.len();
            let added = report.add_netcraft(hosts);
            println!("[+] Netcraft: {} hosts, {} new subdomains", count, added);
        }
        Err(e) => reporter.error(&format!("Netcraft search failed: {}", e)),
    }
    if history {
        match netcraft.fetch_ip_history(&mut session, &domain).await {
            Ok(entries) => report.ip_history = Some(entries),
            Err(e) => reporter.error(&format!("Netcraft history failed: {}", e)),
        }
    }
    if let Err(e) = session.close().await {
        tracing::debug!(error=%e, "browser did not close cleanly");
    }
}

async fn run_history(domain: &str, headless: bool, browser_wait: u64) -> anyhow::Result<()> {
    let reporter: Arc<dyn Reporter> = Arc::new(TeeReporter::default());
    let mut session = ChromeSession::launch(headless, browser_wait).await?;
    let netcraft = DnsIndexClient::new(reporter);
    let history = netcraft.fetch_ip_history(&mut session, domain).await;
    if let Err(e) = session.close().await {
        tracing::debug!(error=%e, "browser did not close cleanly");
    }

    let history = history?;
    if history.is_empty() {
        println!("[·] Netcraft has no IP history for {}", domain);
    }
    for entry in history {
        println!("{:<40} {}", entry.netblock_label, entry.descriptive_cell);
    }
    Ok(())
}

fn write_outputs(out: &Path, report: &HuntReport) -> anyhow::Result<()> {
    write_subdomains_txt(&out.join("subdomains.txt"), &report.subdomains)?;
    write_csv(&out.join("subdomains.csv"), &report.subdomains)?;
    write_report_json(&out.join("report.json"), report)?;
    Ok(())
}

fn print_summary(report: &HuntReport, tee: &TeeReporter) {
    println!("\n{}\n", "-".repeat(60));
    println!("[+] {} unique subdomains for {}", report.subdomains.len(), report.domain);
    for sub in report.subdomains.iter() {
        println!("    {}", sub);
    }
    if let Some(history) = &report.ip_history {
        println!("\n[+] IP history ({} entries):", history.len());
        for entry in history {
            println!("    {:<40} {}", entry.netblock_label, entry.descriptive_cell);
        }
    }
    let (warnings, errors) = (tee.recorded.warnings(), tee.recorded.errors());
    if warnings + errors > 0 {
        println!("\n[!] {} warnings, {} errors during collection", warnings, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use sub_hunter::diagnostics::{Diagnostic, RecordingReporter};

    /// Serves one page per navigation.
    struct PagedBrowser {
        pages: Vec<String>,
        served: usize,
        closed: Arc<AtomicBool>,
    }

    impl PagedBrowser {
        fn new(pages: Vec<String>) -> Self {
            Self { pages, served: 0, closed: Arc::new(AtomicBool::new(false)) }
        }
    }

    #[async_trait]
    impl BrowserSession for PagedBrowser {
        async fn navigate(&mut self, _url: &str) -> sub_hunter::Result<()> {
            self.served += 1;
            Ok(())
        }

        async fn page_source(&mut self) -> sub_hunter::Result<String> {
            Ok(self.pages.get(self.served - 1).cloned().unwrap_or_default())
        }

        async fn close(&mut self) -> sub_hunter::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn netcraft_page(hosts: &[&str]) -> String {
        let mut page = format!("<p>Found {} sites</p>\n", hosts.len());
        for h in hosts {
            page.push_str(&format!(
                "<a href=\"http://toolbar.netcraft.com/site_report?url=http://{}\">{}</a>\n",
                h, h
            ));
        }
        page
    }

    fn recorder() -> (Arc<RecordingReporter>, Arc<dyn Reporter>) {
        let recorded = Arc::new(RecordingReporter::new());
        let reporter: Arc<dyn Reporter> = recorded.clone();
        (recorded, reporter)
    }

    #[tokio::test]
    async fn test_netcraft_hosts_outside_target_are_dropped() {
        let (recorded, reporter) = recorder();
        let mut report = HuntReport::new("shop.example.com");
        let browser = PagedBrowser::new(vec![netcraft_page(&["www.example.com", "api.shop.example.com"])]);

        collect_browser_sources(Ok(browser), &mut report, &reporter, false).await;

        let all: Vec<&str> = report.subdomains.iter().collect();
        assert_eq!(all, vec!["api.shop.example.com"]);
        assert_eq!(report.netcraft.as_ref().map(Vec::len), Some(2));
        assert!(recorded.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_browser_launch_failure_keeps_earlier_results() {
        let (recorded, reporter) = recorder();
        let mut report = HuntReport::new("example.com");
        report.subdomains.insert("www.example.com", "crt.sh");

        let launched: sub_hunter::Result<PagedBrowser> =
            Err(HuntError::Browser("Failed to launch browser: no chrome".into()));
        collect_browser_sources(launched, &mut report, &reporter, true).await;

        assert!(report.netcraft.is_none());
        assert!(report.ip_history.is_none());
        assert!(matches!(
            recorded.diagnostics().as_slice(),
            [Diagnostic::Error(msg)] if msg.contains("Netcraft skipped")
        ));

        let out = std::env::temp_dir().join(format!("sub_hunter_runner_{}", std::process::id()));
        ensure_dir(&out).unwrap();
        write_outputs(&out, &report).unwrap();
        let txt = std::fs::read_to_string(out.join("subdomains.txt")).unwrap();
        assert!(out.join("subdomains.csv").exists());
        assert!(out.join("report.json").exists());
        std::fs::remove_dir_all(&out).ok();
        assert_eq!(txt, "www.example.com");
    }

    #[tokio::test]
    async fn test_session_is_closed_after_use() {
        let (_, reporter) = recorder();
        let mut report = HuntReport::new("example.com");
        let browser = PagedBrowser::new(vec![netcraft_page(&[])]);
        let closed = browser.closed.clone();

        collect_browser_sources(Ok(browser), &mut report, &reporter, false).await;
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(report.netcraft, Some(vec![]));
    }
}
