use crate::discover::{CertIntelRecord, CertificateRecord, DnsAggregateResult, IpHistoryEntry};
use crate::filter::{filter_subdomains, parse_cert_subject, SubdomainSet};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Everything one hunt collected. A `None` source means it was skipped or could
/// not be queried; `Some(vec![])` means it answered with nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HuntReport {
    pub domain: String,
    pub subdomains: SubdomainSet,
    pub crtsh: Option<Vec<CertificateRecord>>,
    pub censys: Option<Vec<CertIntelRecord>>,
    pub dns_dumpster: Option<DnsAggregateResult>,
    pub netcraft: Option<Vec<String>>,
    pub ip_history: Option<Vec<IpHistoryEntry>>,
}

impl HuntReport {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Default::default()
        }
    }

    // Every add_* runs the source's names through the same domain filter before
    // they reach `subdomains`, and returns how many were new.

    pub fn add_crtsh(&mut self, records: Vec<CertificateRecord>) -> usize {
        let names = filter_subdomains(&self.domain, records.iter().flat_map(CertificateRecord::names));
        let added = self.subdomains.extend(names, "crt.sh");
        self.crtsh = Some(records);
        added
    }

    /// Subjects without a usable common name are ignored.
    pub fn add_censys(&mut self, records: Vec<CertIntelRecord>) -> usize {
        let names: Vec<String> = records
            .iter()
            .filter_map(|r| parse_cert_subject(&r.subject_dn).ok())
            .collect();
        let added = self.subdomains.extend(filter_subdomains(&self.domain, names), "censys");
        self.censys = Some(records);
        added
    }

    pub fn add_dns_dumpster(&mut self, result: DnsAggregateResult) -> usize {
        let hosts = filter_subdomains(&self.domain, result.dns_records.hostnames());
        let added = self.subdomains.extend(hosts, "dnsdumpster");
        self.dns_dumpster = Some(result);
        added
    }

    /// Netcraft only checks the apex, so hosts beside a deeper target are
    /// dropped here. The raw host list is kept in `netcraft`.
    pub fn add_netcraft(&mut self, hosts: Vec<String>) -> usize {
        let kept = filter_subdomains(&self.domain, &hosts);
        let added = self.subdomains.extend(kept, "netcraft");
        self.netcraft = Some(hosts);
        added
    }
}

pub fn write_report_json(path: &Path, report: &HuntReport) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(report)?;
    fs::write(path, data)?;
    Ok(())
}

/// One subdomain per line, sorted.
pub fn write_subdomains_txt(path: &Path, subdomains: &SubdomainSet) -> anyhow::Result<()> {
    let lines: Vec<&str> = subdomains.iter().collect();
    fs::write(path, lines.join("\n"))?;
    Ok(())
}
