pub mod browser;
pub mod cert_intel;
pub mod crtsh;
pub mod dns_aggregator;
pub mod dns_index;

pub use browser::{BrowserSession, ChromeSession};
pub use cert_intel::{
    CensysApi, CensysAuthenticator, CertIntelApi, CertIntelAuthenticator, CertIntelClient,
    CertIntelRecord, CertIntelState, DisabledReason,
};
pub use crtsh::{CertificateRecord, CrtShClient};
pub use dns_aggregator::{DnsAggregateResult, DnsAggregatorClient, DnsHostRecord, DnsRecords};
pub use dns_index::{DnsIndexClient, IpHistoryEntry};
