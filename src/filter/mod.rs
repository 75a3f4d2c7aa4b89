pub mod cert_subject;
pub mod domain;

pub use cert_subject::parse_cert_subject;
pub use domain::{apex_matches, filter_subdomains, SubdomainSet};
