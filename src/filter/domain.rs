use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Keep only candidates that end with `root_domain` and are not wildcard patterns.
///
/// This is a plain suffix check: `evilexample.com` passes against `example.com`.
pub fn filter_subdomains<I, S>(root_domain: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .filter_map(|c| {
            let c = c.as_ref();
            if !c.contains('*') && c.ends_with(root_domain) {
                Some(c.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Coarse apex comparison: the last two dot-separated labels of `host` must equal
/// the last two labels of `target`. Multi-label public suffixes (`co.uk`) are not
/// understood.
pub fn apex_matches(host: &str, target: &str) -> bool {
    let host_labels: Vec<&str> = host.split('.').collect();
    let target_labels: Vec<&str> = target.split('.').collect();
    if host_labels.len() < 2 || target_labels.len() < 2 {
        return false;
    }
    host_labels[host_labels.len() - 1] == target_labels[target_labels.len() - 1]
        && host_labels[host_labels.len() - 2] == target_labels[target_labels.len() - 2]
}

/// Deduplicated subdomains with the sources that reported each one.
///
/// Uniqueness is exact, case-sensitive string equality.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubdomainSet {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl SubdomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `subdomain` was not already present.
    pub fn insert(&mut self, subdomain: impl Into<String>, source: &str) -> bool {
        let subdomain = subdomain.into();
        let is_new = !self.entries.contains_key(&subdomain);
        self.entries
            .entry(subdomain)
            .or_default()
            .insert(source.to_string());
        is_new
    }

    pub fn extend<I, S>(&mut self, subdomains: I, source: &str) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for s in subdomains {
            if self.insert(s, source) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, subdomain: &str) -> bool {
        self.entries.contains_key(subdomain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn sources(&self, subdomain: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(subdomain)
    }
}
