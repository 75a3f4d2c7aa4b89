use crate::filter::SubdomainSet;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub fn write_csv(path: &Path, subdomains: &SubdomainSet) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["subdomain", "sources"])?;
    for sub in subdomains.iter() {
        let sources = subdomains
            .sources(sub)
            .map(|s| s.iter().cloned().collect::<Vec<_>>().join(";"))
            .unwrap_or_default();
        w.write_record([sub, sources.as_str()])?;
    }
    w.flush()?;
    Ok(())
}
