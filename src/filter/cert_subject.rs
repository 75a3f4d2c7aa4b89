use crate::error::{HuntError, Result};

/// Extract the common name from a certificate subject DN.
///
/// With a comma present the CN starts after the first `CN=`; without one the
/// string is assumed to be `CN=<name>` and the first three bytes are skipped.
/// The remainder is cut at its first comma. This is a narrow heuristic, not a
/// DN parser: a comma-bearing DN with no `CN=` starts at byte 2.
pub fn parse_cert_subject(subject_dn: &str) -> Result<String> {
    let start = if subject_dn.contains(',') {
        match subject_dn.find("CN=") {
            Some(pos) => pos + 3,
            None => 2,
        }
    } else {
        3
    };

    let rest = subject_dn
        .get(start..)
        .ok_or_else(|| HuntError::SubjectTooShort(subject_dn.to_string()))?;

    let cn = match rest.find(',') {
        Some(end) => &rest[..end],
        None => rest,
    };
    Ok(cn.to_string())
}
