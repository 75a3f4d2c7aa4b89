use std::fs;
use std::path::Path;

pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Reduce user input such as `https://Example.com/login` to `example.com`.
pub fn normalize_target(input: &str) -> String {
    let s = input.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let host = s.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    host.trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("example.com"), "example.com");
        assert_eq!(normalize_target(" https://Example.com/login?x=1 "), "example.com");
        assert_eq!(normalize_target("http://user@example.com:8080/"), "example.com");
        assert_eq!(normalize_target("example.com."), "example.com");
    }
}
