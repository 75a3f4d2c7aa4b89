use thiserror::Error;

/// Errors produced below the collector boundary.
///
/// Collectors convert most of these into `None` plus a diagnostic. Only
/// `TableShape` is allowed to escape `DnsAggregatorClient::scrape`, because it
/// means the source page layout changed.
#[derive(Debug, Error)]
pub enum HuntError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed JSON at byte {offset}: {detail}")]
    MalformedJson { offset: usize, detail: String },

    #[error("Table {table} does not have the expected shape: {detail}")]
    TableShape { table: usize, detail: String },

    #[error("Subject DN too short to hold a common name: {0:?}")]
    SubjectTooShort(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for HuntError {
    fn from(e: reqwest::Error) -> Self {
        HuntError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HuntError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert_with_question_mark() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/sub_hunter/auth.json")?)
        }
        let err = read_missing().unwrap_err();
        assert!(matches!(err, HuntError::Io(_)));
        assert!(err.to_string().starts_with("IO error: "));
    }

    #[test]
    fn test_table_shape_names_the_table() {
        let err = HuntError::TableShape { table: 3, detail: "row with 2 cells".into() };
        assert_eq!(err.to_string(), "Table 3 does not have the expected shape: row with 2 cells");
    }
}
