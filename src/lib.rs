pub mod config;
pub mod diagnostics;
pub mod discover;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod output;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// re-export modules used in tests
pub use crate::error::{HuntError, Result};
pub use crate::filter::*;
