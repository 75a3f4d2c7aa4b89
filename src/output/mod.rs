pub mod report;
pub mod writer_csv;

pub use report::{write_report_json, write_subdomains_txt, HuntReport};
pub use writer_csv::write_csv;
