use clap::Parser;
use sub_hunter::config::DEFAULT_CONFIG_PATH;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Collect subdomains of a domain from crt.sh, Censys, DNS Dumpster and Netcraft
    Hunt {
        /// Target domain (e.g. example.com)
        domain: String,

        /// JSON credentials file ({"Censys": {"api_id": ..., "api_secret": ...}})
        #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Output directory
        #[arg(short = 'o', long, default_value = "./results")]
        out: String,

        /// Query crt.sh for the exact name instead of %.domain
        #[arg(long, default_value_t = false)]
        no_wildcard: bool,

        /// Launch Chrome and scrape Netcraft as well
        #[arg(short = 'B', long, default_value_t = false)]
        browser: bool,

        /// Also fetch the Netcraft IP history (implies --browser)
        #[arg(long, default_value_t = false)]
        history: bool,

        /// Show the browser window instead of running headless
        #[arg(long, default_value_t = false)]
        show_browser: bool,

        /// Time to let each Netcraft page render, in ms
        #[arg(long, default_value_t = 2000_u64)]
        browser_wait: u64,

        /// HTTP request timeout in seconds
        #[arg(long, default_value_t = 30_u64)]
        timeout: u64,
    },

    /// Print the Netcraft IP address history of a domain
    History {
        /// Target domain (e.g. example.com)
        domain: String,

        /// Show the browser window instead of running headless
        #[arg(long, default_value_t = false)]
        show_browser: bool,

        /// Time to let the report render, in ms
        #[arg(long, default_value_t = 2000_u64)]
        browser_wait: u64,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
