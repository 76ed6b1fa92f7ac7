use std::process;

use clap::Parser;

use dns_resolver::{resolve, ResolverConfig, SharedCache};

/// Iterative DNS lookup utility.
///
/// Walks the delegation hierarchy itself, starting from a random root
/// nameserver, and prints the full resolution trace as JSON.
#[derive(Parser)]
struct Args {
    /// Domain name to resolve
    domain: String,

    /// Query type to resolve
    #[clap(default_value = "A")]
    qtype: String,

    /// Disable the TTL cache for this lookup
    #[clap(long, action(clap::ArgAction::SetTrue))]
    no_cache: bool,

    /// Per-UDP-exchange timeout, in seconds
    #[clap(long, default_value_t = dns_resolver::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: f64,

    /// Maximum number of entries the TTL cache may hold
    #[clap(long, default_value_t = dns_resolver::DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,
}

fn begin_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var("RUST_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        Ok("compact") => builder.compact().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    begin_logging();
    let args = Args::parse();

    let cache = SharedCache::with_capacity(args.cache_capacity);
    let config = ResolverConfig {
        timeout_secs: args.timeout_secs,
    };

    match resolve(&cache, &config, &args.domain, &args.qtype, !args.no_cache).await {
        Ok(result) => {
            let rendered = serde_json::to_string_pretty(&result)
                .expect("ResolveResult always serialises");
            println!("{rendered}");
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
