use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod cache;
mod config;
mod models;
mod services;
mod utils;

use cache::QueryCache;
use config::Config;
use models::{Address, CorrelationResult};
use services::correlation_service::CorrelationService;
use services::layout_service::compute_layout;
use services::render_service::{GraphRenderer, PngRenderer};
use services::transaction_service::TransactionFetcher;
use utils::{CorrelateError, Table};

// vitalik.eth and a known counterparty
const DEFAULT_ADDRESS_1: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
const DEFAULT_ADDRESS_2: &str = "0xF8fc9A91349eBd2033d53F2B97245102f00ABa96";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    let mut filter = EnvFilter::from_default_env();
    for directive in ["addr_correlate=info", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    println!("Ethereum Address Correlation Tool");
    println!("---------------------------------");

    let config = Config::from_env();
    if config.dune_api_key.is_none() {
        warn!("DUNE_API_KEY not found in environment variables.");
        println!("WARNING: DUNE_API_KEY not found in environment variables.");
    }

    let mut args = std::env::args().skip(1);
    let address1 = address_arg(args.next(), DEFAULT_ADDRESS_1);
    let address2 = address_arg(args.next(), DEFAULT_ADDRESS_2);

    println!("Calculating correlation between {} and {}...", address1, address2);

    let cache = QueryCache::new(&config.cache_dir).with_ttl(config.cache_ttl);
    info!("Using cache directory {}", cache.cache_dir().display());
    let fetcher = TransactionFetcher::new(config.dune_client(), cache);
    let service = CorrelationService::new(fetcher, config.row_limit);
    let renderer = PngRenderer::new(&config.chart_path);

    if let Err(e) = run(&service, &renderer, &address1, &address2).await {
        error!("Correlation failed: {}", e);
        println!("Error fetching transactions: {}", e);
    }

    println!("Done.");
}

/// Parse a command-line address, falling back to `default` when absent or malformed
fn address_arg(arg: Option<String>, default: &str) -> Address {
    let Some(raw) = arg else {
        return Address::new(default);
    };

    let address = Address::new(&raw);
    if address.is_well_formed() {
        address
    } else {
        warn!("Ignoring malformed address {:?}, using {}", raw, default);
        println!("WARNING: '{}' is not a valid address, using {}", raw, default);
        Address::new(default)
    }
}

async fn run(
    service: &CorrelationService,
    renderer: &dyn GraphRenderer,
    address1: &Address,
    address2: &Address,
) -> Result<(), CorrelateError> {
    let (graph, result) = service.calculate_score(address1, address2).await?;
    println!("Graph built successfully.");
    print!("{}", summary_table(&result, graph.time_span()).render());

    println!("Displaying graph...");
    let layout = compute_layout(&graph, address1, address2);
    renderer.render(&layout, address1, address2)?;

    Ok(())
}

fn summary_table(result: &CorrelationResult, span: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Table {
    let mut table = Table::new(vec!["Metric", "Value"]);
    table.add_row(vec!["Nodes".to_string(), result.details.nodes.to_string()]);
    table.add_row(vec!["Edges".to_string(), result.details.edges.to_string()]);
    table.add_row(vec!["Score".to_string(), format!("{:.1}", result.score)]);
    table.add_row(vec!["Has path".to_string(), result.details.has_path.to_string()]);
    if let Some((first, last)) = span {
        let fmt = "%Y-%m-%d %H:%M";
        table.add_row(vec![
            "Activity".to_string(),
            format!("{} .. {}", first.format(fmt), last.format(fmt)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CorrelationDetails;
    use chrono::TimeZone;

    #[test]
    fn test_address_arg_falls_back_on_malformed_input() {
        let fallback = address_arg(Some("0xabc\" OR 1=1".to_string()), DEFAULT_ADDRESS_1);
        assert_eq!(fallback, Address::new(DEFAULT_ADDRESS_1));

        let missing = address_arg(None, DEFAULT_ADDRESS_2);
        assert_eq!(missing, Address::new(DEFAULT_ADDRESS_2));

        let given = address_arg(Some(DEFAULT_ADDRESS_2.to_uppercase().replace("0X", "0x")), DEFAULT_ADDRESS_1);
        assert_eq!(given, Address::new(DEFAULT_ADDRESS_2));
    }

    #[test]
    fn test_default_addresses_are_well_formed() {
        assert!(Address::new(DEFAULT_ADDRESS_1).is_well_formed());
        assert!(Address::new(DEFAULT_ADDRESS_2).is_well_formed());
    }

    #[test]
    fn test_summary_table_rows() {
        let result = CorrelationResult {
            source: Address::new("0xaaa"),
            target: Address::new("0xbbb"),
            score: 0.0,
            path: Vec::new(),
            details: CorrelationDetails {
                nodes: 3,
                edges: 2,
                notes: "Graph built successfully".to_string(),
                has_path: true,
            },
        };

        let without_span = summary_table(&result, None).render();
        assert!(without_span.contains("Nodes    | 3"));
        assert!(without_span.contains("Has path | true"));
        assert!(!without_span.contains("Activity"));

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let with_span = summary_table(&result, Some((at, at))).render();
        assert!(with_span.contains("2024-05-01 08:00 .. 2024-05-01 08:00"));
    }
}
