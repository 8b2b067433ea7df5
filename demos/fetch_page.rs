//! Fetches an HTML page and a JSON document, printing what comes back.
//!
//! This example shows how to:
//! - Configure a fetcher's defaults
//! - Fetch and query an HTML document
//! - Fetch JSON with re-fetch on invalid payloads
//! - Inspect the retry counts of a response
//!
//! Run with: `cargo run --example fetch_page -- https://www.rust-lang.org/`

use resilient_fetch::{Error, Fetcher, RequestSpec};
use scraper::Selector;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("resilient_fetch=debug,fetch_page=info")
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://www.rust-lang.org/".to_string());

    let fetcher = Fetcher::builder()
        .retry_count(3)
        .retry_delay(Duration::from_secs(1))
        .build()?;

    println!("=== HTML Document ===");
    let spec = RequestSpec::new(&url).with_header("user-agent", "resilient-fetch-demo/0.1")?;
    let page = fetcher.fetch_document(&spec).await?;

    let title = Selector::parse("title").expect("valid selector");
    let links = Selector::parse("a[href]").expect("valid selector");
    for element in page.html.select(&title) {
        println!("Title: {}", element.text().collect::<String>().trim());
    }
    println!("Links: {}", page.html.select(&links).count());
    println!("Status: {}", page.status);
    println!("Attempts: {}", page.attempts);
    println!("Latency: {:?}", page.latency);
    println!();

    println!("=== JSON ===");
    let spec = RequestSpec::new("https://httpbin.org/get")
        .with_form_field("demo", "true")
        .with_total_timeout(Duration::from_secs(20));
    match fetcher.fetch_json::<serde_json::Value>(&spec).await {
        Ok(response) => {
            println!("Payload: {}", response.data);
            println!("Fetch cycles: {}", response.fetches);
        }
        Err(Error::MalformedJson { raw_response, .. }) => {
            println!("Server never sent valid JSON, last body: {}", raw_response);
        }
        Err(e) => println!("Fetch failed: {}", e),
    }

    Ok(())
}
