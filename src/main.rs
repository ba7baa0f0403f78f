// src/main.rs

mod browser;
mod scraper;
#[cfg(test)]
mod tests;

use std::env;
use std::process;

use chrono::Local;
use serde_json::json;

use crate::scraper::{scrape_rentals, ts};

const DEFAULT_URL: &str = "https://www.emeraldpm.com/home_rentals";

fn main() {
    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());

    eprintln!("[{}] ========================================", ts());
    eprintln!("[{}] Rental property scraper starting", ts());
    eprintln!("[{}] Target: {}", ts(), url);
    eprintln!("[{}] ========================================", ts());

    match scrape_rentals(&url) {
        Ok(result) => {
            eprintln!(
                "[{}] ✅ Scrape complete: {} listings",
                ts(),
                result.listing_count
            );
            let envelope = json!({
                "status": "success",
                "timestamp": Local::now().to_rfc3339(),
                "source_url": url,
                "data": result,
            });
            println!("{}", to_pretty(&envelope));
        }
        Err(e) => {
            eprintln!("[{}] ❌ Scrape failed: {}", ts(), e);
            let envelope = json!({
                "status": "error",
                "timestamp": Local::now().to_rfc3339(),
                "error": e.to_string(),
                "error_type": e.kind(),
            });
            println!("{}", to_pretty(&envelope));
            process::exit(1);
        }
    }
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
