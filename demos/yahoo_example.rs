use sentiment_service::price::{self, SystemClock, TICKER};
use sentiment_service::yahoo::{MarketDataProvider, YahooClient, YahooError};

#[tokio::main]
async fn main() -> Result<(), YahooError> {
    println!("Yahoo Chart Client Example");
    println!("==========================");

    let client = YahooClient::new(true)?;

    // 1. Raw daily bars
    println!("\n📈 Daily bars for {} (trailing {} days)", TICKER, price::WINDOW_DAYS);
    println!("{}", "-".repeat(40));

    let (start, end) = price::trailing_window(chrono::Utc::now());
    match client.daily_bars(TICKER, start, end).await {
        Ok(data) => {
            println!("✅ Success! Retrieved {} bars", data.len());

            if let (Some(first), Some(last)) = (data.first(), data.last()) {
                println!("📅 Range: {} to {}", first.time.format("%Y-%m-%d"), last.time.format("%Y-%m-%d"));
                println!("💹 Latest: {:.2} USD (Vol: {})", last.close, last.volume);

                let change_pct = ((last.close - first.open) / first.open) * 100.0;
                let min_low = data.iter().map(|d| d.low).fold(f64::INFINITY, f64::min);
                let max_high = data.iter().map(|d| d.high).fold(f64::NEG_INFINITY, f64::max);
                println!("📊 Change: {:+.2}% | Range: {:.2}-{:.2}", change_pct, min_low, max_high);
            }
        }
        Err(e) => println!("❌ Failed to retrieve daily bars: {}", e),
    }

    // 2. Chart series as served by /api/tesla/price
    println!("\n🗠 Chart series");
    println!("{}", "-".repeat(40));

    match price::fetch_price_series(&client, &SystemClock).await {
        Ok(series) => {
            for point in series.prices.iter().rev().take(5) {
                println!("  [{}, {:.2}]", point.0, point.1);
            }
            println!("  ... {} points total", series.prices.len());
        }
        Err(e) => println!("❌ Failed to build chart series: {}", e),
    }

    Ok(())
}
