use crate::data_structures::{PricePoint, PriceResponse};
use crate::yahoo::{DailyBar, MarketDataProvider, YahooError};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

pub const TICKER: &str = "TSLA";
pub const WINDOW_DAYS: i64 = 90;

/// Wall-clock source, swappable so the trailing window can be pinned.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// `[now - 90 days, now)`
pub fn trailing_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(WINDOW_DAYS), now)
}

pub fn to_price_points(bars: &[DailyBar]) -> Vec<PricePoint> {
    bars.iter()
        .map(|bar| PricePoint(bar.time.timestamp_millis(), bar.close))
        .collect()
}

#[instrument(skip(provider, clock))]
pub async fn fetch_price_series(
    provider: &dyn MarketDataProvider,
    clock: &dyn Clock,
) -> Result<PriceResponse, YahooError> {
    let (start, end) = trailing_window(clock.now());
    debug!(%start, %end, symbol = TICKER, "Fetching trailing price window");

    let bars = provider.daily_bars(TICKER, start, end).await?;
    let prices = to_price_points(&bars);

    info!(symbol = TICKER, points = prices.len(), "Built price series");
    Ok(PriceResponse { prices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use std::sync::Mutex;

    struct RecordingProvider {
        bars: Vec<DailyBar>,
        calls: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl MarketDataProvider for RecordingProvider {
        async fn daily_bars(
            &self,
            symbol: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<DailyBar>, YahooError> {
            self.calls.lock().unwrap().push((symbol.to_string(), start, end));
            Ok(self.bars.clone())
        }
    }

    fn bar(y: i32, m: u32, d: u32, close: f64) -> DailyBar {
        DailyBar {
            time: NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN).and_utc(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
            symbol: Some(TICKER.to_string()),
        }
    }

    #[test]
    fn test_trailing_window_is_ninety_calendar_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 15, 45, 0).unwrap();
        let (start, end) = trailing_window(now);
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 31, 15, 45, 0).unwrap());
    }

    #[test]
    fn test_to_price_points_keeps_order_and_closes() {
        let bars = vec![bar(2025, 1, 2, 100.0), bar(2025, 1, 3, 102.5), bar(2025, 1, 6, 99.0)];
        let points = to_price_points(&bars);
        assert_eq!(
            points,
            vec![
                PricePoint(1_735_776_000_000, 100.0),
                PricePoint(1_735_862_400_000, 102.5),
                PricePoint(1_736_121_600_000, 99.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_price_series_requests_fixed_ticker_and_window() {
        let provider = RecordingProvider {
            bars: vec![bar(2025, 1, 2, 100.0)],
            calls: Mutex::new(Vec::new()),
        };
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();

        let response = fetch_price_series(&provider, &FixedClock(now)).await.unwrap();
        assert_eq!(response.prices.len(), 1);

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "TSLA");
        assert_eq!(calls[0].1, now - Duration::days(90));
        assert_eq!(calls[0].2, now);
    }

    #[tokio::test]
    async fn test_empty_window_yields_empty_series() {
        let provider = RecordingProvider { bars: Vec::new(), calls: Mutex::new(Vec::new()) };
        let response = fetch_price_series(&provider, &SystemClock).await.unwrap();
        assert!(response.prices.is_empty());
    }
}
