//! Read-only retrieval of per-symbol historical candle series.
//!
//! The external price-update producer maintains one resource per watched
//! symbol, keyed by timeframe. This side only selects a bucket; absence of
//! the resource or the bucket is an empty series, not an error, because a
//! freshly added asset simply has no history yet.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use crate::domain::{CandlePoint, Timeframe};
use crate::store::{GithubContentStore, StoreError};

/// Seam between the chart session and series retrieval, so sessions can be
/// driven by canned data in tests.
pub trait SeriesSource: Send + Sync {
    fn fetch_series<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandlePoint>, StoreError>> + Send + 'a>>;
}

/// Fetches candle series from the same repository that holds the watchlist.
/// No caching: the producer updates resources on its own schedule, so every
/// invocation re-fetches.
#[derive(Clone)]
pub struct SeriesFetcher {
    store: GithubContentStore,
}

impl SeriesFetcher {
    pub fn new(store: GithubContentStore) -> Self {
        Self { store }
    }
}

impl SeriesSource for SeriesFetcher {
    fn fetch_series<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CandlePoint>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let resource = series_resource(symbol);
            match self.store.fetch_raw(&resource).await? {
                Some(text) => select_bucket(&text, timeframe),
                None => Ok(Vec::new()),
            }
        })
    }
}

/// Deterministic resource name used by the producer: path separators in the
/// symbol are flattened so the resource stays a single file.
pub fn series_resource(symbol: &str) -> String {
    format!("historical_{}.json", symbol.replace('/', "_"))
}

/// Picks one timeframe bucket out of the series resource. Points the producer
/// wrote malformed are skipped rather than failing the whole series.
fn select_bucket(text: &str, timeframe: Timeframe) -> Result<Vec<CandlePoint>, StoreError> {
    let buckets: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(text)
        .map_err(|err| StoreError::Payload(format!("series resource: {err}")))?;

    let Some(raw) = buckets.get(timeframe.as_str()) else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<CandlePoint>(value.clone()) {
            Ok(point) => match point.validate() {
                Ok(point) => points.push(point),
                Err(err) => warn!(%timeframe, %err, "skipping invalid candle"),
            },
            Err(err) => warn!(%timeframe, %err, "skipping unparsable candle"),
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_symbol_into_resource_name() {
        assert_eq!(series_resource("BTC-USD"), "historical_BTC-USD.json");
        assert_eq!(series_resource("EUR/USD"), "historical_EUR_USD.json");
    }

    #[test]
    fn selects_requested_bucket() {
        let text = r#"{
            "4h": [{"t": 1, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5}],
            "1d": [
                {"t": 1, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5},
                {"t": 2, "o": 1.5, "h": 2.5, "l": 1.0, "c": 2.0}
            ]
        }"#;
        let points = select_bucket(text, Timeframe::OneDay).expect("must parse");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].c, 2.0);
    }

    #[test]
    fn missing_bucket_is_empty() {
        let text = r#"{"4h": []}"#;
        let points = select_bucket(text, Timeframe::OneWeek).expect("must parse");
        assert!(points.is_empty());
    }

    #[test]
    fn skips_malformed_points() {
        let text = r#"{
            "1d": [
                {"t": 1, "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5},
                {"t": 2, "o": "oops"},
                {"t": 3, "o": 1.0, "h": 0.5, "l": 2.0, "c": 1.0}
            ]
        }"#;
        let points = select_bucket(text, Timeframe::OneDay).expect("must parse");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].t, 1);
    }

    #[test]
    fn rejects_non_object_resource() {
        let err = select_bucket("[1,2,3]", Timeframe::OneDay).expect_err("must fail");
        assert!(matches!(err, StoreError::Payload(_)));
    }
}
