use std::sync::{Arc, Mutex};

use watchdeck_tests::{flat_candle, CannedSeries};

use watchdeck_core::{
    Asset, BucketUnit, CandleDataset, ChartError, ChartHandle, ChartRenderer, ChartSession,
    RenderOutcome, Timeframe,
};

/// Renderer that records datasets and enforces one-live-instance at a time.
#[derive(Default)]
struct StrictRenderer {
    next: u64,
    live: Option<u64>,
    datasets: Arc<Mutex<Vec<CandleDataset>>>,
}

impl StrictRenderer {
    fn new(datasets: Arc<Mutex<Vec<CandleDataset>>>) -> Self {
        Self {
            next: 0,
            live: None,
            datasets,
        }
    }
}

impl ChartRenderer for StrictRenderer {
    fn mount(&mut self, dataset: &CandleDataset) -> Result<ChartHandle, ChartError> {
        if self.live.is_some() {
            return Err(ChartError::Renderer(String::from(
                "previous chart instance was not released",
            )));
        }
        self.next += 1;
        self.live = Some(self.next);
        self.datasets.lock().expect("dataset lock").push(dataset.clone());
        Ok(ChartHandle(self.next))
    }

    fn release(&mut self, handle: ChartHandle) {
        assert_eq!(self.live, Some(handle.0), "released handle must be live");
        self.live = None;
    }
}

fn asset() -> Asset {
    Asset::new("BTC-USD", "Bitcoin", Some(70_000.0), Some(50_000.0), None).expect("must build")
}

fn open_session(
    series: Arc<CannedSeries>,
) -> (ChartSession, Arc<Mutex<Vec<CandleDataset>>>) {
    let datasets = Arc::new(Mutex::new(Vec::new()));
    let renderer = StrictRenderer::new(Arc::clone(&datasets));
    let session = ChartSession::open(series, Box::new(renderer), &asset());
    (session, datasets)
}

#[tokio::test]
async fn refresh_renders_default_timeframe_with_thresholds() {
    let series = Arc::new(CannedSeries::new());
    series.put(
        "BTC-USD",
        Timeframe::OneDay,
        vec![flat_candle(1, 60_000.0), flat_candle(2, 61_000.0)],
    );
    let (mut session, datasets) = open_session(series);

    let outcome = session.refresh().await.expect("refresh must succeed");
    assert_eq!(outcome, RenderOutcome::Rendered);

    let datasets = datasets.lock().expect("dataset lock");
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].bucket, BucketUnit::Day);
    assert_eq!(datasets[0].series_label, "Bitcoin");
    assert_eq!(datasets[0].points.len(), 2);
    assert_eq!(datasets[0].alert_above, Some(70_000.0));
    assert_eq!(datasets[0].alert_below, Some(50_000.0));
}

#[tokio::test]
async fn timeframe_switch_refetches_and_remaps_bucket() {
    let series = Arc::new(CannedSeries::new());
    series.put("BTC-USD", Timeframe::OneDay, vec![flat_candle(1, 60_000.0)]);
    series.put(
        "BTC-USD",
        Timeframe::FourHours,
        vec![flat_candle(1, 60_100.0), flat_candle(2, 60_200.0)],
    );
    let (mut session, datasets) = open_session(Arc::clone(&series));

    session.refresh().await.expect("refresh must succeed");
    session
        .set_timeframe(Timeframe::FourHours)
        .await
        .expect("switch must succeed");

    assert_eq!(session.timeframe(), Timeframe::FourHours);
    assert_eq!(series.fetch_count(), 2);

    let datasets = datasets.lock().expect("dataset lock");
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[1].bucket, BucketUnit::Hour);
    assert_eq!(datasets[1].points.len(), 2);
}

#[tokio::test]
async fn every_invocation_refetches() {
    let series = Arc::new(CannedSeries::new());
    series.put("BTC-USD", Timeframe::OneDay, vec![flat_candle(1, 60_000.0)]);
    let (mut session, _) = open_session(Arc::clone(&series));

    session.refresh().await.expect("refresh must succeed");
    session.refresh().await.expect("refresh must succeed");
    session.refresh().await.expect("refresh must succeed");

    assert_eq!(series.fetch_count(), 3);
}

#[tokio::test]
async fn symbol_without_history_renders_empty_chart() {
    let series = Arc::new(CannedSeries::new());
    let (mut session, datasets) = open_session(series);

    let outcome = session.refresh().await.expect("refresh must succeed");
    assert_eq!(outcome, RenderOutcome::Rendered);
    assert!(datasets.lock().expect("dataset lock")[0].points.is_empty());
}

#[tokio::test]
async fn rendering_after_close_is_an_error() {
    let series = Arc::new(CannedSeries::new());
    let (mut session, _) = open_session(series);

    session.refresh().await.expect("refresh must succeed");
    session.close();

    let err = session
        .set_timeframe(Timeframe::OneWeek)
        .await
        .expect_err("must be rejected after close");
    assert!(matches!(err, ChartError::Closed));
}

#[tokio::test]
async fn repeated_sessions_do_not_leak_instances() {
    // StrictRenderer fails the mount if a previous instance is still live, so
    // surviving this loop demonstrates the scoped acquire/release contract.
    let series = Arc::new(CannedSeries::new());
    series.put("BTC-USD", Timeframe::OneDay, vec![flat_candle(1, 60_000.0)]);

    for _ in 0..3 {
        let (mut session, _) = open_session(Arc::clone(&series));
        session.refresh().await.expect("refresh must succeed");
        session
            .set_timeframe(Timeframe::OneWeek)
            .await
            .expect("switch must succeed");
        session.close();
    }
}
