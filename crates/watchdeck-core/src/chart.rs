//! One live candlestick chart bound to one asset.
//!
//! The charting library is an external collaborator: it consumes a
//! declarative [`CandleDataset`] and produces pixels. This module owns the
//! lifecycle around it. Exactly one chart instance is visible at a time and
//! the previous instance is released before a new one is mounted; skipping
//! that release leaks rendering resources across repeated opens.
//!
//! Timeframe switches are not serialized. A fetch that resolves after a newer
//! request was issued must not overwrite the newer render, so every fetch
//! carries a monotonically increasing request id and only the most recently
//! issued id may render.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::domain::{Asset, BucketUnit, CandlePoint, Timeframe};
use crate::series::SeriesSource;
use crate::store::StoreError;

/// Fixed color mapping for up/down/unchanged candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandlePalette {
    pub up: &'static str,
    pub down: &'static str,
    pub unchanged: &'static str,
}

impl CandlePalette {
    pub const DEFAULT: Self = Self {
        up: "#26a69a",
        down: "#ef5350",
        unchanged: "#9e9e9e",
    };
}

impl Default for CandlePalette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Declarative input for the charting library. Data flows one way only.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleDataset {
    pub series_label: String,
    pub bucket: BucketUnit,
    pub points: Vec<CandlePoint>,
    /// Configured thresholds, so the page layer can draw alert lines.
    pub alert_above: Option<f64>,
    pub alert_below: Option<f64>,
    pub palette: CandlePalette,
}

/// Opaque identifier of an allocated chart instance. Returned by the
/// renderer on mount and handed back on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

/// Seam to the external charting library.
pub trait ChartRenderer {
    fn mount(&mut self, dataset: &CandleDataset) -> Result<ChartHandle, ChartError>;
    fn release(&mut self, handle: ChartHandle);
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart session is closed")]
    Closed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("renderer failure: {0}")]
    Renderer(String),
}

/// Whether a completed fetch was rendered or discarded as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Stale,
}

/// Tag for one in-flight series fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    timeframe: Timeframe,
}

impl RequestTicket {
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }
}

/// A visible chart session for one asset.
pub struct ChartSession {
    series: Arc<dyn SeriesSource>,
    renderer: Box<dyn ChartRenderer>,
    symbol: String,
    series_label: String,
    alert_above: Option<f64>,
    alert_below: Option<f64>,
    timeframe: Timeframe,
    issued: u64,
    latest: u64,
    active: Option<ChartHandle>,
    closed: bool,
}

impl ChartSession {
    /// Begins a session for one asset at the default timeframe. Nothing is
    /// fetched or drawn until [`refresh`](Self::refresh) runs.
    pub fn open(
        series: Arc<dyn SeriesSource>,
        renderer: Box<dyn ChartRenderer>,
        asset: &Asset,
    ) -> Self {
        Self {
            series,
            renderer,
            symbol: asset.symbol.clone(),
            series_label: asset.display_name().to_owned(),
            alert_above: asset.alert_above,
            alert_below: asset.alert_below,
            timeframe: Timeframe::default(),
            issued: 0,
            latest: 0,
            active: None,
            closed: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Issues a request id for a fetch about to start. Any ticket issued
    /// earlier becomes stale from this point on.
    pub fn begin_request(&mut self, timeframe: Timeframe) -> RequestTicket {
        self.issued += 1;
        self.latest = self.issued;
        self.timeframe = timeframe;
        RequestTicket {
            id: self.issued,
            timeframe,
        }
    }

    /// Applies a resolved fetch. Responses that are not the most recently
    /// issued request, and responses arriving after close, are discarded.
    pub fn complete_request(
        &mut self,
        ticket: RequestTicket,
        points: Vec<CandlePoint>,
    ) -> Result<RenderOutcome, ChartError> {
        if self.closed {
            warn!(symbol = %self.symbol, "discarding response for closed chart session");
            return Ok(RenderOutcome::Stale);
        }
        if ticket.id != self.latest {
            warn!(
                symbol = %self.symbol,
                timeframe = %ticket.timeframe,
                "discarding stale series response"
            );
            return Ok(RenderOutcome::Stale);
        }

        let dataset = CandleDataset {
            series_label: self.series_label.clone(),
            bucket: ticket.timeframe.bucket(),
            points,
            alert_above: self.alert_above,
            alert_below: self.alert_below,
            palette: CandlePalette::DEFAULT,
        };

        self.release_active();
        let handle = self.renderer.mount(&dataset)?;
        self.active = Some(handle);
        Ok(RenderOutcome::Rendered)
    }

    /// Re-fetches the current timeframe and re-renders.
    pub async fn refresh(&mut self) -> Result<RenderOutcome, ChartError> {
        let timeframe = self.timeframe;
        self.set_timeframe(timeframe).await
    }

    /// Switches timeframe, re-fetches and re-renders. A response overtaken by
    /// a newer request is discarded per the request-id rule.
    pub async fn set_timeframe(&mut self, timeframe: Timeframe) -> Result<RenderOutcome, ChartError> {
        if self.closed {
            return Err(ChartError::Closed);
        }
        let ticket = self.begin_request(timeframe);
        let series = Arc::clone(&self.series);
        let points = series.fetch_series(&self.symbol, timeframe).await?;
        self.complete_request(ticket, points)
    }

    /// Releases the chart instance. No further rendering occurs until a new
    /// session is opened.
    pub fn close(&mut self) {
        self.release_active();
        self.closed = true;
    }

    fn release_active(&mut self) {
        if let Some(handle) = self.active.take() {
            self.renderer.release(handle);
        }
    }
}

impl Drop for ChartSession {
    fn drop(&mut self) {
        self.release_active();
    }
}
