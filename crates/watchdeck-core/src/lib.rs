//! Core contracts for watchdeck.
//!
//! This crate contains:
//! - Canonical domain models and validation for the watchlist document
//! - The transport codec (UTF-8 JSON ⇄ base64) for the remote store
//! - The revisioned store client with optimistic-concurrency writes
//! - The watchlist synchronizer that owns the in-memory document
//! - The per-symbol series fetcher and the chart session lifecycle

pub mod chart;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod series;
pub mod store;
pub mod sync;

pub use chart::{
    CandleDataset, CandlePalette, ChartError, ChartHandle, ChartRenderer, ChartSession,
    RenderOutcome, RequestTicket,
};
pub use codec::{decode_document, encode_document, CodecError};
pub use config::StoreConfig;
pub use domain::{Asset, BucketUnit, CandlePoint, Timeframe, UtcTimestamp, WatchlistDocument};
pub use error::ValidationError;
pub use http::{
    HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport, NoopTransport,
    ReqwestTransport,
};
pub use series::{series_resource, SeriesFetcher, SeriesSource};
pub use store::{
    DocumentStore, FetchOutcome, GithubContentStore, RevisionToken, StoreError,
    WATCHLIST_RESOURCE,
};
pub use sync::{AssetInput, Mutation, SyncError, SyncPhase, WatchlistSync};
