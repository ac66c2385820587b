mod asset;
mod candle;
mod timeframe;
mod timestamp;

pub use asset::{Asset, WatchlistDocument};
pub use candle::CandlePoint;
pub use timeframe::{BucketUnit, Timeframe};
pub use timestamp::UtcTimestamp;
