use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One OHLC observation for a fixed time bucket, in the compact wire shape
/// written by the external history producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    /// Unix epoch milliseconds.
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
}

impl CandlePoint {
    pub fn new(
        t: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_price("o", open)?;
        validate_price("h", high)?;
        validate_price("l", low)?;
        validate_price("c", close)?;
        if let Some(v) = volume {
            validate_price("v", v)?;
        }

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }
        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidCandleBounds);
        }

        Ok(Self {
            t,
            o: open,
            h: high,
            l: low,
            c: close,
            v: volume,
        })
    }

    /// Re-checks the candle invariants after deserialization.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Self::new(self.t, self.o, self.h, self.l, self.c, self.v)
    }
}

fn validate_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidCandleValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_candle() {
        let candle = CandlePoint::new(1_700_000_000_000, 10.0, 11.0, 9.5, 10.5, None)
            .expect("must validate");
        assert_eq!(candle.h, 11.0);
    }

    #[test]
    fn rejects_inverted_range() {
        let err = CandlePoint::new(0, 10.0, 9.0, 11.0, 10.0, None).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidCandleRange));
    }

    #[test]
    fn rejects_close_outside_range() {
        let err = CandlePoint::new(0, 10.0, 11.0, 9.0, 12.0, None).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidCandleBounds));
    }

    #[test]
    fn rejects_non_finite_open() {
        let err = CandlePoint::new(0, f64::NAN, 11.0, 9.0, 10.0, None).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::InvalidCandleValue { field: "o" }
        ));
    }

    #[test]
    fn serializes_compact_keys() {
        let candle = CandlePoint::new(1_700_000_000_000, 1.0, 2.0, 0.5, 1.5, Some(300.0))
            .expect("must validate");
        let json = serde_json::to_value(candle).expect("must serialize");
        assert_eq!(json["t"], 1_700_000_000_000_i64);
        assert_eq!(json["v"], 300.0);
    }
}
