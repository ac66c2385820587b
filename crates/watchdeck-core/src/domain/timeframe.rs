use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Selectable bucket granularities for historical series display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Timeframe {
    pub const ALL: [Self; 3] = [Self::FourHours, Self::OneDay, Self::OneWeek];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FourHours => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
        }
    }

    /// Display bucket the chart axis should use for this timeframe.
    pub const fn bucket(self) -> BucketUnit {
        match self {
            Self::FourHours => BucketUnit::Hour,
            Self::OneDay => BucketUnit::Day,
            Self::OneWeek => BucketUnit::Week,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::OneDay
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::OneDay),
            "1wk" => Ok(Self::OneWeek),
            other => Err(ValidationError::InvalidTimeframe {
                value: other.to_owned(),
            }),
        }
    }
}

/// Axis granularity handed to the charting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketUnit {
    Hour,
    Day,
    Week,
}

impl BucketUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}
