use serde::{Deserialize, Serialize};

use crate::domain::UtcTimestamp;
use crate::ValidationError;

/// One watched instrument with its alert configuration.
///
/// `last_price` and `last_updated` are written only by the external
/// price-update producer; this core carries them through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<UtcTimestamp>,
}

impl Asset {
    /// Builds a user-entered asset. The symbol is trimmed and must be
    /// non-empty; the name falls back to the symbol when blank.
    pub fn new(
        symbol: impl AsRef<str>,
        name: impl AsRef<str>,
        alert_above: Option<f64>,
        alert_below: Option<f64>,
        email: Option<String>,
    ) -> Result<Self, ValidationError> {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let name = name.as_ref().trim();
        let name = if name.is_empty() { symbol } else { name };

        Ok(Self {
            symbol: symbol.to_owned(),
            name: name.to_owned(),
            alert_above,
            alert_below,
            email,
            last_price: None,
            last_updated: None,
        })
    }

    /// Display name, falling back to the symbol for documents written before
    /// names existed.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }
}

/// The shared watchlist document. Asset order is display order; duplicate
/// symbols are representable on purpose and must round-trip untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WatchlistDocument {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_email: Option<String>,
}

impl WatchlistDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }
}
