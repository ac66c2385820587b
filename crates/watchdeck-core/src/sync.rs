//! In-memory ownership of the watchlist document and its commit lifecycle.
//!
//! The synchronizer is the only writer of the in-memory document. Mutations
//! are applied locally and only reach the wire on an explicit `commit`, which
//! chains from the last observed revision token. A conflicting remote edit
//! surfaces as [`StoreError::Conflict`]; the local mutation stays applied and
//! uncommitted so the caller can decide to reload-and-reapply or discard.

use std::sync::Arc;

use tracing::info;

use crate::domain::{Asset, WatchlistDocument};
use crate::store::{DocumentStore, FetchOutcome, RevisionToken, StoreError, WATCHLIST_RESOURCE};
use crate::ValidationError;

/// Lifecycle phase of the synchronized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No document loaded yet; mutations are rejected.
    Uninitialized,
    /// Document matches the last fetched or committed remote state.
    Loaded,
    /// Local mutations exist that have not been committed.
    Mutated,
    /// A commit is outstanding; further mutations and commits are rejected
    /// until it resolves or the document is reloaded.
    Committing,
}

/// Raw form fields for one asset, exactly as the page layer collects them.
/// Blank threshold fields mean "no threshold".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInput {
    pub symbol: String,
    pub name: String,
    pub alert_above: String,
    pub alert_below: String,
    pub email: String,
}

impl AssetInput {
    /// Validates and converts the form input. Runs before any network call.
    pub fn parse(&self) -> Result<Asset, ValidationError> {
        let alert_above = parse_threshold("alert_above", &self.alert_above)?;
        let alert_below = parse_threshold("alert_below", &self.alert_below)?;
        let email = match self.email.trim() {
            "" => None,
            value => Some(value.to_owned()),
        };
        Asset::new(&self.symbol, &self.name, alert_above, alert_below, email)
    }
}

fn parse_threshold(field: &'static str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::UnparsableThreshold {
            field,
            value: trimmed.to_owned(),
        })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteThreshold { field });
    }
    Ok(Some(value))
}

/// A local edit to the in-memory document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddAsset(AssetInput),
    EditAsset { index: usize, input: AssetInput },
    DeleteAsset { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("watchlist has not been loaded")]
    NotLoaded,
    #[error("a commit is already outstanding")]
    CommitInFlight,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the in-memory watchlist for one page session and drives it through
/// the revisioned store.
pub struct WatchlistSync {
    store: Arc<dyn DocumentStore>,
    default_alert_email: Option<String>,
    document: WatchlistDocument,
    revision: Option<RevisionToken>,
    phase: SyncPhase,
    pending: Vec<String>,
}

impl WatchlistSync {
    pub fn new(store: Arc<dyn DocumentStore>, default_alert_email: Option<String>) -> Self {
        Self {
            store,
            default_alert_email,
            document: WatchlistDocument::new(),
            revision: None,
            phase: SyncPhase::Uninitialized,
            pending: Vec::new(),
        }
    }

    pub fn document(&self) -> &WatchlistDocument {
        &self.document
    }

    pub fn revision(&self) -> Option<&RevisionToken> {
        self.revision.as_ref()
    }

    pub const fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Fetches the remote document, adopting its revision token. A missing
    /// resource starts an empty document with no token, so the first commit
    /// becomes a creation. `NotConfigured` surfaces to the caller, which is
    /// expected to collect configuration rather than treat it as a failure.
    ///
    /// Loading is also the recovery path out of `Committing`: a commit future
    /// dropped mid-flight leaves the remote outcome unknown, and refetching
    /// is the only way to learn whether the write landed.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        let store = Arc::clone(&self.store);
        match store.fetch_current(WATCHLIST_RESOURCE).await? {
            FetchOutcome::Found { document, revision } => {
                self.document = document;
                self.revision = Some(revision);
            }
            FetchOutcome::Missing => {
                self.document = WatchlistDocument::new();
                self.revision = None;
            }
        }
        self.pending.clear();
        self.phase = SyncPhase::Loaded;
        Ok(())
    }

    /// Applies one mutation to the in-memory copy. Validation failures reject
    /// the mutation before anything is touched; no network activity here.
    pub fn apply_mutation(&mut self, mutation: Mutation) -> Result<(), SyncError> {
        match self.phase {
            SyncPhase::Uninitialized => return Err(SyncError::NotLoaded),
            SyncPhase::Committing => return Err(SyncError::CommitInFlight),
            SyncPhase::Loaded | SyncPhase::Mutated => {}
        }

        let description = match mutation {
            Mutation::AddAsset(input) => {
                let asset = input.parse()?;
                let description = format!("add {}", asset.symbol);
                self.document.assets.push(asset);
                description
            }
            Mutation::EditAsset { index, input } => {
                let len = self.document.assets.len();
                let slot = self
                    .document
                    .assets
                    .get_mut(index)
                    .ok_or(ValidationError::IndexOutOfRange { index, len })?;
                let mut asset = input.parse()?;
                // Producer-owned fields survive a local edit.
                asset.last_price = slot.last_price;
                asset.last_updated = slot.last_updated;
                let description = format!("edit {}", asset.symbol);
                *slot = asset;
                description
            }
            Mutation::DeleteAsset { index } => {
                let len = self.document.assets.len();
                if index >= len {
                    return Err(ValidationError::IndexOutOfRange { index, len }.into());
                }
                let removed = self.document.assets.remove(index);
                format!("delete {}", removed.symbol)
            }
        };

        self.pending.push(description);
        self.phase = SyncPhase::Mutated;
        Ok(())
    }

    /// Commits the in-memory document using the last-known revision token.
    /// On success the returned token becomes current so the next commit
    /// chains from it. On any failure the local document keeps its pending
    /// edits; a `Conflict` in particular is never merged or retried here.
    pub async fn commit(&mut self) -> Result<RevisionToken, SyncError> {
        match self.phase {
            SyncPhase::Uninitialized => return Err(SyncError::NotLoaded),
            SyncPhase::Committing => return Err(SyncError::CommitInFlight),
            SyncPhase::Loaded | SyncPhase::Mutated => {}
        }

        if let Some(email) = &self.default_alert_email {
            if self.document.alert_email.as_deref() != Some(email.as_str()) {
                self.document.alert_email = Some(email.clone());
            }
        }

        let message = self.commit_message();
        self.phase = SyncPhase::Committing;

        let store = Arc::clone(&self.store);
        let result = store
            .commit(
                WATCHLIST_RESOURCE,
                &self.document,
                self.revision.as_ref(),
                &message,
            )
            .await;

        match result {
            Ok(token) => {
                info!(revision = %token, "watchlist committed");
                self.revision = Some(token.clone());
                self.pending.clear();
                self.phase = SyncPhase::Loaded;
                Ok(token)
            }
            Err(err) => {
                self.phase = if self.pending.is_empty() {
                    SyncPhase::Loaded
                } else {
                    SyncPhase::Mutated
                };
                Err(err.into())
            }
        }
    }

    /// Human-readable change description recorded by the remote store.
    fn commit_message(&self) -> String {
        if self.pending.is_empty() {
            String::from("watchdeck: update watchlist")
        } else {
            format!("watchdeck: {}", self.pending.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_threshold_parses_to_none() {
        assert_eq!(parse_threshold("alert_above", "  ").expect("must parse"), None);
    }

    #[test]
    fn numeric_threshold_parses() {
        assert_eq!(
            parse_threshold("alert_above", "200").expect("must parse"),
            Some(200.0)
        );
        assert_eq!(
            parse_threshold("alert_below", " 1.5 ").expect("must parse"),
            Some(1.5)
        );
    }

    #[test]
    fn unparsable_threshold_is_rejected() {
        let err = parse_threshold("alert_above", "high").expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::UnparsableThreshold {
                field: "alert_above",
                ..
            }
        ));
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let err = parse_threshold("alert_below", "inf").expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteThreshold { .. }));
    }

    #[test]
    fn input_parses_into_asset() {
        let input = AssetInput {
            symbol: String::from("AAPL"),
            name: String::new(),
            alert_above: String::from("200"),
            alert_below: String::new(),
            email: String::new(),
        };
        let asset = input.parse().expect("must parse");
        assert_eq!(asset.symbol, "AAPL");
        assert_eq!(asset.alert_above, Some(200.0));
        assert_eq!(asset.alert_below, None);
        assert_eq!(asset.email, None);
    }

    #[test]
    fn empty_symbol_rejected_at_parse() {
        let input = AssetInput {
            symbol: String::from("  "),
            ..AssetInput::default()
        };
        let err = input.parse().expect_err("must fail");
        assert!(matches!(err, ValidationError::EmptySymbol));
    }
}
