//! Dedup ledger.
//!
//! Tracks which row identities have been announced. Entries are never
//! removed, so the set grows with the sheet; that is fine for form-response
//! volumes but does not scale to unbounded sources.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{IdentityKey, IdentityPolicy, Row, RowIdentity, Sheet};
use crate::storage::LedgerStore;

/// A row not yet announced, with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenRow {
    pub row: Row,
    pub identity: RowIdentity,
}

/// Result of filtering one fetch against the ledger.
#[derive(Debug, Clone)]
pub struct Unseen {
    /// Identity source resolved against this fetch's header, `None` when
    /// the fetch had no data rows
    pub key: Option<IdentityKey>,
    /// Unseen rows in source order
    pub rows: Vec<UnseenRow>,
    /// Rows skipped because their identity cell was blank
    pub blank: usize,
}

impl Unseen {
    /// Column the identity was read from, if the policy uses one.
    pub fn identity_column(&self) -> Option<&str> {
        self.key.as_ref().and_then(IdentityKey::column)
    }
}

/// Set of announced row identities.
pub struct Ledger {
    policy: IdentityPolicy,
    seen: HashSet<RowIdentity>,
    /// Commit order, kept for the persisted file
    order: Vec<RowIdentity>,
    store: Option<Arc<dyn LedgerStore>>,
}

impl Ledger {
    /// Create an empty in-memory ledger.
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
            order: Vec::new(),
            store: None,
        }
    }

    /// Load prior state from the store.
    ///
    /// Missing or unreadable state yields an empty ledger; this never fails.
    pub async fn load(policy: IdentityPolicy, store: Option<Arc<dyn LedgerStore>>) -> Self {
        let mut ledger = Self::new(policy);
        let Some(store) = store else {
            return ledger;
        };

        match store.load().await {
            Ok(Some(snapshot)) => {
                for identity in snapshot.identities {
                    if ledger.seen.insert(identity.clone()) {
                        ledger.order.push(identity);
                    }
                }
                log::info!(
                    "Loaded {} announced rows from {}",
                    ledger.order.len(),
                    store.location()
                );
            }
            Ok(None) => {
                log::info!("No ledger at {}, starting empty", store.location());
            }
            Err(e) => {
                log::warn!(
                    "Ledger at {} is unreadable ({}), starting empty",
                    store.location(),
                    e
                );
            }
        }

        ledger.store = Some(store);
        ledger
    }

    pub fn policy(&self) -> &IdentityPolicy {
        &self.policy
    }

    pub fn contains(&self, identity: &RowIdentity) -> bool {
        self.seen.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Return the rows of `sheet` not yet announced, in source order.
    ///
    /// A fetch without data rows yields nothing and is not checked against
    /// the policy. Otherwise fails when the policy needs a column the header
    /// does not have. Rows with a blank identity cell are skipped and
    /// counted. An identity repeated within the same fetch is returned once.
    /// The ledger is not modified.
    pub fn filter_unseen(&self, sheet: &Sheet) -> Result<Unseen> {
        if sheet.rows.is_empty() {
            return Ok(Unseen {
                key: None,
                rows: Vec::new(),
                blank: 0,
            });
        }

        let key = self.policy.resolve(&sheet.headers)?;
        let mut batch = HashSet::new();
        let mut rows = Vec::new();
        let mut blank = 0;

        for row in &sheet.rows {
            let Some(identity) = key.identify(row) else {
                blank += 1;
                continue;
            };
            if self.seen.contains(&identity) || !batch.insert(identity.clone()) {
                continue;
            }
            rows.push(UnseenRow {
                row: row.clone(),
                identity,
            });
        }

        Ok(Unseen {
            key: Some(key),
            rows,
            blank,
        })
    }

    /// Record an identity as announced and persist the full set.
    ///
    /// Returns whether the identity was new. The in-memory insert stands
    /// even if persisting fails.
    pub async fn commit(&mut self, identity: RowIdentity) -> Result<bool> {
        if !self.seen.insert(identity.clone()) {
            return Ok(false);
        }
        self.order.push(identity);

        if let Some(store) = &self.store {
            store.save(&self.order).await?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn sheet(lines: &[&[&str]]) -> Sheet {
        Sheet::from_values(
            lines
                .iter()
                .map(|l| l.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn timestamp_policy() -> IdentityPolicy {
        IdentityPolicy::Column("Timestamp".into())
    }

    fn ids(unseen: &Unseen) -> Vec<&str> {
        unseen.rows.iter().map(|u| u.identity.as_str()).collect()
    }

    #[tokio::test]
    async fn test_filter_preserves_order_and_skips_seen() {
        let mut ledger = Ledger::new(timestamp_policy());
        ledger.commit(RowIdentity::new("t2")).await.unwrap();

        let s = sheet(&[
            &["Timestamp", "Nome"],
            &["t3", "C"],
            &["t1", "A"],
            &["t2", "B"],
            &["t4", "D"],
        ]);
        let unseen = ledger.filter_unseen(&s).unwrap();

        assert_eq!(ids(&unseen), vec!["t3", "t1", "t4"]);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_filter_does_not_mutate() {
        let ledger = Ledger::new(timestamp_policy());
        let s = sheet(&[&["Timestamp"], &["t1"]]);

        assert_eq!(ledger.filter_unseen(&s).unwrap().rows.len(), 1);
        assert_eq!(ledger.filter_unseen(&s).unwrap().rows.len(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_filter_blank_and_duplicate_identities() {
        let ledger = Ledger::new(timestamp_policy());
        let s = sheet(&[
            &["Timestamp", "Nome"],
            &["", "Half written"],
            &["t1", "A"],
            &["t1", "A again"],
        ]);
        let unseen = ledger.filter_unseen(&s).unwrap();

        assert_eq!(ids(&unseen), vec!["t1"]);
        assert_eq!(unseen.rows[0].row.get("Nome"), Some("A"));
        assert_eq!(unseen.blank, 1);
    }

    #[test]
    fn test_filter_missing_identity_column() {
        let ledger = Ledger::new(timestamp_policy());
        let s = sheet(&[&["Nome"], &["A"]]);

        assert!(matches!(
            ledger.filter_unseen(&s),
            Err(AppError::MissingIdentityColumn { .. })
        ));
    }

    #[test]
    fn test_filter_empty_sheet() {
        let ledger = Ledger::new(IdentityPolicy::WholeRow);
        let unseen = ledger.filter_unseen(&Sheet::default()).unwrap();
        assert!(unseen.rows.is_empty());
    }

    #[test]
    fn test_filter_empty_fetch_needs_no_identity_column() {
        let ledger = Ledger::new(timestamp_policy());

        let nothing = ledger.filter_unseen(&Sheet::from_values(vec![])).unwrap();
        assert!(nothing.rows.is_empty());
        assert_eq!(nothing.key, None);

        let header_only = sheet(&[&["Nome", "ID do Discord"]]);
        assert!(ledger.filter_unseen(&header_only).unwrap().rows.is_empty());

        let heuristic = Ledger::new(IdentityPolicy::Heuristic);
        assert!(heuristic.filter_unseen(&Sheet::default()).is_ok());
    }

    #[test]
    fn test_identity_column_reported() {
        let ledger = Ledger::new(timestamp_policy());
        let s = sheet(&[&["Timestamp", "Nome"], &["t1", "A"]]);
        assert_eq!(ledger.filter_unseen(&s).unwrap().identity_column(), Some("Timestamp"));
    }

    #[tokio::test]
    async fn test_whole_row_policy_reannounces_edits() {
        let mut ledger = Ledger::new(IdentityPolicy::WholeRow);
        let before = sheet(&[&["Nome", "ID"], &["Ana", "1"]]);
        let first = ledger.filter_unseen(&before).unwrap();
        ledger
            .commit(first.rows[0].identity.clone())
            .await
            .unwrap();

        assert!(ledger.filter_unseen(&before).unwrap().rows.is_empty());

        let edited = sheet(&[&["Nome", "ID"], &["Ana", "2"]]);
        assert_eq!(ledger.filter_unseen(&edited).unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_is_idempotent() {
        let mut ledger = Ledger::new(timestamp_policy());
        assert!(ledger.commit(RowIdentity::new("t1")).await.unwrap());
        assert!(!ledger.commit(RowIdentity::new("t1")).await.unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_restart() {
        let tmp = TempDir::new().unwrap();
        let store: Arc<dyn LedgerStore> =
            Arc::new(LocalStorage::new(tmp.path().join("ledger.json")));

        let mut ledger = Ledger::load(timestamp_policy(), Some(Arc::clone(&store))).await;
        assert!(ledger.is_empty());
        ledger.commit(RowIdentity::new("X")).await.unwrap();
        drop(ledger);

        let restarted = Ledger::load(timestamp_policy(), Some(store)).await;
        assert!(restarted.contains(&RowIdentity::new("X")));

        let s = sheet(&[&["Timestamp"], &["X"]]);
        assert!(restarted.filter_unseen(&s).unwrap().rows.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_store_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store: Arc<dyn LedgerStore> = Arc::new(LocalStorage::new(&path));
        let mut ledger = Ledger::load(timestamp_policy(), Some(store)).await;
        assert!(ledger.is_empty());
        assert!(ledger.is_persistent());

        // The next commit replaces the corrupt file.
        ledger.commit(RowIdentity::new("t1")).await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"t1\""));
    }
}
