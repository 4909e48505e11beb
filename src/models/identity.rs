//! Row identity and the policies that derive it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::Row;

/// Header labels accepted by the heuristic policy.
static IDENTITY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(id|timestamp)\b").expect("static regex"));

/// Value deciding whether two observations are the same logical row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIdentity(String);

impl RowIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a deployment identifies rows. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Digest of every (column, value) pair in order.
    WholeRow,
    /// A designated column holds the identity.
    Column(String),
    /// First header labelled "id" or "timestamp" holds the identity.
    Heuristic,
}

/// An identity policy resolved against a concrete header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    WholeRow,
    Column(String),
}

impl IdentityPolicy {
    /// Resolve the policy against a sheet header.
    ///
    /// Column-based policies fail when the header has no matching column;
    /// there is no fallback to whole-row identity.
    pub fn resolve(&self, headers: &[String]) -> Result<IdentityKey> {
        match self {
            Self::WholeRow => Ok(IdentityKey::WholeRow),
            Self::Column(column) => {
                if headers.iter().any(|h| h == column) {
                    Ok(IdentityKey::Column(column.clone()))
                } else {
                    Err(AppError::MissingIdentityColumn {
                        column: column.clone(),
                        headers: headers.to_vec(),
                    })
                }
            }
            Self::Heuristic => headers
                .iter()
                .find(|h| IDENTITY_LABEL.is_match(h))
                .map(|h| IdentityKey::Column(h.clone()))
                .ok_or_else(|| AppError::MissingIdentityColumn {
                    column: "id|timestamp".to_string(),
                    headers: headers.to_vec(),
                }),
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeRow => f.write_str("whole-row"),
            Self::Column(c) => write!(f, "column '{}'", c),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

impl IdentityKey {
    /// Compute a row's identity. `None` when the identity cell is absent or blank.
    pub fn identify(&self, row: &Row) -> Option<RowIdentity> {
        match self {
            Self::WholeRow => Some(Self::digest(row)),
            Self::Column(column) => row
                .get(column)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(RowIdentity::new),
        }
    }

    /// Column holding the identity, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::WholeRow => None,
            Self::Column(c) => Some(c),
        }
    }

    fn digest(row: &Row) -> RowIdentity {
        let mut hasher = Sha256::new();
        for (column, value) in row.iter() {
            // Length prefixes keep ("ab","c") and ("a","bc") apart.
            hasher.update((column.len() as u64).to_le_bytes());
            hasher.update(column.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        RowIdentity(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_policy_resolves() {
        let policy = IdentityPolicy::Column("Timestamp".into());
        let key = policy
            .resolve(&headers(&["Timestamp", "Nome no IC"]))
            .unwrap();
        assert_eq!(key.column(), Some("Timestamp"));
    }

    #[test]
    fn test_column_policy_missing_column() {
        let policy = IdentityPolicy::Column("Timestamp".into());
        let err = policy.resolve(&headers(&["Nome no IC"])).unwrap_err();
        assert!(matches!(err, AppError::MissingIdentityColumn { .. }));
    }

    #[test]
    fn test_heuristic_picks_first_match() {
        let key = IdentityPolicy::Heuristic
            .resolve(&headers(&["Nome", "TIMESTAMP", "ID do Discord"]))
            .unwrap();
        assert_eq!(key.column(), Some("TIMESTAMP"));
    }

    #[test]
    fn test_heuristic_ignores_substrings() {
        let err = IdentityPolicy::Heuristic
            .resolve(&headers(&["Cidade", "Idade"]))
            .unwrap_err();
        assert!(matches!(err, AppError::MissingIdentityColumn { .. }));
    }

    #[test]
    fn test_blank_identity_cell() {
        let key = IdentityKey::Column("Timestamp".into());
        assert_eq!(key.identify(&Row::from_pairs([("Timestamp", "  ")])), None);
        assert_eq!(key.identify(&Row::from_pairs([("Nome", "Ana")])), None);
        assert_eq!(
            key.identify(&Row::from_pairs([("Timestamp", "2024-01-01")])),
            Some(RowIdentity::new("2024-01-01"))
        );
    }

    #[test]
    fn test_whole_row_digest() {
        let a = Row::from_pairs([("Nome", "Ana"), ("ID", "1")]);
        let same = Row::from_pairs([("Nome", "Ana"), ("ID", "1")]);
        let edited = Row::from_pairs([("Nome", "Ana"), ("ID", "2")]);
        let shifted = Row::from_pairs([("Nom", "eAna"), ("ID", "1")]);

        let key = IdentityKey::WholeRow;
        assert_eq!(key.identify(&a), key.identify(&same));
        assert_ne!(key.identify(&a), key.identify(&edited));
        assert_ne!(key.identify(&a), key.identify(&shifted));
    }
}
