//! Sheet and row data structures.

use serde::{Deserialize, Serialize};

/// One data record of the sheet, keyed by column header.
///
/// Field order follows the sheet's column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Zip a line of cell values against the header.
    ///
    /// A line shorter than the header yields a partial row: trailing
    /// columns are absent, not empty. Cells beyond the header are dropped.
    pub fn from_cells(headers: &[String], cells: &[String]) -> Self {
        let fields = headers
            .iter()
            .zip(cells.iter())
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect();
        Self { fields }
    }

    /// Build a row from explicit (column, value) pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a field value by exact column name.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The result of one fetch: header plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Build a sheet from raw value lines where line 0 is the header.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut lines = values.into_iter();
        let Some(headers) = lines.next() else {
            return Self::default();
        };
        let rows = lines.map(|cells| Row::from_cells(&headers, &cells)).collect();
        Self { headers, rows }
    }

    /// Find the position of a column in the header.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
