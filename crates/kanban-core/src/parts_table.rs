//! Product-to-parts table.
//!
//! One line per product, each a comma-separated list of 1-based part ids.
//! Blank lines are skipped. Ids are stored 0-based so they index straight
//! into the counter keys.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Errors raised while loading the product-to-parts table.
#[derive(Debug, thiserror::Error)]
pub enum PartsTableError {
    /// The file could not be read.
    #[error("failed to read parts table {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A token was not a positive integer.
    #[error("parts table line {line}: invalid part id {token:?}")]
    InvalidPart {
        /// 1-based line number in the file.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A part id falls outside `1..=num_parts`.
    #[error("parts table line {line}: part {part} outside 1..={num_parts}")]
    OutOfRange {
        /// 1-based line number in the file.
        line: usize,
        /// The 1-based part id as written.
        part: usize,
        /// Configured number of parts.
        num_parts: usize,
    },

    /// Fewer rows than configured products.
    #[error("parts table has {found} products, expected at least {expected}")]
    TooFewProducts {
        /// Configured number of products.
        expected: usize,
        /// Rows found in the file.
        found: usize,
    },
}

/// Extra parts each product needs on top of the base kit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPartsTable {
    rows: Vec<BTreeSet<usize>>,
}

impl ProductPartsTable {
    /// Read and parse the table at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PartsTableError::Io`] if the file cannot be read, or any
    /// parse error from [`parse`](Self::parse).
    pub fn load(path: &Path, num_parts: usize) -> Result<Self, PartsTableError> {
        let text = std::fs::read_to_string(path).map_err(|source| PartsTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text, num_parts)?;
        tracing::info!(path = %path.display(), products = table.len(), "Loaded parts table");
        Ok(table)
    }

    /// Parse the table from text.
    ///
    /// # Errors
    ///
    /// Returns [`PartsTableError::InvalidPart`] for a token that is not a
    /// positive integer and [`PartsTableError::OutOfRange`] for an id above
    /// `num_parts`.
    pub fn parse(text: &str, num_parts: usize) -> Result<Self, PartsTableError> {
        let mut rows = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index.saturating_add(1);
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let mut parts = BTreeSet::new();
            for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let part = token
                    .parse::<usize>()
                    .ok()
                    .filter(|&p| p > 0)
                    .ok_or_else(|| PartsTableError::InvalidPart {
                        line,
                        token: token.to_owned(),
                    })?;
                if part > num_parts {
                    return Err(PartsTableError::OutOfRange {
                        line,
                        part,
                        num_parts,
                    });
                }
                parts.insert(part.saturating_sub(1));
            }
            rows.push(parts);
        }
        Ok(Self { rows })
    }

    /// Build a table directly from 0-based part sets.
    pub const fn from_rows(rows: Vec<BTreeSet<usize>>) -> Self {
        Self { rows }
    }

    /// 0-based extra parts for `product`, if the table has a row for it.
    pub fn parts(&self, product: usize) -> Option<&BTreeSet<usize>> {
        self.rows.get(product)
    }

    /// Number of product rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail unless there is a row for every configured product.
    ///
    /// # Errors
    ///
    /// Returns [`PartsTableError::TooFewProducts`] when rows are missing.
    pub fn ensure_covers(&self, num_products: usize) -> Result<(), PartsTableError> {
        if self.rows.len() < num_products {
            return Err(PartsTableError::TooFewProducts {
                expected: num_products,
                found: self.rows.len(),
            });
        }
        Ok(())
    }
}
