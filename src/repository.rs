//! Persistence port for company records.
//!
//! Adapters map their failures into [`RepositoryError`] so the service
//! never sees driver types.

use crate::company::{Company, Zipcode};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn backend(message: impl Into<String>) -> Self {
        RepositoryError::Backend(message.into())
    }
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// What a website merge touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeInfo {
    pub matched: u64,
    pub modified: u64,
}

/// Storage operations the catalog needs.
///
/// Lookups match a name text search AND the zipcode. Duplicate checks use
/// the exact `(name, zipcode)` key. Website merges match on name OR zipcode.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Company>, RepositoryError>;

    /// Text search on `name` combined with an exact zipcode.
    async fn find_by_name_and_zip(
        &self,
        name: &str,
        zipcode: Zipcode,
    ) -> Result<Option<Company>, RepositoryError>;

    /// Insert unless a company with exactly this name and zipcode is stored.
    async fn exists_or_insert(&self, company: Company) -> Result<InsertOutcome, RepositoryError>;

    /// Set `company.website` on the first record whose name equals
    /// `company.name` or whose zipcode equals `company.zipcode`.
    async fn update_website_by_name_or_zip(
        &self,
        company: &Company,
    ) -> Result<ChangeInfo, RepositoryError>;
}

/// Case-insensitive word match, the way a text index treats `name`.
pub(crate) fn text_matches(stored: &str, query: &str) -> bool {
    let stored: Vec<String> = stored.split_whitespace().map(str::to_lowercase).collect();
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|word| stored.contains(&word))
}
