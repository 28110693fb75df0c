//! Company catalog: CSV-fed company records served over HTTP.
//!
//! - Ingestion: delimiter sniffing (`;` vs `,`), strict row parsing, per-row
//!   skip policy. Bootstrap files may be gzip/zstd and non-UTF-8.
//! - Service: zipcode validation, insert-if-absent, website merge by name OR zipcode.
//! - Storage: [`CompanyRepository`] port with an in-memory adapter and an
//!   optional MongoDB adapter (feature `mongo`).
//!
//! Data shape:
//! - `Company { id, name, zipcode, website }`
//! - Rows reach handlers as `Vec<String>` (no header row)
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
pub mod company;
pub mod config;
mod io;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod parser;
pub mod repository;
pub mod routes;
pub mod server;
pub mod service;

pub use crate::company::{bootstrap_row, merge_row, Company, ValidationError, Zipcode};
pub use crate::config::{Config, StorageBackend};
pub use crate::io::{build_csv_reader, reader_from_path, CsvMeta};
pub use crate::memory::MemoryRepository;
#[cfg(feature = "mongo")]
pub use crate::mongo::MongoRepository;
pub use crate::parser::{detect_delimiter, for_each_row, Delimiter, IngestSummary, RowReader};
pub use crate::repository::{ChangeInfo, CompanyRepository, InsertOutcome, RepositoryError};
pub use crate::server::{build_router, start_server, AppState};
pub use crate::service::{CatalogService, CompanyService};

use thiserror::Error;

/// Error type returned by the catalog core.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("company not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] RepositoryError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

impl CatalogError {
    /// True for failures of the input stream itself (unreadable or malformed).
    pub fn is_stream(&self) -> bool {
        matches!(self, CatalogError::Io(_) | CatalogError::Csv(_))
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
