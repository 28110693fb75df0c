//! Business rules for company records.

use crate::company::{bootstrap_row, merge_row, Company, Zipcode};
use crate::io::reader_from_path;
use crate::parser::{for_each_row, IngestSummary};
use crate::repository::{CompanyRepository, InsertOutcome};
use crate::{CatalogError, CatalogResult};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Operations the HTTP layer and the startup path rely on.
#[async_trait]
pub trait CompanyService: Send + Sync {
    async fn list_all(&self) -> CatalogResult<Vec<Company>>;

    /// Zipcode is validated before storage is consulted.
    async fn find_by_name_and_zip(&self, name: &str, zipcode: &str) -> CatalogResult<Company>;

    /// Insert unless an equivalent company exists; duplicates are not errors.
    async fn add(&self, company: Company) -> CatalogResult<()>;

    /// Load `[name, zipcode]` rows from a local file.
    async fn bootstrap(
        &self,
        path: &Path,
        charset: &'static encoding_rs::Encoding,
    ) -> CatalogResult<IngestSummary>;

    /// Attach websites from `[name, zipcode, website]` rows.
    async fn merge_websites(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> CatalogResult<IngestSummary>;
}

pub struct CatalogService {
    repository: Arc<dyn CompanyRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CompanyRepository>) -> Self {
        Self { repository }
    }

    async fn add_fields(&self, fields: Vec<String>) -> CatalogResult<()> {
        self.add(bootstrap_row(&fields)?).await
    }

    async fn merge_fields(&self, fields: Vec<String>) -> CatalogResult<()> {
        let company = merge_row(&fields)?;
        let info = self.repository.update_website_by_name_or_zip(&company).await?;
        if info.matched == 0 {
            tracing::info!(name = %company.name, zipcode = %company.zipcode, "no company to update");
        } else {
            tracing::debug!(
                name = %company.name,
                zipcode = %company.zipcode,
                matched = info.matched,
                modified = info.modified,
                "website merged"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl CompanyService for CatalogService {
    async fn list_all(&self) -> CatalogResult<Vec<Company>> {
        Ok(self.repository.find_all().await?)
    }

    async fn find_by_name_and_zip(&self, name: &str, zipcode: &str) -> CatalogResult<Company> {
        let zipcode = Zipcode::parse(zipcode)?;
        self.repository
            .find_by_name_and_zip(name, zipcode)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    async fn add(&self, company: Company) -> CatalogResult<()> {
        if self.repository.exists_or_insert(company.clone()).await? == InsertOutcome::AlreadyPresent {
            tracing::debug!(name = %company.name, zipcode = %company.zipcode, "company already stored");
        }
        Ok(())
    }

    async fn bootstrap(
        &self,
        path: &Path,
        charset: &'static encoding_rs::Encoding,
    ) -> CatalogResult<IngestSummary> {
        tracing::info!(path = %path.display(), "bootstrapping companies");
        let reader = reader_from_path(path, charset).await?;
        let summary = for_each_row(reader, move |fields| self.add_fields(fields)).await?;
        tracing::info!(
            rows = summary.row_count,
            rejected = summary.rejected,
            "bootstrap finished"
        );
        Ok(summary)
    }

    async fn merge_websites(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> CatalogResult<IngestSummary> {
        tracing::debug!("merging websites");
        for_each_row(reader, move |fields| self.merge_fields(fields)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use crate::repository::{ChangeInfo, RepositoryError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Storage that fails every call and counts them.
    #[derive(Default)]
    struct Broken {
        calls: AtomicUsize,
    }

    impl Broken {
        fn fail<T>(&self) -> Result<T, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::backend("mock error"))
        }
    }

    #[async_trait]
    impl CompanyRepository for Broken {
        async fn find_all(&self) -> Result<Vec<Company>, RepositoryError> {
            self.fail()
        }
        async fn find_by_name_and_zip(&self, _: &str, _: Zipcode) -> Result<Option<Company>, RepositoryError> {
            self.fail()
        }
        async fn exists_or_insert(&self, _: Company) -> Result<InsertOutcome, RepositoryError> {
            self.fail()
        }
        async fn update_website_by_name_or_zip(&self, _: &Company) -> Result<ChangeInfo, RepositoryError> {
            self.fail()
        }
    }

    fn memory_service() -> (Arc<MemoryRepository>, CatalogService) {
        let repo = Arc::new(MemoryRepository::new());
        (repo.clone(), CatalogService::new(repo))
    }

    #[tokio::test]
    async fn invalid_zipcode_never_reaches_storage() {
        let repo = Arc::new(Broken::default());
        let service = CatalogService::new(repo.clone());
        let err = service.find_by_name_and_zip("x", "abc").await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_company_is_not_found() {
        let (_, service) = memory_service();
        let err = service.find_by_name_and_zip("x", "12345").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound));
    }

    #[tokio::test]
    async fn storage_failures_surface() {
        let service = CatalogService::new(Arc::new(Broken::default()));
        assert!(matches!(service.list_all().await, Err(CatalogError::Storage(_))));
        assert!(matches!(
            service.find_by_name_and_zip("x", "12345").await,
            Err(CatalogError::Storage(_))
        ));
        assert!(matches!(
            service.add(Company::new("x", Zipcode::default())).await,
            Err(CatalogError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn add_twice_stores_once() -> anyhow::Result<()> {
        let (repo, service) = memory_service();
        let acme = Company::new("acme", Zipcode::parse("12345")?);
        service.add(acme.clone()).await?;
        service.add(acme).await?;
        assert_eq!(repo.count()?, 1);

        service.add(Company::new("acme inc", Zipcode::parse("12345")?)).await?;
        assert_eq!(repo.count()?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn merge_skips_bad_rows() -> anyhow::Result<()> {
        let (repo, service) = memory_service();
        service.add(Company::new("a", Zipcode::parse("12345")?)).await?;

        let mut input: &[u8] = b"a,1234,http://short\nb,12345,http://x\nc,abcde,http://y\n";
        let summary = service.merge_websites(&mut input).await?;
        assert_eq!((summary.row_count, summary.accepted, summary.rejected), (3, 1, 2));

        let stored = repo.find_all().await?;
        assert_eq!(stored[0].website.as_deref(), Some("http://x"));
        Ok(())
    }

    #[tokio::test]
    async fn merge_survives_storage_errors() -> anyhow::Result<()> {
        let repo = Arc::new(Broken::default());
        let service = CatalogService::new(repo.clone());
        let mut input: &[u8] = b"a;12345;http://x\nb;54321;http://y\n";
        let summary = service.merge_websites(&mut input).await?;
        assert_eq!(summary.rejected, 2);
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
