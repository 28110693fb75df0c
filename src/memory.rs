//! In-process document store. Default backend and test double.

use crate::company::{Company, Zipcode};
use crate::repository::{text_matches, ChangeInfo, CompanyRepository, InsertOutcome, RepositoryError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryRepository {
    companies: RwLock<Vec<Company>>,
    next_id: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored companies.
    pub fn count(&self) -> Result<usize, RepositoryError> {
        self.companies
            .read()
            .map(|guard| guard.len())
            .map_err(|_| RepositoryError::backend("poisoned lock"))
    }

    // ObjectId-sized hex ids
    fn assign_id(&self) -> String {
        format!("{:024x}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

fn text_key(stored: &Company, name: &str, zipcode: Zipcode) -> bool {
    stored.zipcode == zipcode && text_matches(&stored.name, name)
}

fn exact_key(stored: &Company, company: &Company) -> bool {
    stored.zipcode == company.zipcode && stored.name == company.name
}

#[async_trait]
impl CompanyRepository for MemoryRepository {
    async fn find_all(&self) -> Result<Vec<Company>, RepositoryError> {
        let guard = self
            .companies
            .read()
            .map_err(|_| RepositoryError::backend("poisoned lock"))?;
        Ok(guard.clone())
    }

    async fn find_by_name_and_zip(
        &self,
        name: &str,
        zipcode: Zipcode,
    ) -> Result<Option<Company>, RepositoryError> {
        let guard = self
            .companies
            .read()
            .map_err(|_| RepositoryError::backend("poisoned lock"))?;
        Ok(guard.iter().find(|c| text_key(c, name, zipcode)).cloned())
    }

    async fn exists_or_insert(&self, mut company: Company) -> Result<InsertOutcome, RepositoryError> {
        let mut guard = self
            .companies
            .write()
            .map_err(|_| RepositoryError::backend("poisoned lock"))?;
        if guard.iter().any(|c| exact_key(c, &company)) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        company.id = Some(self.assign_id());
        guard.push(company);
        Ok(InsertOutcome::Inserted)
    }

    async fn update_website_by_name_or_zip(
        &self,
        company: &Company,
    ) -> Result<ChangeInfo, RepositoryError> {
        let mut guard = self
            .companies
            .write()
            .map_err(|_| RepositoryError::backend("poisoned lock"))?;
        let Some(stored) = guard
            .iter_mut()
            .find(|c| c.name == company.name || c.zipcode == company.zipcode)
        else {
            return Ok(ChangeInfo::default());
        };
        let modified = stored.website != company.website;
        stored.website = company.website.clone();
        Ok(ChangeInfo {
            matched: 1,
            modified: u64::from(modified),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip(token: &str) -> Zipcode {
        Zipcode::parse(token).unwrap()
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_key() -> anyhow::Result<()> {
        let repo = MemoryRepository::new();
        let acme = Company::new("acme", zip("12345"));
        assert_eq!(repo.exists_or_insert(acme.clone()).await?, InsertOutcome::Inserted);
        assert_eq!(repo.exists_or_insert(acme).await?, InsertOutcome::AlreadyPresent);
        assert_eq!(
            repo.exists_or_insert(Company::new("acme", zip("54321"))).await?,
            InsertOutcome::Inserted
        );
        assert_eq!(repo.count()?, 2);

        let all = repo.find_all().await?;
        assert!(all.iter().all(|c| c.id.as_deref().is_some_and(|id| id.len() == 24)));
        assert_ne!(all[0].id, all[1].id);
        Ok(())
    }

    #[tokio::test]
    async fn names_sharing_a_word_are_distinct_companies() -> anyhow::Result<()> {
        let repo = MemoryRepository::new();
        repo.exists_or_insert(Company::new("Acme Inc", zip("12345"))).await?;
        assert_eq!(
            repo.exists_or_insert(Company::new("Beta Inc", zip("12345"))).await?,
            InsertOutcome::Inserted
        );
        let names: Vec<String> = repo.find_all().await?.into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Acme Inc", "Beta Inc"]);
        Ok(())
    }

    #[tokio::test]
    async fn poisoned_lock_is_a_backend_error() {
        let repo = std::sync::Arc::new(MemoryRepository::new());
        let poisoner = repo.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.companies.write().unwrap();
            panic!("poison the store");
        })
        .join();
        assert!(matches!(repo.count(), Err(RepositoryError::Backend(_))));
        assert!(repo.find_all().await.is_err());
    }

    #[tokio::test]
    async fn lookup_needs_name_and_zipcode() -> anyhow::Result<()> {
        let repo = MemoryRepository::new();
        repo.exists_or_insert(Company::new("Acme Corp", zip("12345"))).await?;

        let found = repo.find_by_name_and_zip("acme", zip("12345")).await?;
        assert_eq!(found.map(|c| c.name), Some("Acme Corp".to_string()));
        assert_eq!(repo.find_by_name_and_zip("acme", zip("99999")).await?, None);
        assert_eq!(repo.find_by_name_and_zip("other", zip("12345")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn merge_matches_name_or_zipcode() -> anyhow::Result<()> {
        let repo = MemoryRepository::new();
        repo.exists_or_insert(Company::new("a", zip("11111"))).await?;
        repo.exists_or_insert(Company::new("b", zip("12345"))).await?;

        // zipcode alone is enough
        let info = repo
            .update_website_by_name_or_zip(&Company::new("zzz", zip("12345")).with_website("http://b"))
            .await?;
        assert_eq!(info, ChangeInfo { matched: 1, modified: 1 });

        // name alone is enough
        repo.update_website_by_name_or_zip(&Company::new("a", zip("99999")).with_website("http://a"))
            .await?;

        // neither matches
        let info = repo
            .update_website_by_name_or_zip(&Company::new("c", zip("22222")).with_website("http://c"))
            .await?;
        assert_eq!(info, ChangeInfo::default());

        let sites: Vec<_> = repo.find_all().await?.into_iter().map(|c| c.website).collect();
        assert_eq!(sites, [Some("http://a".to_string()), Some("http://b".to_string())]);
        Ok(())
    }

    #[tokio::test]
    async fn rewriting_the_same_website_is_not_a_modification() -> anyhow::Result<()> {
        let repo = MemoryRepository::new();
        repo.exists_or_insert(Company::new("a", zip("11111"))).await?;
        let update = Company::new("a", zip("11111")).with_website("http://a");
        repo.update_website_by_name_or_zip(&update).await?;
        let info = repo.update_website_by_name_or_zip(&update).await?;
        assert_eq!(info, ChangeInfo { matched: 1, modified: 0 });
        Ok(())
    }
}
