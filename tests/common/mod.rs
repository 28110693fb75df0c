#![allow(dead_code)]

use async_trait::async_trait;
use company_catalog::{
    ChangeInfo, Company, CompanyRepository, InsertOutcome, MemoryRepository, RepositoryError, Zipcode,
};
use std::sync::Mutex;

/// Wraps a [`MemoryRepository`], records merge calls and can fail merges
/// for chosen names.
#[derive(Default)]
pub struct RecordingRepository {
    pub inner: MemoryRepository,
    pub merges: Mutex<Vec<Company>>,
    pub lookups: Mutex<usize>,
    pub fail_merge_for: Vec<String>,
}

impl RecordingRepository {
    pub fn failing_merges_for(names: &[&str]) -> Self {
        Self {
            fail_merge_for: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn merges(&self) -> Vec<Company> {
        self.merges.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl CompanyRepository for RecordingRepository {
    async fn find_all(&self) -> Result<Vec<Company>, RepositoryError> {
        self.inner.find_all().await
    }

    async fn find_by_name_and_zip(
        &self,
        name: &str,
        zipcode: Zipcode,
    ) -> Result<Option<Company>, RepositoryError> {
        *self.lookups.lock().unwrap() += 1;
        self.inner.find_by_name_and_zip(name, zipcode).await
    }

    async fn exists_or_insert(&self, company: Company) -> Result<InsertOutcome, RepositoryError> {
        self.inner.exists_or_insert(company).await
    }

    async fn update_website_by_name_or_zip(
        &self,
        company: &Company,
    ) -> Result<ChangeInfo, RepositoryError> {
        self.merges.lock().unwrap().push(company.clone());
        if self.fail_merge_for.contains(&company.name) {
            return Err(RepositoryError::backend("mock error"));
        }
        self.inner.update_website_by_name_or_zip(company).await
    }
}

pub fn zip(token: &str) -> Zipcode {
    Zipcode::parse(token).unwrap()
}
