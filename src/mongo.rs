//! MongoDB adapter (feature `mongo`).
//!
//! Companies live in the `Company` collection with a text index on `name`.

use crate::company::{Company, Zipcode};
use crate::repository::{ChangeInfo, CompanyRepository, InsertOutcome, RepositoryError};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

const COLLECTION: &str = "Company";

/// Stored shape; the domain type keeps ids as plain strings.
#[derive(Debug, Serialize, Deserialize)]
struct CompanyDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    zipcode: Zipcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    website: Option<String>,
}

impl From<CompanyDocument> for Company {
    fn from(document: CompanyDocument) -> Self {
        Company {
            id: document.id.map(|oid| oid.to_hex()),
            name: document.name,
            zipcode: document.zipcode,
            website: document.website,
        }
    }
}

impl From<&Company> for CompanyDocument {
    fn from(company: &Company) -> Self {
        CompanyDocument {
            id: None,
            name: company.name.clone(),
            zipcode: company.zipcode,
            website: company.website.clone(),
        }
    }
}

fn backend(err: mongodb::error::Error) -> RepositoryError {
    RepositoryError::backend(err.to_string())
}

fn name_and_zip(name: &str, zipcode: Zipcode) -> Document {
    doc! { "$and": [
        { "$text": { "$search": name } },
        { "zipcode": zipcode.get() },
    ] }
}

fn exact_key(name: &str, zipcode: Zipcode) -> Document {
    doc! { "name": name, "zipcode": zipcode.get() }
}

fn name_or_zip(name: &str, zipcode: Zipcode) -> Document {
    doc! { "$or": [
        { "name": name },
        { "zipcode": zipcode.get() },
    ] }
}

pub struct MongoRepository {
    companies: Collection<CompanyDocument>,
}

impl MongoRepository {
    /// Connect and make sure the `name` text index exists.
    pub async fn connect(url: &str, database: &str) -> Result<Self, RepositoryError> {
        tracing::info!(database, "opening database connection");
        let client = Client::with_uri_str(url)
            .await
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        let companies = client.database(database).collection::<CompanyDocument>(COLLECTION);
        companies
            .create_index(IndexModel::builder().keys(doc! { "name": "text" }).build(), None)
            .await
            .map_err(backend)?;
        Ok(Self { companies })
    }
}

#[async_trait]
impl CompanyRepository for MongoRepository {
    async fn find_all(&self) -> Result<Vec<Company>, RepositoryError> {
        let cursor = self.companies.find(None, None).await.map_err(backend)?;
        let documents: Vec<CompanyDocument> = cursor.try_collect().await.map_err(backend)?;
        Ok(documents.into_iter().map(Company::from).collect())
    }

    async fn find_by_name_and_zip(
        &self,
        name: &str,
        zipcode: Zipcode,
    ) -> Result<Option<Company>, RepositoryError> {
        let found = self
            .companies
            .find_one(name_and_zip(name, zipcode), None)
            .await
            .map_err(backend)?;
        Ok(found.map(Company::from))
    }

    async fn exists_or_insert(&self, company: Company) -> Result<InsertOutcome, RepositoryError> {
        let count = self
            .companies
            .count_documents(exact_key(&company.name, company.zipcode), None)
            .await
            .map_err(backend)?;
        if count > 0 {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.companies
            .insert_one(CompanyDocument::from(&company), None)
            .await
            .map_err(backend)?;
        Ok(InsertOutcome::Inserted)
    }

    async fn update_website_by_name_or_zip(
        &self,
        company: &Company,
    ) -> Result<ChangeInfo, RepositoryError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let previous = self
            .companies
            .find_one_and_update(
                name_or_zip(&company.name, company.zipcode),
                doc! { "$set": { "website": company.website.as_deref() } },
                options,
            )
            .await
            .map_err(backend)?;
        Ok(match previous {
            None => ChangeInfo::default(),
            Some(before) => ChangeInfo {
                matched: 1,
                modified: u64::from(before.website != company.website),
            },
        })
    }
}
