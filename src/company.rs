//! The company record and the row converters that build it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of characters a zipcode token must have.
pub const ZIPCODE_LEN: usize = 5;

/// Client-caused input problems. Never reach storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid zipcode length: expected 5 characters, got {len}")]
    ZipcodeLength { len: usize },
    #[error("zipcode is not numeric")]
    ZipcodeNotNumeric,
    #[error("missing fields: expected at least {expected}, got {found}")]
    MissingFields { expected: usize, found: usize },
    #[error("company name is empty")]
    EmptyName,
}

/// A five-digit zipcode stored as an integer.
///
/// Only [`Zipcode::parse`] produces non-zero values; `Zipcode::default()`
/// is the zero placeholder used by the lenient bootstrap path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zipcode(i64);

impl Zipcode {
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        if token.len() != ZIPCODE_LEN {
            return Err(ValidationError::ZipcodeLength { len: token.len() });
        }
        token
            .parse::<i64>()
            .map(Zipcode)
            .map_err(|_| ValidationError::ZipcodeNotNumeric)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Zipcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

/// Company entity. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub zipcode: Zipcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Company {
    pub fn new(name: impl Into<String>, zipcode: Zipcode) -> Self {
        Self {
            id: None,
            name: name.into(),
            zipcode,
            website: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }
}

fn require_fields(fields: &[String], expected: usize) -> Result<(), ValidationError> {
    if fields.len() < expected {
        return Err(ValidationError::MissingFields {
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn non_empty_name(name: &str) -> Result<&str, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name)
}

/// `[name, zipcode, ..]` from the bootstrap file.
///
/// A malformed zipcode becomes zero instead of rejecting the row.
pub fn bootstrap_row(fields: &[String]) -> Result<Company, ValidationError> {
    require_fields(fields, 2)?;
    let name = non_empty_name(&fields[0])?;
    let zipcode = Zipcode::parse(&fields[1]).unwrap_or_else(|err| {
        tracing::debug!(company = name, zipcode = %fields[1], error = %err, "zipcode falls back to 0");
        Zipcode::default()
    });
    Ok(Company::new(name, zipcode))
}

/// `[name, zipcode, website, ..]` from an uploaded merge file.
pub fn merge_row(fields: &[String]) -> Result<Company, ValidationError> {
    require_fields(fields, 3)?;
    let name = non_empty_name(&fields[0])?;
    let zipcode = Zipcode::parse(&fields[1])?;
    Ok(Company::new(name, zipcode).with_website(fields[2].as_str()))
}
