//! Core use-case services.
//!
//! # Responsibility
//! - Wrap repositories with caller-facing rules (empty change sets,
//!   credential hashing, merged-state validation).
//! - Keep callers decoupled from storage details.

use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity_service;

pub use entity_service::EntityService;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    /// Update request carried no mutable field.
    NoFieldsToUpdate,
    /// Change value has the wrong shape for its field.
    InvalidChange(String),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoFieldsToUpdate => write!(f, "No fields to update"),
            Self::InvalidChange(message) => write!(f, "invalid change: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NoFieldsToUpdate | Self::InvalidChange(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}
