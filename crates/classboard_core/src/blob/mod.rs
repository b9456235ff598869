//! Blob storage for item documents.
//!
//! # Responsibility
//! - Define the object-store collaborator contract (`ObjectStore`).
//! - Provide the gateway that derives keys, issues upload grants and maps
//!   public URLs back to keys.
//!
//! # Invariants
//! - Keys live under a fixed namespace prefix (`documents/` by default).
//! - Deleting an absent key is indistinguishable from success.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod gateway;
pub mod local;

pub use gateway::{file_extension, BlobGateway};
pub use local::LocalObjectStore;

pub type BlobResult<T> = Result<T, BlobError>;

/// Default lifetime of an upload grant.
pub const DEFAULT_UPLOAD_TTL_SECS: u64 = 3600;
/// Longest lifetime an upload grant may have (7 days).
pub const MAX_UPLOAD_TTL_SECS: u64 = 7 * 24 * 3600;
/// Key prefix for item documents.
pub const DOCUMENTS_NAMESPACE: &str = "documents";

/// Why an upload grant was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantRejection {
    /// URL does not point at this store.
    ForeignUrl,
    /// Expiry or signature parameter missing or malformed.
    Malformed(&'static str),
    Expired,
    SignatureMismatch,
}

impl Display for GrantRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignUrl => write!(f, "url does not belong to this store"),
            Self::Malformed(what) => write!(f, "malformed grant: {what}"),
            Self::Expired => write!(f, "grant expired"),
            Self::SignatureMismatch => write!(f, "grant signature mismatch"),
        }
    }
}

/// Object store failure.
#[derive(Debug)]
pub enum BlobError {
    /// Key is empty, absolute or escapes the store root.
    InvalidKey(String),
    /// Requested grant lifetime outside `1..=MAX_UPLOAD_TTL_SECS`.
    InvalidTtl(u64),
    /// Gateway configuration cannot be turned into a URL template.
    InvalidConfig(String),
    InvalidGrant(GrantRejection),
    Io {
        key: String,
        source: std::io::Error,
    },
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid object key `{key}`"),
            Self::InvalidTtl(ttl) => write!(
                f,
                "upload ttl {ttl}s outside 1..={MAX_UPLOAD_TTL_SECS}s"
            ),
            Self::InvalidConfig(message) => write!(f, "invalid blob configuration: {message}"),
            Self::InvalidGrant(reason) => write!(f, "upload refused: {reason}"),
            Self::Io { key, source } => write!(f, "object `{key}`: {source}"),
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Time-limited upload grant plus the permanent location of the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGrant {
    /// Signed URL accepting one upload until it expires.
    pub upload_url: String,
    /// Unsigned retrieval URL stored on the item.
    pub public_url: String,
    pub key: String,
    pub expires_in_secs: u64,
}

/// Object-store collaborator used by the gateway.
pub trait ObjectStore {
    /// Returns a URL permitting a `PUT` of `key` with `content_type` for `ttl`.
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> BlobResult<String>;

    /// Removes `key`; an absent key is not an error.
    fn delete_object(&self, key: &str) -> BlobResult<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> BlobResult<String> {
        (**self).presign_put(key, content_type, ttl)
    }

    fn delete_object(&self, key: &str) -> BlobResult<()> {
        (**self).delete_object(key)
    }
}
