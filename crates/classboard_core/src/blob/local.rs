//! Filesystem object store with signed upload URLs.
//!
//! # Responsibility
//! - Store objects as files below a root directory.
//! - Issue `PUT` URLs signed with a BLAKE3 keyed hash and honour them.
//!
//! # Invariants
//! - A grant binds key, content type and expiry; changing any of them
//!   invalidates the signature.
//! - Keys never resolve outside the root directory.

use crate::blob::{BlobError, BlobResult, GrantRejection, ObjectStore};
use chrono::Utc;
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const SIGNING_CONTEXT: &str = "classboard 2026-01-01 upload grant v1";
const EXPIRES_PARAM: &str = "X-Expires";
const SIGNATURE_PARAM: &str = "X-Signature";

pub struct LocalObjectStore {
    root: PathBuf,
    endpoint: String,
    signing_key: [u8; 32],
}

impl LocalObjectStore {
    /// Creates a store rooted at `root`; upload URLs start with `endpoint`.
    pub fn new(root: impl Into<PathBuf>, endpoint: &str, secret: &[u8]) -> Self {
        Self {
            root: root.into(),
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            signing_key: blake3::derive_key(SIGNING_CONTEXT, secret),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the signed upload URL for `key` valid until `expires_at`
    /// (unix seconds).
    pub fn sign_upload_url(&self, key: &str, content_type: &str, expires_at: i64) -> String {
        let signature = self.signature(key, content_type, expires_at);
        format!(
            "{}/{key}?{EXPIRES_PARAM}={expires_at}&{SIGNATURE_PARAM}={}",
            self.endpoint,
            signature.to_hex()
        )
    }

    /// Accepts an upload performed against a signed URL.
    ///
    /// # Errors
    /// - `InvalidGrant` for foreign, malformed, expired or tampered URLs, or
    ///   a content type other than the signed one.
    /// - `InvalidKey`/`Io` when the object cannot be written.
    pub fn accept_upload(&self, upload_url: &str, content_type: &str, bytes: &[u8]) -> BlobResult<String> {
        let (key, expires_at, signature) = self.parse_upload_url(upload_url)?;

        if Utc::now().timestamp() > expires_at {
            warn!("event=blob_upload module=blob status=rejected reason=expired key={key}");
            return Err(BlobError::InvalidGrant(GrantRejection::Expired));
        }
        // `Hash` equality is constant time.
        if self.signature(&key, content_type, expires_at) != signature {
            warn!("event=blob_upload module=blob status=rejected reason=signature key={key}");
            return Err(BlobError::InvalidGrant(GrantRejection::SignatureMismatch));
        }

        let path = self.object_path(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(&key, source))?;
        }
        fs::write(&path, bytes).map_err(|source| io_error(&key, source))?;
        info!(
            "event=blob_upload module=blob status=ok key={key} bytes={}",
            bytes.len()
        );
        Ok(key)
    }

    pub fn exists(&self, key: &str) -> BlobResult<bool> {
        Ok(self.object_path(key)?.is_file())
    }

    pub fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.object_path(key)?;
        fs::read(path).map_err(|source| io_error(key, source))
    }

    /// Resolves `key` below the root, rejecting absolute or escaping keys.
    pub fn object_path(&self, key: &str) -> BlobResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn signature(&self, key: &str, content_type: &str, expires_at: i64) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.signing_key);
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
        hasher.update(content_type.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires_at.to_string().as_bytes());
        hasher.finalize()
    }

    fn parse_upload_url(&self, upload_url: &str) -> BlobResult<(String, i64, blake3::Hash)> {
        let rest = upload_url
            .strip_prefix(self.endpoint.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or(BlobError::InvalidGrant(GrantRejection::ForeignUrl))?;
        let (key, query) = rest
            .split_once('?')
            .ok_or(BlobError::InvalidGrant(GrantRejection::Malformed("query")))?;

        let mut expires_at = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some((EXPIRES_PARAM, value)) => expires_at = value.parse::<i64>().ok(),
                Some((SIGNATURE_PARAM, value)) => signature = blake3::Hash::from_hex(value).ok(),
                _ => {}
            }
        }

        let expires_at =
            expires_at.ok_or(BlobError::InvalidGrant(GrantRejection::Malformed(EXPIRES_PARAM)))?;
        let signature =
            signature.ok_or(BlobError::InvalidGrant(GrantRejection::Malformed(SIGNATURE_PARAM)))?;
        Ok((key.to_string(), expires_at, signature))
    }
}

impl ObjectStore for LocalObjectStore {
    fn presign_put(&self, key: &str, content_type: &str, ttl: Duration) -> BlobResult<String> {
        self.object_path(key)?;
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);
        Ok(self.sign_upload_url(key, content_type, expires_at))
    }

    fn delete_object(&self, key: &str) -> BlobResult<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("event=blob_delete module=blob status=absent key={key}");
                Ok(())
            }
            Err(source) => Err(io_error(key, source)),
        }
    }
}

fn io_error(key: &str, source: std::io::Error) -> BlobError {
    BlobError::Io {
        key: key.to_string(),
        source,
    }
}
