//! Blob storage gateway.
//!
//! # Responsibility
//! - Derive fresh object keys `<namespace>/<uuid>[.<ext>]`.
//! - Issue upload grants whose signed and public URLs share the same key.
//! - Map public URLs back to keys, and delete by key or URL.
//!
//! # Invariants
//! - Public URLs are `<public_base_url>/<key>`, deterministic in the key.
//! - A URL outside the base/namespace template yields no key and no delete.

use crate::blob::{
    BlobError, BlobResult, ObjectStore, UploadGrant, DEFAULT_UPLOAD_TTL_SECS, DOCUMENTS_NAMESPACE,
    MAX_UPLOAD_TTL_SECS,
};
use crate::config::CoreConfig;
use log::{debug, info};
use regex::Regex;
use std::time::Duration;
use uuid::Uuid;

pub struct BlobGateway<O> {
    store: O,
    namespace: String,
    public_base_url: String,
    public_url_pattern: Regex,
    default_ttl_secs: u64,
}

impl<O: ObjectStore> BlobGateway<O> {
    /// Builds a gateway for the `documents/` namespace.
    ///
    /// # Errors
    /// - `InvalidConfig` when `public_base_url` is empty.
    pub fn new(store: O, public_base_url: &str) -> BlobResult<Self> {
        Self::with_namespace(store, public_base_url, DOCUMENTS_NAMESPACE)
    }

    pub fn with_namespace(store: O, public_base_url: &str, namespace: &str) -> BlobResult<Self> {
        let base = public_base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(BlobError::InvalidConfig(
                "public base url must not be empty".to_string(),
            ));
        }
        let namespace = namespace.trim().trim_matches('/');
        if namespace.is_empty() {
            return Err(BlobError::InvalidConfig(
                "namespace must not be empty".to_string(),
            ));
        }

        let pattern = format!(
            r"^{}/({}/[^?#]+)(?:[?#].*)?$",
            regex::escape(base),
            regex::escape(namespace)
        );
        let public_url_pattern =
            Regex::new(&pattern).map_err(|err| BlobError::InvalidConfig(err.to_string()))?;

        Ok(Self {
            store,
            namespace: namespace.to_string(),
            public_base_url: base.to_string(),
            public_url_pattern,
            default_ttl_secs: DEFAULT_UPLOAD_TTL_SECS,
        })
    }

    /// Builds a gateway from the documents settings of `config`.
    pub fn from_config(store: O, config: &CoreConfig) -> BlobResult<Self> {
        let mut gateway = Self::new(store, &config.documents.public_base_url)?;
        gateway.default_ttl_secs = config.documents.upload_ttl_secs;
        Ok(gateway)
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    /// Generates a fresh key, keeping the file's extension when usable.
    pub fn new_object_key(&self, file_name: &str) -> String {
        let token = Uuid::new_v4();
        match file_extension(file_name) {
            Some(ext) => format!("{}/{token}.{ext}", self.namespace),
            None => format!("{}/{token}", self.namespace),
        }
    }

    /// Permanent retrieval URL for `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    /// Issues an upload grant for a new object.
    ///
    /// `ttl_secs = None` uses the configured default (3600 unless overridden).
    ///
    /// # Errors
    /// - `InvalidTtl` when the lifetime is zero or above 7 days.
    /// - Any error of the underlying `ObjectStore::presign_put`.
    pub fn issue_upload(
        &self,
        file_name: &str,
        content_type: &str,
        ttl_secs: Option<u64>,
    ) -> BlobResult<UploadGrant> {
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        if ttl == 0 || ttl > MAX_UPLOAD_TTL_SECS {
            return Err(BlobError::InvalidTtl(ttl));
        }

        let key = self.new_object_key(file_name);
        let upload_url = self
            .store
            .presign_put(&key, content_type, Duration::from_secs(ttl))?;
        info!("event=upload_grant module=blob status=ok key={key} ttl_secs={ttl}");

        Ok(UploadGrant {
            upload_url,
            public_url: self.public_url(&key),
            key,
            expires_in_secs: ttl,
        })
    }

    /// Recovers the object key from a public URL of this gateway.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        self.public_url_pattern
            .captures(url.trim())
            .and_then(|captures| captures.get(1))
            .map(|key| key.as_str().to_string())
    }

    pub fn delete(&self, key: &str) -> BlobResult<()> {
        self.store.delete_object(key)?;
        info!("event=blob_delete module=blob status=ok key={key}");
        Ok(())
    }

    /// Deletes the object behind `url`.
    ///
    /// Returns `Ok(None)` without deleting when the URL does not match the
    /// public URL template, `Ok(Some(key))` after a delete.
    pub fn delete_by_url(&self, url: &str) -> BlobResult<Option<String>> {
        let Some(key) = self.key_from_url(url) else {
            debug!("event=blob_delete module=blob status=skipped reason=unrecognized_url");
            return Ok(None);
        };
        self.delete(&key)?;
        Ok(Some(key))
    }
}

/// Extension kept on generated keys: text after the last `.`, if non-empty
/// and ASCII alphanumeric.
pub fn file_extension(file_name: &str) -> Option<&str> {
    let (_, ext) = file_name.trim().rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::{file_extension, BlobGateway};
    use crate::blob::{BlobError, BlobResult, ObjectStore};
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingStore {
        deleted: RefCell<Vec<String>>,
    }

    impl ObjectStore for RecordingStore {
        fn presign_put(&self, key: &str, _content_type: &str, ttl: Duration) -> BlobResult<String> {
            Ok(format!(
                "https://uploads.test/{key}?expires={}",
                ttl.as_secs()
            ))
        }

        fn delete_object(&self, key: &str) -> BlobResult<()> {
            self.deleted.borrow_mut().push(key.to_string());
            Ok(())
        }
    }

    fn gateway() -> BlobGateway<RecordingStore> {
        BlobGateway::new(
            RecordingStore::default(),
            "https://docs-bucket.s3.amazonaws.com/",
        )
        .unwrap()
    }

    #[test]
    fn extension_rules() {
        assert_eq!(file_extension("photo.png"), Some("png"));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("odd.p/ng"), None);
    }

    #[test]
    fn key_without_extension_has_no_dot_segment() {
        let key = gateway().new_object_key("Makefile");
        let token = key.strip_prefix("documents/").unwrap();
        assert_eq!(token.len(), 36);
        assert!(!token.contains('.'));
    }

    #[test]
    fn key_from_url_strips_query_and_rejects_foreign_hosts() {
        let gateway = gateway();
        assert_eq!(
            gateway
                .key_from_url("https://docs-bucket.s3.amazonaws.com/documents/abc.pdf?x=1")
                .as_deref(),
            Some("documents/abc.pdf")
        );
        assert!(gateway
            .key_from_url("https://other-bucket.s3.amazonaws.com/documents/abc.pdf")
            .is_none());
        assert!(gateway
            .key_from_url("https://docs-bucket.s3.amazonaws.com/avatars/abc.pdf")
            .is_none());
        assert!(gateway
            .key_from_url("https://docs-bucket.s3.amazonaws.com/documents/")
            .is_none());
    }

    #[test]
    fn delete_by_url_skips_unrecognized_urls() {
        let gateway = gateway();
        assert_eq!(gateway.delete_by_url("not a url").unwrap(), None);
        assert!(gateway.store().deleted.borrow().is_empty());

        let deleted = gateway
            .delete_by_url("https://docs-bucket.s3.amazonaws.com/documents/k.txt")
            .unwrap();
        assert_eq!(deleted.as_deref(), Some("documents/k.txt"));
        assert_eq!(*gateway.store().deleted.borrow(), vec!["documents/k.txt"]);
    }

    #[test]
    fn ttl_bounds_are_enforced() {
        let gateway = gateway();
        assert!(matches!(
            gateway.issue_upload("a.png", "image/png", Some(0)),
            Err(BlobError::InvalidTtl(0))
        ));
        let grant = gateway.issue_upload("a.png", "image/png", None).unwrap();
        assert_eq!(grant.expires_in_secs, 3600);
        assert!(grant.upload_url.ends_with("expires=3600"));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            BlobGateway::new(RecordingStore::default(), "  "),
            Err(BlobError::InvalidConfig(_))
        ));
    }
}
