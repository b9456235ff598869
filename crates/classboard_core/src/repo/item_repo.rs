//! Item repository with attached-document lifecycle.
//!
//! # Responsibility
//! - Create items for freshly issued upload grants.
//! - Delete items together with their blob.
//!
//! # Invariants
//! - Deletion order is blob first, then record.
//! - A blob failure never blocks the record delete; it is reported in
//!   `DocumentCleanup`.
//! - If the record delete fails after the blob is gone, the record keeps a
//!   dangling document reference.

use crate::blob::{BlobError, BlobGateway, ObjectStore, UploadGrant};
use crate::model::item::Item;
use crate::repo::{RepoError, RepoResult, Repository};
use crate::store::DocumentStore;
use log::{info, warn};

/// What happened to the item's blob during `delete_with_document`.
#[derive(Debug)]
pub enum DocumentCleanup {
    Deleted { key: String },
    /// Neither a stored key nor a recognizable public URL was found.
    NoDocumentKey,
    Failed { key: String, error: BlobError },
}

impl DocumentCleanup {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }
}

/// Outcome of a successful item deletion.
#[derive(Debug)]
pub struct ItemDeletion {
    pub item: Item,
    pub cleanup: DocumentCleanup,
}

pub struct ItemRepository<'g, S, O> {
    items: Repository<Item, S>,
    blobs: &'g BlobGateway<O>,
}

impl<'g, S: DocumentStore, O: ObjectStore> ItemRepository<'g, S, O> {
    pub fn new(items: Repository<Item, S>, blobs: &'g BlobGateway<O>) -> Self {
        Self { items, blobs }
    }

    /// Plain item CRUD.
    pub fn items(&self) -> &Repository<Item, S> {
        &self.items
    }

    pub fn list_by_board(&self, board_id: &str) -> RepoResult<Vec<Item>> {
        self.items.list_by_board(board_id)
    }

    /// Issues an upload grant and persists an item pointing at it.
    ///
    /// The item stores both the public URL and the issued key.
    pub fn create_with_upload(
        &self,
        board_id: &str,
        x: f64,
        y: f64,
        file_name: &str,
        content_type: &str,
    ) -> RepoResult<(Item, UploadGrant)> {
        let grant = self.blobs.issue_upload(file_name, content_type, None)?;
        let item = self.items.create(&Item::from_upload(board_id, x, y, &grant))?;
        Ok((item, grant))
    }

    /// Deletes the item's blob, then the item record.
    ///
    /// # Errors
    /// - `NotFound` when the item does not exist; nothing is deleted.
    /// - Store failures from reading or deleting the record.
    pub fn delete_with_document(&self, id: &str) -> RepoResult<ItemDeletion> {
        let item = self.items.get(id)?.ok_or_else(|| RepoError::NotFound {
            collection: self.items.collection().to_string(),
            id: id.to_string(),
        })?;

        // A stored key only counts while it still names `document`.
        let key = item
            .document_key
            .clone()
            .filter(|key| !key.trim().is_empty() && self.blobs.public_url(key) == item.document)
            .or_else(|| self.blobs.key_from_url(&item.document));

        let cleanup = match key {
            None => {
                warn!("event=item_delete module=repo status=no_document_key id={id}");
                DocumentCleanup::NoDocumentKey
            }
            Some(key) => match self.blobs.delete(&key) {
                Ok(()) => DocumentCleanup::Deleted { key },
                Err(error) => {
                    warn!(
                        "event=item_delete module=repo status=blob_error id={id} key={key} error={error}"
                    );
                    DocumentCleanup::Failed { key, error }
                }
            },
        };

        self.items.delete(id)?;
        info!(
            "event=item_delete module=repo status=ok id={id} blob_deleted={}",
            cleanup.is_deleted()
        );
        Ok(ItemDeletion { item, cleanup })
    }
}
