//! Repository traits for the channel directory stores.
//!
//! These traits define the narrow interfaces the reconciliation engine and
//! services consume, keeping the diff/patch algorithm storage-agnostic and
//! enabling pluggable backends and testability.
//!
//! The backing store offers per-document atomicity only; there are no
//! multi-document transactions. Within one request, property/tag-store
//! writes must be issued before the channel-store writes that reference
//! them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Channel, Property, Tag};

/// Store of channel documents, each carrying embedded property and tag
/// instance lists.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Fetch a channel document by name.
    async fn find_by_id(&self, name: &str) -> Result<Option<Channel>>;

    /// Check whether a channel exists.
    async fn exists_by_id(&self, name: &str) -> Result<bool>;

    /// List every channel document.
    async fn find_all(&self) -> Result<Vec<Channel>>;

    /// Upsert a channel patch with merge-by-name semantics: instances in the
    /// patch replace same-named instances on the stored document, all other
    /// instances survive. Creates the document if absent.
    async fn save(&self, channel: Channel) -> Result<Channel>;

    /// [`ChannelRepository::save`] applied to a pooled batch. Patches to
    /// different channels are independent; there is no cross-channel
    /// ordering guarantee.
    async fn save_all(&self, channels: Vec<Channel>) -> Result<Vec<Channel>>;

    /// Replace the channel document wholesale, discarding whatever was
    /// stored before.
    async fn index(&self, channel: Channel) -> Result<Channel>;

    /// Delete a channel document.
    async fn delete_by_id(&self, name: &str) -> Result<()>;
}

/// Store of canonical property definitions.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// List every property definition (no channel lists).
    async fn find_all(&self) -> Result<Vec<Property>>;

    /// Fetch a property definition. With `with_channels`, populate the
    /// denormalized channel list: channels bearing a non-empty-valued
    /// instance, each stripped to that single instance with tags removed.
    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Property>>;

    /// Create a property definition.
    async fn index(&self, property: Property) -> Result<Property>;

    /// Create a batch of property definitions.
    async fn index_all(&self, properties: Vec<Property>) -> Result<Vec<Property>>;

    /// Replace the definition stored under `name` (handles renames).
    async fn save(&self, name: &str, property: Property) -> Result<Property>;

    /// [`PropertyRepository::save`] applied to a batch, keyed by each
    /// payload's own name.
    async fn save_all(&self, properties: Vec<Property>) -> Result<Vec<Property>>;

    /// Delete a property definition.
    async fn delete_by_id(&self, name: &str) -> Result<()>;
}

/// Store of canonical tag definitions. Mirrors [`PropertyRepository`]
/// without values; a channel bears a tag iff the instance is present.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Tag>>;

    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Tag>>;

    async fn index(&self, tag: Tag) -> Result<Tag>;

    async fn index_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>>;

    async fn save(&self, name: &str, tag: Tag) -> Result<Tag>;

    async fn save_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>>;

    async fn delete_by_id(&self, name: &str) -> Result<()>;
}
