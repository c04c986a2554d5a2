//! In-memory store backend.
//!
//! Implements the same repository contracts as the PostgreSQL backend over
//! plain hash maps. Used by unit and integration tests and by demo setups
//! that do not want a database; always compiled so downstream test suites
//! can reach it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use chanfind_core::reconcile::{property_view, tag_view};
use chanfind_core::{
    Channel, ChannelRepository, Property, PropertyRepository, Result, Tag, TagRepository,
};

#[derive(Default)]
struct Inner {
    channels: HashMap<String, Channel>,
    properties: HashMap<String, Property>,
    tags: HashMap<String, Tag>,
}

/// Shared in-memory store; hand out repository views with
/// [`MemoryStore::channels`], [`MemoryStore::properties`], and
/// [`MemoryStore::tags`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(&self) -> MemoryChannelRepository {
        MemoryChannelRepository {
            inner: self.inner.clone(),
        }
    }

    pub fn properties(&self) -> MemoryPropertyRepository {
        MemoryPropertyRepository {
            inner: self.inner.clone(),
        }
    }

    pub fn tags(&self) -> MemoryTagRepository {
        MemoryTagRepository {
            inner: self.inner.clone(),
        }
    }
}

/// In-memory [`ChannelRepository`].
#[derive(Clone)]
pub struct MemoryChannelRepository {
    inner: Arc<RwLock<Inner>>,
}

fn merge_into(stored: &mut HashMap<String, Channel>, patch: Channel) -> Channel {
    let merged = match stored.remove(&patch.name) {
        Some(mut existing) => {
            if !patch.owner.is_empty() {
                existing.owner = patch.owner;
            }
            for instance in patch.properties {
                existing.set_property(instance);
            }
            for instance in patch.tags {
                existing.set_tag(instance);
            }
            existing
        }
        None => patch,
    };
    stored.insert(merged.name.clone(), merged.clone());
    merged
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn find_by_id(&self, name: &str) -> Result<Option<Channel>> {
        Ok(self.inner.read().await.channels.get(name).cloned())
    }

    async fn exists_by_id(&self, name: &str) -> Result<bool> {
        Ok(self.inner.read().await.channels.contains_key(name))
    }

    async fn find_all(&self) -> Result<Vec<Channel>> {
        let inner = self.inner.read().await;
        let mut channels: Vec<Channel> = inner.channels.values().cloned().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn save(&self, channel: Channel) -> Result<Channel> {
        let mut inner = self.inner.write().await;
        Ok(merge_into(&mut inner.channels, channel))
    }

    async fn save_all(&self, channels: Vec<Channel>) -> Result<Vec<Channel>> {
        let mut inner = self.inner.write().await;
        Ok(channels
            .into_iter()
            .map(|c| merge_into(&mut inner.channels, c))
            .collect())
    }

    async fn index(&self, channel: Channel) -> Result<Channel> {
        let mut inner = self.inner.write().await;
        inner.channels.insert(channel.name.clone(), channel.clone());
        Ok(channel)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        self.inner.write().await.channels.remove(name);
        Ok(())
    }
}

/// In-memory [`PropertyRepository`].
#[derive(Clone)]
pub struct MemoryPropertyRepository {
    inner: Arc<RwLock<Inner>>,
}

#[async_trait]
impl PropertyRepository for MemoryPropertyRepository {
    async fn find_all(&self) -> Result<Vec<Property>> {
        let inner = self.inner.read().await;
        let mut properties: Vec<Property> = inner
            .properties
            .values()
            .map(|p| Property::new(&p.name, &p.owner))
            .collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }

    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Property>> {
        let inner = self.inner.read().await;
        let Some(stored) = inner.properties.get(name) else {
            return Ok(None);
        };
        let mut property = Property::new(&stored.name, &stored.owner);
        if with_channels {
            let mut bearing: Vec<&Channel> = inner
                .channels
                .values()
                .filter(|c| c.property(name).is_some_and(|p| !p.is_tombstone()))
                .collect();
            bearing.sort_by(|a, b| a.name.cmp(&b.name));
            property.channels = bearing.into_iter().map(|c| property_view(c, name)).collect();
        }
        Ok(Some(property))
    }

    async fn index(&self, property: Property) -> Result<Property> {
        let mut inner = self.inner.write().await;
        inner.properties.insert(
            property.name.clone(),
            Property::new(&property.name, &property.owner),
        );
        Ok(property)
    }

    async fn index_all(&self, properties: Vec<Property>) -> Result<Vec<Property>> {
        let mut inner = self.inner.write().await;
        for property in &properties {
            inner.properties.insert(
                property.name.clone(),
                Property::new(&property.name, &property.owner),
            );
        }
        Ok(properties)
    }

    async fn save(&self, name: &str, property: Property) -> Result<Property> {
        let mut inner = self.inner.write().await;
        if name != property.name {
            inner.properties.remove(name);
        }
        inner.properties.insert(
            property.name.clone(),
            Property::new(&property.name, &property.owner),
        );
        Ok(property)
    }

    async fn save_all(&self, properties: Vec<Property>) -> Result<Vec<Property>> {
        let mut inner = self.inner.write().await;
        for property in &properties {
            inner.properties.insert(
                property.name.clone(),
                Property::new(&property.name, &property.owner),
            );
        }
        Ok(properties)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.properties.remove(name);
        for channel in inner.channels.values_mut() {
            channel.remove_property(name);
        }
        Ok(())
    }
}

/// In-memory [`TagRepository`].
#[derive(Clone)]
pub struct MemoryTagRepository {
    inner: Arc<RwLock<Inner>>,
}

#[async_trait]
impl TagRepository for MemoryTagRepository {
    async fn find_all(&self) -> Result<Vec<Tag>> {
        let inner = self.inner.read().await;
        let mut tags: Vec<Tag> = inner
            .tags
            .values()
            .map(|t| Tag::new(&t.name, &t.owner))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Tag>> {
        let inner = self.inner.read().await;
        let Some(stored) = inner.tags.get(name) else {
            return Ok(None);
        };
        let mut tag = Tag::new(&stored.name, &stored.owner);
        if with_channels {
            let mut bearing: Vec<&Channel> = inner
                .channels
                .values()
                .filter(|c| c.tag(name).is_some())
                .collect();
            bearing.sort_by(|a, b| a.name.cmp(&b.name));
            tag.channels = bearing.into_iter().map(|c| tag_view(c, name)).collect();
        }
        Ok(Some(tag))
    }

    async fn index(&self, tag: Tag) -> Result<Tag> {
        let mut inner = self.inner.write().await;
        inner.tags.insert(tag.name.clone(), Tag::new(&tag.name, &tag.owner));
        Ok(tag)
    }

    async fn index_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>> {
        let mut inner = self.inner.write().await;
        for tag in &tags {
            inner.tags.insert(tag.name.clone(), Tag::new(&tag.name, &tag.owner));
        }
        Ok(tags)
    }

    async fn save(&self, name: &str, tag: Tag) -> Result<Tag> {
        let mut inner = self.inner.write().await;
        if name != tag.name {
            inner.tags.remove(name);
        }
        inner.tags.insert(tag.name.clone(), Tag::new(&tag.name, &tag.owner));
        Ok(tag)
    }

    async fn save_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>> {
        let mut inner = self.inner.write().await;
        for tag in &tags {
            inner.tags.insert(tag.name.clone(), Tag::new(&tag.name, &tag.owner));
        }
        Ok(tags)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.tags.remove(name);
        for channel in inner.channels.values_mut() {
            channel.remove_tag(name);
        }
        Ok(())
    }
}
