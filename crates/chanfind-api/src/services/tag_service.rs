//! Tag operations.
//!
//! Same gate order as the property side: role, validation, ownership of
//! payload and stored definition, then tag-store writes before channel-store
//! writes. The one semantic difference is update: tags have no value and no
//! tombstone form, so an update is additive. Prior channels missing from the
//! desired set keep the tag; only the exclusive create path or a
//! single-channel remove detaches it.

use std::sync::Arc;

use tracing::{debug, info};

use chanfind_core::reconcile::{tag_desired_patches, tag_update_patches, tag_view};
use chanfind_core::validate::{validate_tag, validate_tags};
use chanfind_core::{
    AuthorizationService, ChannelRepository, Error, Owned, Principal, Result, RoleClass, Tag,
    TagRepository,
};

/// Orchestrates tag mutations over the two stores.
#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagRepository>,
    channels: Arc<dyn ChannelRepository>,
    authz: AuthorizationService,
}

impl TagService {
    pub fn new(
        tags: Arc<dyn TagRepository>,
        channels: Arc<dyn ChannelRepository>,
        authz: AuthorizationService,
    ) -> Self {
        Self {
            tags,
            channels,
            authz,
        }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.tags.find_all().await
    }

    pub async fn read(&self, name: &str, with_channels: bool) -> Result<Tag> {
        self.tags
            .find_by_id(name, with_channels)
            .await?
            .ok_or_else(|| not_found(name))
    }

    /// Create (PUT): destructive replace. Deleting the prior definition
    /// strips the tag from every channel; only the listed channels get it
    /// back.
    pub async fn create(&self, principal: &Principal, name: &str, payload: Tag) -> Result<Tag> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate_tag(&payload, self.channels.as_ref()).await?;
        self.require_owner(principal, &payload, name)?;

        if let Some(existing) = self.tags.find_by_id(name, false).await? {
            self.require_owner(principal, &existing, name)?;
            self.tags.delete_by_id(name).await?;
        }

        let created = self.tags.index(Tag::new(&payload.name, &payload.owner)).await?;

        let patches = tag_desired_patches(&payload);
        let saved = self.channels.save_all(patches).await?;
        info!(
            tag = name,
            principal = %principal.name,
            channel_count = saved.len(),
            "Created tag"
        );

        Ok(created.with_channels(saved.iter().map(|c| tag_view(c, name)).collect()))
    }

    /// Create a batch of tags. All gates run before any write.
    pub async fn create_multiple(
        &self,
        principal: &Principal,
        payloads: Vec<Tag>,
    ) -> Result<Vec<Tag>> {
        self.require_role(principal, "batch")?;
        validate_tags(&payloads, self.channels.as_ref()).await?;
        for payload in &payloads {
            self.require_owner(principal, payload, &payload.name)?;
            if let Some(existing) = self.tags.find_by_id(&payload.name, false).await? {
                self.require_owner(principal, &existing, &existing.name)?;
            }
        }

        for payload in &payloads {
            if self.tags.find_by_id(&payload.name, false).await?.is_some() {
                self.tags.delete_by_id(&payload.name).await?;
            }
        }

        let definitions: Vec<Tag> = payloads
            .iter()
            .map(|t| Tag::new(&t.name, &t.owner))
            .collect();
        let created = self.tags.index_all(definitions).await?;

        let mut pooled = Vec::new();
        for payload in &payloads {
            pooled.extend(tag_desired_patches(payload));
        }
        if !pooled.is_empty() {
            self.channels.save_all(pooled).await?;
        }
        info!(
            result_count = created.len(),
            principal = %principal.name,
            "Created tag batch"
        );
        Ok(created)
    }

    /// Update (POST): additive. Listed channels gain the tag, prior bearers
    /// keep it with the (possibly re-owned) instance re-saved.
    pub async fn update(&self, principal: &Principal, name: &str, payload: Tag) -> Result<Tag> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate_tag(&payload, self.channels.as_ref()).await?;
        self.require_owner(principal, &payload, name)?;

        let prior_channels = match self.tags.find_by_id(name, true).await? {
            Some(existing) => {
                self.require_owner(principal, &existing, name)?;
                existing.channels
            }
            None => Vec::new(),
        };

        let updated = self
            .tags
            .save(name, Tag::new(&payload.name, &payload.owner))
            .await?;

        let patches = tag_update_patches(&payload, &prior_channels);
        let carryover_count = patches.len() - payload.channels.len();
        let saved = self.channels.save_all(patches).await?;
        debug!(
            tag = name,
            channel_count = payload.channels.len(),
            carryover_count,
            "Applied tag to channels"
        );

        Ok(updated.with_channels(saved.iter().map(|c| tag_view(c, &payload.name)).collect()))
    }

    /// Update a batch of tags, pooling the channel patches.
    pub async fn update_multiple(
        &self,
        principal: &Principal,
        payloads: Vec<Tag>,
    ) -> Result<Vec<Tag>> {
        self.require_role(principal, "batch")?;
        validate_tags(&payloads, self.channels.as_ref()).await?;
        for payload in &payloads {
            self.require_owner(principal, payload, &payload.name)?;
            if let Some(existing) = self.tags.find_by_id(&payload.name, false).await? {
                self.require_owner(principal, &existing, &existing.name)?;
            }
        }

        let mut pooled = Vec::new();
        for payload in &payloads {
            let prior_channels = self
                .tags
                .find_by_id(&payload.name, true)
                .await?
                .map(|t| t.channels)
                .unwrap_or_default();
            pooled.extend(tag_update_patches(payload, &prior_channels));
        }

        let definitions: Vec<Tag> = payloads
            .iter()
            .map(|t| Tag::new(&t.name, &t.owner))
            .collect();
        let updated = self.tags.save_all(definitions).await?;

        if !pooled.is_empty() {
            self.channels.save_all(pooled).await?;
        }
        info!(
            result_count = updated.len(),
            principal = %principal.name,
            "Updated tag batch"
        );
        Ok(updated)
    }

    /// Attach an existing tag to one channel.
    pub async fn add_single(
        &self,
        principal: &Principal,
        tag_name: &str,
        channel_name: &str,
    ) -> Result<Tag> {
        self.require_role(principal, tag_name)?;
        let existing = self
            .tags
            .find_by_id(tag_name, false)
            .await?
            .ok_or_else(|| not_found(tag_name))?;
        self.require_owner(principal, &existing, tag_name)?;

        let mut channel = self
            .channels
            .find_by_id(channel_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "The channel with the name {channel_name} does not exist"
                ))
            })?;
        channel.set_tag(existing.instance());
        let saved = self.channels.save(channel).await?;

        Ok(existing.with_channels(vec![tag_view(&saved, tag_name)]))
    }

    /// Delete the tag definition and strip it from every channel.
    pub async fn remove(&self, principal: &Principal, name: &str) -> Result<()> {
        self.require_role(principal, name)?;
        let existing = self
            .tags
            .find_by_id(name, false)
            .await?
            .ok_or_else(|| not_found(name))?;
        self.require_owner(principal, &existing, name)?;
        self.tags.delete_by_id(name).await?;
        info!(tag = name, principal = %principal.name, "Deleted tag");
        Ok(())
    }

    /// Detach the tag from a single channel.
    pub async fn remove_single(
        &self,
        principal: &Principal,
        tag_name: &str,
        channel_name: &str,
    ) -> Result<()> {
        self.require_role(principal, tag_name)?;
        let existing = self
            .tags
            .find_by_id(tag_name, false)
            .await?
            .ok_or_else(|| not_found(tag_name))?;
        self.require_owner(principal, &existing, tag_name)?;

        let mut channel = self
            .channels
            .find_by_id(channel_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "The channel with the name {channel_name} does not exist"
                ))
            })?;
        channel.remove_tag(tag_name);
        // Wholesale re-persist: merge save cannot express a removal.
        self.channels.index(channel).await?;
        Ok(())
    }

    fn require_role(&self, principal: &Principal, what: &str) -> Result<()> {
        if self.authz.is_authorized_role(principal, RoleClass::Tag) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} does not have the tag role required to operate on {}",
                principal.name, what
            )))
        }
    }

    fn require_owner<E: Owned>(&self, principal: &Principal, entity: &E, what: &str) -> Result<()> {
        if self.authz.is_authorized_owner(principal, entity) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} is not an owner of the tag {}",
                principal.name, what
            )))
        }
    }
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("The tag with the name {name} does not exist"))
}

fn require_name_match(path: &str, payload: &str) -> Result<()> {
    if path == payload {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "The payload tag name {payload} does not match the path {path}"
        )))
    }
}
