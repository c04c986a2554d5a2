//! Channel document operations.
//!
//! Channels are the primary documents; the property and tag services patch
//! them through reconciliation. The operations here manage the documents
//! themselves: wholesale create, merge update, delete.

use std::sync::Arc;

use tracing::info;

use chanfind_core::validate::validate_entity_name;
use chanfind_core::{
    AuthorizationService, Channel, ChannelRepository, Error, Owned, Principal, Result, RoleClass,
};

#[derive(Clone)]
pub struct ChannelService {
    channels: Arc<dyn ChannelRepository>,
    authz: AuthorizationService,
}

impl ChannelService {
    pub fn new(channels: Arc<dyn ChannelRepository>, authz: AuthorizationService) -> Self {
        Self { channels, authz }
    }

    pub async fn list(&self) -> Result<Vec<Channel>> {
        self.channels.find_all().await
    }

    pub async fn read(&self, name: &str) -> Result<Channel> {
        self.channels
            .find_by_id(name)
            .await?
            .ok_or_else(|| not_found(name))
    }

    /// Create (PUT): replace the document wholesale. Instances absent from
    /// the payload are discarded.
    pub async fn create(
        &self,
        principal: &Principal,
        name: &str,
        payload: Channel,
    ) -> Result<Channel> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate(&payload)?;
        self.require_owner(principal, &payload, name)?;

        if let Some(existing) = self.channels.find_by_id(name).await? {
            self.require_owner(principal, &existing, name)?;
        }

        let created = self.channels.index(payload).await?;
        info!(channel = name, principal = %principal.name, "Created channel");
        Ok(created)
    }

    /// Update (POST): merge by name. Payload instances replace same-named
    /// stored instances, everything else survives.
    pub async fn update(
        &self,
        principal: &Principal,
        name: &str,
        payload: Channel,
    ) -> Result<Channel> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate(&payload)?;
        self.require_owner(principal, &payload, name)?;

        if let Some(existing) = self.channels.find_by_id(name).await? {
            self.require_owner(principal, &existing, name)?;
        }

        let updated = self.channels.save(payload).await?;
        Ok(updated)
    }

    pub async fn remove(&self, principal: &Principal, name: &str) -> Result<()> {
        self.require_role(principal, name)?;
        let existing = self
            .channels
            .find_by_id(name)
            .await?
            .ok_or_else(|| not_found(name))?;
        self.require_owner(principal, &existing, name)?;
        self.channels.delete_by_id(name).await?;
        info!(channel = name, principal = %principal.name, "Deleted channel");
        Ok(())
    }

    fn require_role(&self, principal: &Principal, what: &str) -> Result<()> {
        if self.authz.is_authorized_role(principal, RoleClass::Channel) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} does not have the channel role required to operate on {}",
                principal.name, what
            )))
        }
    }

    fn require_owner(&self, principal: &Principal, channel: &Channel, what: &str) -> Result<()> {
        if self.authz.is_authorized_owner(principal, channel) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} is not an owner of the channel {}",
                principal.name, what
            )))
        }
    }
}

fn validate(channel: &Channel) -> Result<()> {
    validate_entity_name(&channel.name)
        .map_err(|msg| Error::InvalidInput(format!("channel {}", msg)))?;
    if channel.owner.is_empty() {
        return Err(Error::InvalidInput(format!(
            "The channel owner cannot be empty: {}",
            channel.name
        )));
    }
    for instance in &channel.properties {
        validate_entity_name(&instance.name)
            .map_err(|msg| Error::InvalidInput(format!("property {}", msg)))?;
    }
    for instance in &channel.tags {
        validate_entity_name(&instance.name)
            .map_err(|msg| Error::InvalidInput(format!("tag {}", msg)))?;
    }
    Ok(())
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("The channel with the name {name} does not exist"))
}

fn require_name_match(path: &str, payload: &str) -> Result<()> {
    if path == payload {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "The payload channel name {payload} does not match the path {path}"
        )))
    }
}
