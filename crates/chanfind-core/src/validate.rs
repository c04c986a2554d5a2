//! Structural precondition checks run before any mutation.
//!
//! Validation is all-or-nothing for a batch: the first failing item aborts
//! the whole batch before a single write is issued. Failures map to 400 at
//! the API boundary.

use crate::error::{Error, Result};
use crate::models::{Property, Tag};
use crate::traits::ChannelRepository;

/// Maximum accepted length for channel, property, and tag names.
pub const MAX_NAME_LEN: usize = 255;

/// Whether the conflict guard against already-assigned values applies.
///
/// Create is a create-not-overwrite operation: a listed channel must not
/// already carry a meaningful (non-empty) value for the property. Update
/// deliberately overwrites values, so the guard is skipped there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Validate an entity name: non-empty, bounded length, no control
/// characters, no surrounding whitespace.
pub fn validate_entity_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name must be {} characters or less", MAX_NAME_LEN));
    }
    if name.trim() != name {
        return Err("name cannot start or end with whitespace".to_string());
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("name cannot contain control characters".to_string());
    }
    Ok(())
}

/// Validate a property payload against the current channel store.
///
/// Checks, in order: (1) name present and well-formed; (2) owner present;
/// (3) every listed channel exists; (4) in [`ValidationMode::Create`], no
/// listed channel already carries a non-empty-valued instance of this
/// property.
pub async fn validate_property(
    property: &Property,
    channels: &dyn ChannelRepository,
    mode: ValidationMode,
) -> Result<()> {
    validate_entity_name(&property.name)
        .map_err(|msg| Error::InvalidInput(format!("property {}", msg)))?;
    if property.owner.is_empty() {
        return Err(Error::InvalidInput(format!(
            "The property owner cannot be empty: {}",
            property.name
        )));
    }
    for listed in &property.channels {
        let stored = channels.find_by_id(&listed.name).await?.ok_or_else(|| {
            Error::InvalidInput(format!(
                "The channel with the name {} does not exist",
                listed.name
            ))
        })?;
        if mode == ValidationMode::Create {
            if let Some(existing) = stored.property(&property.name) {
                if !existing.is_tombstone() {
                    return Err(Error::InvalidInput(format!(
                        "The channel {} already carries a value for the property {}",
                        listed.name, property.name
                    )));
                }
            }
        }
    }
    Ok(())
}

/// [`validate_property`] over a batch; the first failure aborts the batch.
pub async fn validate_properties(
    properties: &[Property],
    channels: &dyn ChannelRepository,
    mode: ValidationMode,
) -> Result<()> {
    for property in properties {
        validate_property(property, channels, mode).await?;
    }
    Ok(())
}

/// Validate a tag payload: name and owner present, every listed channel
/// exists. Tags carry no value, so there is no conflict guard.
pub async fn validate_tag(tag: &Tag, channels: &dyn ChannelRepository) -> Result<()> {
    validate_entity_name(&tag.name).map_err(|msg| Error::InvalidInput(format!("tag {}", msg)))?;
    if tag.owner.is_empty() {
        return Err(Error::InvalidInput(format!(
            "The tag owner cannot be empty: {}",
            tag.name
        )));
    }
    for listed in &tag.channels {
        if !channels.exists_by_id(&listed.name).await? {
            return Err(Error::InvalidInput(format!(
                "The channel with the name {} does not exist",
                listed.name
            )));
        }
    }
    Ok(())
}

/// [`validate_tag`] over a batch; the first failure aborts the batch.
pub async fn validate_tags(tags: &[Tag], channels: &dyn ChannelRepository) -> Result<()> {
    for tag in tags {
        validate_tag(tag, channels).await?;
    }
    Ok(())
}
