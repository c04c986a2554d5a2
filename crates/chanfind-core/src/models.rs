//! Data model for the channel directory.
//!
//! A [`Channel`] is a named entity carrying an embedded set of property
//! instances and tag instances. [`Property`] and [`Tag`] are the canonical,
//! owned definitions; each optionally carries a denormalized list of the
//! channels currently bearing it. The two embedded views are kept consistent
//! by the reconciliation functions in [`crate::reconcile`].

use serde::{Deserialize, Serialize};

/// A single property occurrence on a channel: the property name, the owner
/// of the property definition, and the value assigned on this channel.
///
/// An empty `value` is the tombstone convention: the instance marks a
/// removed association rather than a meaningful assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInstance {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub value: String,
}

impl PropertyInstance {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            value: value.into(),
        }
    }

    /// A tombstone is an instance whose value is empty; it signals that the
    /// property no longer meaningfully applies to the channel.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// A single tag occurrence on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInstance {
    pub name: String,
    pub owner: String,
}

impl TagInstance {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// A named channel document with its embedded instance lists.
///
/// Invariant: at most one [`PropertyInstance`] per distinct property name and
/// at most one [`TagInstance`] per distinct tag name. The setter methods
/// below replace by name to uphold this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub properties: Vec<PropertyInstance>,
    #[serde(default)]
    pub tags: Vec<TagInstance>,
}

impl Channel {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            properties: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Look up the instance of the named property, tombstones included.
    pub fn property(&self, name: &str) -> Option<&PropertyInstance> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Insert or replace the instance with a matching property name.
    pub fn set_property(&mut self, instance: PropertyInstance) {
        match self.properties.iter_mut().find(|p| p.name == instance.name) {
            Some(existing) => *existing = instance,
            None => self.properties.push(instance),
        }
    }

    /// Drop the instance of the named property, if present.
    pub fn remove_property(&mut self, name: &str) {
        self.properties.retain(|p| p.name != name);
    }

    pub fn tag(&self, name: &str) -> Option<&TagInstance> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Insert or replace the instance with a matching tag name.
    pub fn set_tag(&mut self, instance: TagInstance) {
        match self.tags.iter_mut().find(|t| t.name == instance.name) {
            Some(existing) => *existing = instance,
            None => self.tags.push(instance),
        }
    }

    pub fn remove_tag(&mut self, name: &str) {
        self.tags.retain(|t| t.name != name);
    }
}

/// Canonical property definition.
///
/// `channels` is response shaping only: when populated, each entry is
/// stripped to the single matching property instance with tags removed.
/// It is never the stored source of truth for associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
}

impl Property {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    /// Build the instance this property contributes to a channel document.
    pub fn instance(&self, value: impl Into<String>) -> PropertyInstance {
        PropertyInstance::new(&self.name, &self.owner, value)
    }
}

/// Canonical tag definition. Same shape as [`Property`] without a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
}

impl Tag {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    pub fn instance(&self) -> TagInstance {
        TagInstance::new(&self.name, &self.owner)
    }
}

/// Anything gated by per-entity ownership authorization.
pub trait Owned {
    fn owner(&self) -> &str;
}

impl Owned for Property {
    fn owner(&self) -> &str {
        &self.owner
    }
}

impl Owned for Tag {
    fn owner(&self) -> &str {
        &self.owner
    }
}

impl Owned for Channel {
    fn owner(&self) -> &str {
        &self.owner
    }
}
