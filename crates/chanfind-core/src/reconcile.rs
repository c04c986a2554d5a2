//! Reconciliation of channel/property and channel/tag associations.
//!
//! Given a desired association set (the request payload's channel list) and
//! the previously stored association set, these functions compute the
//! minimal set of channel patches to upsert so that every channel in the
//! desired set carries exactly one instance of the entity and every channel
//! dropped from the prior set is marked accordingly. The functions are pure:
//! they hold no state and issue no writes. Callers hand the patches to
//! [`crate::traits::ChannelRepository::save_all`], whose merge-by-name
//! semantics preserve every unrelated instance on the touched channels.
//!
//! Patches to distinct channels never conflict, so ordering within one
//! batch is irrelevant and batches from several entities can be pooled into
//! a single bulk upsert.

use crate::models::{Channel, Property, PropertyInstance, Tag};

/// Patches for the desired association set of a property.
///
/// One minimal channel patch per payload channel: the channel name and
/// owner, a single instance of `property` carrying the value taken from the
/// payload channel's own instance list (empty if the payload carries none),
/// and no tags.
pub fn property_desired_patches(property: &Property) -> Vec<Channel> {
    property
        .channels
        .iter()
        .map(|ch| {
            let value = ch
                .property(&property.name)
                .map(|p| p.value.clone())
                .unwrap_or_default();
            patch(ch, property.instance(value))
        })
        .collect()
}

/// Tombstone patches for the removal set of a property update.
///
/// The removal set is every prior channel whose name does not appear in the
/// desired set. Each receives an empty-value instance of the property: the
/// association is explicitly marked as no longer applying rather than the
/// instance being silently dropped.
pub fn property_removal_patches(property: &Property, prior_channels: &[Channel]) -> Vec<Channel> {
    prior_channels
        .iter()
        .filter(|prior| !property.channels.iter().any(|ch| ch.name == prior.name))
        .map(|prior| patch(prior, property.instance("")))
        .collect()
}

/// Full patch set for a single-property update: desired patches followed by
/// tombstones. Channels in neither set are untouched.
pub fn property_update_patches(property: &Property, prior_channels: &[Channel]) -> Vec<Channel> {
    let mut patches = property_desired_patches(property);
    patches.extend(property_removal_patches(property, prior_channels));
    patches
}

/// Reshape a saved channel for a property response: tags stripped, instance
/// list reduced to the single instance of `property_name`.
pub fn property_view(channel: &Channel, property_name: &str) -> Channel {
    let mut view = Channel::new(&channel.name, &channel.owner);
    if let Some(instance) = channel.property(property_name) {
        view.properties.push(instance.clone());
    }
    view
}

/// Patches for the desired association set of a tag: one minimal channel
/// patch per payload channel carrying the single tag instance.
pub fn tag_desired_patches(tag: &Tag) -> Vec<Channel> {
    tag.channels
        .iter()
        .map(|ch| {
            let mut p = Channel::new(&ch.name, &ch.owner);
            p.tags.push(tag.instance());
            p
        })
        .collect()
}

/// Carry-over patches for a tag update.
///
/// Tag updates are additive: prior channels absent from the desired set
/// keep the tag, so they are re-saved with the (possibly re-owned) instance
/// to survive the definition rewrite. Tags have no value, hence no
/// tombstone form; detachment happens only through the exclusive create
/// path or a single-channel remove.
pub fn tag_carryover_patches(tag: &Tag, prior_channels: &[Channel]) -> Vec<Channel> {
    prior_channels
        .iter()
        .filter(|prior| !tag.channels.iter().any(|ch| ch.name == prior.name))
        .map(|prior| {
            let mut p = Channel::new(&prior.name, &prior.owner);
            p.tags.push(tag.instance());
            p
        })
        .collect()
}

/// Full patch set for a single-tag update: desired patches plus carry-over.
pub fn tag_update_patches(tag: &Tag, prior_channels: &[Channel]) -> Vec<Channel> {
    let mut patches = tag_desired_patches(tag);
    patches.extend(tag_carryover_patches(tag, prior_channels));
    patches
}

/// Reshape a saved channel for a tag response: properties stripped,
/// tag list reduced to the single instance of `tag_name`.
pub fn tag_view(channel: &Channel, tag_name: &str) -> Channel {
    let mut view = Channel::new(&channel.name, &channel.owner);
    if let Some(instance) = channel.tag(tag_name) {
        view.tags.push(instance.clone());
    }
    view
}

// Each patch gets its own owned instance list; nothing is shared across
// channel objects.
fn patch(channel: &Channel, instance: PropertyInstance) -> Channel {
    let mut p = Channel::new(&channel.name, &channel.owner);
    p.properties.push(instance);
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagInstance;

    fn payload_channel(name: &str, property: &str, value: &str) -> Channel {
        let mut ch = Channel::new(name, "ops");
        ch.set_property(PropertyInstance::new(property, "ops", value));
        ch
    }

    #[test]
    fn desired_patches_carry_exactly_one_instance() {
        let property = Property::new("voltage", "ops").with_channels(vec![
            payload_channel("sig:A", "voltage", "10"),
            payload_channel("sig:B", "voltage", "20"),
        ]);

        let patches = property_desired_patches(&property);

        assert_eq!(patches.len(), 2);
        for p in &patches {
            assert_eq!(p.properties.len(), 1);
            assert!(p.tags.is_empty());
            assert_eq!(p.properties[0].name, "voltage");
            assert_eq!(p.properties[0].owner, "ops");
        }
        assert_eq!(patches[0].properties[0].value, "10");
        assert_eq!(patches[1].properties[0].value, "20");
    }

    #[test]
    fn desired_patch_ignores_unrelated_payload_instances() {
        let mut ch = payload_channel("sig:A", "voltage", "10");
        ch.set_property(PropertyInstance::new("current", "ops", "3"));
        let property = Property::new("voltage", "ops").with_channels(vec![ch]);

        let patches = property_desired_patches(&property);

        assert_eq!(patches[0].properties.len(), 1);
        assert_eq!(patches[0].properties[0].name, "voltage");
    }

    #[test]
    fn desired_patch_defaults_to_empty_value_when_payload_has_none() {
        let property =
            Property::new("voltage", "ops").with_channels(vec![Channel::new("sig:A", "ops")]);

        let patches = property_desired_patches(&property);

        assert!(patches[0].properties[0].is_tombstone());
    }

    #[test]
    fn removal_set_is_prior_minus_desired() {
        let property = Property::new("voltage", "ops")
            .with_channels(vec![payload_channel("sig:B", "voltage", "20")]);
        let prior = vec![Channel::new("sig:A", "ops"), Channel::new("sig:B", "ops")];

        let tombstones = property_removal_patches(&property, &prior);

        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].name, "sig:A");
        assert_eq!(tombstones[0].properties.len(), 1);
        assert!(tombstones[0].properties[0].is_tombstone());
        assert_eq!(tombstones[0].properties[0].owner, "ops");
    }

    #[test]
    fn empty_desired_set_tombstones_every_prior_channel() {
        let property = Property::new("voltage", "ops");
        let prior = vec![Channel::new("sig:A", "ops"), Channel::new("sig:B", "ops")];

        let patches = property_update_patches(&property, &prior);

        assert_eq!(patches.len(), 2);
        assert!(patches.iter().all(|p| p.properties[0].is_tombstone()));
    }

    #[test]
    fn update_patches_cover_desired_and_removal_sets_only() {
        // Prior [A, B], desired [B, C]: B repatched, A tombstoned, C added.
        let property = Property::new("voltage", "ops").with_channels(vec![
            payload_channel("sig:B", "voltage", "20"),
            payload_channel("sig:C", "voltage", "30"),
        ]);
        let prior = vec![Channel::new("sig:A", "ops"), Channel::new("sig:B", "ops")];

        let patches = property_update_patches(&property, &prior);

        assert_eq!(patches.len(), 3);
        let by_name = |n: &str| patches.iter().find(|p| p.name == n).unwrap();
        assert_eq!(by_name("sig:B").properties[0].value, "20");
        assert_eq!(by_name("sig:C").properties[0].value, "30");
        assert!(by_name("sig:A").properties[0].is_tombstone());
    }

    #[test]
    fn patches_own_their_instance_lists() {
        let property = Property::new("voltage", "ops").with_channels(vec![
            payload_channel("sig:A", "voltage", "10"),
            payload_channel("sig:B", "voltage", "10"),
        ]);

        let mut patches = property_desired_patches(&property);
        patches[0].properties[0].value = "changed".to_string();

        assert_eq!(patches[1].properties[0].value, "10");
    }

    #[test]
    fn property_view_strips_tags_and_other_instances() {
        let mut channel = Channel::new("sig:A", "ops");
        channel.set_property(PropertyInstance::new("voltage", "ops", "10"));
        channel.set_property(PropertyInstance::new("current", "ops", "3"));
        channel.set_tag(TagInstance::new("archived", "ops"));

        let view = property_view(&channel, "voltage");

        assert_eq!(view.properties.len(), 1);
        assert_eq!(view.properties[0].name, "voltage");
        assert!(view.tags.is_empty());
    }

    #[test]
    fn tag_update_is_additive_over_prior_channels() {
        let tag = Tag::new("archived", "ops").with_channels(vec![Channel::new("sig:B", "ops")]);
        let prior = vec![Channel::new("sig:A", "ops"), Channel::new("sig:B", "ops")];

        let patches = tag_update_patches(&tag, &prior);

        assert_eq!(patches.len(), 2);
        assert!(patches.iter().all(|p| p.tag("archived").is_some()));
        assert!(patches.iter().any(|p| p.name == "sig:A"));
    }

    #[test]
    fn tag_patches_carry_no_properties() {
        let tag = Tag::new("archived", "ops").with_channels(vec![Channel::new("sig:A", "ops")]);

        let patches = tag_desired_patches(&tag);

        assert_eq!(patches.len(), 1);
        assert!(patches[0].properties.is_empty());
        assert_eq!(patches[0].tags.len(), 1);
    }
}
