//! Property operations: validate, authorize, reconcile, write.
//!
//! Every mutation follows the same gate order: role check, structural
//! validation, ownership checks against both the request payload and any
//! pre-existing stored definition, then the writes — property store first,
//! channel store second. Batch operations evaluate every gate for every
//! item before the first write; the writes themselves are not atomic
//! across the batch, and earlier writes are not rolled back when a later
//! one fails.

use std::sync::Arc;

use tracing::{debug, info};

use chanfind_core::reconcile::{
    property_desired_patches, property_update_patches, property_view,
};
use chanfind_core::validate::{validate_properties, validate_property};
use chanfind_core::{
    AuthorizationService, ChannelRepository, Error, Owned, Principal, Property,
    PropertyRepository, Result, RoleClass, ValidationMode,
};

/// Orchestrates property mutations over the two stores.
#[derive(Clone)]
pub struct PropertyService {
    properties: Arc<dyn PropertyRepository>,
    channels: Arc<dyn ChannelRepository>,
    authz: AuthorizationService,
}

impl PropertyService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        channels: Arc<dyn ChannelRepository>,
        authz: AuthorizationService,
    ) -> Self {
        Self {
            properties,
            channels,
            authz,
        }
    }

    /// List every property definition.
    pub async fn list(&self) -> Result<Vec<Property>> {
        self.properties.find_all().await
    }

    /// Fetch one property, optionally with its bearing channels.
    pub async fn read(&self, name: &str, with_channels: bool) -> Result<Property> {
        self.properties
            .find_by_id(name, with_channels)
            .await?
            .ok_or_else(|| not_found(name))
    }

    /// Create (PUT): destructive replace. An existing definition is deleted
    /// first, which strips its instance from every channel; only channels
    /// re-listed in the payload get the property back.
    pub async fn create(
        &self,
        principal: &Principal,
        name: &str,
        payload: Property,
    ) -> Result<Property> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate_property(&payload, self.channels.as_ref(), ValidationMode::Create).await?;
        self.require_owner(principal, &payload, name)?;

        if let Some(existing) = self.properties.find_by_id(name, false).await? {
            self.require_owner(principal, &existing, name)?;
            self.properties.delete_by_id(name).await?;
        }

        let created = self
            .properties
            .index(Property::new(&payload.name, &payload.owner))
            .await?;

        let patches = property_desired_patches(&payload);
        let saved = self.channels.save_all(patches).await?;
        info!(
            property = name,
            principal = %principal.name,
            channel_count = saved.len(),
            "Created property"
        );

        Ok(created.with_channels(saved.iter().map(|c| property_view(c, name)).collect()))
    }

    /// Create a batch of properties. All gates run before any write.
    pub async fn create_multiple(
        &self,
        principal: &Principal,
        payloads: Vec<Property>,
    ) -> Result<Vec<Property>> {
        self.require_role(principal, "batch")?;
        validate_properties(&payloads, self.channels.as_ref(), ValidationMode::Create).await?;
        for payload in &payloads {
            self.require_owner(principal, payload, &payload.name)?;
            if let Some(existing) = self.properties.find_by_id(&payload.name, false).await? {
                self.require_owner(principal, &existing, &existing.name)?;
            }
        }

        for payload in &payloads {
            if self
                .properties
                .find_by_id(&payload.name, false)
                .await?
                .is_some()
            {
                self.properties.delete_by_id(&payload.name).await?;
            }
        }

        let definitions: Vec<Property> = payloads
            .iter()
            .map(|p| Property::new(&p.name, &p.owner))
            .collect();
        let created = self.properties.index_all(definitions).await?;

        let mut pooled = Vec::new();
        for payload in &payloads {
            pooled.extend(property_desired_patches(payload));
        }
        if !pooled.is_empty() {
            self.channels.save_all(pooled).await?;
        }
        info!(
            result_count = created.len(),
            principal = %principal.name,
            "Created property batch"
        );
        Ok(created)
    }

    /// Update (POST): reconcile against the prior association set. Desired
    /// channels get the new value, channels dropped from the prior set get
    /// a tombstone instance, everything else is untouched.
    pub async fn update(
        &self,
        principal: &Principal,
        name: &str,
        payload: Property,
    ) -> Result<Property> {
        self.require_role(principal, name)?;
        require_name_match(name, &payload.name)?;
        validate_property(&payload, self.channels.as_ref(), ValidationMode::Update).await?;
        self.require_owner(principal, &payload, name)?;

        let prior_channels = match self.properties.find_by_id(name, true).await? {
            Some(existing) => {
                self.require_owner(principal, &existing, name)?;
                existing.channels
            }
            None => Vec::new(),
        };

        let updated = self
            .properties
            .save(name, Property::new(&payload.name, &payload.owner))
            .await?;

        let patches = property_update_patches(&payload, &prior_channels);
        let tombstone_count = patches.len() - payload.channels.len();
        let saved = self.channels.save_all(patches).await?;
        debug!(
            property = name,
            channel_count = payload.channels.len(),
            tombstone_count,
            "Reconciled property associations"
        );

        let views = saved
            .iter()
            .filter(|c| payload.channels.iter().any(|d| d.name == c.name))
            .map(|c| property_view(c, &payload.name))
            .collect();
        Ok(updated.with_channels(views))
    }

    /// Update a batch of properties; channel patches from every member are
    /// pooled into a single bulk upsert.
    pub async fn update_multiple(
        &self,
        principal: &Principal,
        payloads: Vec<Property>,
    ) -> Result<Vec<Property>> {
        self.require_role(principal, "batch")?;
        validate_properties(&payloads, self.channels.as_ref(), ValidationMode::Update).await?;
        for payload in &payloads {
            self.require_owner(principal, payload, &payload.name)?;
            if let Some(existing) = self.properties.find_by_id(&payload.name, false).await? {
                self.require_owner(principal, &existing, &existing.name)?;
            }
        }

        let mut pooled = Vec::new();
        for payload in &payloads {
            let prior_channels = self
                .properties
                .find_by_id(&payload.name, true)
                .await?
                .map(|p| p.channels)
                .unwrap_or_default();
            pooled.extend(property_update_patches(payload, &prior_channels));
        }

        let definitions: Vec<Property> = payloads
            .iter()
            .map(|p| Property::new(&p.name, &p.owner))
            .collect();
        let updated = self.properties.save_all(definitions).await?;

        if !pooled.is_empty() {
            self.channels.save_all(pooled).await?;
        }
        info!(
            result_count = updated.len(),
            principal = %principal.name,
            "Updated property batch"
        );
        Ok(updated)
    }

    /// Attach an existing property to one channel without a value.
    pub async fn add_single(
        &self,
        principal: &Principal,
        property_name: &str,
        channel_name: &str,
    ) -> Result<Property> {
        self.require_role(principal, property_name)?;
        let existing = self
            .properties
            .find_by_id(property_name, false)
            .await?
            .ok_or_else(|| not_found(property_name))?;
        self.require_owner(principal, &existing, property_name)?;

        let mut channel = self
            .channels
            .find_by_id(channel_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "The channel with the name {channel_name} does not exist"
                ))
            })?;
        channel.set_property(existing.instance(""));
        let saved = self.channels.save(channel).await?;

        Ok(existing.with_channels(vec![property_view(&saved, property_name)]))
    }

    /// Delete the property definition; its instance is stripped from every
    /// channel as part of the store delete.
    pub async fn remove(&self, principal: &Principal, name: &str) -> Result<()> {
        self.require_role(principal, name)?;
        let existing = self
            .properties
            .find_by_id(name, false)
            .await?
            .ok_or_else(|| not_found(name))?;
        self.require_owner(principal, &existing, name)?;
        self.properties.delete_by_id(name).await?;
        info!(property = name, principal = %principal.name, "Deleted property");
        Ok(())
    }

    /// Detach the property from a single channel, leaving the definition
    /// and every other association alone.
    pub async fn remove_single(
        &self,
        principal: &Principal,
        property_name: &str,
        channel_name: &str,
    ) -> Result<()> {
        self.require_role(principal, property_name)?;
        let existing = self
            .properties
            .find_by_id(property_name, false)
            .await?
            .ok_or_else(|| not_found(property_name))?;
        self.require_owner(principal, &existing, property_name)?;

        let mut channel = self
            .channels
            .find_by_id(channel_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "The channel with the name {channel_name} does not exist"
                ))
            })?;
        channel.remove_property(property_name);
        // Wholesale re-persist: merge save would resurrect the instance.
        self.channels.index(channel).await?;
        Ok(())
    }

    fn require_role(&self, principal: &Principal, what: &str) -> Result<()> {
        if self.authz.is_authorized_role(principal, RoleClass::Property) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} does not have the property role required to operate on {}",
                principal.name, what
            )))
        }
    }

    fn require_owner<E: Owned>(&self, principal: &Principal, entity: &E, what: &str) -> Result<()> {
        if self.authz.is_authorized_owner(principal, entity) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "User {} is not an owner of the property {}",
                principal.name, what
            )))
        }
    }
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("The property with the name {name} does not exist"))
}

fn require_name_match(path: &str, payload: &str) -> Result<()> {
    if path == payload {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "The payload property name {payload} does not match the path {path}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanfind_core::{Channel, PropertyInstance};
    use chanfind_db::MemoryStore;

    fn service() -> (PropertyService, MemoryStore) {
        let store = MemoryStore::new();
        let authz = AuthorizationService::new(
            vec!["cf-channels".to_string()],
            vec!["cf-properties".to_string()],
            vec!["cf-tags".to_string()],
            vec!["cf-admins".to_string()],
        );
        let service = PropertyService::new(
            Arc::new(store.properties()),
            Arc::new(store.channels()),
            authz,
        );
        (service, store)
    }

    fn ops() -> Principal {
        Principal::new("alice", vec!["cf-properties".to_string(), "ops".to_string()])
    }

    fn payload(name: &str, owner: &str, channels: &[(&str, &str)]) -> Property {
        let listed = channels
            .iter()
            .map(|(channel, value)| {
                let mut ch = Channel::new(*channel, "");
                ch.set_property(PropertyInstance::new(name, owner, *value));
                ch
            })
            .collect();
        Property::new(name, owner).with_channels(listed)
    }

    async fn seed_channels(store: &MemoryStore, names: &[&str]) {
        for name in names {
            store
                .channels()
                .index(Channel::new(*name, "ops"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn create_attaches_property_to_listed_channels() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;

        let created = service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("A", "10")]))
            .await
            .unwrap();

        let names: Vec<&str> = created.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);

        let stored = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert_eq!(stored.properties.len(), 1);
        assert_eq!(stored.property("voltage").unwrap().value, "10");

        let read = service.read("voltage", true).await.unwrap();
        assert_eq!(read.channels.len(), 1);
        assert_eq!(read.channels[0].name, "A");
    }

    #[tokio::test]
    async fn repeated_create_is_rejected_before_any_write() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;

        let body = payload("voltage", "ops", &[("A", "10"), ("B", "20")]);
        service.create(&ops(), "voltage", body.clone()).await.unwrap();
        let first = store.channels().find_all().await.unwrap();

        // The listed channels now carry live values, so the guard fires and
        // the association state is exactly what a single create produced.
        let err = service.create(&ops(), "voltage", body).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let second = store.channels().find_all().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn create_requires_property_role() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        let outsider = Principal::new("mallory", vec!["ops".to_string()]);

        let err = service
            .create(&outsider, "voltage", payload("voltage", "ops", &[("A", "10")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn create_requires_payload_ownership() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        // Holds the role, but not a member of teamA.
        let principal = Principal::new("bob", vec!["cf-properties".to_string()]);

        let err = service
            .create(&principal, "voltage", payload("voltage", "teamA", &[("A", "10")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn update_requires_ownership_of_existing_definition() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        store
            .properties()
            .index(Property::new("voltage", "teamA"))
            .await
            .unwrap();

        // Owner of the new payload but not of the stored definition.
        let principal = Principal::new("bob", vec!["cf-properties".into(), "teamB".into()]);
        let err = service
            .update(&principal, "voltage", payload("voltage", "teamB", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn create_is_a_destructive_replace() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;

        service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("A", "10")]))
            .await
            .unwrap();
        service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("B", "30")]))
            .await
            .unwrap();

        // A lost the instance entirely (delete stripped it, no tombstone).
        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert!(a.property("voltage").is_none());

        let b = store.channels().find_by_id("B").await.unwrap().unwrap();
        assert_eq!(b.property("voltage").unwrap().value, "30");
    }

    #[tokio::test]
    async fn create_rejects_channel_with_conflicting_value() {
        let (service, store) = service();
        let mut channel = Channel::new("C", "ops");
        channel.set_property(PropertyInstance::new("voltage", "ops", "5"));
        store.channels().index(channel).await.unwrap();

        let err = service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("C", "7")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_reconciles_against_prior_associations() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;
        // A also carries an unrelated property that must survive.
        let mut a = store.channels().find_by_id("A").await.unwrap().unwrap();
        a.set_property(PropertyInstance::new("current", "ops", "3"));
        store.channels().index(a).await.unwrap();

        service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("A", "10"), ("B", "10")]))
            .await
            .unwrap();
        let updated = service
            .update(&ops(), "voltage", payload("voltage", "ops", &[("B", "20")]))
            .await
            .unwrap();

        // A got a tombstone, B the new value, A's unrelated property intact.
        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert!(a.property("voltage").unwrap().is_tombstone());
        assert_eq!(a.property("current").unwrap().value, "3");

        let b = store.channels().find_by_id("B").await.unwrap().unwrap();
        assert_eq!(b.property("voltage").unwrap().value, "20");

        // Response and the denormalized list both report the desired set.
        let names: Vec<&str> = updated.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
        let read = service.read("voltage", true).await.unwrap();
        assert_eq!(read.channels.len(), 1);
        assert_eq!(read.channels[0].name, "B");
    }

    #[tokio::test]
    async fn update_with_empty_channel_list_detaches_everywhere() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;
        service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("A", "10"), ("B", "20")]))
            .await
            .unwrap();

        service
            .update(&ops(), "voltage", payload("voltage", "ops", &[]))
            .await
            .unwrap();

        for name in ["A", "B"] {
            let ch = store.channels().find_by_id(name).await.unwrap().unwrap();
            assert!(ch.property("voltage").unwrap().is_tombstone());
        }
        let read = service.read("voltage", true).await.unwrap();
        assert!(read.channels.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_property_creates_it() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;

        service
            .update(&ops(), "voltage", payload("voltage", "ops", &[("A", "10")]))
            .await
            .unwrap();

        assert!(service.read("voltage", false).await.is_ok());
        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert_eq!(a.property("voltage").unwrap().value, "10");
    }

    #[tokio::test]
    async fn update_rejects_unknown_listed_channel() {
        let (service, _store) = service();

        let err = service
            .update(&ops(), "voltage", payload("voltage", "ops", &[("ghost", "1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn batch_update_pools_channel_patches() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;

        service
            .update_multiple(
                &ops(),
                vec![
                    payload("voltage", "ops", &[("A", "10")]),
                    payload("current", "ops", &[("A", "3"), ("B", "4")]),
                ],
            )
            .await
            .unwrap();

        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert_eq!(a.property("voltage").unwrap().value, "10");
        assert_eq!(a.property("current").unwrap().value, "3");
        let b = store.channels().find_by_id("B").await.unwrap().unwrap();
        assert_eq!(b.property("current").unwrap().value, "4");
    }

    #[tokio::test]
    async fn batch_validation_failure_aborts_before_writes() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;

        let result = service
            .update_multiple(
                &ops(),
                vec![
                    payload("voltage", "ops", &[("A", "10")]),
                    payload("current", "ops", &[("ghost", "3")]),
                ],
            )
            .await;

        assert!(result.is_err());
        // The valid member was not applied either.
        assert!(service.read("voltage", false).await.is_err());
        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert!(a.property("voltage").is_none());
    }

    #[tokio::test]
    async fn add_single_requires_existing_property_and_channel() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;

        let err = service.add_single(&ops(), "voltage", "A").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        store
            .properties()
            .index(Property::new("voltage", "ops"))
            .await
            .unwrap();
        let err = service.add_single(&ops(), "voltage", "ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let added = service.add_single(&ops(), "voltage", "A").await.unwrap();
        assert_eq!(added.channels.len(), 1);
        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert!(a.property("voltage").is_some());
    }

    #[tokio::test]
    async fn remove_single_strips_only_the_named_instance() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        service
            .update_multiple(
                &ops(),
                vec![
                    payload("voltage", "ops", &[("A", "10")]),
                    payload("current", "ops", &[("A", "3")]),
                ],
            )
            .await
            .unwrap();

        service.remove_single(&ops(), "voltage", "A").await.unwrap();

        let a = store.channels().find_by_id("A").await.unwrap().unwrap();
        assert!(a.property("voltage").is_none());
        assert_eq!(a.property("current").unwrap().value, "3");
        // Definition survives a single-channel detach.
        assert!(service.read("voltage", false).await.is_ok());
    }

    #[tokio::test]
    async fn remove_deletes_definition_and_all_instances() {
        let (service, store) = service();
        seed_channels(&store, &["A", "B"]).await;
        service
            .create(&ops(), "voltage", payload("voltage", "ops", &[("A", "10"), ("B", "20")]))
            .await
            .unwrap();

        service.remove(&ops(), "voltage").await.unwrap();

        assert!(matches!(
            service.read("voltage", false).await.unwrap_err(),
            Error::NotFound(_)
        ));
        for name in ["A", "B"] {
            let ch = store.channels().find_by_id(name).await.unwrap().unwrap();
            assert!(ch.property("voltage").is_none());
        }
    }

    #[tokio::test]
    async fn ownership_gate_rejects_foreign_team() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        store
            .properties()
            .index(Property::new("voltage", "teamA"))
            .await
            .unwrap();

        let team_b = Principal::new("bob", vec!["cf-properties".into(), "teamB".into()]);
        let err = service.remove(&team_b, "voltage").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn admin_override_bypasses_ownership() {
        let (service, store) = service();
        seed_channels(&store, &["A"]).await;
        store
            .properties()
            .index(Property::new("voltage", "teamA"))
            .await
            .unwrap();

        let admin = Principal::new("root", vec!["cf-admins".to_string()]);
        assert!(service.remove(&admin, "voltage").await.is_ok());
    }
}
